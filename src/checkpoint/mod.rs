// src/checkpoint/mod.rs

//! Durable run state: the versioned checkpoint file, the output log and the
//! paths both live at.

pub mod log;
pub mod paths;
pub mod schema;
pub mod store;

pub use log::{LogScope, LogWriter};
pub use paths::StatePaths;
pub use store::CheckpointStore;
