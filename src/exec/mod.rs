// src/exec/mod.rs

//! Command execution layer.
//!
//! - [`backend`] provides the [`CommandRunner`] trait the engine talks to, so
//!   tests can swap in a fake runner that never spawns a process.
//! - [`shell`] is the production runner: one persistent shell per worker, so
//!   `cd`, exports and sourced files carry over from line to line.

pub mod backend;
pub mod shell;

pub use backend::{CommandOutput, CommandRunner};
pub use shell::ShellSession;
