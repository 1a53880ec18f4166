// src/dag/mod.rs

//! Line dependency graph and scheduling.
//!
//! - [`graph`] holds the dependency adjacency of a parsed script.
//! - [`scheduler`] decides, per sweep, what happens to each line.
//! - [`step`] defines per-line decisions and the result of one sweep.
//! - [`state_manager`] owns the legal status transitions.
//!
//! Everything here is pure: no IO, no locks, no clocks beyond the timestamps
//! passed in by the caller.

pub mod graph;
pub mod scheduler;
pub mod state_manager;
pub mod step;

pub use graph::DependencyGraph;
pub use scheduler::Scheduler;
pub use state_manager::StateManager;
pub use step::{Decision, SweepStep};
