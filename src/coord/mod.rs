// src/coord/mod.rs

//! Cross-worker coordination: worker identities and the lock file guarding
//! checkpoint read-modify-write cycles.

pub mod identity;
pub mod lock;

pub use identity::WorkerIdentity;
pub use lock::CoordinationLock;
