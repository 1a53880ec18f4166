// src/config/mod.rs

//! Optional `Exectr.toml` configuration.
//!
//! - [`model`] maps the TOML sections onto serde types.
//! - [`loader`] reads the file.
//! - [`validate`] turns a [`model::RawConfigFile`] into a checked
//!   [`model::ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use model::ConfigFile;
