// src/config/mod.rs

//! Run configuration.
//!
//! - [`model`] holds the raw `Stagehand.toml` mapping and the resolved
//!   [`model::RunConfig`] the rest of the crate consumes.
//! - [`loader`] reads and deserializes the optional config file.
//! - [`validate`] performs semantic checks after CLI/file merging.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::load_optional;
pub use model::{ProjectSection, RunConfig, ServiceSettings, StageCommands, StagehandToml};
pub use validate::validate;
