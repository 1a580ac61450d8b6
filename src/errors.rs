// src/errors.rs

//! Crate-wide error types and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StagehandError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Install command `{command}` failed with exit code {code}")]
    Install { command: String, code: i32 },

    #[error("Backend '{backend}' failed to start: {reason}")]
    BackendStartup {
        backend: String,
        reason: String,
        /// Captured content of the service's error log, when one exists.
        /// Logged at the failure site to aid diagnosis.
        error_log: String,
    },

    #[error("Step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StagehandError>;
