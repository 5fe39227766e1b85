//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Installable location not found: {path}")]
    LocationNotFound { path: String },

    #[error("Invalid info.json at {path}: {message}")]
    InvalidManifest { path: String, message: String },

    #[error("Invalid version specifier '{spec}': {message}")]
    InvalidVersionSpec { spec: String, message: String },

    #[error("Failed to copy {from} to {to}: {message}")]
    CopyFailed {
        from: String,
        to: String,
        message: String,
    },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
