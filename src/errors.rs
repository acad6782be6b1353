//! Typed error hierarchy for rundock.
//!
//! Three top-level enums cover the three subsystems:
//! - `RunError`: run controller failures surfaced to the caller
//! - `HostError`: process host transport failures
//! - `ConfigError`: configuration load and parse failures
//!
//! Text extraction has no error type: a failed parse is `None`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from starting or stopping runs.
#[derive(Debug, Error)]
pub enum RunError {
    /// Empty prompt or project selection. Rejected before any host call.
    #[error("{0}")]
    Validation(String),

    /// The host RPC failed. No run was registered.
    #[error("Failed to start run: {0}")]
    Transport(String),

    /// Every slot is taken by a running slot-bearing run.
    #[error("No free terminal slot for \"{label}\"; stop a running slot first or try again later")]
    Scheduling { label: String },

    /// The host stop call failed. The run is already marked done locally.
    #[error("Host failed to stop run: {0}")]
    HostStop(String),
}

/// Errors from a process host transport.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Host unreachable: {0}")]
    Transport(String),

    #[error("Host returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Could not decode host response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for HostError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            HostError::Decode(err.to_string())
        } else {
            HostError::Transport(err.to_string())
        }
    }
}

/// Errors from loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}
