//! Error types for tedana-gear.
//!
//! This module defines all error types used throughout the gear, providing
//! detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// The main error type for gear operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load the gear configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Invocation Errors ===
    /// Failed to read the platform invocation file.
    #[error("failed to read invocation file {path}: {source}")]
    InvocationRead {
        /// Path to the invocation file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The platform invocation file could not be parsed.
    #[error("failed to parse invocation file {path}: {source}")]
    InvocationParse {
        /// Path to the invocation file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A required input was not provided or does not exist on disk.
    #[error("missing input '{name}'")]
    InputMissing {
        /// Name of the input slot.
        name: String,
    },

    /// The provided inputs do not select exactly one run mode.
    #[error("input mismatch: {message}")]
    InputSelection {
        /// Description of the mismatch.
        message: String,
    },

    // === Discovery Errors ===
    /// Input file discovery failed.
    #[error("discovery failed: {message}")]
    Discovery {
        /// Description of what could not be found.
        message: String,
    },

    /// A glob pattern could not be compiled.
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying error.
        #[source]
        source: glob::PatternError,
    },

    /// A JSON sidecar was missing or malformed.
    #[error("sidecar {path}: {message}")]
    Sidecar {
        /// Path to the sidecar file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    // === Execution Errors ===
    /// The external command could not be spawned.
    #[error("failed to launch '{program}': {source}")]
    CommandSpawn {
        /// The program that failed to launch.
        program: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The external command ran but exited with a failure status.
    #[error("'{program}' failed with {status}")]
    CommandFailed {
        /// The program that failed.
        program: String,
        /// The exit status of the child process.
        status: ExitStatus,
    },

    // === Archive Errors ===
    /// A zip archive operation failed.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A zip archive entry was unusable.
    #[error("bad archive entry in {path}: {message}")]
    ZipEntry {
        /// Path to the archive.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for gear operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new configuration validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a new discovery error.
    #[must_use]
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Create a new input selection error.
    #[must_use]
    pub fn input_selection(message: impl Into<String>) -> Self {
        Self::InputSelection {
            message: message.into(),
        }
    }

    /// Create a new missing input error.
    #[must_use]
    pub fn input_missing(name: impl Into<String>) -> Self {
        Self::InputMissing { name: name.into() }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error came from the external command exiting non-zero.
    #[must_use]
    pub fn is_command_failure(&self) -> bool {
        matches!(self, Self::CommandFailed { .. })
    }

    /// Check if this error is an input problem (missing or mismatched).
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InputMissing { .. } | Self::InputSelection { .. })
    }
}
