//! Top-level error types and process exit codes.
//!
//! Pipeline failures live in [`crate::bundler::Error`]; this module wraps
//! them together with the failures of the outer shell (arguments, config
//! file handling) and maps everything to an exit code.

use std::path::PathBuf;
use thiserror::Error;

/// Run completed; every requested target was bundled or skipped.
pub const EXIT_CODE_SUCCESS: i32 = 0;

/// Nothing was bundled but nothing failed either (defaults were written).
pub const EXIT_CODE_OTHER: i32 = 2;

/// A fatal error aborted the run.
pub const EXIT_CODE_ERROR: i32 = 255;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type of the command line tool
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument and config errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pipeline errors
    #[error("Bundler error: {0}")]
    Bundler(#[from] crate::bundler::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Config file could not be read or written
    #[error("Config file {}: {reason}", .path.display())]
    Config {
        /// Config file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

impl BundlerError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BundlerError::Bundler(e) => e.exit_code(),
            _ => EXIT_CODE_ERROR,
        }
    }

    /// Hints printed below the error message.
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            BundlerError::Cli(CliError::Config { .. }) => vec![
                "Check that the config directory is readable and writable".to_string(),
                "Delete the config file to have defaults written again".to_string(),
            ],
            BundlerError::Json(_) => {
                vec!["Fix the JSON syntax of the config file and re-run".to_string()]
            }
            BundlerError::Bundler(e) if e.stage().is_some() => vec![String::from(
                "The failing target's build folder was left in place for inspection"
            )],
            _ => Vec::new(),
        }
    }
}
