//! Error types for bundler operations.
//!
//! Provides contextual error chaining, filesystem-specific errors and the
//! failure taxonomy of the bundling pipeline.
//!
//! # Features
//!
//! - **Context trait**: Add context to errors similar to anyhow
//! - **ErrorExt trait**: Filesystem operations with automatic path context
//! - **bail! macro**: Early return with formatted error messages
//! - **Abort semantics**: every error knows whether it only skips a target
//!   ([`Error::is_unsupported_target`]) and which exit code it aborts with
//!   ([`Error::exit_code`])
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_runtime::bundler::{Context, ErrorExt, Result};
//! use std::path::Path;
//!
//! fn read_vm_args(path: &Path) -> Result<String> {
//!     let contents = std::fs::read_to_string(path)
//!         .fs_context("reading vm args file", path)?;
//!
//!     if contents.contains('\n') {
//!         kodegen_bundler_runtime::bail!("vm args file must be a single line");
//!     }
//!
//!     Ok(contents)
//! }
//! ```

use crate::bundler::layout::Stage;
use crate::bundler::settings::Target;
use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the bundler.
///
/// Fatal variants abort the whole run; [`Error::UnsupportedTarget`] only
/// skips the target it was raised for, and icon failures are downgraded to
/// warnings by the layout engine before they ever reach the orchestrator.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// A layout stage failed for one target.
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// The stage that was running
        stage: Stage,
        /// What went wrong inside the stage
        source: Box<Self>,
    },

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "copying include")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// No runtime build is published for the requested version and target.
    #[error("no runtime build available for version {version} on {target}")]
    UnsupportedTarget {
        /// Requested runtime version
        version: u32,
        /// Requested target
        target: Target,
    },

    /// Network or cache storage failure while resolving a runtime.
    #[error("runtime transfer failed: {0}")]
    TransferFailure(String),

    /// Hash mismatch for downloaded files.
    #[error("hash mismatch of downloaded file {file}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Cache file name
        file: String,
        /// Expected hash value
        expected: String,
        /// Actual hash value
        actual: String,
    },

    /// Archive codec asked to handle a format it cannot read or write.
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// Embedding the application icon into a PE image failed.
    #[error("icon patch failed: {0}")]
    IconPatch(String),

    /// A file could not be marked executable.
    #[error("unable to mark {path} as executable: {error}")]
    Permission {
        /// File that should have been marked
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Image processing error (icon conversion, resizing).
    #[error("{0}")]
    ImageError(#[from] image::ImageError),

    /// Error walking a directory tree.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// ZIP archive creation/extraction error.
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    /// Handlebars template rendering error.
    #[error("{0}")]
    HandleBarsError(#[from] handlebars::RenderError),

    /// Handlebars template parsing error.
    #[error("{0}")]
    Template(#[from] handlebars::TemplateError),

    /// JSON serialization/deserialization error.
    #[error("{0}")]
    JsonError(#[from] serde_json::error::Error),

    /// HTTP client error.
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("{0}")]
    UrlParse(#[from] url::ParseError),

    /// Binary parsing error (PE header analysis).
    #[error("binary parse error: {0}")]
    BinaryParseError(#[from] goblin::error::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// Returns true when this error only means "skip this target".
    ///
    /// Looks through [`Error::Stage`] and [`Error::Context`] wrappers.
    pub fn is_unsupported_target(&self) -> bool {
        match self {
            Error::UnsupportedTarget { .. } => true,
            Error::Stage { source, .. } => source.is_unsupported_target(),
            Error::Context(_, source) => source.is_unsupported_target(),
            _ => false,
        }
    }

    /// Stage that was running when this error was raised, if known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            Error::Context(_, source) => source.stage(),
            _ => None,
        }
    }

    /// Process exit code the run aborts with when this error is fatal.
    pub fn exit_code(&self) -> i32 {
        crate::error::EXIT_CODE_ERROR
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with bundler's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
///
/// Wraps I/O errors with the path that caused them for better diagnostics.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_runtime::bundler::{ErrorExt, Result};
/// use std::path::Path;
///
/// fn create_bundle_dir(path: &Path) -> Result<()> {
///     std::fs::create_dir_all(path)
///         .fs_context("creating bundle directory", path)?;
///     Ok(())
/// }
/// ```
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "copying launcher".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// # Examples
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::Error::GenericError(format!($msg)))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($fmt, $($arg)*)))
    };
}
