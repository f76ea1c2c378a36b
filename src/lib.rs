//! Runtime bundler library for self-contained application bundles
//!
//! This library downloads a managed runtime for each configured target and
//! assembles it with the application into:
//! - Linux `.tar.gz` bundles (glibc and musl)
//! - macOS `.app` bundles, packaged as `.tar.gz`
//! - Windows `.zip` bundles with the icon embedded in the launcher
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
