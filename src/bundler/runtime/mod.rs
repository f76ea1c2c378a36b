//! Runtime acquisition.
//!
//! A [`RuntimeResolver`] maps a runtime version and a [`Target`] to a runtime
//! archive on local disk, downloading it into the shared cache on a miss.
//!
//! # Cache
//!
//! The cache is a flat directory of archives named exactly as reported by
//! the listing API. A file present under that name is used as-is; downloads
//! land in `<name>.part` first and are renamed only when complete, so the
//! cache never holds a truncated archive. Population is single-flight per
//! file name, which makes one resolver safe to share between concurrent
//! callers.

mod adoptium;
mod cache;

pub use adoptium::{AdoptiumResolver, RuntimePackage, api_arch, api_os};
pub use cache::DownloadCache;

use crate::bundler::{Result, Target};
use std::future::Future;
use std::path::PathBuf;

/// Resolves a runtime build to a local archive.
pub trait RuntimeResolver {
    /// Returns the path of the cached runtime archive for `version` on `target`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedTarget`] when no build is published for the pair
    /// - [`Error::TransferFailure`] on network or cache storage errors
    /// - [`Error::HashMismatch`] when a fresh download fails verification
    ///
    /// [`Error::UnsupportedTarget`]: crate::bundler::Error::UnsupportedTarget
    /// [`Error::TransferFailure`]: crate::bundler::Error::TransferFailure
    /// [`Error::HashMismatch`]: crate::bundler::Error::HashMismatch
    fn resolve(&self, version: u32, target: Target) -> impl Future<Output = Result<PathBuf>> + Send;
}
