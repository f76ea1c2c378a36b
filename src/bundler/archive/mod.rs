//! Archive codec.
//!
//! Detects archive formats from file names, extracts runtime archives and
//! packages finished bundles.
//!
//! | Format | Suffix | Extract | Create |
//! |--------|--------|---------|--------|
//! | [`ArchiveFormat::TarGz`] | `.tar.gz` | yes | yes |
//! | [`ArchiveFormat::TarXz`] | `.tar.xz` | yes | no |
//! | [`ArchiveFormat::Tar`] | `.tar` | yes | no |
//! | [`ArchiveFormat::SevenZip`] | `.7z` | no | no |
//! | [`ArchiveFormat::Zip`] | `.zip` | yes | yes |

mod create;
mod extract;

pub use create::create;
pub use extract::extract;

use crate::bundler::error::{Error, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Archive formats known to the codec.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ArchiveFormat {
    /// Gzip-compressed tar.
    TarGz,
    /// XZ-compressed tar.
    TarXz,
    /// Plain tar.
    Tar,
    /// 7-Zip. Recognised only.
    SevenZip,
    /// Zip with deflate compression.
    Zip,
}

impl ArchiveFormat {
    /// All formats, in declaration order.
    pub const ALL: [ArchiveFormat; 5] = [
        ArchiveFormat::TarGz,
        ArchiveFormat::TarXz,
        ArchiveFormat::Tar,
        ArchiveFormat::SevenZip,
        ArchiveFormat::Zip,
    ];

    /// Canonical file-name suffix, including the leading dot.
    pub fn suffix(self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => ".tar.gz",
            ArchiveFormat::TarXz => ".tar.xz",
            ArchiveFormat::Tar => ".tar",
            ArchiveFormat::SevenZip => ".7z",
            ArchiveFormat::Zip => ".zip",
        }
    }

    /// Suffix without the leading dot, as used in artifact names.
    pub fn extension(self) -> &'static str {
        &self.suffix()[1..]
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarXz => "tar.xz",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::SevenZip => "7z",
            ArchiveFormat::Zip => "zip",
        };
        f.write_str(name)
    }
}

/// Detects the format of `file_name` from its suffix.
///
/// Suffixes are tried longest first, so `runtime.tar.gz` is
/// [`ArchiveFormat::TarGz`] and never [`ArchiveFormat::Tar`]. Matching is
/// case-insensitive.
pub fn probe_format(file_name: &str) -> Option<ArchiveFormat> {
    let name = file_name.to_ascii_lowercase();
    let mut formats = ArchiveFormat::ALL;
    formats.sort_by_key(|format| std::cmp::Reverse(format.suffix().len()));
    formats
        .into_iter()
        .find(|format| name.ends_with(format.suffix()))
}

/// Like [`probe_format`] for a path, failing with [`Error::UnsupportedFormat`].
pub fn probe_path(path: &Path) -> Result<ArchiveFormat> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    probe_format(&name).ok_or(Error::UnsupportedFormat(name))
}

/// Validates an archive entry path and returns it relative to the
/// extraction root.
///
/// `.` components are dropped; `..`, roots and drive prefixes are rejected.
fn sanitize_entry_path(path: &Path) -> Result<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::GenericError(format!(
                    "refusing archive entry outside the destination: {}",
                    path.display()
                )));
            }
        }
    }
    Ok(clean)
}
