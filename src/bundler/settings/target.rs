//! Operating systems and bundle targets.

use super::Arch;
use std::{fmt, str::FromStr};

/// Operating system a bundle is produced for.
///
/// Linux is split by C library because runtime vendors publish separate
/// builds for glibc and musl distributions.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub enum OperatingSystem {
    /// glibc based Linux distributions (Debian, Fedora, Arch, ...)
    #[serde(rename = "linux-glibc", alias = "linux_glibc")]
    LinuxGlibc,
    /// musl based Linux distributions (Alpine)
    #[serde(rename = "linux-musl", alias = "linux_musl")]
    LinuxMusl,
    /// macOS, bundled as a `.app` directory
    #[serde(rename = "macos", alias = "macosx")]
    MacOs,
    /// Windows
    #[serde(rename = "windows")]
    Windows,
}

impl OperatingSystem {
    /// Every supported operating system, in declaration order.
    pub const ALL: [OperatingSystem; 4] = [
        OperatingSystem::LinuxGlibc,
        OperatingSystem::LinuxMusl,
        OperatingSystem::MacOs,
        OperatingSystem::Windows,
    ];

    /// Name used in configuration files, folder names and artifact names.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingSystem::LinuxGlibc => "linux-glibc",
            OperatingSystem::LinuxMusl => "linux-musl",
            OperatingSystem::MacOs => "macos",
            OperatingSystem::Windows => "windows",
        }
    }

    /// Whether bundles for this OS rely on POSIX permission bits.
    pub fn is_posix(&self) -> bool {
        !matches!(self, OperatingSystem::Windows)
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatingSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "linux-glibc" => Ok(OperatingSystem::LinuxGlibc),
            "linux-musl" => Ok(OperatingSystem::LinuxMusl),
            "macos" | "macosx" => Ok(OperatingSystem::MacOs),
            "windows" => Ok(OperatingSystem::Windows),
            _ => Err(format!("unknown operating system: {s}")),
        }
    }
}

/// One `(OperatingSystem, Arch)` pair to bundle for.
///
/// Immutable and hashable so it can key caches and lookups.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Target {
    /// Operating system of the bundle
    pub os: OperatingSystem,
    /// CPU architecture of the bundled runtime
    pub arch: Arch,
}

impl Target {
    /// Creates a target.
    pub const fn new(os: OperatingSystem, arch: Arch) -> Self {
        Self { os, arch }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
