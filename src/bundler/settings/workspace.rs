//! Folder context threaded through the pipeline.

use super::{OperatingSystem, Target};
use crate::bundler::{error::Result, utils::fs};
use std::path::{Path, PathBuf};

/// Directories the pipeline reads from and writes to.
///
/// Passed explicitly instead of living in process-wide constants so tests
/// can point the whole pipeline at a temporary directory.
///
/// ```text
/// <base>/
/// ├── build/<os>-<arch>/      one bundle tree per target, recreated each run
/// ├── artifacts/              packaged bundles, emptied each run
/// └── download-cache/         runtime archives, kept across runs
/// ```
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Directory include sources are resolved against.
    pub project_root: PathBuf,
    /// Root of all bundler state.
    pub base_dir: PathBuf,
    /// Bundle trees, one sub-directory per target.
    pub build_dir: PathBuf,
    /// Final artifacts.
    pub artifacts_dir: PathBuf,
    /// Shared runtime download cache.
    pub cache_dir: PathBuf,
}

impl Workspace {
    /// Standard layout under `base_dir`, with includes resolved from `project_root`.
    pub fn new(project_root: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            project_root: project_root.into(),
            build_dir: base_dir.join("build"),
            artifacts_dir: base_dir.join("artifacts"),
            cache_dir: base_dir.join("download-cache"),
            base_dir,
        }
    }

    /// Empties `build/` and `artifacts/` and makes sure every folder exists.
    ///
    /// The download cache is left untouched.
    pub async fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir, false).await?;
        fs::create_dir_all(&self.build_dir, true).await?;
        fs::create_dir_all(&self.artifacts_dir, true).await?;
        fs::create_dir_all(&self.cache_dir, false).await?;
        Ok(())
    }

    /// Per-target build folder: `build/<os>-<arch>`.
    pub fn target_build_dir(&self, target: &Target) -> PathBuf {
        self.build_dir.join(target.to_string())
    }

    /// Resolves an include source against the project root.
    pub fn resolve_source(&self, source: &Path) -> PathBuf {
        if source.is_absolute() {
            source.to_path_buf()
        } else {
            self.project_root.join(source)
        }
    }
}

/// Pre-built launcher stubs, one per platform family.
///
/// The stubs are opaque binaries; the bundler only copies them.
#[derive(Debug, Clone)]
pub struct LauncherSet {
    /// Launcher for both Linux flavours.
    pub linux: PathBuf,
    /// Launcher placed in `Contents/MacOS`.
    pub macos: PathBuf,
    /// Windows PE launcher.
    pub windows: PathBuf,
}

impl LauncherSet {
    /// Conventional stub names inside `dir`.
    pub fn from_dir(dir: &Path) -> Self {
        Self {
            linux: dir.join("unix-launcher"),
            macos: dir.join("macos-launcher"),
            windows: dir.join("windows-launcher.exe"),
        }
    }

    /// Launcher stub for `os`.
    pub fn for_os(&self, os: OperatingSystem) -> &Path {
        match os {
            OperatingSystem::LinuxGlibc | OperatingSystem::LinuxMusl => &self.linux,
            OperatingSystem::MacOs => &self.macos,
            OperatingSystem::Windows => &self.windows,
        }
    }
}
