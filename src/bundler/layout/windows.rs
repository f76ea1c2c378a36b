//! Windows bundle layout.
//!
//! Same flat tree as Linux with a `.exe` launcher. The icon is not a
//! separate file: its images are embedded into the launcher's resources.

use super::BundlePaths;
use crate::bundler::{AppIcon, Result, archive::ArchiveFormat, icon::pe};
use std::path::Path;

pub(super) const PACKAGE_FORMAT: ArchiveFormat = ArchiveFormat::Zip;

pub(super) const PRUNE: &[&str] = &["runtime/man", "runtime/docs"];

pub(super) fn paths(target_dir: &Path, name: &str) -> BundlePaths {
    let root = target_dir.to_path_buf();
    let runtime = root.join("runtime");
    let launcher = root.join(format!("{name}.exe"));
    BundlePaths {
        target_dir: target_dir.to_path_buf(),
        extract_dir: runtime.clone(),
        resources_dir: root.clone(),
        icon: launcher.clone(),
        // No permission bits in zip-distributed Windows bundles.
        executables: Vec::new(),
        launcher,
        runtime_dir: runtime,
        root,
    }
}

pub(super) async fn apply_icon(paths: &BundlePaths, icon: &AppIcon) -> Result<()> {
    let resources = icon.resources()?;
    pe::patch(&paths.icon, &resources).await
}
