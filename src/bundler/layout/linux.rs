//! Linux bundle layout (glibc and musl).
//!
//! ```text
//! <name>              launcher stub
//! <name>.png          icon
//! vmargs.txt
//! runtime/            extracted runtime
//! ...                 includes
//! ```

use super::BundlePaths;
use crate::bundler::archive::ArchiveFormat;
use std::path::Path;

pub(super) const PACKAGE_FORMAT: ArchiveFormat = ArchiveFormat::TarGz;

pub(super) const PRUNE: &[&str] = &["runtime/man", "runtime/docs"];

pub(super) fn paths(target_dir: &Path, name: &str) -> BundlePaths {
    let root = target_dir.to_path_buf();
    let runtime = root.join("runtime");
    let launcher = root.join(name);
    BundlePaths {
        target_dir: target_dir.to_path_buf(),
        extract_dir: runtime.clone(),
        resources_dir: root.clone(),
        icon: root.join(format!("{name}.png")),
        executables: vec![launcher.clone(), runtime.join("bin/java")],
        launcher,
        runtime_dir: runtime,
        root,
    }
}
