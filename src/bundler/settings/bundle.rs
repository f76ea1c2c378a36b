//! Bundle specification and per-target overrides.

use super::{Arch, OperatingSystem, Target};
use indexmap::IndexMap;
use std::path::PathBuf;

/// Files copied into a bundle, keyed by source path.
///
/// Values are destinations relative to the bundle's content root. Entries
/// are copied in insertion order, so when two sources share a destination
/// the later one wins.
pub type IncludeMap = IndexMap<PathBuf, PathBuf>;

/// What goes into every bundle, independent of the target.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_runtime::bundler::BundleSpec;
///
/// let spec = BundleSpec {
///     executable_name: "MyApp".into(),
///     executable_id: "com.example.myapp".into(),
///     vm_args: "-Xms1M -jar app.jar".into(),
///     includes: [("build/app.jar".into(), "app.jar".into())].into(),
/// };
/// assert_eq!(spec.artifact_stem_for("linux-glibc", "x86_64"), "MyApp-linux-glibc-x86_64");
/// ```
#[derive(Debug, Clone, Default)]
pub struct BundleSpec {
    /// Name of the launcher executable (without `.exe`).
    pub executable_name: String,

    /// Bundle identifier in reverse domain notation.
    ///
    /// Only macOS uses it (`CFBundleIdentifier`).
    pub executable_id: String,

    /// Base arguments handed to the runtime by the launcher stub.
    pub vm_args: String,

    /// Files copied into every bundle.
    pub includes: IncludeMap,
}

impl BundleSpec {
    /// Artifact file name without extension: `{executableName}-{os}-{arch}`.
    pub fn artifact_stem_for(&self, os: &str, arch: &str) -> String {
        format!("{}-{}-{}", self.executable_name, os, arch)
    }

    /// Composes the VM argument line for a target.
    ///
    /// Extra arguments come first so they act as overrides placed ahead of the
    /// base arguments. Blank extras are ignored.
    pub fn vm_args_with(&self, extra: Option<&str>) -> String {
        match extra.map(str::trim).filter(|extra| !extra.is_empty()) {
            Some(extra) => format!("{} {}", extra, self.vm_args),
            None => self.vm_args.clone(),
        }
    }
}

/// Overrides shared by every target of one matrix block.
#[derive(Debug, Clone, Default)]
pub struct TargetSettings {
    /// Arguments placed in front of [`BundleSpec::vm_args`].
    pub extra_vm_args: Option<String>,

    /// Files copied after [`BundleSpec::includes`]; they win on conflicts.
    pub extra_includes: IncludeMap,
}

/// One block of the OS × architecture matrix.
#[derive(Debug, Clone, Default)]
pub struct TargetGroup {
    /// Operating systems of this block.
    pub operating_systems: Vec<OperatingSystem>,
    /// Architectures built for every OS of this block.
    pub architectures: Vec<Arch>,
    /// Overrides applied to every target of this block.
    pub settings: TargetSettings,
}

impl TargetGroup {
    /// Expands the block into targets, OS-major.
    pub fn targets(&self) -> impl Iterator<Item = Target> + '_ {
        self.operating_systems.iter().flat_map(move |os| {
            self.architectures
                .iter()
                .map(move |arch| Target::new(*os, *arch))
        })
    }
}
