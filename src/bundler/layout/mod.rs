//! Bundle layout engine.
//!
//! Turns one resolved runtime archive plus the application's files into a
//! launchable bundle tree for one target, then packages it. Every target
//! goes through the same linear stages:
//!
//! ```text
//! Reset ─▶ Materialize ─▶ Denest ─▶ Reshape ─▶ Prune ─▶ Includes
//!       ─▶ VmArgs ─▶ Launcher ─▶ Icon ─▶ MarkExecutable ─▶ Package
//! ```
//!
//! A failing stage aborts the target with [`Error::Stage`], except
//! [`Stage::Icon`] whose failures are logged and otherwise ignored.
//!
//! Where things go is decided by a [`PlatformLayout`] picked from the
//! target's operating system; the stages themselves are shared.

mod linux;
mod macos;
mod windows;

use crate::bundler::{
    AppIcon, Context, Error, ErrorExt, Result, RuntimeResolver, Settings, Target, TargetSettings,
    archive::{self, ArchiveFormat},
    utils::fs,
};
use crate::bail;
use std::fmt;
use std::future::Future;
use std::path::{Component, Path, PathBuf};

/// Name of the VM arguments file read by the launchers.
pub const VM_ARGS_FILE: &str = "vmargs.txt";

/// One step of the per-target pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    /// Delete and recreate the target's build folder.
    Reset,
    /// Resolve the runtime archive and extract it.
    Materialize,
    /// Collapse a single wrapping folder in the extracted runtime.
    Denest,
    /// OS-specific restructuring.
    Reshape,
    /// Remove unneeded runtime files.
    Prune,
    /// Copy the configured include files.
    Includes,
    /// Write the VM arguments file.
    VmArgs,
    /// Copy the launcher stub.
    Launcher,
    /// Attach the application icon.
    Icon,
    /// Set executable bits.
    MarkExecutable,
    /// Create the artifact archive.
    Package,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Reset => "reset",
            Stage::Materialize => "materialize runtime",
            Stage::Denest => "de-nest",
            Stage::Reshape => "reshape",
            Stage::Prune => "prune",
            Stage::Includes => "populate includes",
            Stage::VmArgs => "write vm args",
            Stage::Launcher => "inject launcher",
            Stage::Icon => "icon",
            Stage::MarkExecutable => "mark executable",
            Stage::Package => "package",
        };
        f.write_str(name)
    }
}

/// Per-OS layout rules.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlatformLayout {
    /// Flat tree, `.tar.gz`.
    Linux,
    /// `<name>.app` tree, `.tar.gz`.
    MacOs,
    /// Flat tree with a PE launcher, `.zip`.
    Windows,
}

/// Locations inside one target's bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePaths {
    /// `build/<os>-<arch>`; the folder that gets packaged.
    pub target_dir: PathBuf,
    /// Bundle root (`<name>.app` on macOS, `target_dir` elsewhere).
    pub root: PathBuf,
    /// Where the runtime archive is extracted.
    pub extract_dir: PathBuf,
    /// Where the runtime lives once reshaped.
    pub runtime_dir: PathBuf,
    /// Destination root for includes and the VM arguments file.
    pub resources_dir: PathBuf,
    /// Launcher stub destination.
    pub launcher: PathBuf,
    /// Icon destination; the launcher itself on Windows.
    pub icon: PathBuf,
    /// Files that need the executable bit.
    pub executables: Vec<PathBuf>,
}

impl PlatformLayout {
    /// Layout for `os`.
    pub fn for_os(os: crate::bundler::OperatingSystem) -> Self {
        use crate::bundler::OperatingSystem;
        match os {
            OperatingSystem::LinuxGlibc | OperatingSystem::LinuxMusl => PlatformLayout::Linux,
            OperatingSystem::MacOs => PlatformLayout::MacOs,
            OperatingSystem::Windows => PlatformLayout::Windows,
        }
    }

    /// Bundle locations for an executable called `name` under `target_dir`.
    pub fn paths(self, target_dir: &Path, name: &str) -> BundlePaths {
        match self {
            PlatformLayout::Linux => linux::paths(target_dir, name),
            PlatformLayout::MacOs => macos::paths(target_dir, name),
            PlatformLayout::Windows => windows::paths(target_dir, name),
        }
    }

    /// Artifact format.
    pub fn package_format(self) -> ArchiveFormat {
        match self {
            PlatformLayout::Linux => linux::PACKAGE_FORMAT,
            PlatformLayout::MacOs => macos::PACKAGE_FORMAT,
            PlatformLayout::Windows => windows::PACKAGE_FORMAT,
        }
    }

    /// Paths relative to the bundle root that are deleted after reshaping.
    pub fn prune_list(self) -> &'static [&'static str] {
        match self {
            PlatformLayout::Linux => linux::PRUNE,
            PlatformLayout::MacOs => macos::PRUNE,
            PlatformLayout::Windows => windows::PRUNE,
        }
    }

    async fn reshape(self, paths: &BundlePaths, settings: &Settings) -> Result<()> {
        match self {
            PlatformLayout::MacOs => macos::reshape(paths, settings.spec()).await,
            PlatformLayout::Linux | PlatformLayout::Windows => Ok(()),
        }
    }

    async fn apply_icon(self, paths: &BundlePaths, icon: &AppIcon) -> Result<()> {
        match self {
            PlatformLayout::Linux => fs::write_file(&paths.icon, &icon.png).await,
            PlatformLayout::MacOs => fs::write_file(&paths.icon, &icon.icns).await,
            PlatformLayout::Windows => windows::apply_icon(paths, icon).await,
        }
    }
}

/// Runs the stages for single targets.
pub struct LayoutEngine<'a, R> {
    settings: &'a Settings,
    resolver: &'a R,
    icon: Option<&'a AppIcon>,
}

impl<'a, R: RuntimeResolver> LayoutEngine<'a, R> {
    /// Engine for `settings`, fetching runtimes through `resolver`.
    pub fn new(settings: &'a Settings, resolver: &'a R, icon: Option<&'a AppIcon>) -> Self {
        Self {
            settings,
            resolver,
            icon,
        }
    }

    /// Builds and packages the bundle for `target`, returning the artifact path.
    pub async fn bundle(&self, target: Target, extra: &TargetSettings) -> Result<PathBuf> {
        let platform = PlatformLayout::for_os(target.os);
        let paths = platform.paths(
            &self.settings.workspace().target_build_dir(&target),
            self.settings.executable_name(),
        );
        log::info!("Bundling {} into {}", target, paths.root.display());

        stage(Stage::Reset, reset(&paths)).await?;
        stage(Stage::Materialize, self.materialize(target, &paths)).await?;
        stage(Stage::Denest, async {
            if denest(&paths.extract_dir).await? {
                log::debug!("Reorganized the runtime files");
            }
            Ok(())
        })
        .await?;
        stage(Stage::Reshape, platform.reshape(&paths, self.settings)).await?;
        stage(Stage::Prune, prune(&paths.root, platform.prune_list())).await?;
        stage(Stage::Includes, self.copy_includes(&paths, extra)).await?;
        stage(Stage::VmArgs, self.write_vm_args(&paths, extra)).await?;
        stage(Stage::Launcher, self.copy_launcher(target, &paths)).await?;

        if let Some(icon) = self.icon {
            if let Err(e) = stage(Stage::Icon, platform.apply_icon(&paths, icon)).await {
                log::warn!("{} for {}, continuing without an icon", e, target);
            }
        }

        stage(Stage::MarkExecutable, mark_executable(&paths)).await?;
        stage(Stage::Package, self.package(target, platform, &paths)).await
    }

    async fn materialize(&self, target: Target, paths: &BundlePaths) -> Result<()> {
        let runtime = self
            .resolver
            .resolve(self.settings.runtime().version, target)
            .await?;
        let format = archive::probe_path(&runtime)?;
        log::debug!(
            "Extracting {} ({}) into {}",
            runtime.display(),
            format,
            paths.extract_dir.display()
        );
        archive::extract(format, &runtime, &paths.extract_dir)
            .await
            .with_context(|| format!("unpacking runtime archive {}", runtime.display()))
    }

    async fn copy_includes(&self, paths: &BundlePaths, extra: &TargetSettings) -> Result<()> {
        let workspace = self.settings.workspace();
        for (source, destination) in self.settings.spec().includes.iter().chain(&extra.extra_includes)
        {
            let from = workspace.resolve_source(source);
            let to = include_destination(&paths.resources_dir, destination)?;
            if !from.exists() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "include source does not exist",
                ))
                .fs_context("copying include", from);
            }
            log::debug!("Including {} as {}", from.display(), to.display());
            fs::copy_path(&from, &to).await?;
        }
        Ok(())
    }

    async fn write_vm_args(&self, paths: &BundlePaths, extra: &TargetSettings) -> Result<()> {
        let vm_args = self.settings.spec().vm_args_with(extra.extra_vm_args.as_deref());
        log::debug!("VM args: {}", vm_args);
        fs::write_file(&paths.resources_dir.join(VM_ARGS_FILE), vm_args).await
    }

    async fn copy_launcher(&self, target: Target, paths: &BundlePaths) -> Result<()> {
        let stub = self.settings.launchers().for_os(target.os);
        if !stub.is_file() {
            bail!("launcher stub {} not found", stub.display());
        }
        fs::copy_file(stub, &paths.launcher).await
    }

    async fn package(
        &self,
        target: Target,
        platform: PlatformLayout,
        paths: &BundlePaths,
    ) -> Result<PathBuf> {
        let format = platform.package_format();
        let name = format!(
            "{}.{}",
            self.settings
                .spec()
                .artifact_stem_for(target.os.as_str(), target.arch.as_str()),
            format.extension()
        );
        let artifact = self.settings.workspace().artifacts_dir.join(name);
        archive::create(format, &paths.target_dir, &artifact).await?;
        log::info!("Produced artifact: {}", artifact.display());
        Ok(artifact)
    }
}

async fn stage<T>(stage: Stage, work: impl Future<Output = Result<T>>) -> Result<T> {
    log::debug!("Stage: {}", stage);
    work.await.map_err(|source| Error::Stage {
        stage,
        source: Box::new(source),
    })
}

async fn reset(paths: &BundlePaths) -> Result<()> {
    fs::remove_dir_all(&paths.target_dir).await?;
    fs::create_dir_all(&paths.root, false).await
}

/// Collapses a single wrapping directory inside `dir`.
///
/// When `dir` holds exactly one entry and it is a directory, its children
/// are moved up one level and the wrapper is removed. Returns whether
/// anything moved; a tree with several top-level entries is left alone.
pub async fn denest(dir: &Path) -> Result<bool> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .fs_context("reading directory", dir)?;
    let mut children = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("reading directory", dir)?
    {
        children.push(entry);
        if children.len() > 1 {
            return Ok(false);
        }
    }

    let Some(wrapper) = children.pop() else {
        return Ok(false);
    };
    let file_type = wrapper
        .file_type()
        .await
        .fs_context("inspecting entry", wrapper.path())?;
    if !file_type.is_dir() {
        return Ok(false);
    }

    // Move the wrapper aside first; it may contain a child with its own name.
    let mut staging_name = std::ffi::OsString::from(".");
    staging_name.push(wrapper.file_name());
    staging_name.push(".denest");
    let staging = dir.join(staging_name);
    fs::move_path(&wrapper.path(), &staging).await?;

    let mut nested = tokio::fs::read_dir(&staging)
        .await
        .fs_context("reading directory", &staging)?;
    while let Some(child) = nested
        .next_entry()
        .await
        .fs_context("reading directory", &staging)?
    {
        fs::move_path(&child.path(), &dir.join(child.file_name())).await?;
    }
    tokio::fs::remove_dir(&staging)
        .await
        .fs_context("removing directory", &staging)?;
    Ok(true)
}

/// Deletes every `relative` path under `root`; missing paths are skipped.
pub async fn prune(root: &Path, relative: &[&str]) -> Result<()> {
    for path in relative {
        if fs::remove_path(&root.join(path)).await? {
            log::debug!("Pruned {}", path);
        }
    }
    Ok(())
}

/// Joins an include destination onto `base`, refusing escapes.
fn include_destination(base: &Path, destination: &Path) -> Result<PathBuf> {
    let mut out = base.to_path_buf();
    for component in destination.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => bail!(
                "include destination {} must stay inside the bundle",
                destination.display()
            ),
        }
    }
    if out == base {
        bail!("include destination {} is empty", destination.display());
    }
    Ok(out)
}

async fn mark_executable(paths: &BundlePaths) -> Result<()> {
    if paths.executables.is_empty() {
        return Ok(());
    }

    #[cfg(unix)]
    for path in &paths.executables {
        fs::set_executable(path).await?;
        log::debug!("Marked {} as executable", path.display());
    }

    #[cfg(not(unix))]
    log::warn!(
        "This host cannot mark files as executable ({}); the bundle will lack permission bits",
        paths
            .executables
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::OperatingSystem;

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = walkdir::WalkDir::new(dir)
            .min_depth(1)
            .into_iter()
            .map(|entry| {
                let entry = entry.unwrap();
                entry
                    .path()
                    .strip_prefix(dir)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_denest_flattens_single_wrapper() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("nested");
        write(&nested.join("jdk-17.0.9+9-jre/bin/java"), "java");
        write(&nested.join("jdk-17.0.9+9-jre/release"), "JAVA_VERSION=17");

        let flat = temp.path().join("flat");
        write(&flat.join("bin/java"), "java");
        write(&flat.join("release"), "JAVA_VERSION=17");

        assert!(denest(&nested).await.unwrap());
        assert_eq!(listing(&nested), listing(&flat));

        // Second run is a no-op.
        assert!(!denest(&nested).await.unwrap());
        assert_eq!(listing(&nested), listing(&flat));
    }

    #[tokio::test]
    async fn test_denest_handles_child_named_like_wrapper() {
        let temp = tempfile::tempdir().unwrap();
        write(&temp.path().join("jre/jre/lib/modules"), "modules");
        write(&temp.path().join("jre/bin/java"), "java");

        assert!(denest(temp.path()).await.unwrap());
        assert_eq!(
            listing(temp.path()),
            ["bin", "bin/java", "jre", "jre/lib", "jre/lib/modules"]
        );
    }

    #[tokio::test]
    async fn test_denest_ignores_single_file() {
        let temp = tempfile::tempdir().unwrap();
        write(&temp.path().join("README"), "hi");
        assert!(!denest(temp.path()).await.unwrap());
    }

    #[tokio::test]
    async fn test_prune_skips_missing_paths() {
        let temp = tempfile::tempdir().unwrap();
        write(&temp.path().join("runtime/man/man1/java.1"), "man");
        write(&temp.path().join("runtime/bin/java"), "java");

        prune(temp.path(), PlatformLayout::Linux.prune_list())
            .await
            .unwrap();
        assert_eq!(listing(temp.path()), ["runtime", "runtime/bin", "runtime/bin/java"]);
    }

    #[test]
    fn test_include_destination_stays_inside() {
        let base = Path::new("/bundle");
        assert_eq!(
            include_destination(base, Path::new("./lib/app.jar")).unwrap(),
            Path::new("/bundle/lib/app.jar")
        );
        assert!(include_destination(base, Path::new("../app.jar")).is_err());
        assert!(include_destination(base, Path::new("/etc/passwd")).is_err());
        assert!(include_destination(base, Path::new(".")).is_err());
    }

    #[test]
    fn test_dispatch_by_os() {
        assert_eq!(
            PlatformLayout::for_os(OperatingSystem::LinuxMusl),
            PlatformLayout::Linux
        );
        assert_eq!(
            PlatformLayout::for_os(OperatingSystem::Windows).package_format(),
            ArchiveFormat::Zip
        );
        assert_eq!(
            PlatformLayout::for_os(OperatingSystem::MacOs).package_format(),
            ArchiveFormat::TarGz
        );
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::MarkExecutable.to_string(), "mark executable");
        let err = Error::Stage {
            stage: Stage::Includes,
            source: Box::new(Error::GenericError("boom".into())),
        };
        assert_eq!(err.to_string(), "populate includes stage failed: boom");
    }
}
