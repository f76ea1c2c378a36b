//! Builder for constructing Settings.

use super::{BundleSpec, LauncherSet, RuntimeSettings, Settings, TargetGroup, Workspace};
use std::path::PathBuf;

/// Builder for constructing [`Settings`].
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_runtime::bundler::{
///     Arch, BundleSpec, OperatingSystem, SettingsBuilder, TargetGroup, Workspace,
/// };
///
/// # fn example() -> kodegen_bundler_runtime::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .workspace(Workspace::new(".", "jcup"))
///     .bundle_spec(BundleSpec {
///         executable_name: "MyApp".into(),
///         ..Default::default()
///     })
///     .target_group(TargetGroup {
///         operating_systems: vec![OperatingSystem::LinuxGlibc],
///         architectures: vec![Arch::X86_64],
///         ..Default::default()
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    spec: Option<BundleSpec>,
    runtime: RuntimeSettings,
    workspace: Option<Workspace>,
    launchers: Option<LauncherSet>,
    icon_source: Option<PathBuf>,
    matrix: Vec<TargetGroup>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the bundle specification.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn bundle_spec(mut self, spec: BundleSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Sets the runtime source.
    ///
    /// Default: version 17 JRE from the Adoptium API
    pub fn runtime(mut self, runtime: RuntimeSettings) -> Self {
        self.runtime = runtime;
        self
    }

    /// Sets the folder context.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn workspace(mut self, workspace: Workspace) -> Self {
        self.workspace = Some(workspace);
        self
    }

    /// Sets the launcher stubs.
    ///
    /// Default: `<base>/launchers/{unix-launcher,macos-launcher,windows-launcher.exe}`
    pub fn launchers(mut self, launchers: LauncherSet) -> Self {
        self.launchers = Some(launchers);
        self
    }

    /// Sets the icon source image.
    ///
    /// Default: None (bundles are produced without an icon)
    pub fn icon_source(mut self, path: Option<PathBuf>) -> Self {
        self.icon_source = path;
        self
    }

    /// Appends one block to the target matrix.
    pub fn target_group(mut self, group: TargetGroup) -> Self {
        self.matrix.push(group);
        self
    }

    /// Replaces the whole target matrix.
    pub fn matrix(mut self, matrix: Vec<TargetGroup>) -> Self {
        self.matrix = matrix;
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or the executable
    /// name is empty.
    pub fn build(self) -> crate::bundler::Result<Settings> {
        use crate::bundler::error::Context;

        let spec = self.spec.context("bundle_spec is required")?;
        if spec.executable_name.trim().is_empty() {
            crate::bail!("executable name must not be empty");
        }
        let workspace = self.workspace.context("workspace is required")?;
        let launchers = self
            .launchers
            .unwrap_or_else(|| LauncherSet::from_dir(&workspace.base_dir.join("launchers")));

        Ok(Settings::new(
            spec,
            self.runtime,
            workspace,
            launchers,
            self.icon_source,
            self.matrix,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_spec_is_rejected() {
        let err = SettingsBuilder::new()
            .workspace(Workspace::new(".", "jcup"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("bundle_spec"));
    }

    #[test]
    fn test_default_launchers_live_under_base() {
        let settings = SettingsBuilder::new()
            .workspace(Workspace::new(".", "jcup"))
            .bundle_spec(BundleSpec {
                executable_name: "MyApp".into(),
                ..Default::default()
            })
            .build()
            .unwrap();
        assert_eq!(
            settings.launchers().windows,
            PathBuf::from("jcup/launchers/windows-launcher.exe")
        );
        assert_eq!(settings.runtime().version, 17);
    }
}
