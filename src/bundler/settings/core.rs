//! Core Settings struct and implementations.

use super::{BundleSpec, LauncherSet, TargetGroup, Workspace};
use std::path::{Path, PathBuf};

/// Where runtime builds come from.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// Major runtime version (e.g. `17`).
    pub version: u32,

    /// Image flavour requested from the listing API (`jre` or `jdk`).
    pub image_type: String,

    /// Base URL of the listing API.
    pub api_base: String,

    /// Verify freshly downloaded archives against the listed SHA-256.
    pub verify_checksums: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            version: 17,
            image_type: "jre".into(),
            api_base: "https://api.adoptium.net".into(),
            verify_checksums: true,
        }
    }
}

/// Main settings for bundler operations.
///
/// Central configuration for the bundler, constructed via [`SettingsBuilder`].
/// Contains the bundle specification, runtime source, folder context and the
/// target matrix.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_runtime::bundler::{BundleSpec, SettingsBuilder, Workspace};
///
/// # fn example() -> kodegen_bundler_runtime::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .workspace(Workspace::new(".", "jcup"))
///     .bundle_spec(BundleSpec {
///         executable_name: "MyApp".into(),
///         executable_id: "com.example.myapp".into(),
///         vm_args: "-jar app.jar".into(),
///         ..Default::default()
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
///
/// [`SettingsBuilder`]: super::SettingsBuilder
#[derive(Clone, Debug)]
pub struct Settings {
    /// What goes into every bundle.
    spec: BundleSpec,

    /// Runtime source.
    runtime: RuntimeSettings,

    /// Folder context.
    workspace: Workspace,

    /// Launcher stubs.
    launchers: LauncherSet,

    /// Source image for the application icon.
    icon_source: Option<PathBuf>,

    /// OS × architecture matrix, in configuration order.
    matrix: Vec<TargetGroup>,
}

impl Settings {
    /// Returns the bundle specification.
    pub fn spec(&self) -> &BundleSpec {
        &self.spec
    }

    /// Returns the launcher executable name.
    pub fn executable_name(&self) -> &str {
        &self.spec.executable_name
    }

    /// Returns the runtime source settings.
    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    /// Returns the folder context.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Returns the launcher stubs.
    pub fn launchers(&self) -> &LauncherSet {
        &self.launchers
    }

    /// Returns the icon source image, if one is configured.
    pub fn icon_source(&self) -> Option<&Path> {
        self.icon_source.as_deref()
    }

    /// Returns the target matrix.
    pub fn matrix(&self) -> &[TargetGroup] {
        &self.matrix
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    pub(super) fn new(
        spec: BundleSpec,
        runtime: RuntimeSettings,
        workspace: Workspace,
        launchers: LauncherSet,
        icon_source: Option<PathBuf>,
        matrix: Vec<TargetGroup>,
    ) -> Self {
        Self {
            spec,
            runtime,
            workspace,
            launchers,
            icon_source,
            matrix,
        }
    }
}
