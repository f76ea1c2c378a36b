//! Runtime bundling pipeline.
//!
//! Turns a downloaded runtime plus the application's own files into one
//! self-contained, double-clickable bundle per target and packages it.
//!
//! # Pipeline
//!
//! ```text
//! Bundler ─▶ RuntimeResolver ─▶ archive::extract ─▶ layout stages ─▶ archive::create
//!                                                       │
//!                                                       └─▶ icon::pe (Windows only)
//! ```
//!
//! # Supported Targets
//!
//! | OS | Artifact | Bundle root |
//! |----|----------|-------------|
//! | linux-glibc, linux-musl | `.tar.gz` | `<name>`, `runtime/`, `vmargs.txt` |
//! | macos | `.tar.gz` | `<name>.app/Contents/...` |
//! | windows | `.zip` | `<name>.exe`, `runtime/`, `vmargs.txt` |
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_runtime::bundler::{
//!     AdoptiumResolver, Arch, BundleSpec, Bundler, OperatingSystem, SettingsBuilder,
//!     TargetGroup, Workspace,
//! };
//!
//! # async fn example() -> kodegen_bundler_runtime::bundler::Result<()> {
//! let settings = SettingsBuilder::new()
//!     .workspace(Workspace::new(".", "jcup"))
//!     .bundle_spec(BundleSpec {
//!         executable_name: "MyApp".into(),
//!         executable_id: "com.example.myapp".into(),
//!         vm_args: "-jar app.jar".into(),
//!         includes: [("app.jar".into(), "app.jar".into())].into(),
//!     })
//!     .target_group(TargetGroup {
//!         operating_systems: vec![OperatingSystem::Windows],
//!         architectures: vec![Arch::X86_64],
//!         ..Default::default()
//!     })
//!     .build()?;
//!
//! let resolver = AdoptiumResolver::new(settings.runtime().clone(), &settings.workspace().cache_dir)?;
//! let summary = Bundler::new(settings, resolver).run().await?;
//! for artifact in &summary.artifacts {
//!     println!("{}: {}", artifact.target, artifact.path.display());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod archive;
mod builder;
mod error;
pub mod icon;
pub mod layout;
pub mod runtime;
mod settings;
pub(crate) mod utils;

use std::path::PathBuf;

// Public re-exports
pub use builder::Bundler;
pub use error::{Context, Error, ErrorExt, Result};
pub use icon::AppIcon;
pub use layout::Stage;
pub use runtime::{AdoptiumResolver, RuntimeResolver};
pub use settings::{
    // Targets
    Arch,
    // Bundle contents
    BundleSpec,
    IncludeMap,
    // Folder context
    LauncherSet,
    OperatingSystem,
    RuntimeSettings,
    // Main configuration types
    Settings,
    SettingsBuilder,
    Target,
    TargetGroup,
    TargetSettings,
    Workspace,
};

/// One packaged bundle.
///
/// # Fields
///
/// - `target`: the (OS, architecture) pair the bundle was built for
/// - `path`: the artifact file inside the artifacts directory
/// - `size`: artifact size in bytes
/// - `checksum`: SHA-256 of the artifact, hex encoded
#[derive(Debug, Clone)]
pub struct BundledArtifact {
    /// Target the bundle was built for.
    pub target: Target,
    /// Artifact file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// SHA-256 checksum.
    pub checksum: String,
}

/// Outcome of a complete run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Artifacts in the order they were produced.
    pub artifacts: Vec<BundledArtifact>,
    /// Targets skipped because no runtime build exists for them.
    pub skipped: Vec<Target>,
}
