//! Configuration structures for bundling operations.
//!
//! This module provides the value types the pipeline is driven by: targets,
//! the bundle specification, per-target overrides, the folder context and a
//! builder for assembling them into [`Settings`].

mod arch;
mod builder;
mod bundle;
mod core;
mod target;
mod workspace;

// Re-export all public types
pub use arch::Arch;
pub use builder::SettingsBuilder;
pub use bundle::{BundleSpec, IncludeMap, TargetGroup, TargetSettings};
pub use core::{RuntimeSettings, Settings};
pub use target::{OperatingSystem, Target};
pub use workspace::{LauncherSet, Workspace};
