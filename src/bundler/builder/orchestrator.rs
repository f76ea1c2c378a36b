//! Main bundler orchestration and coordination.

use super::checksum::calculate_sha256;
use crate::bundler::{
    AppIcon, BundledArtifact, Result, RunSummary, RuntimeResolver, Settings, Target,
    error::ErrorExt, layout::LayoutEngine,
};
use std::path::PathBuf;

/// Main bundler orchestrator.
///
/// Iterates the configured matrix, bundling one target at a time. A target
/// without a published runtime build is skipped with a warning; any other
/// failure ends the run and is returned.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_runtime::bundler::{AdoptiumResolver, Bundler, Settings};
///
/// # async fn example(settings: Settings) -> kodegen_bundler_runtime::bundler::Result<()> {
/// let resolver = AdoptiumResolver::new(
///     settings.runtime().clone(),
///     &settings.workspace().cache_dir,
/// )?;
/// let summary = Bundler::new(settings, resolver).run().await?;
/// println!("{} artifacts, {} skipped", summary.artifacts.len(), summary.skipped.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Bundler<R> {
    settings: Settings,
    resolver: R,
}

impl<R: RuntimeResolver> Bundler<R> {
    /// Creates a bundler that resolves runtimes through `resolver`.
    pub fn new(settings: Settings, resolver: R) -> Self {
        Self { settings, resolver }
    }

    /// Returns a reference to the bundler settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Bundles every target of the matrix.
    ///
    /// Matrix blocks are processed in order, operating systems in order
    /// within a block and architectures in order within an operating
    /// system. A target listed in several blocks is built once per block;
    /// the later build replaces the earlier artifact.
    ///
    /// # Errors
    ///
    /// The first fatal error of any target. Targets after it are not
    /// attempted and the failing target's artifact is never written.
    pub async fn run(&self) -> Result<RunSummary> {
        self.settings.workspace().prepare().await?;

        let icon = self.load_icon().await;
        let engine = LayoutEngine::new(&self.settings, &self.resolver, icon.as_ref());
        let mut summary = RunSummary::default();

        for group in self.settings.matrix() {
            for target in group.targets() {
                match engine.bundle(target, &group.settings).await {
                    Ok(path) => {
                        let artifact = describe(target, path).await?;
                        summary.artifacts.retain(|known| known.path != artifact.path);
                        summary.artifacts.push(artifact);
                    }
                    Err(e) if e.is_unsupported_target() => {
                        log::warn!("Unsupported build target {}, ignoring: {}", target, e);
                        summary.skipped.push(target);
                    }
                    Err(e) => {
                        log::error!("Bundling {} failed, aborting: {}", target, e);
                        return Err(e);
                    }
                }
            }
        }

        Ok(summary)
    }

    async fn load_icon(&self) -> Option<AppIcon> {
        let source = self.settings.icon_source()?;
        let source = self.settings.workspace().resolve_source(source);
        match AppIcon::from_path(&source).await {
            Ok(icon) => Some(icon),
            Err(e) => {
                log::warn!(
                    "Unable to load icon {}, bundling without it: {}",
                    source.display(),
                    e
                );
                None
            }
        }
    }
}

async fn describe(target: Target, path: PathBuf) -> Result<BundledArtifact> {
    let size = tokio::fs::metadata(&path)
        .await
        .fs_context("reading artifact metadata", &path)?
        .len();
    let checksum = calculate_sha256(&path).await?;
    Ok(BundledArtifact {
        target,
        path,
        size,
        checksum,
    })
}
