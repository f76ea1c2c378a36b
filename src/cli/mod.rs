//! Command line interface for the runtime bundler.
//!
//! Loads (or initializes) the config file, builds the pipeline settings,
//! runs the [`Bundler`] and reports the results.

mod args;
mod output;

pub use args::{Args, RuntimeConfig};
pub use output::OutputManager;

use crate::bundler::{AdoptiumResolver, Bundler, RunSummary};
use crate::config::{Config, ConfigLoad};
use crate::error::{CliError, EXIT_CODE_OTHER, EXIT_CODE_SUCCESS, Result};
use path_absolutize::Absolutize;

/// Main CLI entry point
///
/// Returns the process exit code. Fatal errors are returned as `Err` and
/// carry their own code ([`crate::error::BundlerError::exit_code`]).
pub async fn run(args: Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;
    let runtime = RuntimeConfig::from(&args);
    let output = runtime.output();

    let config = match Config::load_or_init(&args.config).await? {
        ConfigLoad::Loaded(config) => config,
        ConfigLoad::WroteDefaults(path) => {
            let shown = path.absolutize().map(|p| p.into_owned()).unwrap_or(path);
            log::info!(
                "Wrote config defaults. Edit {} and re-run this tool.",
                shown.display()
            );
            return Ok(EXIT_CODE_OTHER);
        }
    };

    let settings = config.to_settings(&args.config, &args.only)?;
    let resolver = AdoptiumResolver::new(settings.runtime().clone(), &settings.workspace().cache_dir)?;

    let _ = output.section(&format!("Bundling {}", settings.executable_name()));
    let _ = output.verbose(&format!(
        "Runtime {} {} from {}",
        settings.runtime().image_type,
        settings.runtime().version,
        settings.runtime().api_base
    ));

    let summary = Bundler::new(settings, resolver).run().await?;
    report(output, &summary);

    Ok(EXIT_CODE_SUCCESS)
}

fn report(output: &OutputManager, summary: &RunSummary) {
    let _ = output.section("Artifacts");
    for artifact in &summary.artifacts {
        let _ = output.success(&format!(
            "{} → {} ({} bytes)",
            artifact.target,
            artifact.path.display(),
            artifact.size
        ));
        let _ = output.indent(&format!("sha256: {}", artifact.checksum));
    }
    for target in &summary.skipped {
        let _ = output.warn(&format!("{target}: no runtime build available, skipped"));
    }
    if summary.artifacts.is_empty() {
        let _ = output.println("Nothing was bundled.");
    }
}
