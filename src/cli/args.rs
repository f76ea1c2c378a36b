//! Command line argument parsing and validation.

use crate::bundler::OperatingSystem;
use crate::config::DEFAULT_CONFIG_PATH;
use clap::Parser;
use std::path::PathBuf;

/// Bundles an application with a downloaded runtime for every configured target
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_runtime",
    version,
    about = "Bundles an application with a managed runtime for Linux, macOS and Windows",
    long_about = "Downloads a runtime build for every (os, arch) pair of the config's matrix,
lays out a self-contained bundle around it and packages the result.

On first use the config file does not exist yet: defaults are written and the
tool exits with code 2. Edit the file and re-run.

Usage:
  kodegen_bundler_runtime
  kodegen_bundler_runtime --config jcup/config.json --only windows --only macos

Exit codes: 0 = success, 2 = defaults written, 255 = fatal error."
)]
pub struct Args {
    /// Config file path
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Enable trace logging (implies --debug)
    #[arg(short, long)]
    pub trace: bool,

    /// Disable colored output
    #[arg(long, alias = "nc")]
    pub no_color: bool,

    /// Only bundle for this operating system (repeatable)
    #[arg(long, value_name = "OS")]
    pub only: Vec<OperatingSystem>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Log level requested by the flags; `RUST_LOG` may still override it.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.trace {
            log::LevelFilter::Trace
        } else if self.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.config.as_os_str().is_empty() {
            return Err("Config path cannot be empty".to_string());
        }
        if self.config.is_dir() {
            return Err(format!(
                "Config path {} is a directory, expected a JSON file",
                self.config.display()
            ));
        }
        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.debug || args.trace, !args.no_color),
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["kodegen_bundler_runtime"]).unwrap();
        assert_eq!(args.config, PathBuf::from("jcup/config.json"));
        assert_eq!(args.log_level(), log::LevelFilter::Info);
        assert!(args.only.is_empty());
    }

    #[test]
    fn test_only_is_repeatable_and_accepts_legacy_names() {
        let args = Args::try_parse_from([
            "kodegen_bundler_runtime",
            "--only",
            "windows",
            "--only",
            "macosx",
            "-t",
        ])
        .unwrap();
        assert_eq!(
            args.only,
            [OperatingSystem::Windows, OperatingSystem::MacOs]
        );
        assert_eq!(args.log_level(), log::LevelFilter::Trace);
    }

    #[test]
    fn test_unknown_os_is_rejected() {
        assert!(Args::try_parse_from(["kodegen_bundler_runtime", "--only", "beos"]).is_err());
    }
}
