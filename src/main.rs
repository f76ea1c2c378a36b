//! Kodegen Bundler Runtime - self-contained application bundles around a
//! downloaded managed runtime, for Linux, macOS and Windows.

use kodegen_bundler_runtime::cli::{self, Args, OutputManager};
use std::process;

#[tokio::main]
async fn main() {
    let args = Args::parse_args();

    let mut logger = env_logger::Builder::new();
    logger.filter_level(args.log_level()).parse_default_env();
    if args.no_color {
        logger.write_style(env_logger::WriteStyle::Never);
    }
    logger.init();

    let color = !args.no_color;
    match cli::run(args).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            let output = OutputManager::new(false, color);
            output.error(&format!("Fatal error: {e}"));
            for suggestion in e.recovery_suggestions() {
                let _ = output.indent(&suggestion);
            }
            process::exit(e.exit_code());
        }
    }
}
