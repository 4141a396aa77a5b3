//! `tome build` command implementation.

use std::path::PathBuf;

use clap::Args;
use tome_build::{BuildSettings, StaticSiteBuilder};
use tome_config::{CliSettings, Config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover tome.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Worker threads for parsing and rendering (0 = one per core).
    #[arg(short, long, env = "TOME_JOBS")]
    jobs: Option<usize>,

    /// Disable the page cache.
    #[arg(long)]
    no_cache: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl BuildArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            output_dir: self.output_dir,
            jobs: self.jobs,
            cache_enabled: self.no_cache.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let settings = BuildSettings::from_config(&config);

        output.info(&format!("Source: {}", settings.source_dir.display()));
        output.info(&format!("Output: {}", settings.output_dir.display()));

        let report = StaticSiteBuilder::new(settings.clone()).build()?;
        super::report_unreachable(&output, &report.unreachable);

        output.success(&format!(
            "Built {} pages ({} from cache) to {}",
            report.pages(),
            report.pages_cached,
            settings.output_dir.display()
        ));
        Ok(())
    }
}
