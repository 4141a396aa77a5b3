//! `tome check` command implementation.

use std::path::PathBuf;

use clap::Args;
use tome_build::{BuildSettings, StaticSiteBuilder};
use tome_config::{CliSettings, Config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    /// Path to configuration file (default: auto-discover tome.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CheckArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let mut settings = BuildSettings::from_config(&config);
        settings.cache_dir = None;

        output.info(&format!("Checking {}", settings.source_dir.display()));
        let report = StaticSiteBuilder::new(settings).check()?;
        super::report_unreachable(&output, &report.unreachable);

        output.success(&format!("{} documents OK", report.documents));
        Ok(())
    }
}
