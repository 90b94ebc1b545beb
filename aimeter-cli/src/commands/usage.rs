//! Usage command - run one refresh cycle and display provider usage.

use std::sync::Arc;

use aimeter_core::DisplayMode;
use aimeter_engine::{Engine, LogNotifier};
use aimeter_store::SettingsStore;
use anyhow::Result;
use clap::{Args, ValueEnum};
use tracing::{debug, info};

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the usage command.
#[derive(Args, Default)]
pub struct UsageArgs {
    /// Print only the compact status line.
    #[arg(long)]
    pub status_line: bool,

    /// Limit preferred by the status line (defaults to the configured one).
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
}

/// Command-line spelling of [`DisplayMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Prefer the session window.
    Session,
    /// Prefer the weekly window.
    Weekly,
}

impl From<ModeArg> for DisplayMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Session => DisplayMode::Session,
            ModeArg::Weekly => DisplayMode::Weekly,
        }
    }
}

/// Runs the usage command.
pub async fn run(args: &UsageArgs, cli: &Cli, store: &SettingsStore) -> Result<ExitCode> {
    let mut settings = store.get().await;
    settings.enabled_providers = cli.selected_providers(&settings.enabled_providers)?;
    let mode = args.mode.map_or(settings.display_mode, DisplayMode::from);

    info!(providers = ?settings.enabled_providers, "Fetching usage");

    let engine = Engine::from_settings(&settings, Arc::new(LogNotifier));
    let report = engine.refresh().wait().await?;
    debug!(?report, "Refresh finished");

    let state = engine.snapshot();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(cli.use_colors());
            if args.status_line {
                println!("{}", formatter.format_status_line(&state, mode));
            } else if state.provider_states.is_empty() {
                println!("No providers enabled. Try: aimeter config enable claude");
            } else {
                println!("{}", formatter.format_state(&state));
                println!();
                println!("{}", formatter.format_updated(&state));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_state(&state, mode)?);
        }
    }

    if state.has_any_usage() {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::NoUsage)
    }
}
