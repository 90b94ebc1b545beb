// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `AIMeter` CLI - usage monitoring for AI coding assistants.
//!
//! # Examples
//!
//! ```bash
//! # Show usage for the enabled providers
//! aimeter
//!
//! # Show usage for a specific provider
//! aimeter --provider codex
//!
//! # JSON output
//! aimeter --format json --pretty
//!
//! # Live view, refreshing every 60 seconds
//! aimeter watch --interval 60
//!
//! # Alert at 75% and 95%
//! aimeter config thresholds 75,95
//! ```

mod commands;
mod output;

use std::collections::BTreeSet;
use std::io::IsTerminal;

use aimeter_core::ProviderKind;
use aimeter_store::{LogLevel, SettingsStore};
use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{config, providers, usage, watch};

// ============================================================================
// CLI Definition
// ============================================================================

/// `AIMeter` CLI - usage monitoring for AI coding assistants.
#[derive(Parser)]
#[command(name = "aimeter")]
#[command(about = "Usage monitoring for Claude and Codex")]
#[command(long_about = r#"
AIMeter shows how much of your AI coding assistant quota is used.

Supported providers:
  • Claude (claude)  - reads the Claude Code login
  • Codex (codex)    - reads the Codex CLI login

Examples:
  aimeter                        # Enabled providers
  aimeter --provider codex       # Single provider
  aimeter --format json          # JSON output
  aimeter watch                  # Live view with alerts
"#)]
#[command(version)]
#[command(author = "AIMeter Contributors")]
pub struct Cli {
    /// Subcommand to run. If none, runs 'usage' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Provider to query ("all" for every provider).
    /// Can be comma-separated: "codex,claude"
    #[arg(long, short, global = true)]
    pub provider: Option<String>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (no logging, no error messages).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Returns true if text output may use ANSI colors.
    pub fn use_colors(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }

    /// Resolves `--provider` against the enabled providers.
    pub fn selected_providers(
        &self,
        enabled: &BTreeSet<ProviderKind>,
    ) -> Result<BTreeSet<ProviderKind>> {
        parse_provider_selection(self.provider.as_deref(), enabled)
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch current usage (default if no command specified).
    #[command(visible_alias = "u")]
    Usage(usage::UsageArgs),

    /// Keep refreshing and show live usage.
    #[command(visible_alias = "w")]
    Watch(watch::WatchArgs),

    /// List providers and whether they are logged in.
    #[command(visible_alias = "p")]
    Providers,

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// No provider produced usage.
    NoUsage = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

/// Parses a provider selection like `claude`, `codex,claude` or `all`.
///
/// No selection means the providers enabled in the settings.
pub fn parse_provider_selection(
    arg: Option<&str>,
    enabled: &BTreeSet<ProviderKind>,
) -> Result<BTreeSet<ProviderKind>> {
    match arg.map(str::trim) {
        None | Some("") => Ok(enabled.clone()),
        Some(all) if all.eq_ignore_ascii_case("all") => {
            Ok(ProviderKind::all().iter().copied().collect())
        }
        Some(names) => {
            let providers = names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::parse::<ProviderKind>)
                .collect::<Result<BTreeSet<_>, _>>()
                .map_err(|e| anyhow::anyhow!(e))?;
            if providers.is_empty() {
                bail!("No valid providers specified");
            }
            Ok(providers)
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(level: LogLevel, quiet: bool) {
    if quiet {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("aimeter={level}")));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(code) => code.into(),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::Error.into()
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let settings = SettingsStore::load_default().await?;

    // Long-running mode follows the configured level; one-shot commands
    // only report problems.
    let level = match &cli.command {
        _ if cli.verbose => LogLevel::Debug,
        Some(Commands::Watch(_)) => settings.log_level().await,
        _ => LogLevel::Warn,
    };
    setup_logging(level, cli.quiet);

    match &cli.command {
        Some(Commands::Usage(args)) => usage::run(args, cli, &settings).await,
        Some(Commands::Watch(args)) => watch::run(args, cli, &settings).await,
        Some(Commands::Providers) => providers::run(cli, &settings).await,
        Some(Commands::Config(args)) => config::run(args, cli, &settings).await,
        None => usage::run(&usage::UsageArgs::default(), cli, &settings).await,
    }
}

// ============================================================================
// Tests
// ============================================================================
