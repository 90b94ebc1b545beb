//! Watch command - real-time usage monitoring.
//!
//! Runs the scheduler until Ctrl-C. Every published snapshot is rendered;
//! pressing Enter reloads the settings file and requests a refresh, and `q`
//! quits. Reloaded alert settings take effect without a restart.

use std::io::{Write, stdout};
use std::sync::Arc;

use aimeter_core::{AggregateState, DisplayMode};
use aimeter_engine::{Engine, SchedulerConfig, SystemNotifier, Trigger};
use aimeter_store::SettingsStore;
use anyhow::Result;
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use super::usage::ModeArg;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for watch command.
#[derive(Args, Default)]
pub struct WatchArgs {
    /// Refresh interval in seconds (defaults to the configured one, 0 = manual).
    #[arg(long, short)]
    pub interval: Option<u64>,

    /// Limit preferred by the status line (defaults to the configured one).
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
}

/// Runs the watch command.
pub async fn run(args: &WatchArgs, cli: &Cli, store: &SettingsStore) -> Result<ExitCode> {
    let mut settings = store.get().await;
    settings.enabled_providers = cli.selected_providers(&settings.enabled_providers)?;
    if let Some(secs) = args.interval {
        settings.refresh_interval_secs = secs;
    }
    let mode = args.mode.map_or(settings.display_mode, DisplayMode::from);

    let config = SchedulerConfig::from_settings(&settings);
    info!(
        interval_secs = config.interval.map(|d| d.as_secs()),
        providers = ?settings.enabled_providers,
        "Starting watch mode"
    );

    let engine = Engine::from_settings(&settings, Arc::new(SystemNotifier::new()));
    let mut snapshots = engine.subscribe();
    let mut settings_changes = store.subscribe();
    let scheduler = engine.start_scheduler(config.clone());

    let screen = Screen {
        cli,
        mode,
        interval: config.interval.map(|d| d.as_secs()),
    };
    screen.render(&snapshots.borrow_and_update())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                break;
            }

            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = Arc::clone(&snapshots.borrow_and_update());
                screen.render(&state)?;
            }

            changed = settings_changes.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!("Settings changed, applying alert settings");
                engine.apply_settings(&store.get().await);
            }

            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().eq_ignore_ascii_case("q") => break,
                Ok(Some(_)) => {
                    // Pick up changes made with `aimeter config` meanwhile.
                    if let Err(e) = store.reload().await {
                        warn!(error = %e, "Failed to reload settings");
                    }
                    debug!("Manual refresh requested");
                    scheduler.trigger(Trigger::Manual);
                }
                Ok(None) => {
                    debug!("Stdin closed, manual refresh unavailable");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    stdin_open = false;
                }
            },
        }
    }

    scheduler.shutdown().await;
    info!("Watch mode stopped");

    if engine.snapshot().has_any_usage() {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::NoUsage)
    }
}

/// Renders snapshots for the chosen output format.
struct Screen<'a> {
    cli: &'a Cli,
    mode: DisplayMode,
    interval: Option<u64>,
}

impl Screen<'_> {
    fn render(&self, state: &AggregateState) -> Result<()> {
        let mut out = stdout().lock();

        match self.cli.format {
            OutputFormat::Json => {
                // One compact document per snapshot.
                let formatter = JsonFormatter::new(false);
                writeln!(out, "{}", formatter.format_state(state, self.mode)?)?;
            }
            OutputFormat::Text => {
                let formatter = TextFormatter::new(self.cli.use_colors());
                let refresh = match self.interval {
                    Some(secs) => format!("every {secs}s"),
                    None => "manual".to_string(),
                };

                write!(out, "\x1b[2J\x1b[H")?;
                writeln!(
                    out,
                    "AIMeter  {}  (refresh: {refresh})",
                    formatter.format_status_line(state, self.mode)
                )?;
                writeln!(out, "{}", "─".repeat(50))?;
                writeln!(out)?;
                writeln!(out, "{}", formatter.format_state(state))?;
                writeln!(out)?;
                writeln!(out, "{}", formatter.format_updated(state))?;
                writeln!(out, "Enter: refresh   q: quit   Ctrl+C: exit")?;
            }
        }

        out.flush()?;
        Ok(())
    }
}
