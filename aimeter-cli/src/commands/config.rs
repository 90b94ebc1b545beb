//! Config command - manage configuration.

use aimeter_core::ProviderKind;
use aimeter_engine::normalize_thresholds;
use aimeter_store::{LogLevel, MIN_REFRESH_INTERVAL_SECS, Settings, SettingsStore, default_config_dir};
use anyhow::{Result, anyhow};
use clap::{Args, Subcommand, ValueEnum};
use tracing::info;

use super::usage::ModeArg;
use crate::output::JsonFormatter;
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Enable a provider.
    Enable {
        /// Provider to enable.
        provider: String,
    },

    /// Disable a provider.
    Disable {
        /// Provider to disable.
        provider: String,
    },

    /// Set the refresh interval in seconds (0 = manual only).
    Interval {
        /// Seconds between refreshes.
        secs: u64,
    },

    /// Set alert thresholds in percent, e.g. "80,90". No values disables alerts.
    Thresholds {
        /// Percentages between 1 and 100.
        #[arg(value_delimiter = ',', num_args = 0..)]
        values: Vec<u8>,
    },

    /// Set which limit the status line prefers.
    Display {
        /// Session or weekly.
        #[arg(value_enum)]
        mode: ModeArg,
    },

    /// Turn desktop notifications on or off.
    Notifications {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Turn refresh after system wake on or off.
    Wake {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Set the log level used by `watch`.
    LogLevel {
        #[arg(value_enum)]
        level: LevelArg,
    },

    /// Reset to defaults.
    Reset,
}

/// An on/off switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> Self {
        toggle == Toggle::On
    }
}

/// Command-line spelling of [`LogLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LevelArg> for LogLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Error => LogLevel::Error,
            LevelArg::Warn => LogLevel::Warn,
            LevelArg::Info => LogLevel::Info,
            LevelArg::Debug => LogLevel::Debug,
            LevelArg::Trace => LogLevel::Trace,
        }
    }
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli, store: &SettingsStore) -> Result<ExitCode> {
    match &args.action {
        ConfigAction::Show => show_config(cli, store).await?,
        ConfigAction::Path => show_paths(cli, store)?,
        ConfigAction::Enable { provider } => set_provider(store, provider, true).await?,
        ConfigAction::Disable { provider } => set_provider(store, provider, false).await?,
        ConfigAction::Interval { secs } => set_interval(store, *secs).await?,
        ConfigAction::Thresholds { values } => set_thresholds(store, values).await?,
        ConfigAction::Display { mode } => {
            store.set_display_mode((*mode).into()).await;
            store.save().await?;
            println!("Display mode: {}", store.display_mode().await);
        }
        ConfigAction::Notifications { state } => {
            store.set_notifications_enabled((*state).into()).await;
            store.save().await?;
            println!("Notifications: {}", on_off(store.notifications_enabled().await));
        }
        ConfigAction::Wake { state } => {
            store.set_auto_refresh_on_wake((*state).into()).await;
            store.save().await?;
            println!("Refresh on wake: {}", on_off(store.auto_refresh_on_wake().await));
        }
        ConfigAction::LogLevel { level } => {
            store.set_log_level((*level).into()).await;
            store.save().await?;
            println!("Log level: {}", store.log_level().await);
        }
        ConfigAction::Reset => {
            store.reset().await;
            store.save().await?;
            info!("Configuration reset");
            println!("Configuration reset to defaults.");
        }
    }

    Ok(ExitCode::Success)
}

async fn show_config(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let settings = store.get().await;

    match cli.format {
        OutputFormat::Text => print!("{}", describe(&settings)),
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

/// Renders settings as human-readable text.
fn describe(settings: &Settings) -> String {
    let mut out = String::new();
    out.push_str("AIMeter Configuration\n");
    out.push_str(&"─".repeat(40));
    out.push_str("\n\nEnabled providers:\n");
    if settings.enabled_providers.is_empty() {
        out.push_str("  (none)\n");
    }
    for provider in &settings.enabled_providers {
        out.push_str(&format!("  • {}\n", provider.display_name()));
    }

    let interval = match settings.refresh_interval() {
        Some(interval) => format!("every {}s", interval.as_secs()),
        None => "manual".to_string(),
    };
    let thresholds = if settings.thresholds.is_empty() {
        "none".to_string()
    } else {
        settings
            .thresholds
            .iter()
            .map(|t| format!("{t}%"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    out.push('\n');
    out.push_str(&format!("Refresh:          {interval}\n"));
    out.push_str(&format!("Alert thresholds: {thresholds}\n"));
    out.push_str(&format!("Notifications:    {}\n", on_off(settings.notifications_enabled)));
    out.push_str(&format!("Refresh on wake:  {}\n", on_off(settings.auto_refresh_on_wake)));
    out.push_str(&format!("Display mode:     {}\n", settings.display_mode));
    out.push_str(&format!("Log level:        {}\n", settings.log_level));
    out
}

fn show_paths(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = store.path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "configDir": config_dir.display().to_string(),
                "settingsFile": settings_path.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn set_provider(store: &SettingsStore, name: &str, enabled: bool) -> Result<()> {
    let provider: ProviderKind = name.parse().map_err(|e: String| anyhow!(e))?;

    store.set_provider_enabled(provider, enabled).await;
    store.save().await?;

    info!(%provider, enabled, "Provider toggled");
    println!(
        "{}: {}",
        if enabled { "Enabled" } else { "Disabled" },
        provider.display_name()
    );

    Ok(())
}

async fn set_interval(store: &SettingsStore, secs: u64) -> Result<()> {
    store.set_refresh_interval_secs(secs).await;
    store.save().await?;

    match store.refresh_interval().await {
        None => println!("Refresh: manual"),
        Some(interval) if secs < MIN_REFRESH_INTERVAL_SECS => println!(
            "Refresh: every {}s (minimum is {MIN_REFRESH_INTERVAL_SECS}s)",
            interval.as_secs()
        ),
        Some(interval) => println!("Refresh: every {}s", interval.as_secs()),
    }

    Ok(())
}

async fn set_thresholds(store: &SettingsStore, values: &[u8]) -> Result<()> {
    let thresholds = normalize_thresholds(values);
    if thresholds.len() != values.len() {
        println!("Ignoring duplicate or out-of-range values (allowed: 1-100).");
    }

    store.set_thresholds(thresholds.clone()).await;
    store.save().await?;

    if thresholds.is_empty() {
        println!("Alerts disabled.");
    } else {
        let list: Vec<String> = thresholds.iter().map(|t| format!("{t}%")).collect();
        println!("Alert thresholds: {}", list.join(", "));
    }

    Ok(())
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        action: ConfigAction,
    }

    fn parse(args: &[&str]) -> ConfigAction {
        let argv = std::iter::once("config").chain(args.iter().copied());
        Harness::try_parse_from(argv).unwrap().action
    }

    #[test]
    fn test_parse_thresholds() {
        match parse(&["thresholds", "90,75"]) {
            ConfigAction::Thresholds { values } => assert_eq!(values, vec![90, 75]),
            _ => panic!("expected thresholds"),
        }
        match parse(&["thresholds"]) {
            ConfigAction::Thresholds { values } => assert!(values.is_empty()),
            _ => panic!("expected thresholds"),
        }
    }

    #[test]
    fn test_parse_toggles() {
        assert!(matches!(
            parse(&["notifications", "off"]),
            ConfigAction::Notifications { state: Toggle::Off }
        ));
        assert!(matches!(parse(&["wake", "on"]), ConfigAction::Wake { state: Toggle::On }));
        assert!(bool::from(Toggle::On));
        assert!(!bool::from(Toggle::Off));
    }

    #[test]
    fn test_parse_log_level() {
        match parse(&["log-level", "debug"]) {
            ConfigAction::LogLevel { level } => assert_eq!(LogLevel::from(level), LogLevel::Debug),
            _ => panic!("expected log-level"),
        }
    }

    #[test]
    fn test_describe_defaults() {
        let text = describe(&Settings::default());
        assert!(text.contains("Refresh:          every 120s"));
        assert!(text.contains("Alert thresholds: 80%, 90%"));
        assert!(text.contains("Notifications:    on"));
    }

    #[test]
    fn test_describe_manual_without_alerts() {
        let settings = Settings {
            refresh_interval_secs: 0,
            thresholds: Vec::new(),
            enabled_providers: std::collections::BTreeSet::new(),
            ..Settings::default()
        };
        let text = describe(&settings);
        assert!(text.contains("Refresh:          manual"));
        assert!(text.contains("Alert thresholds: none"));
        assert!(text.contains("(none)"));
    }

    #[tokio::test]
    async fn test_set_thresholds_normalizes_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));

        set_thresholds(&store, &[95, 0, 80, 95, 120]).await.unwrap();
        assert_eq!(store.thresholds().await, vec![80, 95]);

        let reloaded = SettingsStore::load(dir.path().join("settings.json")).await.unwrap();
        assert_eq!(reloaded.thresholds().await, vec![80, 95]);
    }

    #[tokio::test]
    async fn test_set_provider_rejects_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));

        assert!(set_provider(&store, "cursor", true).await.is_err());
        set_provider(&store, "codex", false).await.unwrap();
        assert!(!store.is_provider_enabled(ProviderKind::Codex).await);
    }
}
