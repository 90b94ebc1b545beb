//! User preferences store.
//!
//! Manages user settings with persistence and change notification.

use aimeter_core::{DisplayMode, ProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json_or_default, save_json};

/// Default refresh interval in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 120;

/// Shortest automatic refresh interval in seconds.
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 10;

/// Default alert thresholds in percent.
pub const DEFAULT_THRESHOLDS: [u8; 2] = [80, 90];

// ============================================================================
// Settings Types
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Providers included in refresh cycles.
    pub enabled_providers: BTreeSet<ProviderKind>,

    /// Seconds between automatic refreshes; 0 disables the timer.
    pub refresh_interval_secs: u64,

    /// Utilization percentages that raise an alert.
    pub thresholds: Vec<u8>,

    /// Deliver threshold alerts as desktop notifications.
    pub notifications_enabled: bool,

    /// Refresh after the machine wakes from sleep.
    pub auto_refresh_on_wake: bool,

    /// Which limit compact displays prefer.
    pub display_mode: DisplayMode,

    /// Log level for long-running modes.
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled_providers: ProviderKind::all().iter().copied().collect(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            notifications_enabled: true,
            auto_refresh_on_wake: true,
            display_mode: DisplayMode::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl Settings {
    /// Returns the automatic refresh interval, or `None` for manual-only.
    ///
    /// Non-zero values below [`MIN_REFRESH_INTERVAL_SECS`] are raised to it.
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.refresh_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs.max(MIN_REFRESH_INTERVAL_SECS))),
        }
    }

    /// Returns true if the provider takes part in refresh cycles.
    pub fn is_enabled(&self, provider: ProviderKind) -> bool {
        self.enabled_providers.contains(&provider)
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    Warn,
    /// Info level logging.
    #[default]
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl LogLevel {
    /// Returns the directive name understood by log filters.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Store for user settings.
///
/// Changes are broadcast as a version counter on a watch channel; readers
/// call [`SettingsStore::get`] for the new values.
#[derive(Debug)]
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
    notify: watch::Sender<u64>,
    version: Arc<RwLock<u64>>,
}

impl SettingsStore {
    /// Creates a store with default settings backed by `path`.
    pub fn new(path: PathBuf) -> Self {
        Self::with_settings(path, Settings::default())
    }

    fn with_settings(path: PathBuf, settings: Settings) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
            notify,
            version: Arc::new(RwLock::new(0)),
        }
    }

    /// Loads settings from the default location.
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from `path`.
    ///
    /// A missing or corrupt file yields the defaults; the file is not
    /// touched until [`save`](Self::save) is called.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        if path.is_dir() {
            return Err(StoreError::Config(format!(
                "settings path is a directory: {}",
                path.display()
            )));
        }

        debug!(path = %path.display(), "Loading settings");
        let settings: Settings = load_json_or_default(&path).await;
        Ok(Self::with_settings(path, settings))
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Applies `f` to the settings and notifies subscribers.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        {
            let mut settings = self.settings.write().await;
            f(&mut settings);
        }
        self.notify_change().await;
    }

    /// Writes the current settings to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Re-reads the backing file and notifies subscribers if anything
    /// changed.
    ///
    /// Picks up edits made by another process, such as `aimeter config`.
    pub async fn reload(&self) -> Result<(), StoreError> {
        if self.path.is_dir() {
            return Err(StoreError::Config(format!(
                "settings path is a directory: {}",
                self.path.display()
            )));
        }

        let latest: Settings = load_json_or_default(&self.path).await;
        let changed = {
            let mut settings = self.settings.write().await;
            let changed = *settings != latest;
            *settings = latest;
            changed
        };

        if changed {
            debug!(path = %self.path.display(), "Settings reloaded");
            self.notify_change().await;
        }
        Ok(())
    }

    /// Restores every setting to its default value.
    pub async fn reset(&self) {
        self.update(|s| *s = Settings::default()).await;
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    async fn notify_change(&self) {
        let mut version = self.version.write().await;
        *version += 1;
        let _ = self.notify.send(*version);
    }

    // ========================================================================
    // Convenience Methods
    // ========================================================================

    /// Returns true if the provider is enabled.
    pub async fn is_provider_enabled(&self, provider: ProviderKind) -> bool {
        self.settings.read().await.is_enabled(provider)
    }

    /// Enables or disables a provider.
    pub async fn set_provider_enabled(&self, provider: ProviderKind, enabled: bool) {
        self.update(|s| {
            if enabled {
                s.enabled_providers.insert(provider);
            } else {
                s.enabled_providers.remove(&provider);
            }
        })
        .await;
    }

    /// Returns the enabled providers in display order.
    pub async fn enabled_providers(&self) -> BTreeSet<ProviderKind> {
        self.settings.read().await.enabled_providers.clone()
    }

    /// Returns the refresh interval, `None` meaning manual-only.
    pub async fn refresh_interval(&self) -> Option<Duration> {
        self.settings.read().await.refresh_interval()
    }

    /// Sets the refresh interval in seconds (0 disables the timer).
    pub async fn set_refresh_interval_secs(&self, secs: u64) {
        self.update(|s| s.refresh_interval_secs = secs).await;
    }

    /// Returns the alert thresholds as stored.
    pub async fn thresholds(&self) -> Vec<u8> {
        self.settings.read().await.thresholds.clone()
    }

    /// Replaces the alert thresholds.
    pub async fn set_thresholds(&self, thresholds: Vec<u8>) {
        self.update(|s| s.thresholds = thresholds).await;
    }

    /// Returns true if alerts become desktop notifications.
    pub async fn notifications_enabled(&self) -> bool {
        self.settings.read().await.notifications_enabled
    }

    /// Enables or disables desktop notifications.
    pub async fn set_notifications_enabled(&self, value: bool) {
        self.update(|s| s.notifications_enabled = value).await;
    }

    /// Returns true if waking from sleep triggers a refresh.
    pub async fn auto_refresh_on_wake(&self) -> bool {
        self.settings.read().await.auto_refresh_on_wake
    }

    /// Enables or disables refresh on wake.
    pub async fn set_auto_refresh_on_wake(&self, value: bool) {
        self.update(|s| s.auto_refresh_on_wake = value).await;
    }

    /// Returns the preferred display mode.
    pub async fn display_mode(&self) -> DisplayMode {
        self.settings.read().await.display_mode
    }

    /// Sets the preferred display mode.
    pub async fn set_display_mode(&self, mode: DisplayMode) {
        self.update(|s| s.display_mode = mode).await;
    }

    /// Returns the configured log level.
    pub async fn log_level(&self) -> LogLevel {
        self.settings.read().await.log_level
    }

    /// Sets the log level.
    pub async fn set_log_level(&self, level: LogLevel) {
        self.update(|s| s.log_level = level).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
