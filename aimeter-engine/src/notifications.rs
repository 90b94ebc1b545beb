//! Usage threshold alerts.
//!
//! [`ThresholdNotifier`] decides when a provider crossed a configured
//! threshold; a [`NotificationSink`] delivers the resulting [`Alert`]s.

use std::collections::{BTreeSet, HashMap};

use aimeter_core::ProviderKind;
use tracing::{debug, info, warn};

// ============================================================================
// Alerts
// ============================================================================

/// A threshold crossing ready to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Provider that crossed the threshold.
    pub provider: ProviderKind,
    /// Threshold that was crossed, in percent.
    pub threshold: u8,
    /// Notification title, e.g. `Claude Usage Alert`.
    pub title: String,
    /// Notification body, e.g. `Usage is at 85%`.
    pub body: String,
}

impl Alert {
    fn new(provider: ProviderKind, threshold: u8, utilization: f64) -> Self {
        Self {
            provider,
            threshold,
            title: format!("{} Usage Alert", provider.display_name()),
            body: format!("Usage is at {}%", whole_percent(utilization)),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn whole_percent(utilization: f64) -> i64 {
    utilization.trunc() as i64
}

/// Sorts thresholds, drops duplicates and values outside `1..=100`.
pub fn normalize_thresholds(thresholds: &[u8]) -> Vec<u8> {
    thresholds
        .iter()
        .copied()
        .filter(|t| (1..=100).contains(t))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ============================================================================
// Threshold Notifier
// ============================================================================

/// Remembers which thresholds already fired for each provider.
///
/// A threshold fires once and stays armed until utilization drops below the
/// lowest configured threshold, which clears the provider's memory.
#[derive(Debug, Clone, Default)]
pub struct ThresholdNotifier {
    thresholds: Vec<u8>,
    fired: HashMap<ProviderKind, BTreeSet<u8>>,
}

impl ThresholdNotifier {
    /// Creates a notifier for the given thresholds.
    pub fn new(thresholds: &[u8]) -> Self {
        Self {
            thresholds: normalize_thresholds(thresholds),
            fired: HashMap::new(),
        }
    }

    /// Returns the normalized thresholds.
    pub fn thresholds(&self) -> &[u8] {
        &self.thresholds
    }

    /// Replaces the thresholds. Memory of thresholds no longer configured is
    /// dropped.
    pub fn set_thresholds(&mut self, thresholds: &[u8]) {
        self.thresholds = normalize_thresholds(thresholds);
        for fired in self.fired.values_mut() {
            fired.retain(|t| self.thresholds.contains(t));
        }
    }

    /// Returns the alerts a new utilization reading raises.
    pub fn check(&mut self, provider: ProviderKind, max_utilization: f64) -> Vec<Alert> {
        let Some(&lowest) = self.thresholds.first() else {
            return Vec::new();
        };

        let fired = self.fired.entry(provider).or_default();
        let mut alerts = Vec::new();

        for &threshold in &self.thresholds {
            if max_utilization >= f64::from(threshold) && fired.insert(threshold) {
                debug!(provider = %provider, threshold, "Threshold crossed");
                alerts.push(Alert::new(provider, threshold, max_utilization));
            }
        }

        if max_utilization < f64::from(lowest) && !fired.is_empty() {
            debug!(provider = %provider, "Usage below lowest threshold, re-arming");
            fired.clear();
        }

        alerts
    }

    /// Forgets every fired threshold of one provider.
    pub fn reset(&mut self, provider: ProviderKind) {
        self.fired.remove(&provider);
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Destination for alerts. Delivery is fire-and-forget.
pub trait NotificationSink: Send + Sync {
    /// Shows one notification.
    fn send(&self, title: &str, body: &str);
}

/// Writes alerts to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn send(&self, title: &str, body: &str) {
        info!(title, body, "Usage alert");
    }
}

/// Desktop notifications through the platform's command line tools.
///
/// macOS uses `osascript`, Linux uses `notify-send`; other platforms only
/// log the alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNotifier;

impl SystemNotifier {
    /// Creates a system notifier.
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for SystemNotifier {
    fn send(&self, title: &str, body: &str) {
        info!(title, body, "Sending usage notification");

        let Some((program, args)) = notification_command(title, body) else {
            return;
        };

        // The child is not awaited; tokio reaps it in the background.
        if let Err(e) = tokio::process::Command::new(program)
            .args(&args)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
        {
            warn!(program, error = %e, "Failed to deliver notification");
        }
    }
}

/// Builds the platform notification command, if there is one.
fn notification_command(title: &str, body: &str) -> Option<(&'static str, Vec<String>)> {
    if cfg!(target_os = "macos") {
        let script = format!(
            "display notification \"{}\" with title \"{}\"",
            applescript_escape(body),
            applescript_escape(title)
        );
        Some(("osascript", vec!["-e".to_string(), script]))
    } else if cfg!(target_os = "linux") {
        Some((
            "notify-send",
            vec![
                "--app-name=AIMeter".to_string(),
                title.to_string(),
                body.to_string(),
            ],
        ))
    } else {
        None
    }
}

/// Escapes text for an AppleScript string literal.
fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\n', '\r'], " ")
}

// ============================================================================
// Tests
// ============================================================================
