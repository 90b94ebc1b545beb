//! Usage-related types.
//!
//! This module contains types related to usage tracking:
//! - [`UsageLimit`] - One named quota window
//! - [`ProviderUsageResponse`] - Ordered limits from one fetch
//! - [`StatusLevel`] - Severity bucket of a percentage
//! - [`DisplayMode`] - Which limit the status line prefers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Usage Limit
// ============================================================================

/// A single named quota window (e.g. "Session (5h)", "Weekly").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLimit {
    /// Display name of the window.
    pub name: String,
    /// Percentage of the quota used (0-100).
    pub utilization: f64,
    /// When this window resets, if known.
    pub reset_time: Option<DateTime<Utc>>,
}

impl UsageLimit {
    /// Creates a new limit without a reset time.
    pub fn new(name: impl Into<String>, utilization: f64) -> Self {
        Self {
            name: name.into(),
            utilization,
            reset_time: None,
        }
    }

    /// Sets the reset time.
    #[must_use]
    pub fn with_reset_time(mut self, reset_time: Option<DateTime<Utc>>) -> Self {
        self.reset_time = reset_time;
        self
    }

    /// Returns the remaining percentage (100 - used).
    pub fn remaining(&self) -> f64 {
        (100.0 - self.utilization).max(0.0)
    }

    /// Returns the severity bucket for this limit.
    pub fn status_level(&self) -> StatusLevel {
        StatusLevel::from_percent(self.utilization)
    }

    /// Clamps the utilization into [0, 100]; non-finite values become 0.
    pub fn sanitize(&mut self) {
        if !self.utilization.is_finite() {
            self.utilization = 0.0;
        }
        self.utilization = self.utilization.clamp(0.0, 100.0);
    }
}

// ============================================================================
// Provider Usage Response
// ============================================================================

/// Everything one provider reported in one fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderUsageResponse {
    /// Limits in the order the provider reported them.
    pub limits: Vec<UsageLimit>,
}

impl ProviderUsageResponse {
    /// Creates a response from a list of limits.
    pub fn new(limits: Vec<UsageLimit>) -> Self {
        Self { limits }
    }

    /// Returns the highest utilization across all limits, or 0 if empty.
    pub fn max_utilization(&self) -> f64 {
        self.limits
            .iter()
            .map(|limit| limit.utilization)
            .fold(0.0_f64, f64::max)
    }

    /// Returns true if the provider reported no limits.
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    /// Finds a limit by exact name.
    pub fn limit(&self, name: &str) -> Option<&UsageLimit> {
        self.limits.iter().find(|limit| limit.name == name)
    }

    /// Returns the limit the given display mode prefers, if any.
    pub fn display_limit(&self, mode: DisplayMode) -> Option<&UsageLimit> {
        self.limits.iter().find(|limit| mode.matches(&limit.name))
    }

    /// Returns the percentage to show for the given display mode.
    ///
    /// Falls back to [`max_utilization`](Self::max_utilization) when no
    /// limit matches the mode.
    pub fn display_percent(&self, mode: DisplayMode) -> f64 {
        self.display_limit(mode)
            .map_or_else(|| self.max_utilization(), |limit| limit.utilization)
    }

    /// Clamps every limit into the valid range.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        for limit in &mut self.limits {
            limit.sanitize();
        }
        self
    }
}

// ============================================================================
// Status Level
// ============================================================================

/// Severity bucket of a usage percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    /// Below 70%.
    Normal,
    /// 70% up to 90%.
    Warning,
    /// 90% and above.
    Critical,
}

impl StatusLevel {
    /// Buckets a percentage.
    pub fn from_percent(percent: f64) -> Self {
        if percent < 70.0 {
            Self::Normal
        } else if percent < 90.0 {
            Self::Warning
        } else {
            Self::Critical
        }
    }

    /// Returns the traffic-light emoji for this level.
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Normal => "🟢",
            Self::Warning => "🟡",
            Self::Critical => "🔴",
        }
    }
}

// ============================================================================
// Display Mode
// ============================================================================

/// Which limit a compact display (status line, menu bar) prefers.
///
/// Purely a presentation filter; the engine never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Prefer the short session window.
    Session,
    /// Prefer the weekly window.
    #[default]
    Weekly,
}

impl DisplayMode {
    /// Returns true if a limit name belongs to this mode.
    pub fn matches(self, limit_name: &str) -> bool {
        match self {
            Self::Session => limit_name.contains('5') || limit_name.contains("Session"),
            Self::Weekly => limit_name.contains("Weekly") || limit_name.contains("7d"),
        }
    }

    /// All display modes.
    pub fn all() -> &'static [DisplayMode] {
        &[Self::Session, Self::Weekly]
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session => write!(f, "session"),
            Self::Weekly => write!(f, "weekly"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
