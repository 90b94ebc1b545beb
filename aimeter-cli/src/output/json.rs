//! JSON output formatting.

use aimeter_core::{AggregateState, DisplayMode, ProviderKind, ProviderState, StatusLevel, UsageLimit};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a whole snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateOutput {
    pub status_line: String,
    pub level: StatusLevel,
    pub max_utilization: f64,
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub providers: Vec<ProviderOutput>,
}

/// JSON output for a single provider.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOutput {
    pub provider: String,
    pub display_name: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_utilization: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<Vec<LimitOutput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A single limit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOutput {
    pub name: String,
    pub used_percent: f64,
    pub level: StatusLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<DateTime<Utc>>,
}

/// Provider info output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfoOutput {
    pub id: String,
    pub display_name: String,
    pub enabled: bool,
    pub logged_in: bool,
}

impl From<&UsageLimit> for LimitOutput {
    fn from(limit: &UsageLimit) -> Self {
        Self {
            name: limit.name.clone(),
            used_percent: limit.utilization,
            level: limit.status_level(),
            resets_at: limit.reset_time,
        }
    }
}

impl From<&ProviderState> for ProviderOutput {
    fn from(state: &ProviderState) -> Self {
        Self {
            provider: state.provider.id().to_string(),
            display_name: state.provider.display_name().to_string(),
            available: state.is_available,
            max_utilization: state.usage.as_ref().map(|u| u.max_utilization()),
            limits: state
                .usage
                .as_ref()
                .map(|u| u.limits.iter().map(LimitOutput::from).collect()),
            last_updated: state.last_updated,
            error: state.error.clone(),
        }
    }
}

impl StateOutput {
    /// Builds the output for a snapshot.
    pub fn new(state: &AggregateState, mode: DisplayMode) -> Self {
        Self {
            status_line: state.status_line(mode),
            level: state.overall_level(),
            max_utilization: state.max_utilization(),
            is_loading: state.is_loading,
            last_updated: state.last_updated,
            providers: state.providers().map(ProviderOutput::from).collect(),
        }
    }
}

impl ProviderInfoOutput {
    /// Builds the output for one entry of the providers list.
    pub fn new(kind: ProviderKind, enabled: bool, logged_in: bool) -> Self {
        Self {
            id: kind.id().to_string(),
            display_name: kind.display_name().to_string(),
            enabled,
            logged_in,
        }
    }
}

// ============================================================================
// Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }

    /// Formats a snapshot.
    pub fn format_state(&self, state: &AggregateState, mode: DisplayMode) -> Result<String> {
        self.format(&StateOutput::new(state, mode))
    }
}
