//! Refresh state types.
//!
//! [`ProviderState`] holds what the engine last learned about one provider;
//! [`AggregateState`] is the read-only snapshot handed to the presentation
//! layer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::provider::ProviderKind;
use super::usage::{DisplayMode, ProviderUsageResponse, StatusLevel};

// ============================================================================
// Provider State
// ============================================================================

/// Latest known state of one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderState {
    /// Which provider this state belongs to.
    pub provider: ProviderKind,
    /// Last successfully fetched usage. Kept across failed refreshes.
    pub usage: Option<ProviderUsageResponse>,
    /// When `usage` was last fetched.
    pub last_updated: Option<DateTime<Utc>>,
    /// Message of the most recent failure, cleared on success.
    pub error: Option<String>,
    /// True while a fetch for this provider is in flight.
    pub is_loading: bool,
    /// Whether the last cycle found a credential for this provider.
    pub is_available: bool,
}

impl ProviderState {
    /// Creates an empty state for a provider.
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            usage: None,
            last_updated: None,
            error: None,
            is_loading: false,
            is_available: false,
        }
    }

    /// Returns the highest utilization of the last usage, or 0 without usage.
    pub fn max_utilization(&self) -> f64 {
        self.usage
            .as_ref()
            .map_or(0.0, ProviderUsageResponse::max_utilization)
    }

    /// Returns true if there is usage data to show.
    pub fn has_usage(&self) -> bool {
        self.usage.is_some()
    }

    /// Returns true if the usage is older than `max_age` (or missing).
    pub fn is_stale(&self, max_age: chrono::Duration) -> bool {
        match self.last_updated {
            Some(time) => Utc::now().signed_duration_since(time) > max_age,
            None => true,
        }
    }
}

// ============================================================================
// Aggregate State
// ============================================================================

/// Snapshot of every provider plus cycle-level flags.
///
/// `is_loading` is true exactly while a refresh cycle is in flight, and
/// `last_updated` only moves when a cycle runs to completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateState {
    /// State per provider, in display order.
    pub provider_states: BTreeMap<ProviderKind, ProviderState>,
    /// True while a refresh cycle is running.
    pub is_loading: bool,
    /// When the last complete cycle finished.
    pub last_updated: Option<DateTime<Utc>>,
    /// Generation of the most recently started cycle (0 before the first).
    pub cycle: u64,
}

impl AggregateState {
    /// Creates a state with an empty entry for each provider.
    pub fn new(providers: &[ProviderKind]) -> Self {
        Self {
            provider_states: providers
                .iter()
                .map(|kind| (*kind, ProviderState::new(*kind)))
                .collect(),
            is_loading: false,
            last_updated: None,
            cycle: 0,
        }
    }

    /// Returns the state of one provider, if tracked.
    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderState> {
        self.provider_states.get(&kind)
    }

    /// Iterates over provider states in display order.
    pub fn providers(&self) -> impl Iterator<Item = &ProviderState> {
        self.provider_states.values()
    }

    /// Returns the highest utilization across all providers.
    pub fn max_utilization(&self) -> f64 {
        self.providers()
            .map(ProviderState::max_utilization)
            .fold(0.0_f64, f64::max)
    }

    /// Returns the severity of the busiest provider.
    pub fn overall_level(&self) -> StatusLevel {
        StatusLevel::from_percent(self.max_utilization())
    }

    /// Returns the first provider error, in display order.
    pub fn first_error(&self) -> Option<&str> {
        self.providers().find_map(|state| state.error.as_deref())
    }

    /// Returns true if at least one provider has usage data.
    pub fn has_any_usage(&self) -> bool {
        self.providers().any(ProviderState::has_usage)
    }

    /// Compact one-line summary, e.g. `🟢 42% | 🟡 75%`.
    ///
    /// Shows `⏳` while loading and `❌` otherwise when nothing has usage.
    pub fn status_line(&self, mode: DisplayMode) -> String {
        let parts: Vec<String> = self
            .providers()
            .filter_map(|state| state.usage.as_ref())
            .map(|usage| {
                let percent = usage.display_percent(mode);
                format!("{} {}%", StatusLevel::from_percent(percent).emoji(), truncate(percent))
            })
            .collect();

        if !parts.is_empty() {
            parts.join(" | ")
        } else if self.is_loading {
            "⏳".to_string()
        } else {
            "❌".to_string()
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(percent: f64) -> i64 {
    percent.trunc() as i64
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UsageLimit;

    fn with_usage(values: &[(ProviderKind, f64)]) -> AggregateState {
        let mut state = AggregateState::new(ProviderKind::all());
        for (kind, value) in values {
            if let Some(entry) = state.provider_states.get_mut(kind) {
                entry.usage = Some(ProviderUsageResponse::new(vec![UsageLimit::new(
                    "Weekly", *value,
                )]));
            }
        }
        state
    }

    #[test]
    fn test_new_state_has_entry_per_provider() {
        let state = AggregateState::new(ProviderKind::all());
        assert_eq!(state.provider_states.len(), 2);
        assert!(!state.is_loading);
        assert!(state.last_updated.is_none());
        assert_eq!(state.cycle, 0);
        assert!(state.provider(ProviderKind::Codex).is_some());
    }

    #[test]
    fn test_status_line_placeholders() {
        let mut state = AggregateState::new(ProviderKind::all());
        assert_eq!(state.status_line(DisplayMode::Weekly), "❌");
        state.is_loading = true;
        assert_eq!(state.status_line(DisplayMode::Weekly), "⏳");
    }

    #[test]
    fn test_status_line_joins_providers() {
        let state = with_usage(&[(ProviderKind::Claude, 42.7), (ProviderKind::Codex, 75.0)]);
        assert_eq!(state.status_line(DisplayMode::Weekly), "🟢 42% | 🟡 75%");
    }

    #[test]
    fn test_overall_level_and_max() {
        let state = with_usage(&[(ProviderKind::Claude, 10.0), (ProviderKind::Codex, 95.0)]);
        assert_eq!(state.overall_level(), StatusLevel::Critical);
        assert!((state.max_utilization() - 95.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_first_error() {
        let mut state = AggregateState::new(ProviderKind::all());
        assert!(state.first_error().is_none());
        if let Some(codex) = state.provider_states.get_mut(&ProviderKind::Codex) {
            codex.error = Some("Not logged in to Codex.".to_string());
        }
        assert_eq!(state.first_error(), Some("Not logged in to Codex."));
    }

    #[test]
    fn test_provider_state_staleness() {
        let mut state = ProviderState::new(ProviderKind::Claude);
        assert!(state.is_stale(chrono::Duration::seconds(60)));
        state.last_updated = Some(Utc::now());
        assert!(!state.is_stale(chrono::Duration::seconds(60)));
        assert!(state.max_utilization().abs() < f64::EPSILON);
    }
}
