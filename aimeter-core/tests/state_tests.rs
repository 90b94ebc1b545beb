//! Integration tests for the public state and provider types.

use aimeter_core::{
    AggregateState, DisplayMode, ProviderError, ProviderKind, ProviderUsageResponse, StatusLevel,
    UsageLimit, UsageProvider,
};

struct Fixed {
    kind: ProviderKind,
    logged_in: bool,
}

impl UsageProvider for Fixed {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.logged_in
    }

    async fn fetch_usage(&self) -> Result<ProviderUsageResponse, ProviderError> {
        if self.logged_in {
            Ok(ProviderUsageResponse::new(vec![UsageLimit::new("Session (5h)", 10.0)]))
        } else {
            Err(ProviderError::not_logged_in(self.kind.display_name()))
        }
    }
}

fn names<P: UsageProvider>(providers: &[P]) -> Vec<&str> {
    providers.iter().map(UsageProvider::display_name).collect()
}

#[test]
fn test_provider_trait_defaults() {
    let providers = [
        Fixed { kind: ProviderKind::Claude, logged_in: true },
        Fixed { kind: ProviderKind::Codex, logged_in: false },
    ];

    assert_eq!(names(&providers), vec!["Claude", "Codex"]);
    assert!(providers[0].is_available());
    assert!(!providers[1].is_available());
}

#[test]
fn test_status_line_follows_display_mode() {
    let mut state = AggregateState::new(&[ProviderKind::Claude, ProviderKind::Codex]);
    state.provider_states.get_mut(&ProviderKind::Claude).unwrap().usage =
        Some(ProviderUsageResponse::new(vec![
            UsageLimit::new("Session (5h)", 12.0),
            UsageLimit::new("Weekly (7d)", 71.5),
        ]));
    state.provider_states.get_mut(&ProviderKind::Codex).unwrap().usage =
        Some(ProviderUsageResponse::new(vec![
            UsageLimit::new("Session (5h)", 93.0),
            UsageLimit::new("Weekly (7d)", 40.0),
        ]));

    assert_eq!(state.status_line(DisplayMode::Session), "🟢 12% | 🔴 93%");
    assert_eq!(state.status_line(DisplayMode::Weekly), "🟡 71% | 🟢 40%");
    assert_eq!(state.overall_level(), StatusLevel::Critical);
}

#[test]
fn test_failed_provider_keeps_previous_usage() {
    let mut state = AggregateState::new(&[ProviderKind::Codex]);
    let codex = state.provider_states.get_mut(&ProviderKind::Codex).unwrap();
    codex.usage = Some(ProviderUsageResponse::new(vec![UsageLimit::new("Weekly (7d)", 55.0)]));
    codex.error = Some(ProviderError::Api { status: 500 }.to_string());

    assert!(state.has_any_usage());
    assert_eq!(state.first_error(), Some("API error (code: 500)"));
    assert_eq!(state.status_line(DisplayMode::Weekly), "🟢 55%");
}
