//! Codex usage API (ChatGPT backend).
//!
//! # API Endpoint
//!
//! ```text
//! GET https://chatgpt.com/backend-api/wham/usage
//! Authorization: Bearer <access_token>
//! ```
//!
//! # Response Format
//!
//! ```json
//! {
//!   "plan_type": "plus",
//!   "rate_limit": {
//!     "allowed": true,
//!     "limit_reached": false,
//!     "primary_window": {"used_percent": 12.0, "limit_window_seconds": 18000,
//!                        "reset_after_seconds": 3600, "reset_at": 1735000000},
//!     "secondary_window": {"used_percent": 40.0, "limit_window_seconds": 604800,
//!                          "reset_after_seconds": 86400, "reset_at": 1735600000}
//!   },
//!   "code_review_rate_limit": {"primary_window": {...}},
//!   "credits": {"has_credits": false, "unlimited": false, "balance": "0"}
//! }
//! ```

use aimeter_core::{ProviderError, ProviderUsageResponse, UsageLimit};
use aimeter_fetch::HttpResponse;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

// ============================================================================
// Constants
// ============================================================================

/// Usage endpoint.
pub const USAGE_URL: &str = "https://chatgpt.com/backend-api/wham/usage";

/// Host the provider is allowed to talk to.
pub const API_DOMAIN: &str = "chatgpt.com";

const PROVIDER_NAME: &str = "Codex";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from the usage API.
#[derive(Debug, Clone, Deserialize)]
pub struct CodexUsageResponse {
    /// Subscription plan (e.g. "plus", "pro").
    #[serde(default)]
    pub plan_type: Option<String>,
    /// Main rate limit.
    pub rate_limit: CodexRateLimit,
    /// Separate limit for code review.
    #[serde(default)]
    pub code_review_rate_limit: Option<CodexRateLimit>,
    /// Credit balance.
    #[serde(default)]
    pub credits: Option<CodexCredits>,
}

/// A rate limit with up to two windows.
#[derive(Debug, Clone, Deserialize)]
pub struct CodexRateLimit {
    /// Whether requests are currently allowed.
    #[serde(default)]
    pub allowed: Option<bool>,
    /// Whether the limit has been hit.
    #[serde(default)]
    pub limit_reached: Option<bool>,
    /// Short window (5 hours).
    #[serde(default)]
    pub primary_window: Option<CodexWindow>,
    /// Long window (weekly).
    #[serde(default)]
    pub secondary_window: Option<CodexWindow>,
}

/// A single rate-limit window.
#[derive(Debug, Clone, Deserialize)]
pub struct CodexWindow {
    /// Percentage used.
    pub used_percent: f64,
    /// Length of the window.
    pub limit_window_seconds: i64,
    /// Seconds until reset.
    pub reset_after_seconds: i64,
    /// Reset time as unix seconds.
    pub reset_at: i64,
}

impl CodexWindow {
    /// Returns the reset time.
    pub fn reset_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.reset_at, 0).single()
    }

    fn into_limit(self, name: &str) -> UsageLimit {
        let reset_time = self.reset_time();
        UsageLimit::new(name, self.used_percent).with_reset_time(reset_time)
    }
}

/// Credit information.
#[derive(Debug, Clone, Deserialize)]
pub struct CodexCredits {
    /// Whether the account has credits.
    #[serde(default)]
    pub has_credits: Option<bool>,
    /// Whether usage is unlimited.
    #[serde(default)]
    pub unlimited: Option<bool>,
    /// Balance as reported.
    #[serde(default)]
    pub balance: Option<String>,
}

impl CodexUsageResponse {
    /// Converts the windows into ordered limits.
    pub fn into_usage(self) -> ProviderUsageResponse {
        let review = self.code_review_rate_limit.and_then(|r| r.primary_window);
        let limits = [
            (self.rate_limit.primary_window, "5 Hour"),
            (self.rate_limit.secondary_window, "Weekly"),
            (review, "Code Review"),
        ]
        .into_iter()
        .filter_map(|(window, name)| window.map(|w| w.into_limit(name)))
        .collect();

        ProviderUsageResponse::new(limits).sanitized()
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Interprets a completed HTTP exchange.
pub fn parse_response(response: &HttpResponse) -> Result<ProviderUsageResponse, ProviderError> {
    if !response.is_ok() {
        return Err(classify_status(response.status));
    }

    let parsed: CodexUsageResponse = serde_json::from_slice(&response.body)
        .map_err(|e| ProviderError::Decoding(e.to_string()))?;

    debug!(plan = parsed.plan_type.as_deref().unwrap_or("unknown"), "Parsed Codex usage");
    Ok(parsed.into_usage())
}

/// Maps a non-200 status to an error.
pub fn classify_status(status: u16) -> ProviderError {
    match status {
        401 | 403 => ProviderError::not_logged_in(PROVIDER_NAME),
        _ => {
            warn!(status, "Codex API request failed");
            ProviderError::Api { status }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.as_bytes().to_vec(),
        }
    }

    const FULL: &str = r#"{
        "plan_type": "plus",
        "rate_limit": {
            "allowed": true,
            "limit_reached": false,
            "primary_window": {"used_percent": 12.0, "limit_window_seconds": 18000, "reset_after_seconds": 3600, "reset_at": 1735000000},
            "secondary_window": {"used_percent": 40.0, "limit_window_seconds": 604800, "reset_after_seconds": 86400, "reset_at": 1735600000}
        },
        "code_review_rate_limit": {
            "primary_window": {"used_percent": 5.0, "limit_window_seconds": 604800, "reset_after_seconds": 86400, "reset_at": 1735600000}
        },
        "credits": {"has_credits": false, "unlimited": false, "balance": "0"}
    }"#;

    #[test]
    fn test_parse_full_response() {
        let usage = parse_response(&ok(FULL)).unwrap();

        let names: Vec<&str> = usage.limits.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["5 Hour", "Weekly", "Code Review"]);
        assert!((usage.max_utilization() - 40.0).abs() < f64::EPSILON);
        assert_eq!(
            usage.limits[0].reset_time,
            Utc.timestamp_opt(1_735_000_000, 0).single()
        );
    }

    #[test]
    fn test_missing_windows() {
        let usage = parse_response(&ok(r#"{"rate_limit": {}}"#)).unwrap();
        assert!(usage.is_empty());
    }

    #[test]
    fn test_missing_rate_limit_is_decoding_error() {
        assert!(matches!(
            parse_response(&ok(r#"{"plan_type": "free"}"#)),
            Err(ProviderError::Decoding(_))
        ));
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(401), ProviderError::not_logged_in("Codex"));
        assert_eq!(classify_status(403), ProviderError::not_logged_in("Codex"));
        assert_eq!(classify_status(502), ProviderError::Api { status: 502 });
    }

    #[test]
    fn test_error_status_ignores_body() {
        let response = HttpResponse {
            status: 500,
            body: FULL.as_bytes().to_vec(),
        };
        assert_eq!(parse_response(&response), Err(ProviderError::Api { status: 500 }));
    }
}
