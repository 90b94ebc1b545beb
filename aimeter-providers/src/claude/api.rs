//! Claude usage API.
//!
//! # API Endpoint
//!
//! ```text
//! GET https://api.anthropic.com/api/oauth/usage
//! Authorization: Bearer <access_token>
//! anthropic-beta: oauth-2025-04-20
//! ```
//!
//! # Response Format
//!
//! ```json
//! {
//!   "five_hour": {"utilization": 25.0, "resets_at": "2025-01-01T12:00:00.123Z"},
//!   "seven_day": {"utilization": 45.0, "resets_at": "2025-01-05T00:00:00Z"},
//!   "sonnet_only": {"utilization": 30.0, "resets_at": null}
//! }
//! ```

use aimeter_core::{ProviderError, ProviderUsageResponse, UsageLimit};
use aimeter_fetch::HttpResponse;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

// ============================================================================
// Constants
// ============================================================================

/// Usage endpoint.
pub const USAGE_URL: &str = "https://api.anthropic.com/api/oauth/usage";

/// Host the provider is allowed to talk to.
pub const API_DOMAIN: &str = "api.anthropic.com";

/// Value of the `anthropic-beta` header the OAuth endpoints require.
pub const OAUTH_BETA: &str = "oauth-2025-04-20";

const PROVIDER_NAME: &str = "Claude";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from the usage API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageApiResponse {
    /// 5-hour session window.
    #[serde(default, alias = "fiveHour")]
    pub five_hour: Option<UsageWindow>,
    /// 7-day window (all models).
    #[serde(default, alias = "sevenDay")]
    pub seven_day: Option<UsageWindow>,
    /// 7-day Sonnet window.
    #[serde(default, alias = "seven_day_sonnet", alias = "sevenDaySonnet")]
    pub sonnet_only: Option<UsageWindow>,
}

/// Individual usage window from API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageWindow {
    /// Utilization percentage (0-100).
    #[serde(default)]
    pub utilization: Option<f64>,
    /// When this window resets (RFC 3339).
    #[serde(default, alias = "resetsAt")]
    pub resets_at: Option<String>,
}

impl UsageWindow {
    fn into_limit(self, name: &str) -> UsageLimit {
        UsageLimit::new(name, self.utilization.unwrap_or(0.0))
            .with_reset_time(self.resets_at.as_deref().and_then(parse_reset_time))
    }
}

impl UsageApiResponse {
    /// Converts the windows into ordered limits.
    pub fn into_usage(self) -> ProviderUsageResponse {
        let limits = [
            (self.five_hour, "Session (5h)"),
            (self.seven_day, "Weekly (7d)"),
            (self.sonnet_only, "Sonnet"),
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

/// Parses an RFC 3339 timestamp with or without fractional seconds.
pub fn parse_reset_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Interprets a completed HTTP exchange.
pub fn parse_response(response: &HttpResponse) -> Result<ProviderUsageResponse, ProviderError> {
    if !response.is_ok() {
        return Err(classify_status(response.status, &response.body));
    }

    let value: Value = serde_json::from_slice(&response.body)
        .map_err(|e| ProviderError::Decoding(e.to_string()))?;

    if !value.is_object() {
        warn!("Usage response is not a JSON object");
        return Err(ProviderError::InvalidResponse);
    }

    let usage: UsageApiResponse =
        serde_json::from_value(value).map_err(|e| ProviderError::Decoding(e.to_string()))?;

    let usage = usage.into_usage();
    debug!(limits = usage.limits.len(), "Parsed Claude usage");
    Ok(usage)
}

/// Maps a non-200 status to an error.
///
/// A body whose `error.message` mentions a scope wins over the status code.
pub fn classify_status(status: u16, body: &[u8]) -> ProviderError {
    let message = serde_json::from_slice::<Value>(body).ok().and_then(|json| {
        json.get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    if message.as_deref().is_some_and(|m| m.contains("scope")) {
        return ProviderError::ScopeError {
            provider: PROVIDER_NAME.to_string(),
        };
    }

    if status == 401 {
        return ProviderError::not_logged_in(PROVIDER_NAME);
    }

    warn!(status, message = message.as_deref().unwrap_or(""), "Claude API request failed");
    ProviderError::Api { status }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_parse_full_response() {
        let usage = parse_response(&ok(r#"{
            "five_hour": {"utilization": 25.0, "resets_at": "2025-01-01T12:00:00.123456+00:00"},
            "seven_day": {"utilization": 45.5, "resets_at": "2025-01-05T00:00:00Z"},
            "sonnet_only": {"utilization": 30.0, "resets_at": null},
            "extra_usage": {"is_enabled": false}
        }"#))
        .unwrap();

        let names: Vec<&str> = usage.limits.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Session (5h)", "Weekly (7d)", "Sonnet"]);
        assert!((usage.max_utilization() - 45.5).abs() < f64::EPSILON);
        assert_eq!(
            usage.limits[1].reset_time,
            Some(Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap())
        );
        assert!(usage.limits[0].reset_time.is_some());
        assert!(usage.limits[2].reset_time.is_none());
    }

    #[test]
    fn test_scope_error_wins_over_status() {
        let body = br#"{"error": {"type": "permission_error", "message": "OAuth token does not meet scope requirement user:profile"}}"#;
        assert_eq!(
            classify_status(403, body),
            ProviderError::ScopeError {
                provider: "Claude".to_string()
            }
        );
        assert!(matches!(classify_status(401, body), ProviderError::ScopeError { .. }));
    }

    #[test]
    fn test_unauthorized_is_not_logged_in() {
        assert_eq!(
            classify_status(401, b"{}"),
            ProviderError::not_logged_in("Claude")
        );
    }

    #[test]
    fn test_other_status_is_api_error() {
        assert_eq!(classify_status(500, b"oops"), ProviderError::Api { status: 500 });
        assert_eq!(
            classify_status(429, br#"{"error": {"message": "rate limited"}}"#),
            ProviderError::Api { status: 429 }
        );
    }

    #[test]
    fn test_non_object_is_invalid_response() {
        assert_eq!(parse_response(&ok("[1, 2]")), Err(ProviderError::InvalidResponse));
    }

    #[test]
    fn test_unparsable_is_decoding_error() {
        assert!(matches!(
            parse_response(&ok("<html>")),
            Err(ProviderError::Decoding(_))
        ));
    }
}
