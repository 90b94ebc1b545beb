//! Claude (Anthropic) provider implementation.
//!
//! Reads the OAuth token Claude Code keeps in the keychain (or in
//! `~/.claude/.credentials.json`) and calls the OAuth usage endpoint.
//!
//! Reported limits, in order: "Session (5h)", "Weekly (7d)", "Sonnet".

mod api;
mod credentials;

use aimeter_core::{ProviderError, ProviderKind, ProviderUsageResponse, UsageProvider};
use aimeter_fetch::{HttpClient, bearer_headers};
use reqwest::header::HeaderValue;
use tracing::{debug, instrument};

// Re-exports
pub use api::{
    API_DOMAIN, OAUTH_BETA, USAGE_URL, UsageApiResponse, UsageWindow, classify_status,
    parse_reset_time, parse_response,
};
pub use credentials::{ClaudeCredentials, credentials_file_path, parse_credentials};

// ============================================================================
// Provider
// ============================================================================

/// Fetches Claude usage through the OAuth usage endpoint.
#[derive(Debug, Clone)]
pub struct ClaudeProvider {
    http: HttpClient,
    credentials: ClaudeCredentials,
}

impl ClaudeProvider {
    /// Creates a provider using the system keychain and default paths.
    pub fn new() -> Self {
        Self::with_credentials(ClaudeCredentials::system())
    }

    /// Creates a provider with a specific credential source.
    pub fn with_credentials(credentials: ClaudeCredentials) -> Self {
        Self {
            http: HttpClient::new().with_allowed_domains(vec![API_DOMAIN.to_string()]),
            credentials,
        }
    }

    async fn access_token(&self) -> Option<String> {
        let credentials = self.credentials.clone();
        tokio::task::spawn_blocking(move || credentials.access_token())
            .await
            .ok()
            .flatten()
    }
}

impl Default for ClaudeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageProvider for ClaudeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn is_available(&self) -> bool {
        self.credentials.access_token().is_some()
    }

    #[instrument(skip(self), fields(provider = "claude"))]
    async fn fetch_usage(&self) -> Result<ProviderUsageResponse, ProviderError> {
        let not_logged_in = || ProviderError::not_logged_in(self.display_name());

        let token = self.access_token().await.ok_or_else(not_logged_in)?;
        let mut headers = bearer_headers(&token).map_err(|_| not_logged_in())?;
        headers.insert("anthropic-beta", HeaderValue::from_static(OAUTH_BETA));
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        debug!("Fetching Claude usage");
        let response = self.http.get_with_headers(USAGE_URL, headers).await?;
        parse_response(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimeter_fetch::MemoryKeychain;
    use std::sync::Arc;

    fn empty_provider() -> ClaudeProvider {
        ClaudeProvider::with_credentials(ClaudeCredentials::new(
            Arc::new(MemoryKeychain::new()),
            "me",
            None,
        ))
    }

    #[test]
    fn test_kind() {
        let provider = empty_provider();
        assert_eq!(provider.kind(), ProviderKind::Claude);
        assert_eq!(provider.display_name(), "Claude");
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let provider = empty_provider();
        assert!(!provider.is_available());
        assert_eq!(
            provider.fetch_usage().await,
            Err(ProviderError::not_logged_in("Claude"))
        );
    }
}
