//! Codex (OpenAI) provider implementation.
//!
//! Reads the ChatGPT access token the Codex CLI stores (keychain or
//! `~/.codex/auth.json`) and calls the ChatGPT backend usage endpoint.
//!
//! Reported limits, in order: "5 Hour", "Weekly", "Code Review".

mod api;
mod credentials;

use aimeter_core::{ProviderError, ProviderKind, ProviderUsageResponse, UsageProvider};
use aimeter_fetch::{HttpClient, bearer_headers};
use tracing::{debug, instrument};

// Re-exports
pub use api::{
    API_DOMAIN, CodexCredits, CodexRateLimit, CodexUsageResponse, CodexWindow, USAGE_URL,
    classify_status, parse_response,
};
pub use credentials::{CodexCredentials, auth_file_path, token_from_auth_json, token_from_secret};

/// Fetches Codex usage from the ChatGPT backend.
#[derive(Debug, Clone)]
pub struct CodexProvider {
    http: HttpClient,
    credentials: CodexCredentials,
}

impl CodexProvider {
    /// Creates a provider using the system keychain and default paths.
    pub fn new() -> Self {
        Self::with_credentials(CodexCredentials::system())
    }

    /// Creates a provider with a specific credential source.
    pub fn with_credentials(credentials: CodexCredentials) -> Self {
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

impl Default for CodexProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageProvider for CodexProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Codex
    }

    fn is_available(&self) -> bool {
        self.credentials.access_token().is_some()
    }

    #[instrument(skip(self), fields(provider = "codex"))]
    async fn fetch_usage(&self) -> Result<ProviderUsageResponse, ProviderError> {
        let not_logged_in = || ProviderError::not_logged_in(self.display_name());

        let token = self.access_token().await.ok_or_else(not_logged_in)?;
        let headers = bearer_headers(&token).map_err(|_| not_logged_in())?;

        debug!("Fetching Codex usage");
        let response = self.http.get_with_headers(USAGE_URL, headers).await?;
        parse_response(&response)
    }
}
