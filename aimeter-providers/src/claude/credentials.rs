//! Claude OAuth credential lookup.
//!
//! Claude Code stores its OAuth credentials in two places:
//!
//! 1. **Keychain**: service="Claude Code-credentials" (older installs use
//!    "Claude Code")
//! 2. **File**: `~/.claude/.credentials.json`
//!
//! # Credentials Format
//!
//! ```json
//! {
//!   "claudeAiOauth": {
//!     "accessToken": "...",
//!     "refreshToken": "...",
//!     "expiresAt": 1735000000000,
//!     "scopes": ["user:profile", "..."]
//!   }
//! }
//! ```
//!
//! Only the access token is used. Refreshing it is left to Claude Code.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use aimeter_fetch::host::credential_file;
use aimeter_fetch::host::keychain::{self, services};
use aimeter_fetch::{KeychainApi, SystemKeychain};
use serde::Deserialize;
use tracing::{debug, warn};

// ============================================================================
// Credentials File Structures
// ============================================================================

/// Root structure of the credentials JSON.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsFile {
    claude_ai_oauth: Option<OAuthCredentialsData>,
}

/// OAuth credentials data from file/keychain.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OAuthCredentialsData {
    access_token: Option<String>,
}

/// Extracts the access token from a credentials JSON document.
pub fn parse_credentials(json: &str) -> Option<String> {
    let file: CredentialsFile = match serde_json::from_str(json.trim()) {
        Ok(file) => file,
        Err(e) => {
            debug!(error = %e, "Credentials are not valid JSON");
            return None;
        }
    };

    file.claude_ai_oauth
        .and_then(|oauth| oauth.access_token)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

// ============================================================================
// Credential Source
// ============================================================================

/// Where the Claude provider looks for an access token.
#[derive(Clone)]
pub struct ClaudeCredentials {
    keychain: Arc<dyn KeychainApi>,
    account: String,
    file: Option<PathBuf>,
}

impl ClaudeCredentials {
    /// Uses the system keychain and `~/.claude/.credentials.json`.
    pub fn system() -> Self {
        Self::new(
            Arc::new(SystemKeychain::new()),
            keychain::current_account(),
            credentials_file_path(),
        )
    }

    /// Creates a credential source from explicit parts.
    pub fn new(keychain: Arc<dyn KeychainApi>, account: impl Into<String>, file: Option<PathBuf>) -> Self {
        Self {
            keychain,
            account: account.into(),
            file,
        }
    }

    /// Returns the current access token, if one can be found.
    ///
    /// Touches the keychain and the filesystem on every call.
    pub fn access_token(&self) -> Option<String> {
        self.keychain_token().or_else(|| self.file_token())
    }

    fn keychain_token(&self) -> Option<String> {
        let service_list = [services::CLAUDE, services::CLAUDE_LEGACY];
        [self.account.as_str(), ""]
            .iter()
            .filter_map(|account| self.keychain.find_first(&service_list, account))
            .find_map(|secret| parse_credentials(&secret))
    }

    fn file_token(&self) -> Option<String> {
        let path = self.file.as_ref()?;
        match credential_file::read_json(path) {
            Ok(Some(value)) => credential_file::string_at(&value, &["claudeAiOauth", "accessToken"]),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read Claude credentials file");
                None
            }
        }
    }
}

impl fmt::Debug for ClaudeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeCredentials")
            .field("account", &self.account)
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

/// Returns the path to the credentials file.
pub fn credentials_file_path() -> Option<PathBuf> {
    credential_file::home_path(".claude/.credentials.json").ok()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use aimeter_fetch::MemoryKeychain;

    const CREDS: &str = r#"{"claudeAiOauth": {"accessToken": "kc-token", "scopes": ["user:profile"]}}"#;

    #[test]
    fn test_parse_credentials_full() {
        let json = r#"{
            "claudeAiOauth": {
                "accessToken": "test-token",
                "refreshToken": "refresh-token",
                "expiresAt": 1735000000000,
                "scopes": ["user:profile", "conversations:read"]
            }
        }"#;
        assert_eq!(parse_credentials(json), Some("test-token".to_string()));
    }

    #[test]
    fn test_parse_credentials_rejects_other_shapes() {
        assert_eq!(parse_credentials("raw-token"), None);
        assert_eq!(parse_credentials("{}"), None);
        assert_eq!(parse_credentials(r#"{"claudeAiOauth": {"accessToken": ""}}"#), None);
        assert_eq!(parse_credentials(r#"{"claudeAiOauth": {}}"#), None);
    }

    #[test]
    fn test_keychain_primary_service() {
        let keychain = Arc::new(MemoryKeychain::new());
        keychain.insert(services::CLAUDE, "me", CREDS);

        let creds = ClaudeCredentials::new(keychain, "me", None);
        assert_eq!(creds.access_token(), Some("kc-token".to_string()));
    }

    #[test]
    fn test_keychain_legacy_service_and_empty_account() {
        let keychain = Arc::new(MemoryKeychain::new());
        keychain.insert(services::CLAUDE_LEGACY, "", CREDS);

        let creds = ClaudeCredentials::new(keychain, "me", None);
        assert_eq!(creds.access_token(), Some("kc-token".to_string()));
    }

    #[test]
    fn test_file_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".credentials.json");
        std::fs::write(&path, r#"{"claudeAiOauth": {"accessToken": "file-token"}}"#).unwrap();

        let creds = ClaudeCredentials::new(Arc::new(MemoryKeychain::new()), "me", Some(path));
        assert_eq!(creds.access_token(), Some("file-token".to_string()));
    }

    #[test]
    fn test_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let creds = ClaudeCredentials::new(
            Arc::new(MemoryKeychain::new()),
            "me",
            Some(dir.path().join("missing.json")),
        );
        assert_eq!(creds.access_token(), None);
    }

    #[test]
    fn test_credential_vanishes() {
        let keychain = Arc::new(MemoryKeychain::new());
        keychain.insert(services::CLAUDE, "me", CREDS);
        let creds = ClaudeCredentials::new(keychain.clone(), "me", None);
        assert!(creds.access_token().is_some());

        keychain.remove(services::CLAUDE, "me");
        assert!(creds.access_token().is_none());
    }
}
