//! Codex credential lookup.
//!
//! The Codex CLI keeps its tokens either in the keychain (keyring storage
//! mode, service "Codex Auth") or in `~/.codex/auth.json`:
//!
//! ```json
//! {
//!   "tokens": {
//!     "id_token": "eyJ...",
//!     "access_token": "eyJ...",
//!     "refresh_token": "..."
//!   }
//! }
//! ```
//!
//! Older files carry a top-level `access_token` or `token` instead.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use aimeter_fetch::host::credential_file;
use aimeter_fetch::host::keychain::{self, services};
use aimeter_fetch::{KeychainApi, SystemKeychain};
use serde_json::Value;
use tracing::{debug, warn};

/// Key paths tried, in order, inside an auth document.
const TOKEN_PATHS: &[&[&str]] = &[&["tokens", "access_token"], &["access_token"], &["token"]];

/// Extracts the access token from an auth document.
pub fn token_from_auth_json(value: &Value) -> Option<String> {
    TOKEN_PATHS
        .iter()
        .find_map(|path| credential_file::string_at(value, path))
}

/// Interprets a keychain secret: an auth document or a bare token.
pub fn token_from_secret(secret: &str) -> Option<String> {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('{') {
        let value: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Keychain secret looks like JSON but does not parse");
                return None;
            }
        };
        return token_from_auth_json(&value);
    }
    Some(trimmed.to_string())
}

// ============================================================================
// Credential Source
// ============================================================================

/// Where the Codex provider looks for an access token.
#[derive(Clone)]
pub struct CodexCredentials {
    keychain: Arc<dyn KeychainApi>,
    account: String,
    file: Option<PathBuf>,
}

impl CodexCredentials {
    /// Uses the system keychain and `~/.codex/auth.json`.
    pub fn system() -> Self {
        Self::new(
            Arc::new(SystemKeychain::new()),
            keychain::current_account(),
            auth_file_path(),
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
    pub fn access_token(&self) -> Option<String> {
        self.keychain_token().or_else(|| self.file_token())
    }

    fn keychain_token(&self) -> Option<String> {
        self.keychain
            .find_first(&[services::CODEX], &self.account)
            .and_then(|secret| token_from_secret(&secret))
    }

    fn file_token(&self) -> Option<String> {
        let path = self.file.as_ref()?;
        match credential_file::read_json(path) {
            Ok(Some(value)) => token_from_auth_json(&value),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read Codex auth file");
                None
            }
        }
    }
}

impl fmt::Debug for CodexCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodexCredentials")
            .field("account", &self.account)
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

/// Returns the path to the Codex auth file.
///
/// Honors `CODEX_HOME` like the Codex CLI does.
pub fn auth_file_path() -> Option<PathBuf> {
    match std::env::var_os("CODEX_HOME") {
        Some(home) if !home.is_empty() => Some(PathBuf::from(home).join("auth.json")),
        _ => credential_file::home_path(".codex/auth.json").ok(),
    }
}

// ============================================================================
// Tests
// ============================================================================
