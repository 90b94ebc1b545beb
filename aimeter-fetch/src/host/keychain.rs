//! Read access to the system keychain.
//!
//! This module provides access to the system's secure credential storage:
//! - macOS: Keychain Services
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KDE Wallet)
//!
//! Credentials are owned by the provider CLIs; `AIMeter` never writes them.
//! Lookups are not cached so that logging in or out is picked up by the
//! next refresh cycle.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use keyring::Entry;
use tracing::{debug, trace, warn};

use crate::error::KeychainError;

// ============================================================================
// Keychain API Trait
// ============================================================================

/// API for reading secrets from credential storage.
pub trait KeychainApi: Send + Sync {
    /// Get a secret from the keychain.
    ///
    /// # Returns
    /// * `Ok(Some(secret))` - Secret found and non-empty
    /// * `Ok(None)` - No entry
    /// * `Err(e)` - Error accessing the keychain
    fn get(&self, service: &str, account: &str) -> Result<Option<String>, KeychainError>;

    /// Returns the first non-empty secret among `services`.
    ///
    /// Access errors are logged and treated as "not found".
    fn find_first(&self, services: &[&str], account: &str) -> Option<String> {
        services.iter().find_map(|service| match self.get(service, account) {
            Ok(found) => found,
            Err(e) => {
                warn!(service = %service, error = %e, "Keychain lookup failed");
                None
            }
        })
    }
}

// ============================================================================
// System Keychain Implementation
// ============================================================================

/// Default implementation using the system keychain.
///
/// This uses the `keyring` crate which provides cross-platform access to:
/// - macOS Keychain Services
/// - Windows Credential Manager
/// - Linux Secret Service API
#[derive(Debug, Clone, Default)]
pub struct SystemKeychain;

impl SystemKeychain {
    /// Creates a new system keychain instance.
    pub fn new() -> Self {
        Self
    }
}

impl KeychainApi for SystemKeychain {
    fn get(&self, service: &str, account: &str) -> Result<Option<String>, KeychainError> {
        trace!(service = %service, account = %account, "Reading keychain entry");

        let entry =
            Entry::new(service, account).map_err(|e| KeychainError::Platform(e.to_string()))?;

        match entry.get_password() {
            Ok(secret) if !secret.trim().is_empty() => {
                debug!(service = %service, "Credential found");
                Ok(Some(secret.trim().to_string()))
            }
            Ok(_) | Err(keyring::Error::NoEntry) => {
                debug!(service = %service, "Credential not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// In-Memory Keychain
// ============================================================================

/// Keychain backed by a map, for tests and keychain-less setups.
#[derive(Debug, Default)]
pub struct MemoryKeychain {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl MemoryKeychain {
    /// Creates an empty keychain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a secret.
    pub fn insert(&self, service: &str, account: &str, secret: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((service.to_string(), account.to_string()), secret.to_string());
    }

    /// Removes a secret.
    pub fn remove(&self, service: &str, account: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(service.to_string(), account.to_string()));
    }
}

impl KeychainApi for MemoryKeychain {
    fn get(&self, service: &str, account: &str) -> Result<Option<String>, KeychainError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(service.to_string(), account.to_string()))
            .filter(|secret| !secret.is_empty())
            .cloned())
    }
}

/// Returns the account name provider CLIs store their secrets under.
pub fn current_account() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default()
}

// ============================================================================
// Common Credential Keys
// ============================================================================

/// Keychain service names used by the provider CLIs.
pub mod services {
    /// Claude Code OAuth credentials.
    pub const CLAUDE: &str = "Claude Code-credentials";
    /// Older Claude Code entry name.
    pub const CLAUDE_LEGACY: &str = "Claude Code";
    /// Codex CLI keyring storage.
    pub const CODEX: &str = "Codex Auth";
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_keychain() {
        let keychain = MemoryKeychain::new();
        assert_eq!(keychain.get("svc", "me").unwrap(), None);

        keychain.insert("svc", "me", "secret");
        assert_eq!(keychain.get("svc", "me").unwrap(), Some("secret".to_string()));
        assert_eq!(keychain.get("svc", "other").unwrap(), None);

        keychain.remove("svc", "me");
        assert_eq!(keychain.get("svc", "me").unwrap(), None);
    }

    #[test]
    fn test_empty_secret_is_missing() {
        let keychain = MemoryKeychain::new();
        keychain.insert("svc", "me", "");
        assert_eq!(keychain.get("svc", "me").unwrap(), None);
    }

    #[test]
    fn test_find_first_prefers_earlier_service() {
        let keychain = MemoryKeychain::new();
        keychain.insert(services::CLAUDE_LEGACY, "me", "legacy");
        assert_eq!(
            keychain.find_first(&[services::CLAUDE, services::CLAUDE_LEGACY], "me"),
            Some("legacy".to_string())
        );

        keychain.insert(services::CLAUDE, "me", "primary");
        assert_eq!(
            keychain.find_first(&[services::CLAUDE, services::CLAUDE_LEGACY], "me"),
            Some("primary".to_string())
        );
    }

    // Real keychain access needs platform services and is not unit tested.
}
