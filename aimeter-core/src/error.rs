//! Provider error taxonomy for `AIMeter`.
//!
//! Every provider fetch fails with a [`ProviderError`]. The retry wrapper
//! only ever looks at [`ProviderError::is_transient`]; the presentation layer
//! only ever looks at the `Display` message.

use thiserror::Error;

/// Classification of a network-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkErrorKind {
    /// No network connectivity at all.
    NotConnected,
    /// Name resolution failed.
    DnsFailure,
    /// The host could not be reached or refused the connection.
    HostUnreachable,
    /// Connecting or waiting for a response timed out.
    Timeout,
    /// The TLS handshake failed.
    TlsHandshake,
    /// An established connection was dropped.
    ConnectionLost,
    /// Anything else (request building, redirects, body errors, ...).
    Other,
}

impl NetworkErrorKind {
    /// Returns true for conditions that typically clear up on their own.
    pub fn is_transient(self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// Errors a provider fetch can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// No usable credential was found.
    #[error("Not logged in to {provider}.")]
    NotLoggedIn {
        /// Display name of the provider.
        provider: String,
    },

    /// The credential is valid but lacks the scope the usage endpoint needs.
    #[error("{provider} token missing required scope.")]
    ScopeError {
        /// Display name of the provider.
        provider: String,
    },

    /// The request failed below HTTP.
    #[error("Network error: {detail}")]
    Network {
        /// What kind of network failure this was.
        kind: NetworkErrorKind,
        /// Human-readable detail.
        detail: String,
    },

    /// The transport envelope was not what we expected.
    #[error("Invalid response from API")]
    InvalidResponse,

    /// Non-200 status without a more specific classification.
    #[error("{}", api_error_message(.status))]
    Api {
        /// HTTP status code.
        status: u16,
    },

    /// The payload did not have the expected shape.
    #[error("Failed to parse response: {0}")]
    Decoding(String),
}

fn api_error_message(status: &u16) -> String {
    if *status == 401 {
        "Authentication expired.".to_string()
    } else {
        format!("API error (code: {status})")
    }
}

impl ProviderError {
    /// Shorthand for [`ProviderError::NotLoggedIn`].
    pub fn not_logged_in(provider: impl Into<String>) -> Self {
        Self::NotLoggedIn {
            provider: provider.into(),
        }
    }

    /// Shorthand for [`ProviderError::Network`].
    pub fn network(kind: NetworkErrorKind, detail: impl Into<String>) -> Self {
        Self::Network {
            kind,
            detail: detail.into(),
        }
    }

    /// Returns true if a retry might succeed.
    ///
    /// Only transient network conditions qualify. Authentication, scope,
    /// HTTP status and payload errors will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { kind, .. } => kind.is_transient(),
            _ => false,
        }
    }
}
