//! HTTP client with tracing, domain allowlist and failure classification.
//!
//! This module provides a wrapped HTTP client that adds:
//! - Request/response tracing
//! - Domain allowlist so a provider only talks to its own API host
//! - Mapping of transport failures onto [`NetworkErrorKind`]

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use aimeter_core::{NetworkErrorKind, ProviderError};
use reqwest::header::{self, HeaderMap, HeaderValue, InvalidHeaderValue};
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::HttpError;

/// Connect timeout for a single request.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Total timeout for a single request including the body.
const RESOURCE_TIMEOUT_SECS: u64 = 30;

/// User agent string for `AIMeter`.
pub const USER_AGENT: &str = concat!("AIMeter/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Response
// ============================================================================

/// Status and body of a completed request.
///
/// Providers classify the status themselves, so any HTTP status is a
/// successful transport outcome here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for a 200 status.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing and domain allowlist.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    allowed_domains: Option<Vec<String>>,
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    pub fn new() -> Self {
        Self::with_timeouts(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(RESOURCE_TIMEOUT_SECS),
        )
    }

    /// Creates a new HTTP client with custom timeouts.
    pub fn with_timeouts(connect: Duration, total: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(connect)
            .timeout(total)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to configure HTTP client, using defaults");
                Client::new()
            });

        Self {
            inner: client,
            allowed_domains: None,
        }
    }

    /// Restricts requests to the given domains (and their subdomains).
    #[must_use]
    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = Some(domains);
        self
    }

    /// Checks if a URL's domain is allowed.
    fn is_domain_allowed(&self, url: &str) -> Result<(), HttpError> {
        let Some(ref allowed) = self.allowed_domains else {
            return Ok(());
        };

        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;

        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl("No host in URL".to_string()))?;

        let allowed = allowed
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")));

        if allowed {
            Ok(())
        } else {
            Err(HttpError::DomainNotAllowed(host.to_string()))
        }
    }

    /// Performs a GET request with custom headers and reads the whole body.
    ///
    /// Transport failures are classified into [`ProviderError::Network`].
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<HttpResponse, ProviderError> {
        self.is_domain_allowed(url)?;
        debug!("GET request");

        let response = self
            .inner
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        debug!(status, bytes = body.len(), "Response received");

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds JSON request headers carrying a bearer token.
///
/// Fails if the token contains characters not allowed in a header value.
pub fn bearer_headers(token: &str) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}"))?,
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    Ok(headers)
}

impl From<HttpError> for ProviderError {
    fn from(err: HttpError) -> Self {
        ProviderError::network(NetworkErrorKind::Other, err.to_string())
    }
}

// ============================================================================
// Failure Classification
// ============================================================================

/// Maps a reqwest failure onto [`ProviderError::Network`].
pub fn classify_reqwest_error(err: &reqwest::Error) -> ProviderError {
    let kind = if err.is_timeout() {
        NetworkErrorKind::Timeout
    } else {
        match classify_error_chain(err) {
            Some(kind) => kind,
            None if err.is_connect() => NetworkErrorKind::HostUnreachable,
            None => NetworkErrorKind::Other,
        }
    };

    ProviderError::network(kind, describe_chain(err))
}

/// Walks an error's source chain looking for a recognizable cause.
pub fn classify_error_chain(err: &(dyn StdError + 'static)) -> Option<NetworkErrorKind> {
    let mut current = Some(err);
    while let Some(e) = current {
        let by_io = e
            .downcast_ref::<io::Error>()
            .and_then(|io_err| classify_io_kind(io_err.kind()));
        if let Some(kind) = by_io.or_else(|| classify_message(&e.to_string())) {
            return Some(kind);
        }
        current = e.source();
    }
    None
}

/// Maps an I/O error kind to a network condition.
pub fn classify_io_kind(kind: io::ErrorKind) -> Option<NetworkErrorKind> {
    match kind {
        io::ErrorKind::TimedOut => Some(NetworkErrorKind::Timeout),
        io::ErrorKind::NotConnected | io::ErrorKind::NetworkDown => {
            Some(NetworkErrorKind::NotConnected)
        }
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::HostUnreachable
        | io::ErrorKind::NetworkUnreachable
        | io::ErrorKind::AddrNotAvailable => Some(NetworkErrorKind::HostUnreachable),
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => Some(NetworkErrorKind::ConnectionLost),
        _ => None,
    }
}

/// Recognizes resolver and TLS failures by their message.
fn classify_message(message: &str) -> Option<NetworkErrorKind> {
    let lower = message.to_lowercase();
    if lower.contains("dns error")
        || lower.contains("failed to lookup address")
        || lower.contains("name or service not known")
        || lower.contains("nodename nor servname")
    {
        Some(NetworkErrorKind::DnsFailure)
    } else if lower.contains("certificate") || lower.contains("handshake") || lower.contains("tls")
    {
        Some(NetworkErrorKind::TlsHandshake)
    } else if lower.contains("connection closed") || lower.contains("connection reset") {
        Some(NetworkErrorKind::ConnectionLost)
    } else {
        None
    }
}

/// Joins the messages of an error chain (`outer: inner: root`).
fn describe_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        let text = e.to_string();
        if parts.last() != Some(&text) {
            parts.push(text);
        }
        current = e.source();
    }
    parts.join(": ")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Wrapped {
        message: &'static str,
        source: io::Error,
    }

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.source)
        }
    }

    #[test]
    fn test_domain_allowlist() {
        let client = HttpClient::new().with_allowed_domains(vec![
            "api.anthropic.com".to_string(),
            "chatgpt.com".to_string(),
        ]);

        assert!(client.is_domain_allowed("https://api.anthropic.com/api/oauth/usage").is_ok());
        assert!(client.is_domain_allowed("https://chatgpt.com/backend-api/wham/usage").is_ok());
        assert!(client.is_domain_allowed("https://www.chatgpt.com/").is_ok());
        assert!(client.is_domain_allowed("https://evil.com/steal").is_err());
        assert!(client.is_domain_allowed("not-a-valid-url").is_err());
    }

    #[test]
    fn test_no_domain_restrictions() {
        let client = HttpClient::new();
        assert!(client.is_domain_allowed("https://any.domain.com").is_ok());
    }

    #[test]
    fn test_domain_error_is_not_transient() {
        let err: ProviderError = HttpError::DomainNotAllowed("evil.com".to_string()).into();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_classify_io_kinds() {
        assert_eq!(
            classify_io_kind(io::ErrorKind::TimedOut),
            Some(NetworkErrorKind::Timeout)
        );
        assert_eq!(
            classify_io_kind(io::ErrorKind::ConnectionRefused),
            Some(NetworkErrorKind::HostUnreachable)
        );
        assert_eq!(
            classify_io_kind(io::ErrorKind::ConnectionReset),
            Some(NetworkErrorKind::ConnectionLost)
        );
        assert_eq!(
            classify_io_kind(io::ErrorKind::NetworkDown),
            Some(NetworkErrorKind::NotConnected)
        );
        assert_eq!(classify_io_kind(io::ErrorKind::PermissionDenied), None);
    }

    #[test]
    fn test_classify_chain_finds_io_source() {
        let err = Wrapped {
            message: "error sending request",
            source: io::Error::from(io::ErrorKind::ConnectionAborted),
        };
        assert_eq!(
            classify_error_chain(&err),
            Some(NetworkErrorKind::ConnectionLost)
        );
    }

    #[test]
    fn test_classify_chain_by_message() {
        let dns = io::Error::other("dns error: failed to lookup address information");
        assert_eq!(classify_error_chain(&dns), Some(NetworkErrorKind::DnsFailure));

        let tls = io::Error::other("invalid peer certificate: UnknownIssuer");
        assert_eq!(classify_error_chain(&tls), Some(NetworkErrorKind::TlsHandshake));

        let other = io::Error::other("builder error");
        assert_eq!(classify_error_chain(&other), None);
    }

    #[test]
    fn test_describe_chain() {
        let err = Wrapped {
            message: "error sending request",
            source: io::Error::other("connection refused"),
        };
        assert_eq!(describe_chain(&err), "error sending request: connection refused");
    }

    #[test]
    fn test_bearer_headers() {
        let headers = bearer_headers("tok").unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer tok");
        assert_eq!(headers[header::ACCEPT], "application/json");

        assert!(bearer_headers("bad\ntoken").is_err());
    }

    #[test]
    fn test_user_agent() {
        assert!(USER_AGENT.starts_with("AIMeter/"));
    }
}
