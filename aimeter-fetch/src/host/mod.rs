//! Host APIs used by providers.
//!
//! - [`keychain`] - Secure credential storage (system keychain)
//! - [`credential_file`] - JSON credential files under the home directory
//! - [`http`] - HTTP client with tracing, domain allowlist and failure
//!   classification

pub mod credential_file;
pub mod http;
pub mod keychain;

// Re-export key types
pub use http::{HttpClient, HttpResponse, bearer_headers, classify_reqwest_error};
pub use keychain::{KeychainApi, MemoryKeychain, SystemKeychain};
