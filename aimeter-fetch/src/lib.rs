// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `AIMeter` Fetch
//!
//! Fetch infrastructure shared by the `AIMeter` providers.
//!
//! ## Host APIs
//!
//! The [`host`] module provides abstractions for system interactions:
//!
//! - [`host::keychain`] - Secure credential storage (system keychain)
//! - [`host::credential_file`] - Credential files written by provider CLIs
//! - [`host::http`] - HTTP client with transient-failure classification
//!
//! ## Retry
//!
//! [`retry::fetch_with_retry`] wraps a single provider fetch with bounded
//! fixed-delay retry. Only transient network failures are retried.
//!
//! ## Example
//!
//! ```ignore
//! use aimeter_fetch::{RetryPolicy, fetch_with_retry};
//!
//! let usage = fetch_with_retry(&provider, &RetryPolicy::default()).await?;
//! ```

pub mod error;
pub mod host;
pub mod retry;

// Errors
pub use error::{CredentialFileError, HttpError, KeychainError};

// Host APIs
pub use host::{
    HttpClient, HttpResponse, KeychainApi, MemoryKeychain, SystemKeychain, bearer_headers,
    classify_reqwest_error,
};

// Retry
pub use retry::{RetryPolicy, fetch_with_retry, retry_transient};
