//! Trait definitions for `AIMeter`.
//!
//! This module defines the capability every provider implementation must
//! satisfy. The refresh engine dispatches only through this contract.

use std::future::Future;

use crate::error::ProviderError;
use crate::models::{ProviderKind, ProviderUsageResponse};

/// Trait for providers that can fetch usage data.
///
/// Implementors of this trait are responsible for:
/// - Locating a credential for the provider
/// - Fetching current usage information
/// - Normalizing the response into [`ProviderUsageResponse`]
pub trait UsageProvider: Send + Sync {
    /// Returns the kind of provider this implementation handles.
    fn kind(&self) -> ProviderKind;

    /// Returns the display name for this provider.
    fn display_name(&self) -> &str {
        self.kind().display_name()
    }

    /// Returns true if a credential is currently present.
    ///
    /// This may touch the keychain or the filesystem, so callers should not
    /// invoke it from latency-sensitive code.
    fn is_available(&self) -> bool;

    /// Fetches current usage from the provider.
    ///
    /// A credential that vanished since [`is_available`](Self::is_available)
    /// was checked is reported as [`ProviderError::NotLoggedIn`].
    fn fetch_usage(
        &self,
    ) -> impl Future<Output = Result<ProviderUsageResponse, ProviderError>> + Send;
}
