//! Provider registry.
//!
//! The set of providers is closed: [`Provider`] has one variant per
//! [`ProviderKind`] and dispatches the [`UsageProvider`] contract to it.
//! The registry is the central point for constructing and looking them up.

use std::collections::BTreeSet;

use aimeter_core::{ProviderError, ProviderKind, ProviderUsageResponse, UsageProvider};

use crate::claude::ClaudeProvider;
use crate::codex::CodexProvider;

// ============================================================================
// Provider
// ============================================================================

/// One of the supported providers.
#[derive(Debug, Clone)]
pub enum Provider {
    /// Anthropic Claude.
    Claude(ClaudeProvider),
    /// OpenAI Codex.
    Codex(CodexProvider),
}

impl Provider {
    /// Creates the default provider for a kind.
    pub fn for_kind(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Claude => Self::Claude(ClaudeProvider::new()),
            ProviderKind::Codex => Self::Codex(CodexProvider::new()),
        }
    }
}

impl UsageProvider for Provider {
    fn kind(&self) -> ProviderKind {
        match self {
            Self::Claude(p) => p.kind(),
            Self::Codex(p) => p.kind(),
        }
    }

    fn is_available(&self) -> bool {
        match self {
            Self::Claude(p) => p.is_available(),
            Self::Codex(p) => p.is_available(),
        }
    }

    async fn fetch_usage(&self) -> Result<ProviderUsageResponse, ProviderError> {
        match self {
            Self::Claude(p) => p.fetch_usage().await,
            Self::Codex(p) => p.fetch_usage().await,
        }
    }
}

impl From<ClaudeProvider> for Provider {
    fn from(provider: ClaudeProvider) -> Self {
        Self::Claude(provider)
    }
}

impl From<CodexProvider> for Provider {
    fn from(provider: CodexProvider) -> Self {
        Self::Codex(provider)
    }
}

// ============================================================================
// Provider Registry
// ============================================================================

/// Constructs and looks up providers.
pub struct ProviderRegistry;

impl ProviderRegistry {
    /// Returns one provider per kind, in display order.
    pub fn all() -> Vec<Provider> {
        Self::kinds().iter().copied().map(Provider::for_kind).collect()
    }

    /// Returns the provider for a kind.
    pub fn get(kind: ProviderKind) -> Provider {
        Provider::for_kind(kind)
    }

    /// Resolves a command-line name (case-insensitive).
    pub fn by_cli_name(name: &str) -> Option<Provider> {
        name.parse::<ProviderKind>().ok().map(Provider::for_kind)
    }

    /// Returns providers whose kind is in `enabled`, in display order.
    pub fn enabled(enabled: &BTreeSet<ProviderKind>) -> Vec<Provider> {
        Self::kinds()
            .iter()
            .filter(|kind| enabled.contains(kind))
            .copied()
            .map(Provider::for_kind)
            .collect()
    }

    /// Returns all provider kinds.
    pub fn kinds() -> &'static [ProviderKind] {
        ProviderKind::all()
    }

    /// Returns the number of registered providers.
    pub fn count() -> usize {
        Self::kinds().len()
    }
}

// ============================================================================
// Tests
// ============================================================================
