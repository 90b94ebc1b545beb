// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `AIMeter` Providers
//!
//! Provider-specific implementations for the `AIMeter` application.
//!
//! Each provider module includes:
//!
//! - **Credentials**: where the provider CLI keeps its token
//! - **API**: endpoint constants, response structures and parsing
//! - **Provider**: the [`UsageProvider`](aimeter_core::UsageProvider)
//!   implementation tying both together
//!
//! ## Supported Providers
//!
//! | Provider | Keychain service | Credential file | Endpoint |
//! |----------|------------------|-----------------|----------|
//! | Claude (Anthropic) | `Claude Code-credentials` | `~/.claude/.credentials.json` | `/api/oauth/usage` |
//! | Codex (OpenAI) | `Codex Auth` | `~/.codex/auth.json` | `/backend-api/wham/usage` |
//!
//! ## Usage
//!
//! ```ignore
//! use aimeter_core::UsageProvider;
//! use aimeter_providers::ProviderRegistry;
//!
//! for provider in ProviderRegistry::all() {
//!     if provider.is_available() {
//!         let usage = provider.fetch_usage().await?;
//!     }
//! }
//! ```

pub mod claude;
pub mod codex;
pub mod registry;

// Re-export key types
pub use claude::{ClaudeCredentials, ClaudeProvider};
pub use codex::{CodexCredentials, CodexProvider};
pub use registry::{Provider, ProviderRegistry};
