//! Domain models for `AIMeter`.
//!
//! This module contains the core data structures representing providers,
//! usage limits and the state the refresh engine maintains for them.
//!
//! ## Submodules
//!
//! - [`provider`] - Provider types (ProviderKind, Branding)
//! - [`usage`] - Usage types (UsageLimit, ProviderUsageResponse, StatusLevel)
//! - [`state`] - State types (ProviderState, AggregateState)

mod provider;
mod state;
mod usage;

// Re-export everything at the models level
pub use provider::{ProviderBranding, ProviderColor, ProviderKind};
pub use state::{AggregateState, ProviderState};
pub use usage::{DisplayMode, ProviderUsageResponse, StatusLevel, UsageLimit};
