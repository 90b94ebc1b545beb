// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `AIMeter` Core
//!
//! Core types, models, and traits for the `AIMeter` application.
//!
//! This crate provides the foundational abstractions used across all other
//! `AIMeter` crates, including:
//!
//! - Domain models (providers, usage limits, per-provider and aggregate state)
//! - The provider error taxonomy and its retry classification
//! - The [`UsageProvider`] trait every provider implements
//!
//! ## Key Types
//!
//! ### Provider Types
//! - [`ProviderKind`] - Closed set of supported providers
//! - [`ProviderBranding`] - Icon and accent color hints for a provider
//!
//! ### Usage Types
//! - [`UsageLimit`] - One named quota window (e.g. "Session (5h)")
//! - [`ProviderUsageResponse`] - All limits returned by one fetch
//! - [`StatusLevel`] - Green / yellow / red bucketing of a percentage
//! - [`DisplayMode`] - Which limit the status line prefers
//!
//! ### State Types
//! - [`ProviderState`] - Latest known data for one provider
//! - [`AggregateState`] - Immutable snapshot handed to the presentation layer

pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::{NetworkErrorKind, ProviderError};

// Re-export all model types
pub use models::{
    // Provider types
    ProviderBranding,
    ProviderColor,
    ProviderKind,
    // Usage types
    DisplayMode,
    ProviderUsageResponse,
    StatusLevel,
    UsageLimit,
    // State types
    AggregateState,
    ProviderState,
};

// Re-export traits
pub use traits::UsageProvider;
