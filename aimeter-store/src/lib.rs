// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `AIMeter` Store
//!
//! State management for `AIMeter`.
//!
//! This crate provides:
//!
//! - **`UsageStore`**: Owner of the aggregate refresh state, publishing
//!   immutable snapshots on a watch channel
//! - **`SettingsStore`**: User preferences with persistence
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use aimeter_store::{UsageStore, SettingsStore};
//! use aimeter_core::ProviderKind;
//!
//! let usage = UsageStore::new(ProviderKind::all());
//! let settings = SettingsStore::load_default().await?;
//!
//! let mut rx = usage.subscribe();
//! while rx.changed().await.is_ok() {
//!     println!("{}", rx.borrow().status_line(settings.display_mode().await));
//! }
//! ```

pub mod error;
pub mod persistence;
pub mod settings_store;
pub mod usage_store;

pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_settings_path, load_json, load_json_or_default, save_json,
};
pub use settings_store::{
    DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_THRESHOLDS, LogLevel, MIN_REFRESH_INTERVAL_SECS,
    Settings, SettingsStore,
};
pub use usage_store::{CycleId, UsageStore};

#[cfg(test)]
mod persistence_tests;
