// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `AIMeter` Engine
//!
//! The refresh engine behind every `AIMeter` front end.
//!
//! - [`refresh`]: latest-wins refresh cycles over all providers
//! - [`scheduler`]: interval, startup and wake-from-sleep triggers
//! - [`notifications`]: threshold alerts with hysteresis
//! - [`engine`]: wiring of the above around a [`UsageStore`](aimeter_store::UsageStore)
//!
//! ## Usage
//!
//! ```ignore
//! use aimeter_engine::{Engine, LogNotifier, SchedulerConfig, Trigger};
//!
//! let engine = Engine::from_settings(&settings, Arc::new(LogNotifier));
//! let scheduler = engine.start_scheduler(SchedulerConfig::from_settings(&settings));
//!
//! let mut rx = engine.subscribe();
//! while rx.changed().await.is_ok() {
//!     println!("{}", rx.borrow().status_line(settings.display_mode));
//! }
//! scheduler.shutdown().await;
//! ```

pub mod engine;
pub mod notifications;
pub mod refresh;
pub mod scheduler;

pub use engine::Engine;
pub use notifications::{
    Alert, LogNotifier, NotificationSink, SystemNotifier, ThresholdNotifier, normalize_thresholds,
};
pub use refresh::{CycleReport, RefreshCoordinator, RefreshHandle};
pub use scheduler::{
    Scheduler, SchedulerConfig, SchedulerHandle, Trigger, WakeDetector, system_uptime,
    warm_up_delay,
};
