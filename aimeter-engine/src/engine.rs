//! Wiring of store, coordinator and scheduler.

use std::sync::Arc;

use aimeter_core::{AggregateState, ProviderKind, UsageProvider};
use aimeter_fetch::RetryPolicy;
use aimeter_providers::{Provider, ProviderRegistry};
use aimeter_store::{Settings, UsageStore};
use tokio::sync::watch;
use tracing::info;

use crate::notifications::NotificationSink;
use crate::refresh::{RefreshCoordinator, RefreshHandle};
use crate::scheduler::{Scheduler, SchedulerConfig, SchedulerHandle};

/// A usage monitor: providers, their shared state and the refresh logic.
pub struct Engine<P> {
    coordinator: RefreshCoordinator<P>,
}

impl Engine<Provider> {
    /// Builds an engine for the providers enabled in `settings`.
    pub fn from_settings(settings: &Settings, sink: Arc<dyn NotificationSink>) -> Self {
        Self::new(ProviderRegistry::enabled(&settings.enabled_providers), settings, sink)
    }
}

impl<P> Engine<P>
where
    P: UsageProvider + 'static,
{
    /// Builds an engine over `providers`.
    pub fn new(providers: Vec<P>, settings: &Settings, sink: Arc<dyn NotificationSink>) -> Self {
        let kinds: Vec<ProviderKind> = providers.iter().map(UsageProvider::kind).collect();
        info!(providers = ?kinds, "Creating engine");

        let store = Arc::new(UsageStore::new(&kinds));
        let coordinator = RefreshCoordinator::new(
            providers,
            store,
            RetryPolicy::default(),
            &settings.thresholds,
            sink,
        );
        coordinator.set_notifications_enabled(settings.notifications_enabled);

        Self { coordinator }
    }

    /// Returns the refresh coordinator.
    pub fn coordinator(&self) -> &RefreshCoordinator<P> {
        &self.coordinator
    }

    /// Returns the latest state snapshot.
    pub fn snapshot(&self) -> Arc<AggregateState> {
        self.coordinator.store().snapshot()
    }

    /// Subscribes to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AggregateState>> {
        self.coordinator.store().subscribe()
    }

    /// Starts a refresh cycle now.
    pub fn refresh(&self) -> RefreshHandle {
        self.coordinator.refresh()
    }

    /// Applies changed alert settings to the running engine.
    pub fn apply_settings(&self, settings: &Settings) {
        self.coordinator.set_thresholds(&settings.thresholds);
        self.coordinator
            .set_notifications_enabled(settings.notifications_enabled);
    }

    /// Starts automatic refreshing.
    pub fn start_scheduler(&self, config: SchedulerConfig) -> SchedulerHandle {
        Scheduler::new(self.coordinator.clone(), config).spawn()
    }
}

impl<P> std::fmt::Debug for Engine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
