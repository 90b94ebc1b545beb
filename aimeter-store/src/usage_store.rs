//! Main usage state store.
//!
//! [`UsageStore`] is the only writer of [`AggregateState`]. Every commit is
//! tagged with the refresh cycle that produced it and is dropped unless that
//! cycle is still the newest one. Readers get immutable snapshots.

use aimeter_core::{AggregateState, ProviderError, ProviderKind, ProviderUsageResponse};
use chrono::Utc;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, trace};

// ============================================================================
// Cycle Id
// ============================================================================

/// Generation number of a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleId(u64);

impl CycleId {
    /// Returns the raw generation number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Usage Store
// ============================================================================

/// Owner of the aggregate refresh state.
///
/// Writes go through a mutex; each accepted write republishes the whole
/// state as an `Arc<AggregateState>` on a watch channel.
pub struct UsageStore {
    state: Mutex<AggregateState>,
    notify: watch::Sender<Arc<AggregateState>>,
}

impl UsageStore {
    /// Creates a store with an empty entry per provider.
    pub fn new(providers: &[ProviderKind]) -> Self {
        let state = AggregateState::new(providers);
        let (notify, _) = watch::channel(Arc::new(state.clone()));
        Self {
            state: Mutex::new(state),
            notify,
        }
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Returns the latest published snapshot.
    pub fn snapshot(&self) -> Arc<AggregateState> {
        self.notify.borrow().clone()
    }

    /// Subscribes to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AggregateState>> {
        self.notify.subscribe()
    }

    /// Returns the most recently started cycle, if any.
    pub fn current_cycle(&self) -> Option<CycleId> {
        match self.lock().cycle {
            0 => None,
            n => Some(CycleId(n)),
        }
    }

    /// Returns true if `cycle` is the most recently started cycle.
    pub fn is_current(&self, cycle: CycleId) -> bool {
        self.lock().cycle == cycle.0
    }

    // ========================================================================
    // Cycle Lifecycle
    // ========================================================================

    /// Starts a new cycle, superseding any cycle still in flight.
    pub fn begin_cycle(&self) -> CycleId {
        let mut state = self.lock();
        state.cycle += 1;
        state.is_loading = true;
        for provider in state.provider_states.values_mut() {
            provider.is_loading = false;
        }
        let cycle = CycleId(state.cycle);
        debug!(%cycle, "Refresh cycle started");
        self.publish(&state);
        cycle
    }

    /// Ends a cycle.
    ///
    /// Clears the loading flags and, unless the cycle was cancelled, stamps
    /// the aggregate `last_updated`. Ignored for superseded cycles.
    pub fn finish_cycle(&self, cycle: CycleId, cancelled: bool) -> bool {
        self.commit(cycle, |state| {
            state.is_loading = false;
            for provider in state.provider_states.values_mut() {
                provider.is_loading = false;
            }
            if !cancelled {
                state.last_updated = Some(Utc::now());
            }
            debug!(%cycle, cancelled, "Refresh cycle finished");
        })
    }

    // ========================================================================
    // Provider Commits
    // ========================================================================

    /// Marks a provider as being fetched by `cycle`.
    pub fn mark_loading(&self, cycle: CycleId, provider: ProviderKind) -> bool {
        self.commit(cycle, |state| {
            if let Some(entry) = state.provider_states.get_mut(&provider) {
                entry.is_loading = true;
                entry.is_available = true;
            }
        })
    }

    /// Marks a provider as having no credential. Its usage and error are kept.
    pub fn mark_unavailable(&self, cycle: CycleId, provider: ProviderKind) -> bool {
        self.commit(cycle, |state| {
            if let Some(entry) = state.provider_states.get_mut(&provider) {
                entry.is_loading = false;
                entry.is_available = false;
            }
        })
    }

    /// Merges one provider's fetch outcome.
    ///
    /// Success replaces the usage and clears the error; failure records the
    /// message and keeps the previous usage. Returns false if `cycle` has
    /// been superseded and nothing was written.
    pub fn apply_result(
        &self,
        cycle: CycleId,
        provider: ProviderKind,
        result: Result<ProviderUsageResponse, ProviderError>,
    ) -> bool {
        self.commit(cycle, move |state| {
            let Some(entry) = state.provider_states.get_mut(&provider) else {
                return;
            };
            entry.is_loading = false;
            match result {
                Ok(usage) => {
                    entry.usage = Some(usage);
                    entry.last_updated = Some(Utc::now());
                    entry.error = None;
                    entry.is_available = true;
                }
                Err(err) => {
                    entry.is_available = !matches!(err, ProviderError::NotLoggedIn { .. });
                    entry.error = Some(err.to_string());
                }
            }
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn lock(&self) -> std::sync::MutexGuard<'_, AggregateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `f` if `cycle` is current, then publishes. The generation
    /// check and the write happen under the same lock.
    fn commit(&self, cycle: CycleId, f: impl FnOnce(&mut AggregateState)) -> bool {
        let mut state = self.lock();
        if state.cycle != cycle.0 {
            trace!(%cycle, current = state.cycle, "Discarding write from superseded cycle");
            return false;
        }
        f(&mut state);
        self.publish(&state);
        true
    }

    fn publish(&self, state: &AggregateState) {
        self.notify.send_replace(Arc::new(state.clone()));
    }
}

impl fmt::Debug for UsageStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageStore")
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use aimeter_core::{NetworkErrorKind, UsageLimit};

    fn usage(percent: f64) -> ProviderUsageResponse {
        ProviderUsageResponse::new(vec![UsageLimit::new("Weekly (7d)", percent)])
    }

    fn store() -> UsageStore {
        UsageStore::new(ProviderKind::all())
    }

    #[test]
    fn test_new_store() {
        let store = store();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.provider_states.len(), 2);
        assert!(!snapshot.is_loading);
        assert!(snapshot.last_updated.is_none());
        assert_eq!(store.current_cycle(), None);
    }

    #[test]
    fn test_cycle_loading_span() {
        let store = store();
        let cycle = store.begin_cycle();
        assert!(store.snapshot().is_loading);
        assert_eq!(store.current_cycle(), Some(cycle));

        assert!(store.finish_cycle(cycle, false));
        let snapshot = store.snapshot();
        assert!(!snapshot.is_loading);
        assert!(snapshot.last_updated.is_some());
    }

    #[test]
    fn test_cancelled_cycle_keeps_last_updated() {
        let store = store();
        let cycle = store.begin_cycle();
        store.finish_cycle(cycle, true);

        let snapshot = store.snapshot();
        assert!(!snapshot.is_loading);
        assert!(snapshot.last_updated.is_none());
    }

    #[test]
    fn test_success_and_failure_merge() {
        let store = store();
        let cycle = store.begin_cycle();

        assert!(store.mark_loading(cycle, ProviderKind::Claude));
        assert!(store.snapshot().provider(ProviderKind::Claude).unwrap().is_loading);

        store.apply_result(cycle, ProviderKind::Claude, Ok(usage(50.0)));
        store.apply_result(
            cycle,
            ProviderKind::Codex,
            Err(ProviderError::network(NetworkErrorKind::Timeout, "timed out")),
        );

        let snapshot = store.snapshot();
        let claude = snapshot.provider(ProviderKind::Claude).unwrap();
        assert!(claude.has_usage());
        assert!(claude.error.is_none());
        assert!(!claude.is_loading);

        let codex = snapshot.provider(ProviderKind::Codex).unwrap();
        assert!(codex.usage.is_none());
        assert_eq!(codex.error.as_deref(), Some("Network error: timed out"));
    }

    #[test]
    fn test_failure_keeps_previous_usage() {
        let store = store();
        let first = store.begin_cycle();
        store.apply_result(first, ProviderKind::Claude, Ok(usage(40.0)));
        store.finish_cycle(first, false);

        let second = store.begin_cycle();
        store.apply_result(second, ProviderKind::Claude, Err(ProviderError::InvalidResponse));

        let snapshot = store.snapshot();
        let claude = snapshot.provider(ProviderKind::Claude).unwrap();
        assert!((claude.max_utilization() - 40.0).abs() < f64::EPSILON);
        assert_eq!(claude.error.as_deref(), Some("Invalid response from API"));
    }

    #[test]
    fn test_superseded_cycle_is_discarded() {
        let store = store();
        let old = store.begin_cycle();
        let new = store.begin_cycle();

        assert!(!store.is_current(old));
        assert!(!store.apply_result(old, ProviderKind::Claude, Ok(usage(10.0))));
        assert!(!store.finish_cycle(old, false));

        let snapshot = store.snapshot();
        assert!(snapshot.is_loading);
        assert!(snapshot.last_updated.is_none());
        assert!(!snapshot.provider(ProviderKind::Claude).unwrap().has_usage());

        assert!(store.apply_result(new, ProviderKind::Claude, Ok(usage(20.0))));
        assert!(store.finish_cycle(new, false));
        assert!(!store.snapshot().is_loading);
    }

    #[test]
    fn test_mark_unavailable_keeps_usage() {
        let store = store();
        let first = store.begin_cycle();
        store.apply_result(first, ProviderKind::Codex, Ok(usage(30.0)));

        let second = store.begin_cycle();
        store.mark_unavailable(second, ProviderKind::Codex);

        let snapshot = store.snapshot();
        let codex = snapshot.provider(ProviderKind::Codex).unwrap();
        assert!(!codex.is_available);
        assert!(codex.has_usage());
    }

    #[test]
    fn test_not_logged_in_clears_availability() {
        let store = store();
        let cycle = store.begin_cycle();
        store.mark_loading(cycle, ProviderKind::Claude);
        store.apply_result(cycle, ProviderKind::Claude, Err(ProviderError::not_logged_in("Claude")));

        assert!(!store.snapshot().provider(ProviderKind::Claude).unwrap().is_available);
    }

    #[tokio::test]
    async fn test_subscribers_see_each_commit() {
        let store = store();
        let mut rx = store.subscribe();

        let cycle = store.begin_cycle();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_loading);

        store.finish_cycle(cycle, false);
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().is_loading);
    }
}
