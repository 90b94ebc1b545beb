//! Refresh cycles.
//!
//! A [`RefreshCoordinator`] runs one cycle per [`refresh`] call: it checks
//! which providers have a credential, fetches all of them concurrently with
//! retry, and merges each outcome into the [`UsageStore`] as it arrives.
//!
//! Cycles are latest-wins. Starting a cycle cancels the previous one, and
//! the store rejects commits from any cycle that is no longer current, so a
//! slow response from an old cycle can never overwrite newer data.
//!
//! [`refresh`]: RefreshCoordinator::refresh

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use aimeter_core::{ProviderError, ProviderKind, ProviderUsageResponse, UsageProvider};
use aimeter_fetch::{RetryPolicy, fetch_with_retry};
use aimeter_store::{CycleId, UsageStore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::notifications::{NotificationSink, ThresholdNotifier};

// ============================================================================
// Cycle Report
// ============================================================================

/// What happened to each provider during one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// The cycle this report describes.
    pub cycle: CycleId,
    /// Providers whose fetch succeeded.
    pub succeeded: Vec<ProviderKind>,
    /// Providers whose fetch failed.
    pub failed: Vec<ProviderKind>,
    /// Providers skipped for lack of a credential.
    pub skipped: Vec<ProviderKind>,
    /// True if the cycle was cancelled or superseded before finishing.
    pub cancelled: bool,
}

impl CycleReport {
    fn new(cycle: CycleId) -> Self {
        Self {
            cycle,
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            cancelled: false,
        }
    }
}

/// Handle to a running cycle.
///
/// Dropping the handle detaches the cycle; it keeps running.
#[derive(Debug)]
pub struct RefreshHandle {
    cycle: CycleId,
    task: JoinHandle<CycleReport>,
}

impl RefreshHandle {
    /// Returns the generation of the cycle.
    pub fn cycle(&self) -> CycleId {
        self.cycle
    }

    /// Waits for the cycle to finish.
    pub async fn wait(self) -> Result<CycleReport, JoinError> {
        self.task.await
    }
}

// ============================================================================
// Refresh Coordinator
// ============================================================================

/// Runs refresh cycles over a fixed set of providers.
///
/// Cloning is cheap and clones share the same cycle state.
pub struct RefreshCoordinator<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for RefreshCoordinator<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<P> {
    providers: Vec<Arc<P>>,
    store: Arc<UsageStore>,
    retry: RetryPolicy,
    notifier: Mutex<ThresholdNotifier>,
    sink: Arc<dyn NotificationSink>,
    notifications_enabled: AtomicBool,
    current: Mutex<Option<(CycleId, CancellationToken)>>,
}

impl<P> RefreshCoordinator<P>
where
    P: UsageProvider + 'static,
{
    /// Creates a coordinator that writes into `store`.
    ///
    /// `store` should track every provider in `providers`. Every fetch is
    /// retried according to `retry`.
    pub fn new(
        providers: Vec<P>,
        store: Arc<UsageStore>,
        retry: RetryPolicy,
        thresholds: &[u8],
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                providers: providers.into_iter().map(Arc::new).collect(),
                store,
                retry,
                notifier: Mutex::new(ThresholdNotifier::new(thresholds)),
                sink,
                notifications_enabled: AtomicBool::new(true),
                current: Mutex::new(None),
            }),
        }
    }

    /// Returns the store this coordinator writes into.
    pub fn store(&self) -> &Arc<UsageStore> {
        &self.inner.store
    }

    /// Replaces the alert thresholds.
    pub fn set_thresholds(&self, thresholds: &[u8]) {
        lock(&self.inner.notifier).set_thresholds(thresholds);
    }

    /// Enables or disables alert delivery.
    ///
    /// While disabled, threshold memory is left untouched.
    pub fn set_notifications_enabled(&self, enabled: bool) {
        self.inner
            .notifications_enabled
            .store(enabled, Ordering::Relaxed);
    }

    /// Starts a new cycle, superseding the one in flight.
    ///
    /// The new cycle is current as soon as this returns. Must be called from
    /// within a tokio runtime.
    pub fn refresh(&self) -> RefreshHandle {
        let token = CancellationToken::new();
        let cycle = {
            let mut current = lock(&self.inner.current);
            if let Some((previous, old_token)) = current.take() {
                debug!(%previous, "Superseding in-flight cycle");
                old_token.cancel();
            }
            let cycle = self.inner.store.begin_cycle();
            *current = Some((cycle, token.clone()));
            cycle
        };

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.run_cycle(cycle, token).await });
        RefreshHandle { cycle, task }
    }

    /// Cancels the in-flight cycle, if any, without starting a new one.
    pub fn cancel(&self) {
        if let Some((cycle, token)) = lock(&self.inner.current).take() {
            debug!(%cycle, "Cancelling cycle");
            token.cancel();
        }
    }
}

impl<P> Inner<P>
where
    P: UsageProvider + 'static,
{
    async fn run_cycle(self: Arc<Self>, cycle: CycleId, token: CancellationToken) -> CycleReport {
        let mut report = CycleReport::new(cycle);

        let availability = tokio::select! {
            biased;
            () = token.cancelled() => None,
            found = self.check_availability() => Some(found),
        };

        match availability {
            Some(available) => {
                let tasks = self.launch_fetches(cycle, &available, &token, &mut report);
                self.collect(cycle, tasks, &token, &mut report).await;
            }
            None => report.cancelled = true,
        }

        if token.is_cancelled() {
            report.cancelled = true;
        }
        self.store.finish_cycle(cycle, report.cancelled);
        self.release(cycle);

        info!(
            %cycle,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            cancelled = report.cancelled,
            "Refresh cycle complete"
        );
        report
    }

    /// Asks every provider for a credential. Keychain access may block.
    ///
    /// Each check runs on its own blocking task, so a check that panics only
    /// marks its own provider unavailable.
    async fn check_availability(&self) -> Vec<(Arc<P>, bool)> {
        let checks: Vec<_> = self
            .providers
            .iter()
            .map(|provider| {
                let checked = Arc::clone(provider);
                let task = tokio::task::spawn_blocking(move || checked.is_available());
                (Arc::clone(provider), task)
            })
            .collect();

        let mut found = Vec::with_capacity(checks.len());
        for (provider, task) in checks {
            let available = task.await.unwrap_or_else(|e| {
                warn!(provider = %provider.kind(), error = %e, "Availability check failed");
                false
            });
            found.push((provider, available));
        }
        found
    }

    fn launch_fetches(
        &self,
        cycle: CycleId,
        available: &[(Arc<P>, bool)],
        token: &CancellationToken,
        report: &mut CycleReport,
    ) -> JoinSet<(ProviderKind, Option<FetchResult>)> {
        let mut tasks = JoinSet::new();

        for (provider, is_available) in available {
            let kind = provider.kind();
            if !is_available {
                debug!(%cycle, provider = %kind, "No credential, skipping");
                self.store.mark_unavailable(cycle, kind);
                report.skipped.push(kind);
                continue;
            }

            self.store.mark_loading(cycle, kind);
            let provider = Arc::clone(provider);
            let retry = self.retry.clone();
            let token = token.clone();
            tasks.spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    () = token.cancelled() => None,
                    result = fetch_with_retry(provider.as_ref(), &retry) => Some(result),
                };
                (kind, outcome)
            });
        }

        tasks
    }

    async fn collect(
        &self,
        cycle: CycleId,
        mut tasks: JoinSet<(ProviderKind, Option<FetchResult>)>,
        token: &CancellationToken,
        report: &mut CycleReport,
    ) {
        loop {
            let joined = tokio::select! {
                biased;
                () = token.cancelled() => {
                    tasks.abort_all();
                    report.cancelled = true;
                    return;
                }
                next = tasks.join_next() => next,
            };

            match joined {
                Some(Ok((kind, Some(result)))) => self.commit(cycle, kind, result, report),
                Some(Ok((_, None))) => report.cancelled = true,
                Some(Err(e)) => warn!(%cycle, error = %e, "Fetch task failed"),
                None => return,
            }
        }
    }

    fn commit(&self, cycle: CycleId, kind: ProviderKind, result: FetchResult, report: &mut CycleReport) {
        let utilization = match &result {
            Ok(usage) => Some(usage.max_utilization()),
            Err(e) => {
                warn!(%cycle, provider = %kind, error = %e, "Provider fetch failed");
                None
            }
        };

        // Held across the commit so threshold checks see readings in the
        // order the store accepted them.
        let mut notifier = lock(&self.notifier);
        if !self.store.apply_result(cycle, kind, result) {
            debug!(%cycle, provider = %kind, "Result from superseded cycle discarded");
            report.cancelled = true;
            return;
        }

        let alerts = match utilization {
            Some(utilization) => {
                debug!(%cycle, provider = %kind, utilization, "Provider refreshed");
                report.succeeded.push(kind);
                if self.notifications_enabled.load(Ordering::Relaxed) {
                    notifier.check(kind, utilization)
                } else {
                    Vec::new()
                }
            }
            None => {
                report.failed.push(kind);
                Vec::new()
            }
        };
        drop(notifier);

        for alert in alerts {
            self.sink.send(&alert.title, &alert.body);
        }
    }

    /// Clears the in-flight marker if it still belongs to `cycle`.
    fn release(&self, cycle: CycleId) {
        let mut current = lock(&self.current);
        if current.as_ref().is_some_and(|(c, _)| *c == cycle) {
            *current = None;
        }
    }
}

type FetchResult = Result<ProviderUsageResponse, ProviderError>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<P> fmt::Debug for RefreshCoordinator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("providers", &self.inner.providers.len())
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}
