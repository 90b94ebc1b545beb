//! Automatic refresh triggers.
//!
//! The [`Scheduler`] turns time into refresh cycles: one at startup (after a
//! warm-up if the machine just booted), one per interval tick, and one a few
//! seconds after the machine wakes from sleep. Manual refreshes go through
//! the same coordinator and follow the same latest-wins rule.

use std::time::{Duration, SystemTime};

use aimeter_core::UsageProvider;
use aimeter_store::Settings;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::refresh::RefreshCoordinator;

/// Delay between a wake event and the refresh it triggers.
pub const WAKE_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// How often the wall clock is compared against the monotonic clock.
pub const WAKE_PROBE_INTERVAL: Duration = Duration::from_secs(10);

/// Wall-clock gain over monotonic time that counts as a wake.
pub const WAKE_JUMP_THRESHOLD: Duration = Duration::from_secs(30);

/// Uptime below which the startup refresh waits for the network.
const WARM_UP_UPTIME: Duration = Duration::from_secs(60);

// ============================================================================
// Triggers
// ============================================================================

/// An externally injected refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The user asked for a refresh.
    Manual,
    /// The machine woke from sleep.
    Wake,
}

/// Scheduler timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Interval between automatic refreshes; `None` is manual-only.
    pub interval: Option<Duration>,
    /// Delay before the startup refresh.
    pub startup_delay: Option<Duration>,
    /// Whether wake events trigger a refresh.
    pub refresh_on_wake: bool,
    /// Probe period for built-in wake detection; `None` disables it.
    pub wake_probe: Option<Duration>,
}

impl SchedulerConfig {
    /// Derives the timing from user settings and the current uptime.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval: settings.refresh_interval(),
            startup_delay: warm_up_delay(system_uptime()),
            refresh_on_wake: settings.auto_refresh_on_wake,
            wake_probe: settings.auto_refresh_on_wake.then_some(WAKE_PROBE_INTERVAL),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Drives a [`RefreshCoordinator`] from timers and triggers.
#[derive(Debug)]
pub struct Scheduler<P> {
    coordinator: RefreshCoordinator<P>,
    config: SchedulerConfig,
}

impl<P> Scheduler<P>
where
    P: UsageProvider + 'static,
{
    /// Creates a scheduler. Nothing runs until [`spawn`](Self::spawn).
    pub fn new(coordinator: RefreshCoordinator<P>, config: SchedulerConfig) -> Self {
        Self {
            coordinator,
            config,
        }
    }

    /// Starts the scheduler loop on the current tokio runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (triggers, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(self.run(rx, shutdown.clone()));
        SchedulerHandle {
            triggers,
            shutdown,
            task,
        }
    }

    async fn run(self, mut triggers: mpsc::UnboundedReceiver<Trigger>, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.interval.map(|d| d.as_secs()),
            startup_delay_secs = self.config.startup_delay.map(|d| d.as_secs()),
            refresh_on_wake = self.config.refresh_on_wake,
            "Scheduler started"
        );

        let now = Instant::now();
        let mut startup_at = Some(now + self.config.startup_delay.unwrap_or_default());
        let mut next_tick = self.config.interval.map(|d| now + d);
        let mut next_probe = self.config.wake_probe.map(|d| now + d);
        let mut wake_at: Option<Instant> = None;
        let mut detector = WakeDetector::new();

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,

                () = sleep_until_opt(startup_at) => {
                    startup_at = None;
                    debug!("Startup refresh");
                    self.coordinator.refresh();
                }

                () = sleep_until_opt(next_tick) => {
                    next_tick = self.config.interval.map(|d| Instant::now() + d);
                    debug!("Interval refresh");
                    self.coordinator.refresh();
                }

                () = sleep_until_opt(wake_at) => {
                    wake_at = None;
                    info!("Refreshing after wake");
                    self.coordinator.refresh();
                }

                () = sleep_until_opt(next_probe) => {
                    next_probe = self.config.wake_probe.map(|d| Instant::now() + d);
                    if detector.check() {
                        info!("Wake from sleep detected");
                        wake_at = self.schedule_wake(wake_at);
                    }
                }

                trigger = triggers.recv() => match trigger {
                    Some(Trigger::Manual) => {
                        debug!("Manual refresh");
                        self.coordinator.refresh();
                    }
                    Some(Trigger::Wake) => wake_at = self.schedule_wake(wake_at),
                    None => break,
                },
            }
        }

        self.coordinator.cancel();
        info!("Scheduler stopped");
    }

    /// Returns the deadline of the wake refresh, keeping an earlier one.
    fn schedule_wake(&self, pending: Option<Instant>) -> Option<Instant> {
        if !self.config.refresh_on_wake {
            debug!("Refresh on wake disabled");
            return pending;
        }
        pending.or_else(|| Some(Instant::now() + WAKE_SETTLE_DELAY))
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Control handle for a running [`Scheduler`].
///
/// Dropping the handle also stops the scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    triggers: mpsc::UnboundedSender<Trigger>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Injects a trigger. Returns false if the scheduler has stopped.
    pub fn trigger(&self, trigger: Trigger) -> bool {
        self.triggers.send(trigger).is_ok()
    }

    /// Stops the scheduler and cancels the in-flight cycle.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Scheduler task failed");
        }
    }
}

// ============================================================================
// Wake Detection
// ============================================================================

/// Detects sleep by comparing wall-clock and monotonic progress.
///
/// The monotonic clock stops while the machine sleeps; the wall clock does
/// not.
#[derive(Debug, Clone)]
pub struct WakeDetector {
    last_wall: SystemTime,
    last_mono: std::time::Instant,
}

impl WakeDetector {
    /// Starts observing from now.
    pub fn new() -> Self {
        Self {
            last_wall: SystemTime::now(),
            last_mono: std::time::Instant::now(),
        }
    }

    /// Returns true if the machine slept since the last check.
    pub fn check(&mut self) -> bool {
        self.observe(SystemTime::now(), std::time::Instant::now())
    }

    /// Records a pair of clock readings.
    pub fn observe(&mut self, wall: SystemTime, mono: std::time::Instant) -> bool {
        let wall_elapsed = wall.duration_since(self.last_wall).unwrap_or_default();
        let mono_elapsed = mono.saturating_duration_since(self.last_mono);
        self.last_wall = wall;
        self.last_mono = mono;

        wall_elapsed.saturating_sub(mono_elapsed) > WAKE_JUMP_THRESHOLD
    }
}

impl Default for WakeDetector {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Uptime
// ============================================================================

/// Returns the startup delay for a given system uptime.
///
/// Shortly after boot the network is often not ready yet, so the first
/// refresh waits until about 30 s of uptime, and at least 5 s.
pub fn warm_up_delay(uptime: Option<Duration>) -> Option<Duration> {
    let uptime = uptime?;
    if uptime >= WARM_UP_UPTIME {
        return None;
    }
    let remaining = Duration::from_secs(30).saturating_sub(uptime);
    Some(remaining.max(Duration::from_secs(5)))
}

/// Returns how long the system has been running, if known.
pub fn system_uptime() -> Option<Duration> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/uptime")
            .ok()
            .and_then(|s| parse_proc_uptime(&s))
    }

    #[cfg(target_os = "macos")]
    {
        let output = std::process::Command::new("sysctl")
            .args(["-n", "kern.boottime"])
            .output()
            .ok()?;
        let boot = parse_boottime(&String::from_utf8_lossy(&output.stdout))?;
        SystemTime::now().duration_since(boot).ok()
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

/// Parses the first field of `/proc/uptime` (`"12345.67 54321.00"`).
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_proc_uptime(contents: &str) -> Option<Duration> {
    let secs: f64 = contents.split_whitespace().next()?.parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

/// Parses `sysctl -n kern.boottime` output (`{ sec = 1700000000, usec = 0 } ...`).
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn parse_boottime(output: &str) -> Option<SystemTime> {
    let rest = &output[output.find("sec =")? + "sec =".len()..];
    let secs: u64 = rest
        .trim_start()
        .split(|c: char| !c.is_ascii_digit())
        .next()?
        .parse()
        .ok()?;
    SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs(secs))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warm_up_delay() {
        assert_eq!(warm_up_delay(None), None);
        assert_eq!(warm_up_delay(Some(Duration::from_secs(120))), None);
        assert_eq!(warm_up_delay(Some(Duration::from_secs(60))), None);
        assert_eq!(
            warm_up_delay(Some(Duration::from_secs(10))),
            Some(Duration::from_secs(20))
        );
        assert_eq!(
            warm_up_delay(Some(Duration::from_secs(28))),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            warm_up_delay(Some(Duration::from_secs(45))),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_wake_detector() {
        let mut detector = WakeDetector::new();
        let wall = detector.last_wall;
        let mono = detector.last_mono;

        // Both clocks advance together.
        assert!(!detector.observe(wall + Duration::from_secs(10), mono + Duration::from_secs(10)));

        // Wall clock jumped 10 minutes during a 10 s monotonic step.
        assert!(detector.observe(
            wall + Duration::from_secs(620),
            mono + Duration::from_secs(20)
        ));

        // Small drift is ignored.
        assert!(!detector.observe(
            wall + Duration::from_secs(650),
            mono + Duration::from_secs(30)
        ));
    }

    #[test]
    fn test_wall_clock_going_back_is_not_wake() {
        let mut detector = WakeDetector::new();
        let wall = detector.last_wall;
        let mono = detector.last_mono;
        assert!(!detector.observe(wall - Duration::from_secs(3600), mono + Duration::from_secs(10)));
    }

    #[test]
    fn test_parse_proc_uptime() {
        assert_eq!(
            parse_proc_uptime("350735.47 234388.90\n"),
            Some(Duration::from_secs_f64(350_735.47))
        );
        assert_eq!(parse_proc_uptime(""), None);
        assert_eq!(parse_proc_uptime("abc 1"), None);
    }

    #[test]
    fn test_parse_boottime() {
        let output = "{ sec = 1700000000, usec = 123456 } Tue Nov 14 22:13:20 2023\n";
        assert_eq!(
            parse_boottime(output),
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        );
        assert_eq!(parse_boottime("garbage"), None);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = Settings {
            refresh_interval_secs: 0,
            auto_refresh_on_wake: false,
            ..Settings::default()
        };
        let config = SchedulerConfig::from_settings(&settings);
        assert_eq!(config.interval, None);
        assert!(!config.refresh_on_wake);
        assert_eq!(config.wake_probe, None);

        let config = SchedulerConfig::from_settings(&Settings::default());
        assert_eq!(config.interval, Some(Duration::from_secs(120)));
        assert_eq!(config.wake_probe, Some(WAKE_PROBE_INTERVAL));
    }
}
