//! Text output formatting with progress bars and colors.

use aimeter_core::{AggregateState, DisplayMode, ProviderKind, ProviderState, StatusLevel, UsageLimit};
use chrono::{DateTime, Duration, Local, Utc};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

/// Width of the limit name column.
const LABEL_WIDTH: usize = 14;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    bar_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            bar_width: 10,
        }
    }

    /// Formats every provider of a snapshot, separated by blank lines.
    pub fn format_state(&self, state: &AggregateState) -> String {
        state
            .providers()
            .map(|provider| self.format_provider(provider))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Formats one provider: a header and one line per limit, or its error.
    pub fn format_provider(&self, state: &ProviderState) -> String {
        let name = state.provider.display_name();
        let mut lines = vec![self.bold(name)];

        match &state.usage {
            Some(usage) if !usage.is_empty() => {
                lines.extend(usage.limits.iter().map(|limit| self.format_limit(limit)));
            }
            Some(_) => lines.push(format!("  {}", self.dim("No limits reported"))),
            None if state.is_loading => lines.push(format!("  {}", self.dim("Loading..."))),
            None if state.error.is_none() && !state.is_available => {
                lines.push(format!("  {}", self.dim("Not logged in")));
            }
            None => {}
        }

        if let Some(error) = &state.error {
            lines.push(format!("  {}", self.red(error)));
        }

        lines.join("\n")
    }

    /// Formats a single limit: `  Session (5h)   ████░░░░░░  42%  resets in 2h 5m`.
    pub fn format_limit(&self, limit: &UsageLimit) -> String {
        let mut line = format!(
            "  {:<width$} {} {}",
            limit.name,
            self.progress_bar(limit.utilization),
            self.color_for_percent(limit.utilization, &format!("{:>3.0}%", limit.utilization)),
            width = LABEL_WIDTH,
        );

        if let Some(reset) = limit.reset_time {
            line.push_str("  ");
            line.push_str(&self.dim(&format!("resets {}", format_reset_time(reset, Utc::now()))));
        }

        line
    }

    /// Creates a progress bar for a used percentage.
    pub fn progress_bar(&self, percent_used: f64) -> String {
        let clamped = percent_used.clamp(0.0, 100.0);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let filled = ((clamped / 100.0) * self.bar_width as f64).round() as usize;
        let empty = self.bar_width - filled.min(self.bar_width);

        let bar: String = std::iter::repeat_n(BAR_FULL, filled.min(self.bar_width))
            .chain(std::iter::repeat_n(BAR_EMPTY, empty))
            .collect();

        self.color_for_percent(percent_used, &bar)
    }

    /// Formats the compact status line.
    pub fn format_status_line(&self, state: &AggregateState, mode: DisplayMode) -> String {
        self.bold(&state.status_line(mode))
    }

    /// Formats the `Updated ...` footer.
    pub fn format_updated(&self, state: &AggregateState) -> String {
        match state.last_updated {
            Some(at) => self.dim(&format!(
                "Updated {}",
                at.with_timezone(&Local).format("%H:%M:%S")
            )),
            None => self.dim("Never updated"),
        }
    }

    /// Formats the providers list header.
    pub fn format_providers_header(&self) -> String {
        format!(
            "{}\n{}",
            self.bold("Providers"),
            self.dim("─────────────────────────────────")
        )
    }

    /// Formats a single provider in the providers list.
    pub fn format_provider_line(&self, kind: ProviderKind, enabled: bool, logged_in: bool) -> String {
        let marker = if enabled { self.green("●") } else { self.dim("○") };
        let login = if logged_in {
            self.green("logged in")
        } else {
            self.yellow("not logged in")
        };

        format!(
            "  {} {:<8} {}  {}",
            marker,
            kind.display_name(),
            self.dim(&format!("({})", kind.cli_name())),
            login
        )
    }

    /// Formats an error message.
    pub fn format_error(&self, provider: &str, error: &str) -> String {
        format!("{}: {}", self.bold(provider), self.red(error))
    }

    fn color_for_percent(&self, percent_used: f64, text: &str) -> String {
        match StatusLevel::from_percent(percent_used) {
            StatusLevel::Normal => self.green(text),
            StatusLevel::Warning => self.yellow(text),
            StatusLevel::Critical => self.red(text),
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }
}

/// Formats the time until `resets_at` as seen from `now`.
///
/// Within a day this is a countdown (`in 2h 5m`); further out it is the
/// local wall-clock time (`tomorrow at 9:00 AM`).
pub fn format_reset_time(resets_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if resets_at <= now {
        return "now".to_string();
    }

    let diff = resets_at - now;

    if diff < Duration::hours(1) {
        let mins = diff.num_minutes().max(1);
        format!("in {} minute{}", mins, if mins == 1 { "" } else { "s" })
    } else if diff < Duration::hours(24) {
        let hours = diff.num_hours();
        let mins = diff.num_minutes() % 60;
        if mins > 0 {
            format!("in {hours}h {mins}m")
        } else {
            format!("in {} hour{}", hours, if hours == 1 { "" } else { "s" })
        }
    } else {
        let local_reset = resets_at.with_timezone(&Local);
        let today = now.with_timezone(&Local).date_naive();
        let reset_date = local_reset.date_naive();
        let clock = local_reset.format("%l:%M %p").to_string();

        if reset_date == today + chrono::Days::new(1) {
            format!("tomorrow at {}", clock.trim())
        } else {
            local_reset.format("%a %b %-d at %l:%M %p").to_string().replace("  ", " ")
        }
    }
}
