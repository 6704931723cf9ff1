//! Progress reporting for snapshot replay.
//!
//! Interactive runs get an indicatif bar; with `--log-only` the bar is hidden
//! and periodic `[phase] n/total` lines go to stderr instead, which reads
//! better in `tail -f` or a systemd journal.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Progress over a fixed number of snapshots.
pub struct ReplayProgress {
    bar: ProgressBar,
    phase: String,
    total: u64,
    interval: u64,
}

impl ReplayProgress {
    pub fn new(phase: &str, total: u64) -> Self {
        let bar = ProgressBar::new(total);
        if is_log_only() || total <= 1 {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            let style = ProgressStyle::default_bar()
                .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ");
            bar.set_style(style);
        }
        bar.set_message(phase.to_string());
        Self {
            bar,
            phase: phase.to_string(),
            total,
            interval: (total / 20).max(1),
        }
    }

    /// Advance by one snapshot; `label` is shown next to the bar.
    pub fn tick(&self, label: &str) {
        self.bar.set_message(format!("{} {}", self.phase, label));
        self.bar.inc(1);
        let current = self.bar.position();
        if is_log_only() && (current % self.interval == 0 || current == self.total) {
            let pct = 100.0 * current as f64 / self.total.max(1) as f64;
            eprintln!("[{}] {}/{} ({:.1}%)", self.phase, current, self.total, pct);
        }
    }

    /// Print a line without tearing the bar.
    pub fn println(&self, line: &str) {
        if self.bar.is_hidden() {
            eprintln!("{}", line);
        } else {
            self.bar.println(line);
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
