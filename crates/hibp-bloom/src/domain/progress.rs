//! Build progress and time estimates
//!
//! Percent budget: 1 when counting starts, 5 once the filter is sized,
//! 5..=95 across the insertion pass, 100 after the file is written.

use std::time::Duration;

use super::stage::BuildStage;

pub const COUNTING_STARTED: u8 = 1;
pub const SIZING_DONE: u8 = 5;
pub const INSERTION_SPAN: u8 = 90;
pub const COMPLETE: u8 = 100;

/// One progress report from a running build
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressUpdate {
    /// Percent complete, 0..=100, non-decreasing within a build
    pub percent: u8,
    /// Stage the build was in when this was emitted
    pub stage: BuildStage,
    /// Estimated time left
    pub remaining: Duration,
}

impl ProgressUpdate {
    /// Human-readable time left, e.g. "12 minutes"
    pub fn remaining_label(&self) -> String {
        format_remaining(self.remaining)
    }
}

/// Records between progress reports during insertion
///
/// Never zero, so inputs with fewer than 100 records still report.
pub fn progress_tick(total_records: u64) -> u64 {
    (total_records / 100).max(1)
}

/// Percent complete after `processed` of `total` records were inserted
///
/// Clamped to the insertion span if the input grew between passes.
pub fn insertion_percent(processed: u64, total: u64) -> u8 {
    if total == 0 {
        return SIZING_DONE + INSERTION_SPAN;
    }
    let done = u128::from(processed.min(total)) * u128::from(INSERTION_SPAN) / u128::from(total);
    SIZING_DONE + done as u8
}

/// Estimate time left at `percent` after `elapsed`
///
/// Extrapolates linearly from observed throughput. Before anything but the
/// start of counting has been reported, scales `fallback_total` instead.
pub fn estimate_remaining(percent: u8, elapsed: Duration, fallback_total: Duration) -> Duration {
    let percent = percent.min(COMPLETE);
    if percent == COMPLETE {
        return Duration::ZERO;
    }
    let left = f64::from(COMPLETE - percent);
    if percent <= COUNTING_STARTED || elapsed.is_zero() {
        return fallback_total.mul_f64(left / f64::from(COMPLETE));
    }
    elapsed.mul_f64(left / f64::from(percent))
}

/// Render a duration as whole minutes, rounding up
pub fn format_remaining(remaining: Duration) -> String {
    let minutes = remaining.as_secs().div_ceil(60);
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{} minutes", minutes)
    }
}
