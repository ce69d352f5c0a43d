//! Progress view and best-effort ETA estimation.

use serde::Serialize;

/// Presentation-facing progress summary for one job.
///
/// `percent` never decreases for the lifetime of a subscription (the
/// explicit error reset aside); stale or out-of-order progress frames
/// cannot regress it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressView {
    /// Completion percentage, 0-100.
    pub percent: u8,
    /// Latest human-readable status line from the backend.
    pub message: String,
    /// Sources finished so far.
    pub completed_sources: u32,
    /// Total sources queried.
    pub total_sources: u32,
    /// Estimated seconds to completion. `None` means "unknown"
    /// (rendered as "calculating"), `Some(0.0)` means done.
    pub eta_seconds: Option<f64>,
}

/// Estimate seconds remaining from one elapsed-time sample.
///
/// The rate is `percent / elapsed` since the first non-zero progress
/// observation. Returns `None` until that rate is computable, so the
/// UI shows "calculating" rather than a junk number.
pub fn estimate_eta(percent: u8, elapsed_secs: f64) -> Option<f64> {
    if percent == 0 {
        return None;
    }
    if percent >= 100 {
        return Some(0.0);
    }
    if elapsed_secs <= 0.0 {
        return None;
    }
    let rate = f64::from(percent) / elapsed_secs;
    if rate <= 0.0 {
        return None;
    }
    Some(f64::from(100 - percent) / rate)
}
