//! The per-job reducer: `(current state, event) -> new state`.
//!
//! Pure with respect to I/O: time enters only through the `Instant`
//! the caller passes to [`JobState::apply`], so every invariant is
//! testable without a live socket.

use std::time::Instant;

use osprey_channel::messages::{ErrorFrame, ProgressFrame, UpdateFrame, WireMessage};
use osprey_core::snapshot::ResultSnapshot;
use osprey_core::types::ProfileId;

use crate::progress::{estimate_eta, ProgressView};

/// Lifecycle phase of one job subscription.
///
/// `Idle -> Loading -> {Loaded | Failed}`. `Loaded` and `Failed` are
/// terminal for ETA purposes, but late `update` frames may still merge
/// snapshot data afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum JobPhase {
    /// Subscribed, no event seen yet.
    Idle,
    /// At least one event seen, job still running.
    Loading,
    /// The job completed (percent hit 100 or an `update` arrived).
    Loaded,
    /// The backend reported an error. Terminal for the UI only; later
    /// frames are still processed.
    Failed,
}

impl JobPhase {
    /// Whether the job has reached a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Loaded | Self::Failed)
    }
}

/// Reconciled state for one job subscription.
///
/// Recreated fresh per profile id; events for other profiles are
/// ignored without side effects.
#[derive(Debug, Clone)]
pub struct JobState {
    profile_id: ProfileId,
    /// Current lifecycle phase.
    pub phase: JobPhase,
    /// Progress percentage, counts and ETA.
    pub progress: ProgressView,
    /// The merged result document.
    pub snapshot: ResultSnapshot,
    /// Last error reported by the backend, if any.
    pub error: Option<String>,
    /// Wall-clock anchor captured at the first non-zero progress
    /// observation. Used only to derive ETA.
    started_at: Option<Instant>,
}

impl JobState {
    /// Fresh state for a new subscription, empty snapshot.
    pub fn new(profile_id: ProfileId) -> Self {
        Self {
            profile_id,
            phase: JobPhase::Idle,
            progress: ProgressView::default(),
            snapshot: ResultSnapshot::default(),
            error: None,
            started_at: None,
        }
    }

    /// Fresh state seeded with the persisted baseline snapshot.
    pub fn with_baseline(profile_id: ProfileId, snapshot: ResultSnapshot) -> Self {
        Self {
            snapshot,
            ..Self::new(profile_id)
        }
    }

    /// Profile id this state is scoped to.
    pub fn profile_id(&self) -> ProfileId {
        self.profile_id
    }

    /// Fold one inbound event into the state.
    ///
    /// `now` is the observation time for ETA purposes. Events scoped to
    /// a different profile are ignored entirely.
    pub fn apply(&mut self, event: &WireMessage, now: Instant) {
        match event {
            WireMessage::Progress(frame) => {
                if frame.profile_id == self.profile_id {
                    self.apply_progress(frame, now);
                }
            }
            WireMessage::Update(frame) => {
                if frame.profile_id == self.profile_id {
                    self.apply_update(frame);
                }
            }
            WireMessage::Error(frame) => {
                // A bare error applies to the active subscription; a
                // scoped one must match.
                if frame.profile_id.is_none() || frame.profile_id == Some(self.profile_id) {
                    self.apply_error(frame);
                }
            }
        }
    }

    fn apply_progress(&mut self, frame: &ProgressFrame, now: Instant) {
        if self.phase == JobPhase::Idle {
            self.phase = JobPhase::Loading;
        }

        self.progress.message = frame.message.clone();
        self.progress.completed_sources = frame.completed;
        self.progress.total_sources = frame.total;

        // Monotonic: a stale or out-of-order frame never lowers percent.
        let percent = frame.progress.min(100);
        if percent > self.progress.percent {
            self.progress.percent = percent;
        }

        if self.started_at.is_none() && self.progress.percent > 0 {
            self.started_at = Some(now);
        }

        if self.progress.percent >= 100 {
            self.progress.eta_seconds = Some(0.0);
            if self.phase == JobPhase::Loading {
                self.phase = JobPhase::Loaded;
            }
        } else if self.phase == JobPhase::Loading {
            self.progress.eta_seconds = self.started_at.and_then(|anchor| {
                estimate_eta(
                    self.progress.percent,
                    now.duration_since(anchor).as_secs_f64(),
                )
            });
        }
    }

    /// An `update` is authoritative completion, with or without a
    /// preceding 100% progress frame.
    fn apply_update(&mut self, frame: &UpdateFrame) {
        self.snapshot.merge(&frame.data);
        self.progress.percent = 100;
        self.progress.eta_seconds = Some(0.0);
        if self.phase != JobPhase::Failed {
            self.phase = JobPhase::Loaded;
        }
    }

    fn apply_error(&mut self, frame: &ErrorFrame) {
        self.error = Some(frame.error.clone());
        self.progress.percent = 0;
        self.progress.eta_seconds = None;
        self.phase = JobPhase::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osprey_channel::messages::parse_frame;
    use serde_json::json;
    use std::time::Duration;

    fn progress_event(profile_id: i64, percent: u8, message: &str) -> WireMessage {
        parse_frame(&format!(
            r#"{{"type":"progress","profile_id":{profile_id},"progress":{percent},"message":"{message}","completed":1,"total":4}}"#
        ))
        .unwrap()
    }

    fn update_event(profile_id: i64, data: serde_json::Value) -> WireMessage {
        WireMessage::Update(UpdateFrame { profile_id, data })
    }

    fn error_event(error: &str, profile_id: Option<i64>) -> WireMessage {
        WireMessage::Error(ErrorFrame {
            error: error.to_string(),
            profile_id,
        })
    }

    #[test]
    fn percent_is_running_max_over_any_order() {
        let t0 = Instant::now();
        let samples: [u8; 6] = [10, 40, 20, 90, 5, 60];

        let mut state = JobState::new(1);
        let mut running_max = 0u8;
        for (i, &p) in samples.iter().enumerate() {
            state.apply(
                &progress_event(1, p, "m"),
                t0 + Duration::from_secs(i as u64),
            );
            running_max = running_max.max(p);
            assert_eq!(state.progress.percent, running_max);
        }
    }

    #[test]
    fn first_event_moves_idle_to_loading() {
        let mut state = JobState::new(1);
        assert_eq!(state.phase, JobPhase::Idle);

        state.apply(&progress_event(1, 0, "starting"), Instant::now());
        assert_eq!(state.phase, JobPhase::Loading);
    }

    #[test]
    fn counts_and_message_update_even_when_percent_is_stale() {
        let t0 = Instant::now();
        let mut state = JobState::new(1);

        state.apply(&progress_event(1, 50, "halfway"), t0);
        state.apply(&progress_event(1, 10, "stale"), t0 + Duration::from_secs(1));

        assert_eq!(state.progress.percent, 50);
        assert_eq!(state.progress.message, "stale");
    }

    #[test]
    fn eta_is_none_until_nonzero_progress() {
        let t0 = Instant::now();
        let mut state = JobState::new(1);

        state.apply(&progress_event(1, 0, "starting"), t0);
        assert_eq!(state.progress.eta_seconds, None);

        // Anchor is captured here; elapsed is still zero.
        state.apply(&progress_event(1, 20, "going"), t0 + Duration::from_secs(5));
        assert_eq!(state.progress.eta_seconds, None);

        // 20 -> 40 percent over 10s: rate 4 %/s, 60 percent left = 15s.
        state.apply(&progress_event(1, 40, "going"), t0 + Duration::from_secs(15));
        let eta = state.progress.eta_seconds.unwrap();
        assert!((eta - 15.0).abs() < 1e-9, "eta was {eta}");
    }

    #[test]
    fn hundred_percent_progress_loads_the_job() {
        let t0 = Instant::now();
        let mut state = JobState::new(1);

        state.apply(&progress_event(1, 100, "done"), t0);
        assert_eq!(state.phase, JobPhase::Loaded);
        assert_eq!(state.progress.eta_seconds, Some(0.0));
    }

    #[test]
    fn update_is_authoritative_completion() {
        let mut state = JobState::new(1);

        // No prior progress at all.
        state.apply(&update_event(1, json!({"status": "complete"})), Instant::now());

        assert_eq!(state.phase, JobPhase::Loaded);
        assert_eq!(state.progress.percent, 100);
        assert_eq!(state.progress.eta_seconds, Some(0.0));
        assert_eq!(state.snapshot.status.as_deref(), Some("complete"));
    }

    #[test]
    fn update_merge_retains_fields_omitted_later() {
        let mut state = JobState::new(1);
        let now = Instant::now();

        state.apply(
            &update_event(1, json!({"results": {"github": {"login": "a"}}})),
            now,
        );
        state.apply(
            &update_event(1, json!({"results": {"twitter": {"handle": "b"}}})),
            now,
        );

        assert_eq!(state.snapshot.results["github"]["login"], "a");
        assert_eq!(state.snapshot.results["twitter"]["handle"], "b");
    }

    #[test]
    fn stale_progress_after_update_never_regresses() {
        // progress(10), progress(0, stale), update, progress(50)
        // -> percent 100, snapshot merged, job loaded.
        let t0 = Instant::now();
        let mut state = JobState::new(1);

        state.apply(&progress_event(1, 10, "starting"), t0);
        state.apply(&progress_event(1, 0, "stale"), t0 + Duration::from_secs(1));
        state.apply(
            &update_event(1, json!({"extra_field": {"a": 1}})),
            t0 + Duration::from_secs(2),
        );
        state.apply(&progress_event(1, 50, "late"), t0 + Duration::from_secs(3));

        assert_eq!(state.progress.percent, 100);
        assert_eq!(state.phase, JobPhase::Loaded);
        assert_eq!(state.snapshot.extra["extra_field"], json!({"a": 1}));
    }

    #[test]
    fn error_resets_percent_and_fails_the_job() {
        let t0 = Instant::now();
        let mut state = JobState::new(1);

        state.apply(&progress_event(1, 60, "going"), t0);
        state.apply(&error_event("rate limited", None), t0 + Duration::from_secs(1));

        assert_eq!(state.phase, JobPhase::Failed);
        assert_eq!(state.progress.percent, 0);
        assert_eq!(state.progress.eta_seconds, None);
        assert_eq!(state.error.as_deref(), Some("rate limited"));
    }

    #[test]
    fn update_after_error_still_merges() {
        // error("rate limited") followed by a data-bearing update.
        let mut state = JobState::new(1);
        let now = Instant::now();

        state.apply(&error_event("rate limited", None), now);
        state.apply(&update_event(1, json!({"b_field": 2})), now);

        assert_eq!(state.phase, JobPhase::Failed);
        assert_eq!(state.snapshot.extra["b_field"], 2);
        assert_eq!(state.progress.percent, 100);
        assert_eq!(state.error.as_deref(), Some("rate limited"));
    }

    #[test]
    fn events_for_other_profiles_are_ignored() {
        let mut state = JobState::new(1);
        let now = Instant::now();

        state.apply(&progress_event(2, 80, "other"), now);
        state.apply(&update_event(2, json!({"status": "complete"})), now);
        state.apply(&error_event("other job blew up", Some(2)), now);

        assert_eq!(state.phase, JobPhase::Idle);
        assert_eq!(state.progress.percent, 0);
        assert_eq!(state.snapshot, ResultSnapshot::default());
        assert!(state.error.is_none());
    }

    #[test]
    fn scoped_error_for_this_profile_applies() {
        let mut state = JobState::new(1);
        state.apply(&error_event("boom", Some(1)), Instant::now());
        assert_eq!(state.phase, JobPhase::Failed);
    }

    #[test]
    fn baseline_snapshot_survives_until_first_update() {
        let baseline = ResultSnapshot::from_baseline(&json!({
            "status": "pending",
            "results": {"github": {"login": "a"}},
        }));
        let mut state = JobState::with_baseline(1, baseline);

        state.apply(&progress_event(1, 30, "going"), Instant::now());
        assert_eq!(state.snapshot.results["github"]["login"], "a");

        state.apply(
            &update_event(1, json!({"status": "complete"})),
            Instant::now(),
        );
        assert_eq!(state.snapshot.status.as_deref(), Some("complete"));
        assert_eq!(state.snapshot.results["github"]["login"], "a");
    }

    #[test]
    fn overlong_percent_is_clamped() {
        let mut state = JobState::new(1);
        state.apply(&progress_event(1, 250, "bogus"), Instant::now());
        assert_eq!(state.progress.percent, 100);
        assert_eq!(state.phase, JobPhase::Loaded);
    }
}
