//! Single-writer reconcile loop.
//!
//! One spawned task owns the [`JobState`], drains the channel's event
//! stream, and publishes each updated view through a
//! `tokio::sync::watch` channel. Presentation code holds the
//! [`watch::Receiver`] and never mutates anything. Frames that race an
//! unsubscribe are discarded by the cancellation guard.

use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use osprey_channel::messages::WireMessage;
use osprey_channel::subscription::SubscriptionHandle;
use osprey_core::snapshot::ResultSnapshot;
use osprey_core::types::ProfileId;

use crate::progress::ProgressView;
use crate::state::{JobPhase, JobState};

/// Read-only view of the reconciled job state.
#[derive(Debug, Clone)]
pub struct JobView {
    pub phase: JobPhase,
    pub progress: ProgressView,
    pub snapshot: ResultSnapshot,
    pub error: Option<String>,
}

impl From<&JobState> for JobView {
    fn from(state: &JobState) -> Self {
        Self {
            phase: state.phase,
            progress: state.progress.clone(),
            snapshot: state.snapshot.clone(),
            error: state.error.clone(),
        }
    }
}

/// Handle to a running reconcile worker.
pub struct Reconciler {
    view_rx: watch::Receiver<JobView>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl Reconciler {
    /// Watch receiver for view changes.
    pub fn view(&self) -> watch::Receiver<JobView> {
        self.view_rx.clone()
    }

    /// Snapshot of the current view.
    pub fn current(&self) -> JobView {
        self.view_rx.borrow().clone()
    }

    /// Wait for the worker to exit (event stream closed or cancelled).
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), task).await;
        }
    }
}

/// Spawn a reconcile worker over an event stream.
///
/// `baseline` seeds the snapshot before any `update` arrives. The
/// worker stops when `events` closes or `cancel` fires; once cancelled
/// it mutates nothing, even if frames are already queued.
pub fn spawn(
    profile_id: ProfileId,
    baseline: Option<ResultSnapshot>,
    events: mpsc::UnboundedReceiver<WireMessage>,
    cancel: CancellationToken,
) -> Reconciler {
    let state = match baseline {
        Some(snapshot) => JobState::with_baseline(profile_id, snapshot),
        None => JobState::new(profile_id),
    };

    let (view_tx, view_rx) = watch::channel(JobView::from(&state));
    let task = tokio::spawn(run_reconcile(state, events, view_tx, cancel));

    Reconciler {
        view_rx,
        task: Some(task),
    }
}

/// Attach a reconcile worker to a channel subscription.
///
/// Takes the subscription's event stream (so this works once per
/// handle) and shares its cancellation token: unsubscribing stops the
/// worker too.
pub fn attach(
    handle: &mut SubscriptionHandle,
    baseline: Option<ResultSnapshot>,
) -> Option<Reconciler> {
    let events = handle.take_events()?;
    Some(spawn(
        handle.profile_id(),
        baseline,
        events,
        handle.cancellation_token(),
    ))
}

async fn run_reconcile(
    mut state: JobState,
    mut events: mpsc::UnboundedReceiver<WireMessage>,
    view_tx: watch::Sender<JobView>,
    cancel: CancellationToken,
) {
    let profile_id = state.profile_id();

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(profile_id, "Reconciler cancelled");
                return;
            }
            event = events.recv() => match event {
                Some(event) => event,
                None => {
                    tracing::debug!(profile_id, "Event stream closed");
                    return;
                }
            },
        };

        // Still-subscribed guard: a frame that raced the unsubscribe
        // must not mutate state for a view nobody is showing anymore.
        if cancel.is_cancelled() {
            return;
        }

        state.apply(&event, Instant::now());

        tracing::debug!(
            profile_id,
            phase = ?state.phase,
            percent = state.progress.percent,
            "Reconciled event",
        );

        let _ = view_tx.send(JobView::from(&state));
    }
}
