//! Job state reconciliation for live profile-search updates.
//!
//! Consumes the message stream produced by `osprey-channel` and folds
//! it into a coherent, monotonically-improving view of one job:
//! progress percentage and ETA, the merged [`ResultSnapshot`], and a
//! job phase. The fold itself is a pure reducer ([`state::JobState`]);
//! the [`worker`] module wraps it in a single-writer task that
//! publishes the view through a `tokio::sync::watch` channel.
//!
//! [`ResultSnapshot`]: osprey_core::snapshot::ResultSnapshot

pub mod baseline;
pub mod progress;
pub mod state;
pub mod worker;

pub use progress::ProgressView;
pub use state::{JobPhase, JobState};
pub use worker::{attach, JobView, Reconciler};
