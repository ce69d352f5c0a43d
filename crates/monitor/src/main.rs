//! `osprey-monitor` -- CLI watcher for one profile search job.
//!
//! Fetches the persisted baseline snapshot, subscribes to the
//! backend's live WebSocket channel, and logs every reconciled state
//! change until the job loads, fails, or the process is interrupted.
//! Stands in for the dashboard as the presentation-side consumer.
//!
//! # Environment variables
//!
//! | Variable                  | Required | Default                 | Description                        |
//! |---------------------------|----------|-------------------------|------------------------------------|
//! | `PROFILE_ID`              | yes      | --                      | Integer id of the profile to watch |
//! | `API_BASE_URL`            | no       | `http://localhost:8000` | HTTP base for the baseline fetch   |
//! | `WS_BASE_URL`             | no       | `ws://localhost:8000`   | WebSocket base URL                 |
//! | `RECONNECT_BASE_DELAY_MS` | no       | `1000`                  | Linear backoff base delay          |
//! | `RECONNECT_MAX_ATTEMPTS`  | no       | `5`                     | Reconnect attempt ceiling          |

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use osprey_channel::{subscribe, ReconnectConfig};
use osprey_core::types::ProfileId;
use osprey_reconciler::baseline::fetch_baseline;
use osprey_reconciler::{attach, JobPhase};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "osprey_monitor=info,osprey_channel=info,osprey_reconciler=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let profile_id: ProfileId = std::env::var("PROFILE_ID")
        .unwrap_or_else(|_| {
            tracing::error!("PROFILE_ID environment variable is required");
            std::process::exit(1);
        })
        .parse()
        .unwrap_or_else(|_| {
            tracing::error!("PROFILE_ID must be a valid integer");
            std::process::exit(1);
        });

    let api_base_url =
        std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".into());
    let ws_base_url = std::env::var("WS_BASE_URL").unwrap_or_else(|_| "ws://localhost:8000".into());
    let config = ReconnectConfig::from_env();

    tracing::info!(
        profile_id,
        api_base_url = %api_base_url,
        ws_base_url = %ws_base_url,
        "Starting osprey-monitor",
    );

    let baseline = match fetch_baseline(&api_base_url, profile_id).await {
        Ok(baseline) => baseline,
        Err(e) => {
            tracing::warn!(error = %e, "Baseline fetch failed, starting from an empty snapshot");
            None
        }
    };

    let mut handle = subscribe(&ws_base_url, profile_id, config);
    let Some(reconciler) = attach(&mut handle, baseline) else {
        tracing::error!("Subscription event stream already taken");
        std::process::exit(1);
    };

    let mut state_rx = handle.state();
    let mut view_rx = reconciler.view();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, unsubscribing");
                break;
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *state_rx.borrow();
                tracing::info!(?state, "Connection state changed");
            }
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = view_rx.borrow().clone();
                tracing::info!(
                    phase = ?view.phase,
                    percent = view.progress.percent,
                    completed = view.progress.completed_sources,
                    total = view.progress.total_sources,
                    eta_seconds = ?view.progress.eta_seconds,
                    status = %view.progress.message,
                    "Job state changed",
                );

                if view.phase.is_terminal() {
                    match view.phase {
                        JobPhase::Loaded => tracing::info!(
                            sources = view.snapshot.results.len(),
                            "Search complete",
                        ),
                        JobPhase::Failed => tracing::error!(
                            error = view.error.as_deref().unwrap_or("unknown"),
                            "Search failed",
                        ),
                        _ => {}
                    }
                    break;
                }
            }
        }
    }

    handle.shutdown().await;
    reconciler.shutdown().await;
}
