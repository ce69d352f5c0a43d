//! One-shot fetch of the last persisted profile snapshot.
//!
//! Plain request/response over HTTP, used to seed the
//! [`ResultSnapshot`] before any live `update` arrives. Not part of
//! the sync hot path: a failed fetch just means starting from an empty
//! snapshot.

use serde::Deserialize;

use osprey_core::snapshot::ResultSnapshot;
use osprey_core::types::{ProfileId, Timestamp};

/// Persisted profile row as returned by `GET /api/profile/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRecord {
    pub id: ProfileId,
    #[serde(default)]
    pub status: Option<String>,
    /// The last persisted result document, if the search has produced
    /// anything yet.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

/// Errors from the baseline fetch.
#[derive(Debug, thiserror::Error)]
pub enum BaselineError {
    /// The request failed or the body could not be decoded.
    #[error("Baseline request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Fetch the persisted snapshot for a profile.
///
/// Returns `Ok(None)` when the profile exists but has no stored data
/// yet.
pub async fn fetch_baseline(
    api_base_url: &str,
    profile_id: ProfileId,
) -> Result<Option<ResultSnapshot>, BaselineError> {
    let url = format!("{api_base_url}/api/profile/{profile_id}");

    let response = reqwest::get(&url).await?;
    if !response.status().is_success() {
        return Err(BaselineError::Status(response.status()));
    }

    let record: ProfileRecord = response.json().await?;

    tracing::info!(
        profile_id = record.id,
        status = record.status.as_deref().unwrap_or("unknown"),
        has_data = record.data.is_some(),
        "Fetched baseline snapshot",
    );

    Ok(record.data.as_ref().map(ResultSnapshot::from_baseline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_record_deserializes_with_data() {
        let record: ProfileRecord = serde_json::from_value(json!({
            "id": 7,
            "status": "complete",
            "data": {"results": {"github": {"login": "a"}}},
            "created_at": "2026-08-20T12:00:00Z",
        }))
        .unwrap();

        assert_eq!(record.id, 7);
        assert_eq!(record.status.as_deref(), Some("complete"));
        assert!(record.data.is_some());
        assert!(record.created_at.is_some());
    }

    #[test]
    fn profile_record_tolerates_missing_optional_fields() {
        let record: ProfileRecord = serde_json::from_value(json!({"id": 3})).unwrap();
        assert_eq!(record.id, 3);
        assert!(record.status.is_none());
        assert!(record.data.is_none());
    }

    #[test]
    fn baseline_data_seeds_a_snapshot() {
        let record: ProfileRecord = serde_json::from_value(json!({
            "id": 1,
            "data": {"status": "pending", "primary_image": "https://x/a.png"},
        }))
        .unwrap();

        let snapshot = record.data.as_ref().map(ResultSnapshot::from_baseline).unwrap();
        assert_eq!(snapshot.status.as_deref(), Some("pending"));
        assert_eq!(snapshot.primary_image.as_deref(), Some("https://x/a.png"));
    }
}
