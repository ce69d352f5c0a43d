//! The accumulated result document for one profile search.
//!
//! The backend streams partial result documents as the search runs.
//! [`ResultSnapshot`] merges them with presence-override semantics: a
//! field is replaced only when the incoming patch carries a non-empty
//! value for it. A patch that omits a field, or sends `null` / `""` /
//! `[]` / `{}`, never erases data already shown to the user.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level fields of the result document that get dedicated handling.
const KNOWN_FIELDS: &[&str] = &[
    "status",
    "results",
    "correlation",
    "analysis",
    "images",
    "primary_image",
    "image_matches",
];

/// The merged result document for one profile.
///
/// Built from the persisted baseline (if any) plus every `update`
/// frame received over the live channel. Mutated only through
/// [`merge`](Self::merge).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSnapshot {
    /// Overall search status reported by the backend (`pending`,
    /// `complete`, `failed`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Per-source result payloads, keyed by source name. Sources merge
    /// independently: an update for one source leaves the others alone.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub results: serde_json::Map<String, Value>,

    /// Cross-source correlation output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<Value>,

    /// Confidence analysis report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Value>,

    /// Discovered profile images.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Value>,

    /// URL of the image chosen as the profile's primary one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_image: Option<String>,

    /// Reverse-image search matches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_matches: Vec<Value>,

    /// Fields the backend added that this build does not model yet.
    /// Merged with the same presence-override rule.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ResultSnapshot {
    /// Build a snapshot from a persisted baseline document.
    pub fn from_baseline(data: &Value) -> Self {
        let mut snapshot = Self::default();
        snapshot.merge(data);
        snapshot
    }

    /// Merge a partial result document into this snapshot.
    ///
    /// Presence-override: only keys present in `patch` with a non-empty
    /// value replace existing data. The `results` map merges per source
    /// key. Non-object patches are ignored.
    pub fn merge(&mut self, patch: &Value) {
        let Some(fields) = patch.as_object() else {
            return;
        };

        if let Some(status) = non_empty_str(fields.get("status")) {
            self.status = Some(status.to_string());
        }

        if let Some(results) = fields.get("results").and_then(Value::as_object) {
            for (source, payload) in results {
                if !is_empty_value(payload) {
                    self.results.insert(source.clone(), payload.clone());
                }
            }
        }

        if let Some(correlation) = non_empty(fields.get("correlation")) {
            self.correlation = Some(correlation.clone());
        }

        if let Some(analysis) = non_empty(fields.get("analysis")) {
            self.analysis = Some(analysis.clone());
        }

        if let Some(images) = fields.get("images").and_then(Value::as_array) {
            if !images.is_empty() {
                self.images = images.clone();
            }
        }

        if let Some(primary) = non_empty_str(fields.get("primary_image")) {
            self.primary_image = Some(primary.to_string());
        }

        if let Some(matches) = fields.get("image_matches").and_then(Value::as_array) {
            if !matches.is_empty() {
                self.image_matches = matches.clone();
            }
        }

        for (key, value) in fields {
            if KNOWN_FIELDS.contains(&key.as_str()) {
                continue;
            }
            if !is_empty_value(value) {
                self.extra.insert(key.clone(), value.clone());
            }
        }
    }
}

/// `null`, `""`, `[]` and `{}` all count as "no data" for merge purposes.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn non_empty(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !is_empty_value(v))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
