//! Inbound WebSocket message types and parser.
//!
//! The backend sends one JSON object per text frame, discriminated by a
//! `type` field with the payload fields inline. This module
//! deserializes them into a strongly-typed [`WireMessage`] enum.

use osprey_core::types::ProfileId;
use serde::Deserialize;

/// All known inbound frame types.
///
/// Deserialized via the internally-tagged `"type"` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    /// Search progress for one profile (percentage + source counts).
    #[serde(rename = "progress")]
    Progress(ProgressFrame),

    /// A partial result document to merge into the snapshot.
    #[serde(rename = "update")]
    Update(UpdateFrame),

    /// The search failed with an error.
    #[serde(rename = "error")]
    Error(ErrorFrame),
}

impl WireMessage {
    /// Profile id this frame targets, if it carries one.
    ///
    /// `error` frames from older backends omit the id and apply to the
    /// active subscription.
    pub fn profile_id(&self) -> Option<ProfileId> {
        match self {
            Self::Progress(frame) => Some(frame.profile_id),
            Self::Update(frame) => Some(frame.profile_id),
            Self::Error(frame) => frame.profile_id,
        }
    }
}

/// Payload for `progress` frames.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressFrame {
    pub profile_id: ProfileId,
    /// Completion percentage (0-100).
    pub progress: u8,
    /// Human-readable status line.
    #[serde(default)]
    pub message: String,
    /// Sources finished so far.
    #[serde(default)]
    pub completed: u32,
    /// Total sources queried for this search.
    #[serde(default)]
    pub total: u32,
    /// Unix timestamp set by the producer. Informational only; the
    /// consumer keeps its own clock for ETA.
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// Payload for `update` frames.
///
/// `data` is the accumulating result document. A field absent from
/// `data` means "no change", never "clear this field".
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateFrame {
    pub profile_id: ProfileId,
    pub data: serde_json::Value,
}

/// Payload for `error` frames.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorFrame {
    /// Human-readable error description.
    pub error: String,
    /// The backend historically sent errors without a profile id; when
    /// present, the frame is scoped to that profile.
    #[serde(default)]
    pub profile_id: Option<ProfileId>,
}

/// Parse one WebSocket text frame into a typed message.
///
/// Returns `Err` for malformed JSON or unknown `type` values. Callers
/// drop and log such frames without closing the connection.
pub fn parse_frame(text: &str) -> Result<WireMessage, serde_json::Error> {
    serde_json::from_str(text)
}
