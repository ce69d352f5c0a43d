//! WebSocket client for one profile's live update endpoint.
//!
//! [`ChannelClient`] holds the connection target for a single profile.
//! Call [`ChannelClient::connect`] to establish a live
//! [`ChannelConnection`] over WebSocket.

use osprey_core::types::ProfileId;
use tokio_tungstenite::{connect_async, MaybeTlsStream};

/// Connection target for one profile subscription.
///
/// The profile id is fixed for the client's lifetime; subscribing to a
/// different profile means creating a new client.
pub struct ChannelClient {
    profile_id: ProfileId,
    ws_base_url: String,
}

/// A live WebSocket connection to the backend.
pub struct ChannelConnection {
    /// Profile id this connection is scoped to.
    pub profile_id: ProfileId,
    /// The raw WebSocket stream for reading frames.
    pub ws_stream: tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl ChannelClient {
    /// Create a client targeting `{ws_base_url}/ws/{profile_id}`.
    ///
    /// * `ws_base_url` - WebSocket base URL, e.g. `ws://host:8000`.
    pub fn new(profile_id: ProfileId, ws_base_url: String) -> Self {
        Self {
            profile_id,
            ws_base_url,
        }
    }

    /// Profile id this client is scoped to.
    pub fn profile_id(&self) -> ProfileId {
        self.profile_id
    }

    /// Full endpoint URL for this profile.
    pub fn endpoint(&self) -> String {
        format!("{}/ws/{}", self.ws_base_url, self.profile_id)
    }

    /// Open the WebSocket connection for this profile.
    pub async fn connect(&self) -> Result<ChannelConnection, ChannelError> {
        let url = self.endpoint();

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            ChannelError::Connection(format!("Failed to connect to {url}: {e}"))
        })?;

        tracing::info!(
            profile_id = self.profile_id,
            url = %url,
            "WebSocket connected",
        );

        Ok(ChannelConnection {
            profile_id: self.profile_id,
            ws_stream,
        })
    }
}

/// Errors that can occur when working with the WebSocket client.
///
/// These stay inside the channel: the subscription loop retries or
/// gives up on its own, and callers only ever observe the
/// [`ConnectionState`](crate::ConnectionState) watch.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A protocol-level error on an already-established connection.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_includes_profile_id_path() {
        let client = ChannelClient::new(42, "ws://localhost:8000".into());
        assert_eq!(client.endpoint(), "ws://localhost:8000/ws/42");
    }
}
