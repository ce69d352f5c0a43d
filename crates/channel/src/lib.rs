//! Resilient WebSocket channel for live profile-search updates.
//!
//! One subscription owns one connection to the backend's
//! `/ws/{profile_id}` endpoint. Inbound frames are parsed into typed
//! [`WireMessage`]s and forwarded to the consumer in wire order. An
//! unexpected drop triggers bounded linear-backoff reconnection;
//! [`SubscriptionHandle::unsubscribe`] cancels the connection and any
//! pending reconnect.
//!
//! Transport failures never propagate to callers. The only externally
//! observable signals are the [`ConnectionState`] watch and the message
//! stream itself.

pub mod backoff;
pub mod client;
pub mod messages;
pub mod subscription;

pub use backoff::{ReconnectConfig, RetrySchedule};
pub use client::{ChannelClient, ChannelError};
pub use messages::WireMessage;
pub use subscription::{subscribe, ConnectionState, SubscriptionHandle};
