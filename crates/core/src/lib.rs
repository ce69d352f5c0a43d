//! Shared types for the Osprey profile dashboard sync core.
//!
//! Holds the primitives every other crate agrees on: id and timestamp
//! aliases, and the [`snapshot::ResultSnapshot`] document with its
//! presence-override merge.

pub mod snapshot;
pub mod types;
