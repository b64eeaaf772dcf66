//! Matchsync Realtime - pushes sync progress to WebSocket clients.
//!
//! [`ProgressBroadcastHub`] owns every live connection and the index of which
//! connection watches which entity. It is transport-agnostic: a connection is
//! any sink of [`WsFrame`]s paired with a stream of them, so the HTTP layer
//! only adapts its socket type.

pub mod connection;
pub mod errors;
pub mod frame;
pub mod hub;
pub mod messages;

pub use errors::HubError;
pub use frame::{CloseReason, MessageAssembler, WsFrame};
pub use hub::{HubConfig, HubStats, ProgressBroadcastHub};
pub use messages::{ClientMessage, SyncProgressMessage};
