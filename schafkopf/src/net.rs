//! Wire protocol between the game client and the game server.
//!
//! Messages are JSON objects tagged by a `type` field and exchanged over a
//! persistent WebSocket connection.

/// Protocol error types.
pub mod errors;

/// Inbound and outbound message types.
pub mod messages;
