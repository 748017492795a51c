//! Game-state synchronization client for Schafkopf.
//!
//! The client keeps one WebSocket session per room, folds the server's
//! messages into a local [`GameView`](reconciler::GameView) and forwards
//! user intents after checking them against that view. The binary wraps
//! this in a line-oriented console.

pub mod api_client;
pub mod commands;
pub mod config;
pub mod console;
pub mod logging;
pub mod reconciler;
pub mod sync_client;
pub mod transport;

pub use config::{ClientConfig, ConfigError, Timings};
pub use reconciler::{GameSnapshot, GameView, SeatSource, ViewStatus};
pub use sync_client::{SyncClient, SyncError};
pub use transport::{ConnectionState, Connector, WsConnector};
