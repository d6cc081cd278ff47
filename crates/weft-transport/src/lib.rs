//! weft-transport: the reconnecting link between a weft replica and the
//! document service.
//!
//! - `spawn` / `BridgeHandle` - the bridge task and its host-side handle
//! - `Channel` / `Connector` - the duplex channel it runs over
//! - `WsConnector` - the websocket implementation
//! - `Inbound` - incoming wire messages

mod bridge;
mod channel;
mod config;
mod error;
pub mod messages;
mod outbox;
mod state;
mod ws;

pub use bridge::{BridgeHandle, spawn};
pub use channel::{Channel, Connector};
pub use config::{Endpoint, TransportConfig};
pub use error::{ConfigError, TransportError};
pub use messages::Inbound;
pub use outbox::Outbox;
pub use state::ConnectionState;
pub use ws::{WsChannel, WsConnector};
