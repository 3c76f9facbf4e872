//! Network adapters.

pub mod bridge;

pub use bridge::{BridgeConnector, BridgeConnection};
