//! Host-side bridge for driving a card run over local HTTP.
//!
//! A [`BridgeServer`] is ticked once per host frame. Each tick accepts at most
//! one connection, reads what is available on pending ones and answers every
//! complete request against the world exposed by a [`Host`].

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod host;
pub mod legal;
pub mod memory_host;
pub mod metrics;
pub mod network;
pub mod phase;
pub mod router;
pub mod snapshot;
pub mod world;

pub use config::{BridgeConfig, BridgeConfigError};
pub use dispatch::{dispatch, observe};
pub use host::{Host, HostError, HostValue, TableKey, TableRef};
pub use memory_host::{MemoryHost, WorldBuilder};
pub use metrics::BridgeMetrics;
pub use network::BridgeServer;
pub use phase::classify;
pub use router::{route, HandlerError};
pub use snapshot::build_snapshot;
