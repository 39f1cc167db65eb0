//! # Proxy
//!
//! The bidirectional bridge between the node and the application: block
//! commits, historical-state queries, and snapshot restores flow down;
//! submitted transactions and answers flow up. Realized as a pair of
//! bounded `tokio::sync::mpsc` channels rather than a real duplex
//! socket, so an in-process application links directly against this
//! crate; a future out-of-process application would swap this for a
//! framed stream without Core or Poset noticing the difference.

mod messages;
mod proxy;

pub use messages::{DownstreamMessage, UpstreamMessage};
pub use proxy::{AppHandle, Proxy, ProxyDriver, ProxyError};
