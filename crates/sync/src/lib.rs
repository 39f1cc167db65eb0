//! # Sync transport
//!
//! Length-prefixed `bincode` RPC over TCP for the four gossip message
//! pairs (`Sync`, `EagerSync`, `FastForward`, `RequestBlockSignatures`).
//! One request/response per connection, matching the synchronous RPC
//! model the node's gossip driver expects.
//!
//! `sync` knows nothing about `node-core::Core` directly: [`SyncHandler`]
//! is the seam the `node` binary implements over a running `Core`.

mod client;
mod framing;
mod handler;
mod protocol;
mod server;

pub use client::{SyncClient, DEFAULT_RPC_TIMEOUT};
pub use framing::{read_frame, write_frame, FramingError, MAX_FRAME_BYTES};
pub use handler::SyncHandler;
pub use protocol::{RpcRequest, RpcResponse};
pub use server::{SyncServer, DEFAULT_SYNC_LIMIT};
