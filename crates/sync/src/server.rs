//! # Sync listener
//!
//! One task accepts connections; each connection is handled on its own
//! spawned task, reads exactly one [`RpcRequest`], writes exactly one
//! [`RpcResponse`], then closes — matching the synchronous
//! one-call-per-connection model the transport encoding commits to.

use crate::framing::{read_frame, write_frame, FramingError};
use crate::handler::SyncHandler;
use crate::protocol::{RpcRequest, RpcResponse};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Diffs larger than this make a `Sync` call report `sync_limit = true`
/// instead of the events themselves; the caller must fast-forward.
pub const DEFAULT_SYNC_LIMIT: usize = 1000;

/// Accepts and serves sync connections on one bound address.
pub struct SyncServer {
    listener: TcpListener,
    handler: Arc<dyn SyncHandler>,
    sync_limit: usize,
}

impl SyncServer {
    /// Binds `addr` and wraps it with a request handler.
    pub async fn bind(
        addr: &str,
        handler: Arc<dyn SyncHandler>,
    ) -> std::io::Result<Self> {
        Self::bind_with_limit(addr, handler, DEFAULT_SYNC_LIMIT).await
    }

    /// As [`Self::bind`], with an explicit sync-diff limit.
    pub async fn bind_with_limit(
        addr: &str,
        handler: Arc<dyn SyncHandler>,
        sync_limit: usize,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            handler,
            sync_limit,
        })
    }

    /// The address actually bound (useful when `addr` used port 0).
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves connections until `shutdown` is signalled.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let handler = Arc::clone(&self.handler);
                            let sync_limit = self.sync_limit;
                            tokio::spawn(async move {
                                if let Err(err) = handle_connection(stream, handler.as_ref(), sync_limit).await {
                                    debug!(%peer, error = %err, "sync connection ended with an error");
                                }
                            });
                        }
                        Err(err) => warn!(error = %err, "accept failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    handler: &dyn SyncHandler,
    sync_limit: usize,
) -> Result<(), FramingError> {
    let request: RpcRequest = read_frame(&mut stream).await?;
    let response = dispatch(handler, request, sync_limit);
    write_frame(&mut stream, &response).await
}

fn dispatch(handler: &dyn SyncHandler, request: RpcRequest, sync_limit: usize) -> RpcResponse {
    match request {
        RpcRequest::Sync { known } => match handler.event_diff(&known) {
            Ok(diff) if diff.len() > sync_limit => RpcResponse::Sync {
                from_id: handler.self_id(),
                events: Vec::new(),
                known: BTreeMap::new(),
                sync_limit: true,
            },
            Ok(events) => match handler.known_events() {
                Ok(known) => RpcResponse::Sync {
                    from_id: handler.self_id(),
                    events,
                    known,
                    sync_limit: false,
                },
                Err(message) => RpcResponse::Error { message },
            },
            Err(message) => RpcResponse::Error { message },
        },
        RpcRequest::EagerSync { events } => RpcResponse::EagerSync {
            from_id: handler.self_id(),
            success: handler.insert_events(events),
        },
        RpcRequest::FastForward => match handler.fast_forward_snapshot() {
            Some((block, frame)) => RpcResponse::FastForward {
                from_id: handler.self_id(),
                block,
                frame,
            },
            None => RpcResponse::Error {
                message: "no decided block yet".to_string(),
            },
        },
        RpcRequest::RequestBlockSignatures { from_index, to_index } => RpcResponse::BlockSignatures {
            from_id: handler.self_id(),
            signatures: handler.block_signatures(from_index, to_index),
        },
    }
}
