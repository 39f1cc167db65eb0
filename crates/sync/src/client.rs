//! # Sync client
//!
//! One connection per call: connect, write the request, read the
//! response, drop the stream. A timeout wraps the whole round trip.

use crate::framing::{read_frame, write_frame};
use crate::protocol::{RpcRequest, RpcResponse};
use shared_types::SyncError;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Default per-call timeout if the caller doesn't configure one.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(3);

/// Calls peers over the sync transport.
#[derive(Debug, Clone, Copy)]
pub struct SyncClient {
    call_timeout: Duration,
}

impl Default for SyncClient {
    fn default() -> Self {
        Self::new(DEFAULT_RPC_TIMEOUT)
    }
}

impl SyncClient {
    /// Builds a client with an explicit per-call timeout.
    pub fn new(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }

    /// Makes one call to `addr`, enforcing the configured timeout over
    /// the whole connect-write-read round trip.
    pub async fn call(&self, addr: &str, request: RpcRequest) -> Result<RpcResponse, SyncError> {
        timeout(self.call_timeout, self.call_inner(addr, request))
            .await
            .map_err(|_| SyncError::Timeout)?
    }

    async fn call_inner(&self, addr: &str, request: RpcRequest) -> Result<RpcResponse, SyncError> {
        let mut stream = TcpStream::connect(addr)
            .await
            .map_err(|err| SyncError::Transport(err.to_string()))?;
        write_frame(&mut stream, &request)
            .await
            .map_err(|err| SyncError::Transport(err.to_string()))?;
        read_frame(&mut stream)
            .await
            .map_err(|err| SyncError::Malformed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn call_to_unreachable_address_is_a_transport_error() {
        let client = SyncClient::new(Duration::from_millis(200));
        let result = client
            .call("127.0.0.1:1", RpcRequest::FastForward)
            .await;
        assert!(matches!(result, Err(SyncError::Transport(_)) | Err(SyncError::Timeout)));
    }
}
