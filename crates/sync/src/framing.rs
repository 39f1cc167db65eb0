//! # Wire framing
//!
//! Every message is a 4-byte big-endian length prefix followed by a
//! `bincode`-encoded payload. No compression, no magic bytes: the
//! transport is trusted to carry one protocol only.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames larger than this are rejected outright rather than allocated,
/// bounding the damage a misbehaving or corrupted peer can do.
pub const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame of {0} bytes exceeds the {1} byte limit")]
    TooLarge(u32, u32),
    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),
}

/// Writes `value` as one length-prefixed frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let encoded = bincode::serialize(value)?;
    let len = u32::try_from(encoded.len()).map_err(|_| {
        FramingError::TooLarge(u32::MAX, MAX_FRAME_BYTES)
    })?;
    if len > MAX_FRAME_BYTES {
        return Err(FramingError::TooLarge(len, MAX_FRAME_BYTES));
    }
    writer.write_u32(len).await?;
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame and decodes it as `T`.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, FramingError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = reader.read_u32().await?;
    if len > MAX_FRAME_BYTES {
        return Err(FramingError::TooLarge(len, MAX_FRAME_BYTES));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(bincode::deserialize(&buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RpcRequest;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn frame_round_trips_through_a_duplex_stream() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let mut known = BTreeMap::new();
        known.insert(1u64, 5u64);
        let request = RpcRequest::Sync { known };

        write_frame(&mut client, &request).await.unwrap();
        let decoded: RpcRequest = read_frame(&mut server).await.unwrap();

        match decoded {
            RpcRequest::Sync { known } => assert_eq!(known.get(&1), Some(&5)),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected_before_allocating() {
        let (mut client, mut server) = tokio::io::duplex(16);
        client.write_u32(MAX_FRAME_BYTES + 1).await.unwrap();
        client.flush().await.unwrap();
        let result: Result<RpcRequest, _> = read_frame(&mut server).await;
        assert!(matches!(result, Err(FramingError::TooLarge(_, _))));
    }
}
