//! Length-prefixed framing: a 4-byte big-endian length `N ∈ (0, 1 MiB]`
//! followed by `N` payload bytes (§4.3, §6).
//!
//! `AsyncReadExt::read_exact` loops internally until the buffer is full or
//! EOF, so short reads on a stream socket are handled correctly here —
//! the single-read assumption the original design notes flag as a bug
//! (§9 Open Question a) never applies to this implementation.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::NetError;

/// Upper bound on a single frame's payload length, inclusive.
pub const MAX_FRAME_LEN: u32 = 1024 * 1024;

/// Read one length-prefixed frame. Returns [`NetError::InvalidFrameLength`]
/// if the advertised length is `0` or exceeds [`MAX_FRAME_LEN`]; callers
/// must close the connection on this error per §4.3.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Bytes, NetError> {
    let len = reader.read_u32().await?;
    if len == 0 || len > MAX_FRAME_LEN {
        return Err(NetError::InvalidFrameLength(len));
    }
    let mut buf = BytesMut::zeroed(len as usize);
    reader.read_exact(&mut buf).await?;
    Ok(buf.freeze())
}

/// Write one length-prefixed frame. `payload.len()` must fit in `u32` and
/// obey [`MAX_FRAME_LEN`]; this is an invariant of the caller, not
/// re-validated here since every internal producer already bounds its
/// payloads.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<(), NetError> {
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello").await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let payload = read_frame(&mut cursor).await.unwrap();
        assert_eq!(&payload[..], b"hello");
    }

    #[tokio::test]
    async fn zero_length_is_rejected() {
        let mut cursor = std::io::Cursor::new(0u32.to_be_bytes().to_vec());
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, NetError::InvalidFrameLength(0)));
    }

    #[tokio::test]
    async fn over_max_length_is_rejected() {
        let over = MAX_FRAME_LEN + 1;
        let mut cursor = std::io::Cursor::new(over.to_be_bytes().to_vec());
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, NetError::InvalidFrameLength(n) if n == over));
    }
}
