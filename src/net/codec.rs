//! Length-prefixed JSON framing

use std::io;

use bytes::{BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::NetError;

/// Largest accepted payload
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

const HEADER_LEN: usize = 4;

/// Encode a message into a complete frame
pub fn encode<T: Serialize>(msg: &T) -> Result<BytesMut, NetError> {
    let payload = serde_json::to_vec(msg)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(NetError::MalformedMessage(format!(
            "outbound frame of {} bytes exceeds limit",
            payload.len()
        )));
    }
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, NetError> {
    Ok(serde_json::from_slice(payload)?)
}

pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<usize, NetError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(frame.len())
}

/// Read one frame. `Ok(None)` means the peer closed cleanly between frames.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, NetError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(NetError::StreamFault(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream closed inside a frame header",
            )));
        }
        filled += n;
    }
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(NetError::MalformedMessage(format!(
            "inbound frame of {len} bytes exceeds limit"
        )));
    }

    let mut payload = BytesMut::zeroed(len);
    reader.read_exact(&mut payload).await?;
    decode(&payload).map(Some)
}
