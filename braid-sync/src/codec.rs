//! Binary framing for [`WireMessage`]s.
//!
//! ```text
//! [1-byte type][4-byte big-endian payload length][JSON payload]
//! ```
//!
//! Operation frames must stay under [`OPERATION_BUDGET`] bytes; every other
//! frame is bounded by [`MAX_FRAME_SIZE`].

use crate::error::{SyncError, SyncResult};
use crate::protocol::WireMessage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Type tag plus length prefix.
pub const HEADER_LEN: usize = 5;

/// Maximum encoded size of an `Insert` or `Delete` frame (exclusive).
pub const OPERATION_BUDGET: usize = 1024;

/// Maximum encoded size of any frame (16 MB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Message type tags.
pub mod tag {
    pub const INSERT: u8 = 0x01;
    pub const DELETE: u8 = 0x02;
    pub const JOIN: u8 = 0x10;
    pub const RESYNC: u8 = 0x11;
    pub const LEAVE: u8 = 0x12;
    pub const ACK: u8 = 0x13;
    pub const HORIZON: u8 = 0x14;
    pub const SNAPSHOT: u8 = 0x20;
    pub const ERROR: u8 = 0x21;
}

fn limit_for(tag: u8) -> usize {
    match tag {
        tag::INSERT | tag::DELETE => OPERATION_BUDGET - 1,
        _ => MAX_FRAME_SIZE,
    }
}

/// Encodes one message into a frame.
pub fn encode<T: Serialize>(message: &WireMessage<T>) -> SyncResult<Vec<u8>> {
    let (tag, payload) = match message {
        WireMessage::Insert(op) => (tag::INSERT, serde_json::to_vec(op)?),
        WireMessage::Delete(op) => (tag::DELETE, serde_json::to_vec(op)?),
        WireMessage::Join(m) => (tag::JOIN, serde_json::to_vec(m)?),
        WireMessage::Resync(m) => (tag::RESYNC, serde_json::to_vec(m)?),
        WireMessage::Leave(m) => (tag::LEAVE, serde_json::to_vec(m)?),
        WireMessage::Ack(m) => (tag::ACK, serde_json::to_vec(m)?),
        WireMessage::Horizon(m) => (tag::HORIZON, serde_json::to_vec(m)?),
        WireMessage::Snapshot(m) => (tag::SNAPSHOT, serde_json::to_vec(m)?),
        WireMessage::Error(m) => (tag::ERROR, serde_json::to_vec(m)?),
    };

    let size = HEADER_LEN + payload.len();
    let limit = limit_for(tag);
    if size > limit {
        return Err(SyncError::FrameTooLarge { size, limit });
    }

    let mut frame = Vec::with_capacity(size);
    frame.push(tag);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decodes the frame at the start of `buf`.
///
/// Returns the message and the number of bytes it occupied; anything after
/// that belongs to the next frame.
pub fn decode<T: DeserializeOwned>(buf: &[u8]) -> SyncResult<(WireMessage<T>, usize)> {
    if buf.len() < HEADER_LEN {
        return Err(SyncError::Protocol(format!(
            "frame shorter than header: {} bytes",
            buf.len()
        )));
    }
    let tag = buf[0];
    let len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
    let remaining = buf.len() - HEADER_LEN;
    if len > remaining {
        return Err(SyncError::Protocol(format!(
            "declared payload of {len} bytes but only {remaining} remain"
        )));
    }
    let message = decode_payload(tag, &buf[HEADER_LEN..HEADER_LEN + len])?;
    Ok((message, HEADER_LEN + len))
}

fn decode_payload<T: DeserializeOwned>(tag: u8, payload: &[u8]) -> SyncResult<WireMessage<T>> {
    let invalid = |e: serde_json::Error| {
        SyncError::Protocol(format!("bad payload for type {tag:#04x}: {e}"))
    };
    let message = match tag {
        tag::INSERT => WireMessage::Insert(serde_json::from_slice(payload).map_err(invalid)?),
        tag::DELETE => WireMessage::Delete(serde_json::from_slice(payload).map_err(invalid)?),
        tag::JOIN => WireMessage::Join(serde_json::from_slice(payload).map_err(invalid)?),
        tag::RESYNC => WireMessage::Resync(serde_json::from_slice(payload).map_err(invalid)?),
        tag::LEAVE => WireMessage::Leave(serde_json::from_slice(payload).map_err(invalid)?),
        tag::ACK => WireMessage::Ack(serde_json::from_slice(payload).map_err(invalid)?),
        tag::HORIZON => WireMessage::Horizon(serde_json::from_slice(payload).map_err(invalid)?),
        tag::SNAPSHOT => WireMessage::Snapshot(serde_json::from_slice(payload).map_err(invalid)?),
        tag::ERROR => WireMessage::Error(serde_json::from_slice(payload).map_err(invalid)?),
        other => return Err(SyncError::Protocol(format!("unknown message type {other:#04x}"))),
    };
    Ok(message)
}

/// Reads one frame, returning its raw bytes, or `None` on a clean EOF
/// before the header.
pub async fn read_raw_frame<R: AsyncRead + Unpin>(io: &mut R) -> SyncResult<Option<Vec<u8>>> {
    let mut header = [0u8; HEADER_LEN];
    match io.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    let limit = limit_for(header[0]);
    if HEADER_LEN + len > limit {
        return Err(SyncError::FrameTooLarge {
            size: HEADER_LEN + len,
            limit,
        });
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + len);
    frame.extend_from_slice(&header);
    frame.resize(HEADER_LEN + len, 0);
    io.read_exact(&mut frame[HEADER_LEN..]).await?;
    Ok(Some(frame))
}

/// Reads and decodes one frame, or `None` on a clean EOF.
pub async fn read_frame<T, R>(io: &mut R) -> SyncResult<Option<WireMessage<T>>>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    match read_raw_frame(io).await? {
        Some(frame) => Ok(Some(decode(&frame)?.0)),
        None => Ok(None),
    }
}

/// Writes an already encoded frame.
pub async fn write_raw_frame<W: AsyncWrite + Unpin>(io: &mut W, frame: &[u8]) -> SyncResult<()> {
    io.write_all(frame).await?;
    io.flush().await?;
    Ok(())
}

/// Encodes and writes one message.
pub async fn write_frame<T, W>(io: &mut W, message: &WireMessage<T>) -> SyncResult<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let frame = encode(message)?;
    write_raw_frame(io, &frame).await
}
