//! The length-prefixed TCP frame every coordinator/helper/client message is
//! wrapped in, independent of whatever command the payload encodes.
//!
//! `4-byte big-endian magic | 4-byte big-endian length | payload`. The
//! payload itself is little-endian throughout (command id, then fields) —
//! only the frame header is big-endian, matching a conventional network
//! byte order wrapper around an otherwise host-endian wire format.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use ga_error::Result;

pub const MAGIC: u32 = 0x5041_434B;

/// Frames larger than this are rejected outright — a malformed or
/// malicious length field should never cause an unbounded allocation.
pub const MAX_PAYLOAD_BYTES: usize = 128 * 1024 * 1024;

const HEADER_BYTES: usize = 8;

/// Wraps `payload` in a frame header, ready to write to a socket.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes> {
    ga_error::ga_ensure!(
        payload.len() <= MAX_PAYLOAD_BYTES,
        Protocol: "payload of {} bytes exceeds the {}-byte frame limit",
        payload.len(),
        MAX_PAYLOAD_BYTES
    );

    let mut buf = BytesMut::with_capacity(HEADER_BYTES + payload.len());
    buf.put_u32(MAGIC);
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Attempts to pull one complete frame's payload out of `buf`, a growing
/// receive buffer fed by repeated socket reads. Returns `Ok(None)` when
/// `buf` doesn't yet hold a full frame — the caller should read more bytes
/// and try again. On success, the consumed bytes (header and payload) are
/// advanced out of `buf`.
pub fn try_decode_frame(buf: &mut BytesMut) -> Result<Option<Bytes>> {
    if buf.len() < HEADER_BYTES {
        return Ok(None);
    }

    let magic = u32::from_be_bytes(buf[0..4].try_into().unwrap());
    ga_error::ga_ensure!(
        magic == MAGIC,
        Protocol: "bad frame magic: expected {:#010x}, got {:#010x}",
        MAGIC,
        magic
    );

    let len = u32::from_be_bytes(buf[4..8].try_into().unwrap()) as usize;
    ga_error::ga_ensure!(
        len <= MAX_PAYLOAD_BYTES,
        Protocol: "frame length {} exceeds the {}-byte limit",
        len,
        MAX_PAYLOAD_BYTES
    );

    if buf.len() < HEADER_BYTES + len {
        return Ok(None);
    }

    buf.advance(HEADER_BYTES);
    Ok(Some(buf.split_to(len).freeze()))
}
