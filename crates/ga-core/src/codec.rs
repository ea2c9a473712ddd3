//! Abstract byte-stream primitives.
//!
//! The on-the-wire encoding of user data is explicitly out of scope (see
//! spec §1): genomes, fitness, and factory parameters are opaque blobs to
//! everything except the problem plug-in. What *is* in scope is the shape
//! of the stream they are read from and written to, so that `ga-protocol`
//! can frame arbitrary plug-in payloads without knowing their contents.

use ga_error::Result;

/// A sink for primitive, little-endian values. Concrete implementations
/// (see `ga-protocol::codec`) write into a length-prefixed wire buffer.
pub trait ByteWriter {
    fn write_i32(&mut self, value: i32) -> Result<()>;
    fn write_f64(&mut self, value: f64) -> Result<()>;
    fn write_bool(&mut self, value: bool) -> Result<()>;
    fn write_bytes(&mut self, value: &[u8]) -> Result<()>;
    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }
}

/// A source of primitive, little-endian values, the dual of [`ByteWriter`].
pub trait ByteReader {
    fn read_i32(&mut self) -> Result<i32>;
    fn read_f64(&mut self) -> Result<f64>;
    fn read_bool(&mut self) -> Result<bool>;
    fn read_bytes(&mut self) -> Result<Vec<u8>>;
    fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|e| ga_error::ga_err!(Codec: "invalid utf-8: {}", e))
    }
}

/// A simple in-memory [`ByteWriter`]/[`ByteReader`] pair, used by tests and
/// by callers that only need to round-trip a payload without going over the
/// wire (e.g. cloning a genome's serialized form into the best-set).
#[derive(Default)]
pub struct MemoryBuffer {
    bytes: Vec<u8>,
    cursor: usize,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { bytes, cursor: 0 }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// The bytes not yet consumed by a `read_*` call. Used by callers that
    /// read a generic envelope (a command id, a factory id) off the front
    /// of a message and then hand the rest along as an opaque blob to
    /// someone who *does* know how to decode it (e.g. `ga-net`'s
    /// connection manager forwarding a FACTORY body to the coordinator).
    pub fn remaining(&self) -> &[u8] {
        &self.bytes[self.cursor..]
    }

    /// Reads an `i32` without advancing the cursor, so a caller can branch
    /// on a value (a factory id, to discard a stale reply) before deciding
    /// whether to consume it for real.
    pub fn peek_i32(&self) -> Result<i32> {
        if self.cursor + 4 > self.bytes.len() {
            ga_error::ga_bail!(Codec: "buffer underrun peeking i32: need 4 bytes, have {}", self.bytes.len() - self.cursor);
        }
        Ok(i32::from_le_bytes(self.bytes[self.cursor..self.cursor + 4].try_into().unwrap()))
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.cursor + n > self.bytes.len() {
            ga_error::ga_bail!(Codec: "buffer underrun: need {} bytes, have {}", n, self.bytes.len() - self.cursor);
        }
        let slice = &self.bytes[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(slice)
    }
}

impl ByteWriter for MemoryBuffer {
    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.bytes.push(value as u8);
        Ok(())
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.write_i32(value.len() as i32)?;
        self.bytes.extend_from_slice(value);
        Ok(())
    }
}

impl ByteReader for MemoryBuffer {
    fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.take(8)?;
        Ok(f64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_bool(&mut self) -> Result<bool> {
        let bytes = self.take(1)?;
        Ok(bytes[0] != 0)
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_i32()?;
        ga_error::ga_ensure!(len >= 0, Codec: "negative byte-array length {}", len);
        Ok(self.take(len as usize)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_primitives() {
        let mut buf = MemoryBuffer::new();
        buf.write_i32(-42).unwrap();
        buf.write_f64(3.25).unwrap();
        buf.write_bool(true).unwrap();
        buf.write_string("hello").unwrap();

        let mut read = MemoryBuffer::from_vec(buf.into_vec());
        assert_eq!(read.read_i32().unwrap(), -42);
        assert_eq!(read.read_f64().unwrap(), 3.25);
        assert!(read.read_bool().unwrap());
        assert_eq!(read.read_string().unwrap(), "hello");
    }

    #[test]
    fn underrun_is_an_error() {
        let mut buf = MemoryBuffer::new();
        buf.write_i32(1).unwrap();
        let mut read = MemoryBuffer::from_vec(buf.into_vec());
        read.read_i32().unwrap();
        assert!(read.read_i32().is_err());
    }

    #[test]
    fn peek_does_not_consume() {
        let mut buf = MemoryBuffer::new();
        buf.write_i32(7).unwrap();
        buf.write_i32(8).unwrap();
        let read = MemoryBuffer::from_vec(buf.into_vec());
        assert_eq!(read.peek_i32().unwrap(), 7);
        assert_eq!(read.peek_i32().unwrap(), 7);
    }

    #[test]
    fn remaining_returns_the_unconsumed_tail() {
        let mut buf = MemoryBuffer::new();
        buf.write_i32(1).unwrap();
        buf.write_i32(2).unwrap();
        let mut read = MemoryBuffer::from_vec(buf.into_vec());
        read.read_i32().unwrap();
        assert_eq!(read.remaining().len(), 4);
    }
}
