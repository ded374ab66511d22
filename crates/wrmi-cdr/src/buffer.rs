use bytes::BytesMut;

use crate::error::{CdrError, Result};

/// Initial capacity for buffers created with [`CdrBuffer::new`].
pub const DEFAULT_CAPACITY: usize = 8 * 1024;

/// A growable byte buffer with NIO-style cursor discipline.
///
/// Three cursors govern access: `position` (next read/write offset), `limit`
/// (one past the last valid byte) and `capacity` (allocation size), with
/// `0 <= position <= limit <= capacity` at all times.
///
/// In write mode (`clear`) data is appended at `position` and `limit` tracks
/// the full capacity; writes that would pass the capacity grow the backing
/// store by doubling. [`flip`](CdrBuffer::flip) switches to read mode:
/// `limit` becomes the old `position` and reads consume from offset zero.
///
/// All multi-byte primitives are big-endian and strings are encoded as an
/// `i32` byte count followed by that many UTF-8 bytes, no terminator, no
/// padding. Any growth invalidates previously returned slices.
pub struct CdrBuffer {
    data: BytesMut,
    position: usize,
    limit: usize,
}

impl CdrBuffer {
    /// Create a buffer with the default capacity, in write mode.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a buffer with an explicit capacity, in write mode.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::zeroed(capacity),
            position: 0,
            limit: capacity,
        }
    }

    /// Current allocation size.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Next read/write offset.
    pub fn position(&self) -> usize {
        self.position
    }

    /// One past the last valid byte.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes between `position` and `limit`.
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    /// Reset to write mode over the full capacity. Contents are not zeroed.
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.capacity();
    }

    /// Switch to read mode: `limit` becomes the current `position` and
    /// `position` rewinds to zero.
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    /// Move `position`. Fails when the new position would pass `limit`.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.limit {
            return Err(CdrError::PositionOutOfBounds {
                position,
                limit: self.limit,
            });
        }
        self.position = position;
        Ok(())
    }

    /// Move `limit`. Fails when the new limit would pass the capacity;
    /// clamps `position` down to the new limit if it exceeded it.
    pub fn set_limit(&mut self, limit: usize) -> Result<()> {
        if limit > self.capacity() {
            return Err(CdrError::LimitOutOfBounds {
                limit,
                capacity: self.capacity(),
            });
        }
        self.limit = limit;
        if self.position > limit {
            self.position = limit;
        }
        Ok(())
    }

    /// The active slice, `[position..limit)`.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.position..self.limit]
    }

    /// The raw backing storage up to capacity.
    pub fn storage(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw backing storage up to capacity.
    pub fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Ensure room for `additional` more bytes at `position`, growing the
    /// backing store if needed. New capacity is the smallest power-of-two
    /// doubling of the current capacity that fits `capacity + additional`.
    pub fn reserve(&mut self, additional: usize) {
        if self.position + additional <= self.limit {
            return;
        }
        let old = self.capacity();
        if self.position + additional > old {
            let mut new_cap = old.max(1);
            while new_cap < old + additional {
                new_cap *= 2;
            }
            self.data.resize(new_cap, 0);
        }
        self.limit = self.capacity();
    }

    // -- writes ------------------------------------------------------------

    /// Append raw bytes at `position`.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.data[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Length-prefixed UTF-8 string. Empty strings emit only the zero prefix.
    pub fn write_string(&mut self, s: &str) {
        self.write_i32(s.len() as i32);
        self.write_bytes(s.as_bytes());
    }

    /// Object reference: the identity string, or the empty string for null.
    pub fn write_object_identity(&mut self, identity: Option<&str>) {
        self.write_string(identity.unwrap_or(""));
    }

    // -- reads -------------------------------------------------------------

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.remaining() < n {
            return Err(CdrError::Underflow {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let start = self.position;
        self.position += n;
        Ok(&self.data[start..start + n])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let bytes = self.take(2)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.take(8)?;
        Ok(i64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let bytes = self.take(4)?;
        Ok(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.take(8)?;
        Ok(f64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Read a length-prefixed string. Leaves `position` unchanged on failure.
    pub fn read_string(&mut self) -> Result<String> {
        if self.remaining() < 4 {
            return Err(CdrError::Underflow {
                needed: 4,
                remaining: self.remaining(),
            });
        }
        let p = self.position;
        let len = i32::from_be_bytes([
            self.data[p],
            self.data[p + 1],
            self.data[p + 2],
            self.data[p + 3],
        ]);
        if len < 0 {
            return Err(CdrError::NegativeLength(len));
        }
        let len = len as usize;
        if self.remaining() < 4 + len {
            return Err(CdrError::Underflow {
                needed: 4 + len,
                remaining: self.remaining(),
            });
        }
        let text = String::from_utf8(self.data[p + 4..p + 4 + len].to_vec())?;
        self.position = p + 4 + len;
        Ok(text)
    }

    /// Read an object reference: `None` for the empty identity.
    pub fn read_object_identity(&mut self) -> Result<Option<String>> {
        let identity = self.read_string()?;
        Ok(if identity.is_empty() {
            None
        } else {
            Some(identity)
        })
    }
}

impl Default for CdrBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CdrBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdrBuffer")
            .field("position", &self.position)
            .field("limit", &self.limit)
            .field("capacity", &self.capacity())
            .finish()
    }
}
