use std::io::{ErrorKind, Read, Write};

use wrmi_cdr::CdrBuffer;

use crate::error::{Result, TransportError};

/// A blocking duplex byte channel with exact-count semantics.
///
/// `send` delivers every byte of a buffer's active slice; `recv` fills a
/// buffer's active region completely or fails. Partial reads and writes are
/// looped internally, so callers never see short transfers.
pub trait ByteChannel {
    /// Write all bytes and flush.
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read exactly `out.len()` bytes.
    fn recv_exact(&mut self, out: &mut [u8]) -> Result<()>;

    /// Send the buffer's active slice, `[position..limit)`.
    fn send(&mut self, buf: &CdrBuffer) -> Result<()> {
        self.send_bytes(buf.as_slice())
    }

    /// Read exactly `buf.remaining()` bytes, appending at `position` and
    /// advancing it to `limit`.
    fn recv(&mut self, buf: &mut CdrBuffer) -> Result<()> {
        let start = buf.position();
        let end = buf.limit();
        self.recv_exact(&mut buf.storage_mut()[start..end])?;
        buf.set_position(end)?;
        Ok(())
    }
}

/// A [`ByteChannel`] over any `Read` + `Write` pair.
#[derive(Debug)]
pub struct StreamChannel<R, W> {
    rx: R,
    tx: W,
}

impl<R: Read, W: Write> StreamChannel<R, W> {
    pub fn new(rx: R, tx: W) -> Self {
        Self { rx, tx }
    }

    /// Borrow the receive side.
    pub fn rx(&self) -> &R {
        &self.rx
    }

    /// Borrow the send side.
    pub fn tx(&self) -> &W {
        &self.tx
    }

    /// Consume the channel and return both sides.
    pub fn into_parts(self) -> (R, W) {
        (self.rx, self.tx)
    }
}

impl<R: Read, W: Write> ByteChannel for StreamChannel<R, W> {
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.tx.write(&bytes[offset..]) {
                Ok(0) => {
                    return Err(TransportError::PrematureEof {
                        expected: bytes.len(),
                        got: offset,
                    })
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        loop {
            match self.tx.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn recv_exact(&mut self, out: &mut [u8]) -> Result<()> {
        let expected = out.len();
        let mut offset = 0usize;
        while offset < expected {
            match self.rx.read(&mut out[offset..]) {
                Ok(0) => {
                    return Err(TransportError::PrematureEof {
                        expected,
                        got: offset,
                    })
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }
}
