//! Scripted in-memory channel for exercising the ORB without a compiler.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use wrmi_cdr::{CdrBuffer, MessageHeader, MessageType, ReplyHeader, ReplyStatus, RequestHeader};
use wrmi_transport::{ByteChannel, TransportError};

use crate::orb::{Orb, OrbConfig};

/// Captured outbound frames, one `Vec<u8>` per `send` call.
pub type SentFrames = Rc<RefCell<Vec<Vec<u8>>>>;

/// A [`ByteChannel`] that replays scripted inbound bytes and records every
/// outbound frame.
pub struct ScriptedChannel {
    inbound: VecDeque<u8>,
    sent: SentFrames,
}

impl ScriptedChannel {
    pub fn new(inbound: Vec<u8>) -> Self {
        Self {
            inbound: inbound.into(),
            sent: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn sent_frames(&self) -> SentFrames {
        Rc::clone(&self.sent)
    }
}

impl ByteChannel for ScriptedChannel {
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.sent.borrow_mut().push(bytes.to_vec());
        Ok(())
    }

    fn recv_exact(&mut self, out: &mut [u8]) -> Result<(), TransportError> {
        if self.inbound.len() < out.len() {
            return Err(TransportError::PrematureEof {
                expected: out.len(),
                got: self.inbound.len(),
            });
        }
        for slot in out.iter_mut() {
            *slot = self.inbound.pop_front().unwrap_or_default();
        }
        Ok(())
    }
}

/// Connect an ORB over a scripted channel, returning the captured-frame
/// handle. `inbound` must start with the peer's handshake frame.
pub fn scripted_orb(inbound: Vec<u8>, config: OrbConfig) -> (Orb, SentFrames) {
    let channel = ScriptedChannel::new(inbound);
    let sent = channel.sent_frames();
    let orb = Orb::connect(Box::new(channel), None, config).expect("scripted handshake");
    (orb, sent)
}

/// Encode a complete frame: header with the given type/flags, then the body
/// produced by `write_body`.
pub fn frame(
    message_type: MessageType,
    flags: u8,
    write_body: impl FnOnce(&mut CdrBuffer),
) -> Vec<u8> {
    let mut body = CdrBuffer::new();
    write_body(&mut body);
    body.flip();

    let mut out = CdrBuffer::new();
    let mut header = MessageHeader::new(message_type, body.remaining() as u32);
    header.flags = flags;
    header.write(&mut out);
    out.write_bytes(body.as_slice());
    out.flip();
    out.as_slice().to_vec()
}

/// The peer's VALIDATE frame (empty body).
pub fn validate_frame() -> Vec<u8> {
    frame(MessageType::Validate, 0, |_| {})
}

/// A server-initiated REQUEST frame.
pub fn request_frame(
    request_id: u32,
    target: &str,
    operation: &str,
    write_args: impl FnOnce(&mut CdrBuffer),
) -> Vec<u8> {
    frame(MessageType::Request, 0, |b| {
        RequestHeader::new(request_id, target, operation).write(b);
        write_args(b);
    })
}

/// A REPLY frame for a client request.
pub fn reply_frame(
    request_id: u32,
    status: ReplyStatus,
    write_body: impl FnOnce(&mut CdrBuffer),
) -> Vec<u8> {
    frame(MessageType::Reply, 0, |b| {
        ReplyHeader::new(request_id, status).write(b);
        write_body(b);
    })
}
