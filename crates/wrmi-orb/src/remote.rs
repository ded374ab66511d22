use std::ops::{Deref, DerefMut};

use wrmi_cdr::{CdrBuffer, MessageHeader, MessageType, ReplyStatus, RequestHeader};

use crate::error::{OrbError, Result};
use crate::orb::Orb;

/// A handle on a remote object: an opaque identity plus the ORB that can
/// reach it.
///
/// Handles are value-like and cheap to clone. They own no remote resources;
/// lifecycle is governed by the typed `close`/`shutdown` operations the
/// stubs expose.
#[derive(Clone)]
pub struct RemoteHandle {
    orb: Orb,
    identity: String,
}

impl RemoteHandle {
    pub fn new(orb: &Orb, identity: impl Into<String>) -> Self {
        Self {
            orb: orb.clone(),
            identity: identity.into(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn orb(&self) -> &Orb {
        &self.orb
    }

    /// Start a request for `operation`: a pooled buffer with the
    /// MessageHeader space reserved and the RequestHeader written, positioned
    /// for the caller to append arguments.
    pub fn request(&self, operation: &str) -> Result<CdrBuffer> {
        let mut buf = self.orb.acquire_buffer();
        buf.clear();
        if let Err(err) = buf.set_position(MessageHeader::SIZE) {
            self.orb.release_buffer(buf);
            return Err(err.into());
        }
        RequestHeader::new(self.orb.next_request_id(), &self.identity, operation).write(&mut buf);
        Ok(buf)
    }

    /// Send a request and wait for its reply.
    ///
    /// On NO_EXCEPTION the reply is returned positioned for result reads; a
    /// USER_EXCEPTION or SYSTEM_EXCEPTION body is decoded into the matching
    /// error. Request and reply buffers go back to the pool on every path.
    pub fn invoke(&self, buf: CdrBuffer) -> Result<Reply> {
        let request_id = request_id_of(&buf)?;
        self.orb.register_waiter(request_id);
        if let Err(err) = self.send_and_release(buf, MessageType::Request) {
            self.orb.discard_waiter(request_id);
            return Err(err);
        }

        let (status, reply_buf) = self.orb.wait_for_reply(request_id)?;
        let mut reply = Reply::new(self.orb.clone(), reply_buf);
        match status {
            ReplyStatus::NoException => Ok(reply),
            ReplyStatus::UserException => {
                let exception = reply.read_string()?;
                let reason = if reply.remaining() > 0 {
                    reply.read_string()?
                } else {
                    String::new()
                };
                Err(OrbError::User { exception, reason })
            }
            ReplyStatus::SystemException => {
                let type_id = reply.read_string()?;
                let message = if reply.remaining() > 0 {
                    reply.read_string()?
                } else {
                    String::new()
                };
                Err(OrbError::System { type_id, message })
            }
        }
    }

    /// Send a request that expects no reply.
    pub fn invoke_oneway(&self, buf: CdrBuffer) -> Result<()> {
        self.send_and_release(buf, MessageType::Oneway)
    }

    fn send_and_release(&self, mut buf: CdrBuffer, message_type: MessageType) -> Result<()> {
        let result = self.orb.send_request(&mut buf, message_type);
        self.orb.release_buffer(buf);
        result
    }
}

impl std::fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteHandle")
            .field("identity", &self.identity)
            .finish()
    }
}

/// The request id sits at a fixed offset, right after the reserved
/// MessageHeader prefix.
fn request_id_of(buf: &CdrBuffer) -> Result<u32> {
    let bytes = buf.storage();
    if buf.position() < MessageHeader::SIZE + 4 {
        return Err(OrbError::Protocol(
            "request buffer has no request header".to_string(),
        ));
    }
    let at = MessageHeader::SIZE;
    Ok(u32::from_be_bytes([
        bytes[at],
        bytes[at + 1],
        bytes[at + 2],
        bytes[at + 3],
    ]))
}

/// A reply buffer on loan from the pool; returned on drop.
pub struct Reply {
    orb: Orb,
    buf: Option<CdrBuffer>,
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reply").finish_non_exhaustive()
    }
}

impl Reply {
    fn new(orb: Orb, buf: CdrBuffer) -> Self {
        Self {
            orb,
            buf: Some(buf),
        }
    }
}

impl Deref for Reply {
    type Target = CdrBuffer;

    fn deref(&self) -> &CdrBuffer {
        self.buf.as_ref().expect("reply buffer present until drop")
    }
}

impl DerefMut for Reply {
    fn deref_mut(&mut self) -> &mut CdrBuffer {
        self.buf.as_mut().expect("reply buffer present until drop")
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.orb.release_buffer(buf);
        }
    }
}
