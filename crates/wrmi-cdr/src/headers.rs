//! Fixed-layout frame headers for the WRMI protocol.
//!
//! Every frame starts with a 12-byte [`MessageHeader`]. REQUEST and ONEWAY
//! frames follow it with a variable-length [`RequestHeader`]; REPLY frames
//! with a 5-byte [`ReplyHeader`]. All fields are big-endian, no padding.

use crate::buffer::CdrBuffer;
use crate::error::{CdrError, Result};

/// Frame sentinel: "WRMI" in ASCII.
pub const EYE_CATCHER: u32 = 0x5752_4D49;

/// Protocol version spoken on the wire.
pub const PROTOCOL_MAJOR: u8 = 2;
pub const PROTOCOL_MINOR: u8 = 1;

/// Message type discriminator carried in [`MessageHeader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Request = 1,
    Reply = 2,
    Oneway = 3,
    Shutdown = 4,
    Validate = 5,
}

impl MessageType {
    /// Decode a wire byte; `None` for types outside the defined set.
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Request),
            2 => Some(Self::Reply),
            3 => Some(Self::Oneway),
            4 => Some(Self::Shutdown),
            5 => Some(Self::Validate),
            _ => None,
        }
    }

    pub fn as_wire(self) -> u8 {
        self as u8
    }
}

/// Reply status carried in [`ReplyHeader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReplyStatus {
    NoException = 0,
    UserException = 1,
    SystemException = 2,
}

impl ReplyStatus {
    pub fn from_wire(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::NoException),
            1 => Ok(Self::UserException),
            2 => Ok(Self::SystemException),
            other => Err(CdrError::UnknownReplyStatus(other)),
        }
    }

    pub fn as_wire(self) -> u8 {
        self as u8
    }
}

/// The 12-byte header at the start of every frame.
///
/// `message_length` counts the bytes *after* the header. `message_type` is
/// kept raw so unknown types surface at the dispatch layer, and `flags` is
/// kept raw so reserved bits pass through reply frames unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub eye_catcher: u32,
    pub protocol_major: u8,
    pub protocol_minor: u8,
    pub message_type: u8,
    pub flags: u8,
    pub message_length: u32,
}

impl MessageHeader {
    /// Wire size in bytes.
    pub const SIZE: usize = 12;

    /// A header for an outbound frame of the given type and body length.
    pub fn new(message_type: MessageType, message_length: u32) -> Self {
        Self {
            eye_catcher: EYE_CATCHER,
            protocol_major: PROTOCOL_MAJOR,
            protocol_minor: PROTOCOL_MINOR,
            message_type: message_type.as_wire(),
            flags: 0,
            message_length,
        }
    }

    pub fn write(&self, buf: &mut CdrBuffer) {
        buf.write_u32(self.eye_catcher);
        buf.write_u8(self.protocol_major);
        buf.write_u8(self.protocol_minor);
        buf.write_u8(self.message_type);
        buf.write_u8(self.flags);
        buf.write_u32(self.message_length);
    }

    pub fn read(buf: &mut CdrBuffer) -> Result<Self> {
        Ok(Self {
            eye_catcher: buf.read_u32()?,
            protocol_major: buf.read_u8()?,
            protocol_minor: buf.read_u8()?,
            message_type: buf.read_u8()?,
            flags: buf.read_u8()?,
            message_length: buf.read_u32()?,
        })
    }
}

/// Variable-length header following [`MessageHeader`] on REQUEST and ONEWAY
/// frames. `future` is reserved and written even when empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub request_id: u32,
    pub target_object: String,
    pub future: String,
    pub operation: String,
    pub flags: u8,
}

impl RequestHeader {
    pub fn new(request_id: u32, target_object: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            request_id,
            target_object: target_object.into(),
            future: String::new(),
            operation: operation.into(),
            flags: 0,
        }
    }

    pub fn write(&self, buf: &mut CdrBuffer) {
        buf.write_u32(self.request_id);
        buf.write_string(&self.target_object);
        buf.write_string(&self.future);
        buf.write_string(&self.operation);
        buf.write_u8(self.flags);
    }

    pub fn read(buf: &mut CdrBuffer) -> Result<Self> {
        Ok(Self {
            request_id: buf.read_u32()?,
            target_object: buf.read_string()?,
            future: buf.read_string()?,
            operation: buf.read_string()?,
            flags: buf.read_u8()?,
        })
    }
}

/// The 5-byte header following [`MessageHeader`] on REPLY frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHeader {
    pub request_id: u32,
    pub reply_status: ReplyStatus,
}

impl ReplyHeader {
    /// Wire size in bytes.
    pub const SIZE: usize = 5;

    pub fn new(request_id: u32, reply_status: ReplyStatus) -> Self {
        Self {
            request_id,
            reply_status,
        }
    }

    pub fn write(&self, buf: &mut CdrBuffer) {
        buf.write_u32(self.request_id);
        buf.write_u8(self.reply_status.as_wire());
    }

    pub fn read(buf: &mut CdrBuffer) -> Result<Self> {
        Ok(Self {
            request_id: buf.read_u32()?,
            reply_status: ReplyStatus::from_wire(buf.read_u8()?)?,
        })
    }
}
