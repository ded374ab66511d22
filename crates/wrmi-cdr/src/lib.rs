//! Common Data Representation for the WRMI wire protocol.
//!
//! Every value exchanged with the compiler process travels as CDR: big-endian
//! primitives and length-prefixed UTF-8 strings, with no alignment padding.
//! This crate provides the growable cursor buffer those values are marshalled
//! through, and the three fixed-layout frame headers.

pub mod buffer;
pub mod error;
pub mod headers;

pub use buffer::CdrBuffer;
pub use error::{CdrError, Result};
pub use headers::{
    MessageHeader, MessageType, ReplyHeader, ReplyStatus, RequestHeader, EYE_CATCHER,
    PROTOCOL_MAJOR, PROTOCOL_MINOR,
};
