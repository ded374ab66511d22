use wrmi_cdr::CdrError;
use wrmi_transport::TransportError;

use crate::adapter::AdapterError;

/// Errors surfaced by the ORB and the stubs built on it.
#[derive(Debug, thiserror::Error)]
pub enum OrbError {
    /// Send/receive failure, premature EOF or peer-process exit. Fatal.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Marshalling failure while building or consuming a frame.
    #[error("marshalling error: {0}")]
    Cdr(#[from] CdrError),

    /// Bad eye-catcher, unsupported protocol version or unknown message
    /// type. Fatal.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The bounded wait-for-reply loop was exhausted.
    #[error("timed out waiting for reply after {attempts} receive attempts")]
    Timeout { attempts: u32 },

    /// The peer answered with USER_EXCEPTION.
    #[error("user exception {exception}: {reason}")]
    User { exception: String, reason: String },

    /// The peer answered with SYSTEM_EXCEPTION, or a local servant faulted.
    #[error("system exception {type_id}: {message}")]
    System { type_id: String, message: String },

    /// Object adapter registry failure. Does not kill the ORB.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// The compiler process could not be started or announced no pipes.
    #[error("startup failed: {0}")]
    Startup(String),
}

pub type Result<T> = std::result::Result<T, OrbError>;
