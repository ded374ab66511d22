use std::path::PathBuf;

/// Errors that can occur on the pipe transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open a named pipe.
    #[error("failed to open pipe {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream before the expected byte count arrived.
    #[error("premature EOF ({got} of {expected} bytes)")]
    PrematureEof { expected: usize, got: usize },

    /// The peer process exited while the transport was in use.
    #[error("peer died: {stderr}")]
    PeerDied { stderr: String },

    /// Buffer cursor misuse while staging transport bytes.
    #[error("buffer error: {0}")]
    Cdr(#[from] wrmi_cdr::CdrError),
}

pub type Result<T> = std::result::Result<T, TransportError>;
