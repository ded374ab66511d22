/// Errors that can occur during CDR encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum CdrError {
    /// Fewer bytes remain than the requested read width.
    #[error("buffer underflow (needed {needed} bytes, {remaining} remaining)")]
    Underflow { needed: usize, remaining: usize },

    /// A position beyond the current limit was requested.
    #[error("position {position} out of bounds (limit {limit})")]
    PositionOutOfBounds { position: usize, limit: usize },

    /// A limit beyond the current capacity was requested.
    #[error("limit {limit} out of bounds (capacity {capacity})")]
    LimitOutOfBounds { limit: usize, capacity: usize },

    /// A string length prefix was negative.
    #[error("negative string length {0}")]
    NegativeLength(i32),

    /// String bytes were not valid UTF-8.
    #[error("invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A reply status byte outside the defined set.
    #[error("unknown reply status {0}")]
    UnknownReplyStatus(u8),
}

pub type Result<T> = std::result::Result<T, CdrError>;
