//! Wire protocol error types.

use thiserror::Error;

/// Wire protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Buffer shorter than the minimum frame size
    #[error("frame too short: {0} bytes")]
    TooShort(usize),

    /// Payload does not fit the frame encoding
    #[error("payload too large: {0} bytes")]
    PayloadSize(usize),

    /// Unknown frame type
    #[error("unknown type {0}")]
    Type(u8),
}

/// Reasons a chunked send cannot be started
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// Another chunked send is still in flight
    #[error("chunked send already in progress")]
    Busy,

    /// Nothing to send
    #[error("empty payload")]
    Empty,

    /// Chunk count does not fit the one-byte total field
    #[error("payload of {0} bytes needs more than 255 chunks")]
    TooLarge(usize),

    /// Frame encoding failed
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}
