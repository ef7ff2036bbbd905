//! Link error types.

use crate::mailbox::{RequestKind, ResultKind};
use thiserror::Error;

/// Failures reported by a radio driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Hardware did not come up
    #[error("hardware init failed: {0}")]
    Init(String),
}

/// Link-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Driver initialization failed
    #[error("radio init failed: {0}")]
    Init(#[from] DriverError),

    /// Configuration out of range
    #[error("invalid radio config: {0}")]
    Config(String),

    /// A request of this kind is already waiting
    #[error("{0:?} request already pending")]
    RequestPending(RequestKind),

    /// A result of this kind has not been delivered yet
    #[error("{0:?} result not yet delivered")]
    ResultPending(ResultKind),
}

/// Errors delivered to the application through the error callback
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadioError {
    /// Hardware init failed
    #[error("Hardware init failed")]
    InitFailed,

    /// Transmission did not complete in time; the send was aborted
    #[error("TX timeout")]
    TransmitTimeout,

    /// Nothing was received before the receive timeout
    #[error("RX timeout")]
    ReceiveTimeout,

    /// Receiver reported a reception error
    #[error("RX error")]
    ReceiveError,

    /// A multi-packet reception did not complete in time
    #[error("Multi-packet RX timeout")]
    ReassemblyTimeout,
}

impl RadioError {
    /// Numeric error code as reported by the device firmware
    pub fn code(&self) -> u8 {
        match self {
            RadioError::InitFailed => 1,
            RadioError::TransmitTimeout => 2,
            RadioError::ReceiveTimeout => 3,
            RadioError::ReceiveError => 4,
            RadioError::ReassemblyTimeout => 5,
        }
    }
}

impl From<&LinkError> for Option<RadioError> {
    fn from(err: &LinkError) -> Self {
        match err {
            LinkError::Init(_) => Some(RadioError::InitFailed),
            _ => None,
        }
    }
}
