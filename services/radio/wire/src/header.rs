//! Frame header fields: device identifiers, frame types and option flags.
//!
//! The fixed 15-byte header sits in front of every payload:
//!
//! ```text
//! 0      marker (0x85)
//! 1..3   length field, u16 big-endian, equal to the total frame size
//! 3..7   source id
//! 7..11  destination id
//! 11     frame type
//! 12     options
//! 13     total chunks
//! 14     chunk index
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel byte that opens every frame
pub const FRAME_MARKER: u8 = 0x85;

/// Header bytes in front of the payload
pub const HEADER_SIZE: usize = 15;

/// Fixed per-frame overhead: header plus trailing checksum byte
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + 1;

/// Smallest valid frame (empty payload)
pub const MIN_FRAME_SIZE: usize = FRAME_OVERHEAD;

/// Largest payload the one-byte length encoding can carry
pub const MAX_FRAME_PAYLOAD: usize = 255;

/// Payload bytes carried by one chunk of a multi-packet transfer
pub const CHUNK_SIZE: usize = 239;

pub(crate) const SOURCE_OFFSET: usize = 3;
pub(crate) const DESTINATION_OFFSET: usize = 7;
pub(crate) const TYPE_OFFSET: usize = 11;
pub(crate) const OPTIONS_OFFSET: usize = 12;
pub(crate) const TOTAL_CHUNKS_OFFSET: usize = 13;
pub(crate) const CHUNK_INDEX_OFFSET: usize = 14;

/// Four-byte device identifier
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub [u8; 4]);

impl DeviceId {
    /// Destination that every device accepts
    pub const BROADCAST: DeviceId = DeviceId([0xFF; 4]);

    /// Derive the id from a 6-byte hardware MAC (its last four bytes)
    pub fn from_mac(mac: &[u8; 6]) -> Self {
        Self([mac[2], mac[3], mac[4], mac[5]])
    }

    /// Whether this is the broadcast id
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for DeviceId {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// Frame types as defined in the wire protocol
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameType {
    /// Periodic device advertisement
    DiscoveryAdvertisement = 0x00,
    /// Sensor telemetry
    Telemetry = 0x01,
    /// Device metrics
    Metrics = 0x02,
    /// Response to a command
    CommandResponse = 0x03,
    /// Configuration advertisement
    ConfigAdvertisement = 0x04,
    /// Acknowledgement of a single frame
    Acknowledgement = 0x05,
    /// One chunk of a multi-packet transfer
    MultiPacket = 0x06,
    /// Acknowledgement of a multi-packet transfer
    MultiPacketAck = 0x07,
    /// Command addressed to a device
    Command = 0x08,
}

impl TryFrom<u8> for FrameType {
    type Error = crate::WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(FrameType::DiscoveryAdvertisement),
            0x01 => Ok(FrameType::Telemetry),
            0x02 => Ok(FrameType::Metrics),
            0x03 => Ok(FrameType::CommandResponse),
            0x04 => Ok(FrameType::ConfigAdvertisement),
            0x05 => Ok(FrameType::Acknowledgement),
            0x06 => Ok(FrameType::MultiPacket),
            0x07 => Ok(FrameType::MultiPacketAck),
            0x08 => Ok(FrameType::Command),
            _ => Err(crate::WireError::Type(value)),
        }
    }
}

bitflags! {
    /// Caller-defined option bits carried in every frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Options: u8 {
        /// Sender asks the receiver to acknowledge
        const ACK_REQUESTED = 1 << 0;
        // Remaining bits belong to the application
        const _ = !0;
    }
}

impl Options {
    /// Options for a send with or without acknowledgement
    pub fn with_ack(ack_requested: bool) -> Self {
        if ack_requested {
            Options::ACK_REQUESTED
        } else {
            Options::empty()
        }
    }
}
