//! Frame building and validation.
//!
//! A frame is the unit exchanged over the air: a 15-byte header, up to 255
//! payload bytes and a one-byte checksum. The checksum is the 8-bit truncated
//! sum of every byte from the source id through the end of the payload.
//!
//! The length field carries the total frame size, header and checksum
//! included. Counterpart devices read it that way, so it must not change.

use crate::header::{
    DeviceId, FrameType, Options, CHUNK_INDEX_OFFSET, DESTINATION_OFFSET, FRAME_MARKER,
    FRAME_OVERHEAD, HEADER_SIZE, MAX_FRAME_PAYLOAD, MIN_FRAME_SIZE, OPTIONS_OFFSET,
    SOURCE_OFFSET, TOTAL_CHUNKS_OFFSET, TYPE_OFFSET,
};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

/// Payload byte of an acknowledgement frame
pub const ACK_PAYLOAD: u8 = 0xAA;

/// Multi-packet sequencing carried by a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Number of chunks in the transfer
    pub total_chunks: u8,
    /// 0-based index of this chunk
    pub chunk_index: u8,
}

impl ChunkInfo {
    /// Sequencing of a frame that is not part of a chunked transfer
    pub const SINGLE: ChunkInfo = ChunkInfo {
        total_chunks: 1,
        chunk_index: 0,
    };
}

impl Default for ChunkInfo {
    fn default() -> Self {
        Self::SINGLE
    }
}

/// Result of validating a received buffer.
///
/// Validation never fails on a bad checksum or a foreign destination; it
/// reports both and lets the caller decide whether to discard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFrame<'a> {
    /// Checksum matched the frame contents
    pub checksum_valid: bool,
    /// Destination is broadcast or this device
    pub is_intended_destination: bool,
    /// Raw frame type byte
    pub frame_type: u8,
    /// Option bits
    pub options: Options,
    /// Sender id
    pub source_id: DeviceId,
    /// Destination id
    pub destination_id: DeviceId,
    /// Total chunks of the transfer (1 for single frames)
    pub total_chunks: u8,
    /// Chunk index (0 for single frames)
    pub chunk_index: u8,
    /// Literal value of the length field
    pub length_field: u16,
    /// Payload view into the validated buffer
    pub payload: &'a [u8],
}

impl ValidatedFrame<'_> {
    /// Frame type, if the code is known
    pub fn kind(&self) -> Option<FrameType> {
        FrameType::try_from(self.frame_type).ok()
    }

    /// Whether the frame was sent to every device
    pub fn is_broadcast(&self) -> bool {
        self.destination_id.is_broadcast()
    }

    /// Whether the sender asked for an acknowledgement
    pub fn ack_requested(&self) -> bool {
        self.options.contains(Options::ACK_REQUESTED)
    }
}

/// Frame codec bound to this device's identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    device_id: DeviceId,
}

impl FrameCodec {
    /// Create a codec that stamps `device_id` as the source of every frame
    pub fn new(device_id: DeviceId) -> Self {
        Self { device_id }
    }

    /// This device's identifier
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Total encoded size of a frame carrying `payload_len` bytes
    pub fn frame_size(payload_len: usize) -> usize {
        FRAME_OVERHEAD + payload_len
    }

    /// Build a single (non-chunked) frame
    pub fn build(
        &self,
        frame_type: FrameType,
        payload: &[u8],
        destination: DeviceId,
        options: Options,
    ) -> Result<Bytes, crate::WireError> {
        self.build_chunk(frame_type, payload, destination, options, ChunkInfo::SINGLE)
    }

    /// Build a frame with explicit multi-packet sequencing
    pub fn build_chunk(
        &self,
        frame_type: FrameType,
        payload: &[u8],
        destination: DeviceId,
        options: Options,
        chunk: ChunkInfo,
    ) -> Result<Bytes, crate::WireError> {
        if payload.len() > MAX_FRAME_PAYLOAD {
            return Err(crate::WireError::PayloadSize(payload.len()));
        }

        let size = Self::frame_size(payload.len());
        let mut buf = BytesMut::with_capacity(size);

        buf.put_u8(FRAME_MARKER);
        buf.put_u16(size as u16);
        buf.put_slice(self.device_id.as_bytes());
        buf.put_slice(destination.as_bytes());
        buf.put_u8(frame_type as u8);
        buf.put_u8(options.bits());
        buf.put_u8(chunk.total_chunks);
        buf.put_u8(chunk.chunk_index);
        buf.put_slice(payload);

        let checksum = checksum(&buf[SOURCE_OFFSET..]);
        buf.put_u8(checksum);

        trace!(
            "built {:?} frame: {} bytes to {} (chunk {}/{})",
            frame_type,
            size,
            destination,
            chunk.chunk_index,
            chunk.total_chunks
        );

        Ok(buf.freeze())
    }

    /// Build a discovery advertisement (broadcast, options 0)
    pub fn build_discovery(
        &self,
        sensor_type: u16,
        hardware_version: u8,
        firmware_version: u8,
    ) -> Result<Bytes, crate::WireError> {
        let [hi, lo] = sensor_type.to_be_bytes();
        self.build(
            FrameType::DiscoveryAdvertisement,
            &[hi, lo, hardware_version, firmware_version],
            DeviceId::BROADCAST,
            Options::empty(),
        )
    }

    /// Build an acknowledgement frame
    pub fn build_acknowledgement(
        &self,
        destination: DeviceId,
        options: Options,
    ) -> Result<Bytes, crate::WireError> {
        self.build(
            FrameType::Acknowledgement,
            &[ACK_PAYLOAD],
            destination,
            options,
        )
    }

    /// Parse a received buffer and check its checksum and destination
    pub fn validate<'a>(&self, buf: &'a [u8]) -> Result<ValidatedFrame<'a>, crate::WireError> {
        if buf.len() < MIN_FRAME_SIZE {
            return Err(crate::WireError::TooShort(buf.len()));
        }

        let checksum_end = buf.len() - 1;
        let checksum_valid = checksum(&buf[SOURCE_OFFSET..checksum_end]) == buf[checksum_end];

        let source_id = read_id(buf, SOURCE_OFFSET);
        let destination_id = read_id(buf, DESTINATION_OFFSET);
        let is_intended_destination =
            destination_id.is_broadcast() || destination_id == self.device_id;

        Ok(ValidatedFrame {
            checksum_valid,
            is_intended_destination,
            frame_type: buf[TYPE_OFFSET],
            options: Options::from_bits_retain(buf[OPTIONS_OFFSET]),
            source_id,
            destination_id,
            total_chunks: buf[TOTAL_CHUNKS_OFFSET],
            chunk_index: buf[CHUNK_INDEX_OFFSET],
            length_field: u16::from_be_bytes([buf[1], buf[2]]),
            payload: &buf[HEADER_SIZE..checksum_end],
        })
    }
}

/// 8-bit truncated sum of `bytes`
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

fn read_id(buf: &[u8], offset: usize) -> DeviceId {
    let mut id = [0u8; 4];
    id.copy_from_slice(&buf[offset..offset + 4]);
    DeviceId(id)
}
