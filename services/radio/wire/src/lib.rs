//! Radio frame codec, checksums, chunking and reassembly for the resonant radio link.
//!
//! This crate provides the wire-level half of the radio link: building and
//! validating frames, splitting payloads that exceed one radio packet into
//! chunk frames, and reassembling received chunks into the original payload.
//!
//! ## Features
//!
//! - **Compact Frames**: 16 bytes of fixed overhead around up to 255 payload bytes
//! - **Checksums**: 8-bit additive checksum over ids, header fields and payload
//! - **Destination Filtering**: broadcast or exact device id match
//! - **Chunking**: 239-byte chunks paced one at a time by transmit completion
//! - **Reassembly**: duplicate/mismatch rejection and a session timeout
//!
//! ## Wire Format
//!
//! ```text
//! +----------------------+----------------------------+
//! | u8  marker (0x85)    | protocol sentinel          |
//! +----------------------+----------------------------+
//! | u16 length (BE)      | total frame size           |
//! +----------------------+----------------------------+
//! | source id (4B)       | sender device id           |
//! +----------------------+----------------------------+
//! | destination id (4B)  | device id or FF FF FF FF   |
//! +----------------------+----------------------------+
//! | u8 type | u8 options | u8 total | u8 index        |
//! +----------------------+----------------------------+
//! | payload              | variable (0..255)          |
//! +----------------------+----------------------------+
//! | u8 checksum          | sum of bytes 3..len-1      |
//! +----------------------+----------------------------+
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod error;
pub mod frame;
pub mod header;

// Re-export main types
pub use chunk::{
    chunk_count, AcceptOutcome, ChunkProgress, Chunker, DiscardReason, Reassembled, Reassembler,
    SendStats, DEFAULT_SESSION_TIMEOUT, MAX_CHUNKED_PAYLOAD, MAX_CHUNKS,
};
pub use error::{ChunkError, WireError};
pub use frame::{checksum, ChunkInfo, FrameCodec, ValidatedFrame, ACK_PAYLOAD};
pub use header::{
    DeviceId, FrameType, Options, CHUNK_SIZE, FRAME_MARKER, FRAME_OVERHEAD, HEADER_SIZE,
    MAX_FRAME_PAYLOAD, MIN_FRAME_SIZE,
};
