//! Chunked transfers for payloads larger than one radio frame.
//!
//! The sender splits a payload into frames of `CHUNK_SIZE` bytes and keeps
//! exactly one chunk in flight: the next one is built only after the radio
//! reports the previous transmission as finished. The receiver stitches the
//! chunks back together by index. No total-size field travels on the wire;
//! the final size comes from the length of the last chunk.

use crate::error::ChunkError;
use crate::frame::{ChunkInfo, FrameCodec, ValidatedFrame};
use crate::header::{DeviceId, FrameType, Options, CHUNK_SIZE};
use bytes::{Bytes, BytesMut};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Most chunks a single transfer can be split into (one-byte total field)
pub const MAX_CHUNKS: usize = u8::MAX as usize;

/// Largest payload a chunked transfer can carry
pub const MAX_CHUNKED_PAYLOAD: usize = MAX_CHUNKS * CHUNK_SIZE;

/// Time a reassembly session may stay open before it is abandoned
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_millis(5000);

/// Number of chunks needed for `len` payload bytes
pub fn chunk_count(len: usize) -> usize {
    (len + CHUNK_SIZE - 1) / CHUNK_SIZE
}

/// Totals of a finished chunked send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendStats {
    /// Payload bytes delivered to the radio
    pub bytes_sent: usize,
    /// Number of chunk frames transmitted
    pub chunk_count: u8,
}

/// What to do after a chunk finished transmitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkProgress {
    /// Transmit this frame next
    More(Bytes),
    /// Every chunk has been sent
    Complete(SendStats),
}

/// In-flight multi-packet transmission. Owns the caller's payload until the
/// last chunk is sent or the transfer is aborted.
#[derive(Debug)]
struct ChunkedSend {
    buffer: Bytes,
    destination: DeviceId,
    options: Options,
    total_chunks: u8,
    next_chunk_index: u8,
}

impl ChunkedSend {
    fn chunk_frame(&self, codec: &FrameCodec) -> Result<Bytes, ChunkError> {
        let offset = self.next_chunk_index as usize * CHUNK_SIZE;
        let end = std::cmp::min(offset + CHUNK_SIZE, self.buffer.len());

        let frame = codec.build_chunk(
            FrameType::MultiPacket,
            &self.buffer[offset..end],
            self.destination,
            self.options,
            ChunkInfo {
                total_chunks: self.total_chunks,
                chunk_index: self.next_chunk_index,
            },
        )?;
        Ok(frame)
    }
}

/// Chunking engine: splits payloads and paces chunks by completion events
#[derive(Debug)]
pub struct Chunker {
    codec: FrameCodec,
    active: Option<ChunkedSend>,
    last_stats: Option<SendStats>,
}

impl Chunker {
    /// Create a chunker that frames chunks with `codec`
    pub fn new(codec: FrameCodec) -> Self {
        Self {
            codec,
            active: None,
            last_stats: None,
        }
    }

    /// Whether a chunked send is in flight
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Totals of the most recently completed send
    pub fn last_stats(&self) -> Option<SendStats> {
        self.last_stats
    }

    /// Progress of the active send as (next index, total)
    pub fn progress(&self) -> Option<(u8, u8)> {
        self.active
            .as_ref()
            .map(|send| (send.next_chunk_index, send.total_chunks))
    }

    /// Start a chunked send and return the first chunk frame to transmit
    pub fn start(
        &mut self,
        payload: Bytes,
        destination: DeviceId,
        ack_requested: bool,
    ) -> Result<Bytes, ChunkError> {
        if self.active.is_some() {
            return Err(ChunkError::Busy);
        }
        if payload.is_empty() {
            return Err(ChunkError::Empty);
        }
        if payload.len() > MAX_CHUNKED_PAYLOAD {
            return Err(ChunkError::TooLarge(payload.len()));
        }

        let total_chunks = chunk_count(payload.len()) as u8;
        let send = ChunkedSend {
            buffer: payload,
            destination,
            options: Options::with_ack(ack_requested),
            total_chunks,
            next_chunk_index: 0,
        };

        let first = send.chunk_frame(&self.codec)?;
        info!(
            "starting chunked send: {} bytes in {} chunks to {}",
            send.buffer.len(),
            total_chunks,
            destination
        );
        self.last_stats = None;
        self.active = Some(send);
        Ok(first)
    }

    /// Advance after the radio finished the chunk in flight.
    ///
    /// Returns `None` when no chunked send is active.
    pub fn on_chunk_sent(&mut self) -> Option<Result<ChunkProgress, ChunkError>> {
        let send = self.active.as_mut()?;
        send.next_chunk_index = send.next_chunk_index.wrapping_add(1);

        if send.next_chunk_index >= send.total_chunks {
            let stats = SendStats {
                bytes_sent: send.buffer.len(),
                chunk_count: send.total_chunks,
            };
            self.active = None;
            self.last_stats = Some(stats);
            debug!(
                "chunked send complete: {} bytes, {} chunks",
                stats.bytes_sent, stats.chunk_count
            );
            return Some(Ok(ChunkProgress::Complete(stats)));
        }

        debug!(
            "sending chunk {}/{}",
            send.next_chunk_index + 1,
            send.total_chunks
        );
        let next = send.chunk_frame(&self.codec).map(ChunkProgress::More);
        if next.is_err() {
            self.active = None;
        }
        Some(next)
    }

    /// Drop the in-flight send, releasing its buffer
    pub fn abort(&mut self) -> bool {
        match self.active.take() {
            Some(send) => {
                warn!(
                    "aborting chunked send at chunk {}/{}",
                    send.next_chunk_index + 1,
                    send.total_chunks
                );
                true
            }
            None => false,
        }
    }

    /// Split a payload into every chunk frame at once
    pub fn chunk_frames(
        &self,
        payload: &[u8],
        destination: DeviceId,
        options: Options,
    ) -> Result<Vec<Bytes>, ChunkError> {
        if payload.is_empty() {
            return Err(ChunkError::Empty);
        }
        if payload.len() > MAX_CHUNKED_PAYLOAD {
            return Err(ChunkError::TooLarge(payload.len()));
        }

        let total_chunks = chunk_count(payload.len()) as u8;
        payload
            .chunks(CHUNK_SIZE)
            .enumerate()
            .map(|(index, chunk)| {
                self.codec
                    .build_chunk(
                        FrameType::MultiPacket,
                        chunk,
                        destination,
                        options,
                        ChunkInfo {
                            total_chunks,
                            chunk_index: index as u8,
                        },
                    )
                    .map_err(ChunkError::from)
            })
            .collect()
    }
}

/// One bit per chunk index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ChunkMask([u64; 4]);

impl ChunkMask {
    fn contains(&self, index: u8) -> bool {
        self.0[index as usize / 64] & (1 << (index % 64)) != 0
    }

    fn insert(&mut self, index: u8) {
        self.0[index as usize / 64] |= 1 << (index % 64);
    }

    fn count(&self) -> u32 {
        self.0.iter().map(|word| word.count_ones()).sum()
    }
}

/// State of one in-flight multi-packet reception
#[derive(Debug)]
struct ReassemblySession {
    expected_chunks: u8,
    received: ChunkMask,
    buffer: BytesMut,
    accumulated_size: usize,
    started_at: Instant,
}

impl ReassemblySession {
    fn new(expected_chunks: u8, now: Instant) -> Self {
        Self {
            expected_chunks,
            received: ChunkMask::default(),
            buffer: BytesMut::zeroed(expected_chunks as usize * CHUNK_SIZE),
            accumulated_size: 0,
            started_at: now,
        }
    }

    fn is_complete(&self) -> bool {
        self.received.count() == self.expected_chunks as u32
    }
}

/// A fully reassembled multi-packet payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassembled {
    /// Sender of the chunk that completed the set
    pub source_id: DeviceId,
    /// Destination of the chunk that completed the set
    pub destination_id: DeviceId,
    /// Options of the chunk that completed the set
    pub options: Options,
    /// Number of chunks in the transfer
    pub total_chunks: u8,
    /// The reassembled payload
    pub payload: Bytes,
    /// Signal strength of the completing chunk
    pub rssi: i16,
    /// Signal-to-noise ratio of the completing chunk
    pub snr: i8,
}

/// Why a chunk was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Chunk announces zero chunks
    NoChunks,
    /// Chunk count disagrees with the open session
    ChunkCountMismatch,
    /// Chunk index is beyond the announced count
    IndexOutOfRange,
    /// Chunk already received in this session
    Duplicate,
    /// Chunk payload has the wrong size for its position
    BadChunkSize,
}

/// Outcome of feeding one chunk to the reassembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// Chunk stored, more chunks outstanding
    Pending {
        /// Chunks received so far
        received: u8,
        /// Chunks expected
        expected: u8,
    },
    /// Last missing chunk arrived
    Complete(Reassembled),
    /// Chunk dropped
    Discarded(DiscardReason),
}

/// Reassembly engine for incoming chunk sequences
#[derive(Debug)]
pub struct Reassembler {
    session: Option<ReassemblySession>,
    timeout: Duration,
}

impl Reassembler {
    /// Create a reassembler with the default session timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_SESSION_TIMEOUT)
    }

    /// Create a reassembler with a custom session timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            session: None,
            timeout,
        }
    }

    /// Whether a session is open
    pub fn in_progress(&self) -> bool {
        self.session.is_some()
    }

    /// Progress of the open session as (received, expected)
    pub fn progress(&self) -> Option<(u8, u8)> {
        self.session
            .as_ref()
            .map(|s| (s.received.count() as u8, s.expected_chunks))
    }

    /// Feed a validated multi-packet frame
    pub fn accept(
        &mut self,
        frame: &ValidatedFrame<'_>,
        rssi: i16,
        snr: i8,
        now: Instant,
    ) -> AcceptOutcome {
        let total = frame.total_chunks;
        let index = frame.chunk_index;

        if total == 0 {
            debug!("chunk announces zero chunks, discarding");
            return AcceptOutcome::Discarded(DiscardReason::NoChunks);
        }

        let restart = match &self.session {
            Some(session) if session.expected_chunks != total => {
                if index != 0 {
                    debug!(
                        "chunk total mismatch ({} != {}), discarding",
                        total, session.expected_chunks
                    );
                    return AcceptOutcome::Discarded(DiscardReason::ChunkCountMismatch);
                }
                true
            }
            _ => false,
        };

        if index >= total {
            debug!("chunk index {} out of range for {} chunks", index, total);
            return AcceptOutcome::Discarded(DiscardReason::IndexOutOfRange);
        }

        let is_last = index == total - 1;
        let len = frame.payload.len();
        if len > CHUNK_SIZE || (!is_last && len != CHUNK_SIZE) {
            debug!("chunk {} has {} bytes, discarding", index, len);
            return AcceptOutcome::Discarded(DiscardReason::BadChunkSize);
        }

        // the open session is only replaced by a restart chunk that is stored
        if restart {
            if let Some(old) = self.session.take() {
                info!(
                    "sender restarted with {} chunks, resetting session of {}",
                    total, old.expected_chunks
                );
            }
        }

        let mut session = self
            .session
            .take()
            .unwrap_or_else(|| ReassemblySession::new(total, now));

        if session.received.contains(index) {
            debug!("duplicate chunk {}, ignoring", index);
            self.session = Some(session);
            return AcceptOutcome::Discarded(DiscardReason::Duplicate);
        }

        let offset = index as usize * CHUNK_SIZE;
        session.buffer[offset..offset + len].copy_from_slice(frame.payload);
        session.received.insert(index);
        if is_last {
            session.accumulated_size = offset + len;
        }

        debug!(
            "accumulated chunk {}/{}",
            session.received.count(),
            session.expected_chunks
        );

        if !session.is_complete() {
            let outcome = AcceptOutcome::Pending {
                received: session.received.count() as u8,
                expected: session.expected_chunks,
            };
            self.session = Some(session);
            return outcome;
        }

        session.buffer.truncate(session.accumulated_size);
        info!(
            "reassembled {} bytes from {} chunks",
            session.accumulated_size, session.expected_chunks
        );

        AcceptOutcome::Complete(Reassembled {
            source_id: frame.source_id,
            destination_id: frame.destination_id,
            options: frame.options,
            total_chunks: session.expected_chunks,
            payload: session.buffer.freeze(),
            rssi,
            snr,
        })
    }

    /// Abandon the open session once it outlives the timeout.
    ///
    /// Returns true exactly once per abandoned session.
    pub fn tick(&mut self, now: Instant) -> bool {
        let expired = self
            .session
            .as_ref()
            .is_some_and(|s| now.saturating_duration_since(s.started_at) > self.timeout);

        if expired {
            if let Some((received, expected)) = self.progress() {
                warn!(
                    "reassembly timeout with {}/{} chunks received",
                    received, expected
                );
            }
            self.session = None;
        }
        expired
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENDER: DeviceId = DeviceId([0xA0, 0xA1, 0xA2, 0xA3]);
    const RECEIVER: DeviceId = DeviceId([0xB0, 0xB1, 0xB2, 0xB3]);

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn frames_for(len: usize) -> (Vec<u8>, Vec<Bytes>) {
        let data = payload(len);
        let chunker = Chunker::new(FrameCodec::new(SENDER));
        let frames = chunker
            .chunk_frames(&data, RECEIVER, Options::empty())
            .unwrap();
        (data, frames)
    }

    fn feed(
        reassembler: &mut Reassembler,
        receiver: &FrameCodec,
        frame: &[u8],
        now: Instant,
    ) -> AcceptOutcome {
        let validated = receiver.validate(frame).unwrap();
        assert!(validated.checksum_valid);
        reassembler.accept(&validated, -40, 9, now)
    }

    #[test]
    fn test_chunk_sizes_for_500_bytes() {
        let (_, frames) = frames_for(500);
        let receiver = FrameCodec::new(RECEIVER);
        let sizes: Vec<usize> = frames
            .iter()
            .map(|f| receiver.validate(f).unwrap().payload.len())
            .collect();
        assert_eq!(sizes, vec![239, 239, 22]);
    }

    #[test]
    fn test_reassembly_in_any_order() {
        let receiver = FrameCodec::new(RECEIVER);
        let orders: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        let (data, frames) = frames_for(500);
        for order in orders {
            let mut reassembler = Reassembler::new();
            let now = Instant::now();
            let mut delivered = None;
            for (step, &i) in order.iter().enumerate() {
                match feed(&mut reassembler, &receiver, &frames[i], now) {
                    AcceptOutcome::Complete(done) => delivered = Some(done),
                    AcceptOutcome::Pending { received, expected } => {
                        assert_eq!(received as usize, step + 1);
                        assert_eq!(expected, 3);
                    }
                    other => panic!("unexpected outcome {:?}", other),
                }
            }
            let done = delivered.expect("payload should be complete");
            assert_eq!(&done.payload[..], &data[..]);
            assert_eq!(done.total_chunks, 3);
            assert_eq!(done.source_id, SENDER);
            assert_eq!(done.rssi, -40);
            assert!(!reassembler.in_progress());
        }
    }

    #[test]
    fn test_reassembly_across_lengths() {
        let receiver = FrameCodec::new(RECEIVER);
        for len in [240usize, 478, 479, 1912, 1913, 5000, MAX_CHUNKED_PAYLOAD] {
            let (data, frames) = frames_for(len);
            assert_eq!(frames.len(), chunk_count(len));

            let mut reassembler = Reassembler::new();
            let now = Instant::now();
            let mut delivered = None;
            for frame in frames.iter().rev() {
                if let AcceptOutcome::Complete(done) = feed(&mut reassembler, &receiver, frame, now)
                {
                    delivered = Some(done);
                }
            }
            assert_eq!(delivered.unwrap().payload.len(), data.len());
        }
    }

    #[test]
    fn test_duplicate_chunk_is_ignored() {
        let receiver = FrameCodec::new(RECEIVER);
        let (data, frames) = frames_for(500);
        let mut reassembler = Reassembler::new();
        let now = Instant::now();

        feed(&mut reassembler, &receiver, &frames[2], now);
        assert_eq!(
            feed(&mut reassembler, &receiver, &frames[2], now),
            AcceptOutcome::Discarded(DiscardReason::Duplicate)
        );
        assert_eq!(reassembler.progress(), Some((1, 3)));

        feed(&mut reassembler, &receiver, &frames[0], now);
        let outcome = feed(&mut reassembler, &receiver, &frames[1], now);
        let AcceptOutcome::Complete(done) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(&done.payload[..], &data[..]);

        // A late duplicate opens a fresh session instead of re-completing
        let late = feed(&mut reassembler, &receiver, &frames[1], now);
        assert_eq!(
            late,
            AcceptOutcome::Pending {
                received: 1,
                expected: 3
            }
        );
    }

    #[test]
    fn test_mismatched_total_is_discarded() {
        let receiver = FrameCodec::new(RECEIVER);
        let (_, three) = frames_for(500);
        let (_, two) = frames_for(300);
        let mut reassembler = Reassembler::new();
        let now = Instant::now();

        feed(&mut reassembler, &receiver, &three[0], now);
        assert_eq!(
            feed(&mut reassembler, &receiver, &two[1], now),
            AcceptOutcome::Discarded(DiscardReason::ChunkCountMismatch)
        );
        assert_eq!(reassembler.progress(), Some((1, 3)));
    }

    #[test]
    fn test_restart_at_index_zero_resets_session() {
        let receiver = FrameCodec::new(RECEIVER);
        let (_, three) = frames_for(500);
        let (data, two) = frames_for(300);
        let mut reassembler = Reassembler::new();
        let now = Instant::now();

        feed(&mut reassembler, &receiver, &three[1], now);
        feed(&mut reassembler, &receiver, &two[0], now);
        assert_eq!(reassembler.progress(), Some((1, 2)));

        let AcceptOutcome::Complete(done) = feed(&mut reassembler, &receiver, &two[1], now) else {
            panic!("expected completion");
        };
        assert_eq!(&done.payload[..], &data[..]);
    }

    #[test]
    fn test_discarded_restart_keeps_open_session() {
        let sender = FrameCodec::new(SENDER);
        let receiver = FrameCodec::new(RECEIVER);
        let (data, three) = frames_for(500);
        let mut reassembler = Reassembler::new();
        let now = Instant::now();

        feed(&mut reassembler, &receiver, &three[0], now);

        // index 0 of a 2-chunk send must carry a full chunk
        let short_restart = sender
            .build_chunk(
                FrameType::MultiPacket,
                &[9u8; 10],
                RECEIVER,
                Options::empty(),
                ChunkInfo {
                    total_chunks: 2,
                    chunk_index: 0,
                },
            )
            .unwrap();
        assert_eq!(
            feed(&mut reassembler, &receiver, &short_restart, now),
            AcceptOutcome::Discarded(DiscardReason::BadChunkSize)
        );
        assert_eq!(reassembler.progress(), Some((1, 3)));

        feed(&mut reassembler, &receiver, &three[1], now);
        let AcceptOutcome::Complete(done) = feed(&mut reassembler, &receiver, &three[2], now) else {
            panic!("expected completion");
        };
        assert_eq!(&done.payload[..], &data[..]);
    }

    #[test]
    fn test_bad_chunk_sizes_are_discarded() {
        let sender = FrameCodec::new(SENDER);
        let receiver = FrameCodec::new(RECEIVER);
        let mut reassembler = Reassembler::new();
        let now = Instant::now();

        let short_middle = sender
            .build_chunk(
                FrameType::MultiPacket,
                &[1u8; 100],
                RECEIVER,
                Options::empty(),
                ChunkInfo {
                    total_chunks: 3,
                    chunk_index: 1,
                },
            )
            .unwrap();
        assert_eq!(
            feed(&mut reassembler, &receiver, &short_middle, now),
            AcceptOutcome::Discarded(DiscardReason::BadChunkSize)
        );

        let out_of_range = sender
            .build_chunk(
                FrameType::MultiPacket,
                &[1u8; 10],
                RECEIVER,
                Options::empty(),
                ChunkInfo {
                    total_chunks: 2,
                    chunk_index: 2,
                },
            )
            .unwrap();
        assert_eq!(
            feed(&mut reassembler, &receiver, &out_of_range, now),
            AcceptOutcome::Discarded(DiscardReason::IndexOutOfRange)
        );

        let zero = sender
            .build_chunk(
                FrameType::MultiPacket,
                &[1u8; 10],
                RECEIVER,
                Options::empty(),
                ChunkInfo {
                    total_chunks: 0,
                    chunk_index: 0,
                },
            )
            .unwrap();
        assert_eq!(
            feed(&mut reassembler, &receiver, &zero, now),
            AcceptOutcome::Discarded(DiscardReason::NoChunks)
        );
        assert!(!reassembler.in_progress());
    }

    #[test]
    fn test_session_timeout_fires_once() {
        let receiver = FrameCodec::new(RECEIVER);
        let (_, frames) = frames_for(500);
        let mut reassembler = Reassembler::new();
        let start = Instant::now();

        feed(&mut reassembler, &receiver, &frames[0], start);
        assert!(!reassembler.tick(start + Duration::from_millis(4999)));
        assert!(!reassembler.tick(start + DEFAULT_SESSION_TIMEOUT));
        assert!(reassembler.tick(start + Duration::from_millis(5001)));
        assert!(!reassembler.in_progress());
        assert!(!reassembler.tick(start + Duration::from_millis(9000)));
    }

    #[test]
    fn test_chunker_paces_one_chunk_at_a_time() {
        let sender = FrameCodec::new(SENDER);
        let receiver = FrameCodec::new(RECEIVER);
        let mut chunker = Chunker::new(sender);
        let data = payload(500);

        let first = chunker
            .start(Bytes::from(data.clone()), RECEIVER, true)
            .unwrap();
        let validated = receiver.validate(&first).unwrap();
        assert_eq!(validated.chunk_index, 0);
        assert_eq!(validated.total_chunks, 3);
        assert!(validated.ack_requested());
        assert_eq!(chunker.progress(), Some((0, 3)));

        assert_eq!(
            chunker.start(Bytes::from_static(b"second"), RECEIVER, false),
            Err(ChunkError::Busy)
        );

        let mut indices = vec![];
        loop {
            match chunker.on_chunk_sent().unwrap().unwrap() {
                ChunkProgress::More(frame) => {
                    indices.push(receiver.validate(&frame).unwrap().chunk_index);
                }
                ChunkProgress::Complete(stats) => {
                    assert_eq!(stats.bytes_sent, 500);
                    assert_eq!(stats.chunk_count, 3);
                    break;
                }
            }
        }
        assert_eq!(indices, vec![1, 2]);
        assert!(!chunker.is_active());
        assert_eq!(
            chunker.last_stats(),
            Some(SendStats {
                bytes_sent: 500,
                chunk_count: 3
            })
        );
        assert!(chunker.on_chunk_sent().is_none());
    }

    #[test]
    fn test_chunker_rejects_bad_payloads() {
        let mut chunker = Chunker::new(FrameCodec::new(SENDER));
        assert_eq!(
            chunker.start(Bytes::new(), RECEIVER, false),
            Err(ChunkError::Empty)
        );
        let huge = Bytes::from(vec![0u8; MAX_CHUNKED_PAYLOAD + 1]);
        assert_eq!(
            chunker.start(huge, RECEIVER, false),
            Err(ChunkError::TooLarge(MAX_CHUNKED_PAYLOAD + 1))
        );
        assert!(!chunker.is_active());
    }

    #[test]
    fn test_abort_releases_send() {
        let mut chunker = Chunker::new(FrameCodec::new(SENDER));
        chunker
            .start(Bytes::from(payload(1000)), RECEIVER, false)
            .unwrap();
        assert!(chunker.abort());
        assert!(!chunker.is_active());
        assert!(!chunker.abort());
        assert!(chunker.last_stats().is_none());
        assert!(chunker
            .start(Bytes::from(payload(300)), RECEIVER, false)
            .is_ok());
    }
}
