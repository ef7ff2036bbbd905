//! Radio controller: the driving context of the link.
//!
//! The controller exclusively owns the transceiver driver, the chunked-send
//! state and the reassembly session. Each [`RadioController::tick`] runs, in
//! order:
//!
//! 1. every pending request from the mailbox,
//! 2. the driver's completion events through the internal handlers,
//! 3. the reassembly session timeout.
//!
//! Outcomes are published to the result mailbox; delivering them to
//! callbacks is the issuing context's job. An event whose result slot is
//! still occupied waits in the controller's backlog, and the driver is not
//! polled again until the backlog has drained.

use crate::config::RadioConfig;
use crate::driver::{RadioDriver, RadioEvent};
use crate::error::{LinkError, RadioError};
use crate::mailbox::{
    RadioResult, ReceivedPayload, Request, ResultKind, SendRequest, TransmitOutcome,
};
use crate::state::Shared;
use bytes::Bytes;
use radio_wire::{
    AcceptOutcome, ChunkError, ChunkProgress, Chunker, DeviceId, FrameCodec, FrameType,
    Options, Reassembler, CHUNK_SIZE,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Transmit side of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitState {
    /// Nothing in flight
    Idle,
    /// One frame in flight
    Single {
        /// Payload bytes carried by the frame
        bytes: usize,
    },
    /// A chunk of a multi-packet send in flight
    Chunked,
}

/// Receive side of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveState {
    /// Receiver closed
    Idle,
    /// Receiver open; re-armed after every transmission
    Listening {
        /// Receive window, zero for continuous
        timeout: Duration,
    },
}

/// Driving half of a radio link
#[derive(Debug)]
pub struct RadioController<D> {
    driver: D,
    shared: Arc<Shared>,
    codec: FrameCodec,
    chunker: Chunker,
    reassembler: Reassembler,
    tx: TransmitState,
    rx: ReceiveState,
    /// Driver events waiting for a free result slot, oldest first
    backlog: VecDeque<RadioEvent>,
}

impl<D: RadioDriver> RadioController<D> {
    pub(crate) fn new(
        mut driver: D,
        shared: Arc<Shared>,
        device_id: DeviceId,
        session_timeout: Duration,
    ) -> Result<Self, LinkError> {
        if let Err(e) = driver.init() {
            error!("Radio init failed: {}", e);
            return Err(e.into());
        }

        let codec = FrameCodec::new(device_id);
        let mut controller = Self {
            driver,
            shared,
            codec,
            chunker: Chunker::new(codec),
            reassembler: Reassembler::with_timeout(session_timeout),
            tx: TransmitState::Idle,
            rx: ReceiveState::Idle,
            backlog: VecDeque::new(),
        };

        let config = controller.shared.config.read().clone();
        controller.apply_config(&config);
        controller.shared.state.set_initialized(true);
        info!("Radio {} initialized", device_id);

        Ok(controller)
    }

    /// This device's identifier
    pub fn device_id(&self) -> DeviceId {
        self.codec.device_id()
    }

    /// Current transmit state
    pub fn transmit_state(&self) -> TransmitState {
        self.tx
    }

    /// Current receive state
    pub fn receive_state(&self) -> ReceiveState {
        self.rx
    }

    /// Whether a multi-packet reception is in progress
    pub fn is_reassembling(&self) -> bool {
        self.reassembler.in_progress()
    }

    /// Driver events held until the application takes its results
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// The owned transceiver driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the transceiver driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Run one iteration of the driving loop
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Run one iteration with an explicit clock reading
    pub fn tick_at(&mut self, now: Instant) {
        let busy = self.tx != TransmitState::Idle;
        for request in self.shared.requests.drain(busy) {
            self.execute(request);
        }

        if self.backlog.is_empty() {
            self.backlog.extend(self.driver.process_events());
        }
        while let Some(event) = self.backlog.front() {
            if !self.has_room_for(event) {
                trace!("{} radio events wait for result delivery", self.backlog.len());
                break;
            }
            let Some(event) = self.backlog.pop_front() else {
                break;
            };
            self.handle_event(event, now);
        }

        // an expired session stays open until its error can be published
        if !self.shared.results.is_pending(ResultKind::Error) && self.reassembler.tick(now) {
            self.publish(RadioResult::Error(RadioError::ReassemblyTimeout));
        }
    }

    fn execute(&mut self, request: Request) {
        trace!("executing {:?} request", request.kind());
        match request {
            Request::Send(send) => self.start_send(send),
            Request::StartReceive(timeout) => self.start_receive(timeout),
            Request::StopReceive => self.stop_receive(),
            Request::ConfigChange(config) => self.change_config(config),
            Request::Sleep => self.enter_sleep(),
        }
    }

    fn has_room_for(&self, event: &RadioEvent) -> bool {
        let results = &self.shared.results;
        match event {
            RadioEvent::TransmitDone => !results.is_pending(ResultKind::TransmitComplete),
            RadioEvent::TransmitTimeout => {
                !results.is_pending(ResultKind::TransmitComplete)
                    && !results.is_pending(ResultKind::Error)
            }
            RadioEvent::ReceiveDone { .. } => !results.is_pending(ResultKind::ReceiveComplete),
            RadioEvent::ReceiveTimeout | RadioEvent::ReceiveError => {
                !results.is_pending(ResultKind::Error)
            }
        }
    }

    fn handle_event(&mut self, event: RadioEvent, now: Instant) {
        match event {
            RadioEvent::TransmitDone => self.on_transmit_done(),
            RadioEvent::TransmitTimeout => self.on_transmit_timeout(),
            RadioEvent::ReceiveDone { payload, rssi, snr } => {
                self.on_receive_done(payload, rssi, snr, now)
            }
            RadioEvent::ReceiveTimeout => self.on_receive_timeout(),
            RadioEvent::ReceiveError => self.on_receive_error(),
        }
    }

    fn start_send(&mut self, request: SendRequest) {
        let len = request.payload.len();
        let prepared = if len > CHUNK_SIZE {
            self.chunker
                .start(
                    request.payload,
                    request.destination,
                    request.options.contains(Options::ACK_REQUESTED),
                )
                .map(|frame| (frame, TransmitState::Chunked))
        } else {
            self.codec
                .build(
                    request.frame_type,
                    &request.payload,
                    request.destination,
                    request.options,
                )
                .map(|frame| (frame, TransmitState::Single { bytes: len }))
                .map_err(ChunkError::from)
        };

        match prepared {
            Ok((frame, state)) => {
                debug!("sending {} bytes to {}", len, request.destination);
                self.set_transmit_state(state);
                self.transmit(&frame);
            }
            Err(e) => {
                warn!("Send of {} bytes failed: {}", len, e);
                self.publish(RadioResult::TransmitComplete(TransmitOutcome::failed()));
            }
        }
    }

    fn transmit(&mut self, frame: &Bytes) {
        let count = self.shared.state.count_transmission();
        trace!("transmission #{}: {} byte frame", count, frame.len());
        self.driver.send(frame);
    }

    fn start_receive(&mut self, timeout: Duration) {
        self.set_receive_state(ReceiveState::Listening { timeout });
        self.shared.state.set_asleep(false);

        if self.tx == TransmitState::Idle {
            self.arm_receiver(timeout);
        } else {
            debug!("receiver will open once the transmission finishes");
        }
    }

    fn stop_receive(&mut self) {
        self.set_receive_state(ReceiveState::Idle);
        if self.tx == TransmitState::Idle {
            self.driver.standby();
        }
    }

    fn change_config(&mut self, config: RadioConfig) {
        *self.shared.config.write() = config.clone();
        self.apply_config(&config);
        self.shared.state.set_asleep(false);

        if let ReceiveState::Listening { timeout } = self.rx {
            self.arm_receiver(timeout);
        }
    }

    fn enter_sleep(&mut self) {
        self.set_receive_state(ReceiveState::Idle);
        self.driver.standby();
        self.driver.sleep();
        self.shared.state.set_asleep(true);
        info!("Radio asleep");
    }

    fn apply_config(&mut self, config: &RadioConfig) {
        self.driver.standby();
        self.driver.set_channel(config.frequency);
        self.driver.set_tx_config(&config.tx_params());
        self.driver.set_rx_config(&config.rx_params());
        info!(
            "Applied {:?} config at {} Hz, {} dBm",
            config.modem, config.frequency, config.tx_power
        );
    }

    fn arm_receiver(&mut self, timeout: Duration) {
        self.driver.standby();
        self.driver.receive(timeout);
    }

    fn on_transmit_done(&mut self) {
        match self.tx {
            TransmitState::Idle => {
                debug!("transmit-done with nothing in flight, ignoring");
            }
            TransmitState::Single { bytes } => {
                self.finish_transmit(TransmitOutcome {
                    success: true,
                    bytes_sent: bytes,
                    chunk_count: 1,
                });
            }
            TransmitState::Chunked => match self.chunker.on_chunk_sent() {
                Some(Ok(ChunkProgress::More(frame))) => self.transmit(&frame),
                Some(Ok(ChunkProgress::Complete(stats))) => {
                    self.finish_transmit(TransmitOutcome {
                        success: true,
                        bytes_sent: stats.bytes_sent,
                        chunk_count: stats.chunk_count,
                    });
                }
                Some(Err(e)) => {
                    warn!("Chunked send failed: {}", e);
                    self.finish_transmit(TransmitOutcome::failed());
                }
                None => {
                    warn!("Chunked transmit state without an active send");
                    self.finish_transmit(TransmitOutcome::failed());
                }
            },
        }
    }

    fn on_transmit_timeout(&mut self) {
        warn!("Transmission timed out");
        self.chunker.abort();
        self.finish_transmit(TransmitOutcome::failed());
        self.publish(RadioResult::Error(RadioError::TransmitTimeout));
    }

    fn finish_transmit(&mut self, outcome: TransmitOutcome) {
        self.set_transmit_state(TransmitState::Idle);
        self.publish(RadioResult::TransmitComplete(outcome));

        if let ReceiveState::Listening { timeout } = self.rx {
            self.arm_receiver(timeout);
        }
    }

    fn on_receive_done(&mut self, packet: Bytes, rssi: i16, snr: i8, now: Instant) {
        let frame = match self.codec.validate(&packet) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("discarding packet: {}", e);
                return;
            }
        };

        if !frame.checksum_valid {
            debug!("checksum mismatch on frame from {}, discarding", frame.source_id);
            return;
        }
        if !frame.is_intended_destination {
            trace!("frame for {} is not ours, discarding", frame.destination_id);
            return;
        }

        if frame.kind() == Some(FrameType::MultiPacket) {
            match self.reassembler.accept(&frame, rssi, snr, now) {
                AcceptOutcome::Complete(done) => {
                    self.publish(RadioResult::ReceiveComplete(ReceivedPayload {
                        source_id: done.source_id,
                        destination_id: done.destination_id,
                        frame_type: FrameType::MultiPacket as u8,
                        options: done.options,
                        total_chunks: done.total_chunks,
                        payload: done.payload,
                        rssi: done.rssi,
                        snr: done.snr,
                    }));
                }
                AcceptOutcome::Pending { received, expected } => {
                    trace!("chunk {}/{} from {}", received, expected, frame.source_id);
                }
                AcceptOutcome::Discarded(reason) => {
                    debug!("chunk from {} discarded: {:?}", frame.source_id, reason);
                }
            }
            return;
        }

        let received = ReceivedPayload {
            source_id: frame.source_id,
            destination_id: frame.destination_id,
            frame_type: frame.frame_type,
            options: frame.options,
            total_chunks: frame.total_chunks,
            payload: packet.slice_ref(frame.payload),
            rssi,
            snr,
        };
        debug!(
            "received {} bytes from {} (rssi {}, snr {})",
            received.payload.len(),
            received.source_id,
            rssi,
            snr
        );
        self.publish(RadioResult::ReceiveComplete(received));
    }

    fn on_receive_timeout(&mut self) {
        debug!("Receive window closed");
        self.set_receive_state(ReceiveState::Idle);
        self.publish(RadioResult::Error(RadioError::ReceiveTimeout));
    }

    fn on_receive_error(&mut self) {
        warn!("Receiver error");
        self.set_receive_state(ReceiveState::Idle);
        self.publish(RadioResult::Error(RadioError::ReceiveError));
    }

    fn publish(&self, result: RadioResult) {
        if let Err(e) = self.shared.results.post(result) {
            warn!("Dropping result: {}", e);
        }
    }

    fn set_transmit_state(&mut self, state: TransmitState) {
        self.tx = state;
        self.shared
            .state
            .set_transmitting(state != TransmitState::Idle);
    }

    fn set_receive_state(&mut self, state: ReceiveState) {
        self.rx = state;
        self.shared
            .state
            .set_receiving(matches!(state, ReceiveState::Listening { .. }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::ResultKind;
    use crate::radio::{Radio, RadioBuilder};
    use crate::sim::{SimAir, SimControl, SimRadio};
    use radio_wire::DEFAULT_SESSION_TIMEOUT;

    const LOCAL: DeviceId = DeviceId([0x0A, 0x0B, 0x0C, 0x0D]);
    const PEER: DeviceId = DeviceId([0x01, 0x02, 0x03, 0x04]);

    fn radio() -> (Radio<SimRadio>, SimControl) {
        let driver = SimRadio::standalone();
        let control = driver.control();
        let radio = RadioBuilder::new(LOCAL).build(driver).unwrap();
        (radio, control)
    }

    fn results(radio: &Radio<SimRadio>) -> Vec<RadioResult> {
        radio.shared().results.drain().into_vec()
    }

    #[test]
    fn test_init_applies_config() {
        let (radio, control) = radio();
        assert!(radio.handle().is_initialized());
        assert_eq!(control.frequency(), 915_600_000);
        assert_eq!(control.tx_params().unwrap().power, 22);
        assert!(control.rx_params().unwrap().continuous);
    }

    #[test]
    fn test_init_failure() {
        let driver = SimRadio::standalone();
        driver.control().fail_init();
        let err = RadioBuilder::new(LOCAL).build(driver).unwrap_err();
        assert!(matches!(err, LinkError::Init(_)));
    }

    #[test]
    fn test_single_send_completes_on_transmit_done() {
        let (mut radio, control) = radio();
        control.hold_transmissions(true);
        assert!(radio.handle().send(&b"hello"[..], PEER, false));

        radio.controller_mut().tick();
        assert_eq!(
            radio.controller().transmit_state(),
            TransmitState::Single { bytes: 5 }
        );
        assert!(radio.handle().is_transmitting());
        assert_eq!(control.sent_frames().len(), 1);
        assert_eq!(control.sent_frames()[0].len(), 16 + 5);
        assert!(results(&radio).is_empty());

        control.release_transmissions();
        radio.controller_mut().tick();
        assert_eq!(radio.controller().transmit_state(), TransmitState::Idle);
        assert_eq!(
            results(&radio),
            vec![RadioResult::TransmitComplete(TransmitOutcome {
                success: true,
                bytes_sent: 5,
                chunk_count: 1,
            })]
        );
        assert_eq!(radio.handle().transmission_count(), 1);
    }

    #[test]
    fn test_chunked_send_paced_by_completions() {
        let (mut radio, control) = radio();
        control.hold_transmissions(true);
        assert!(radio.handle().send(vec![0x5A; 500], PEER, true));

        radio.controller_mut().tick();
        assert_eq!(radio.controller().transmit_state(), TransmitState::Chunked);

        // nothing further goes out until the radio reports completion
        radio.controller_mut().tick();
        radio.controller_mut().tick();
        assert_eq!(control.sent_frames().len(), 1);

        for expected in 2..=3 {
            control.release_transmissions();
            radio.controller_mut().tick();
            assert_eq!(control.sent_frames().len(), expected);
        }
        assert!(results(&radio).is_empty());

        control.release_transmissions();
        radio.controller_mut().tick();
        assert_eq!(
            results(&radio),
            vec![RadioResult::TransmitComplete(TransmitOutcome {
                success: true,
                bytes_sent: 500,
                chunk_count: 3,
            })]
        );

        let sizes: Vec<_> = control.sent_frames().iter().map(Bytes::len).collect();
        assert_eq!(sizes, vec![16 + 239, 16 + 239, 16 + 22]);
        let sent = control.sent_frames();
        let first = FrameCodec::new(PEER).validate(&sent[0]).unwrap();
        assert!(first.ack_requested());
        assert_eq!(first.kind(), Some(FrameType::MultiPacket));
    }

    #[test]
    fn test_transmit_timeout_mid_chunk() {
        let (mut radio, control) = radio();
        control.hold_transmissions(true);
        assert!(radio.handle().send(vec![1u8; 600], PEER, false));
        radio.controller_mut().tick();

        // chunk 0 done, chunk 1 goes out and times out
        control.time_out_transmissions(1);
        control.release_transmissions();
        radio.controller_mut().tick();
        radio.controller_mut().tick();

        let mut got = results(&radio);
        got.sort_by_key(|r| r.kind() as u8);
        assert_eq!(
            got,
            vec![
                RadioResult::TransmitComplete(TransmitOutcome::failed()),
                RadioResult::Error(RadioError::TransmitTimeout),
            ]
        );
        assert_eq!(radio.controller().transmit_state(), TransmitState::Idle);
        assert_eq!(control.sent_frames().len(), 2);

        // the link accepts a new send right away
        control.hold_transmissions(false);
        assert!(radio.handle().send(&b"again"[..], PEER, false));
        radio.controller_mut().tick();
        assert_eq!(control.sent_frames().len(), 3);
    }

    #[test]
    fn test_send_held_while_transmitting() {
        let (mut radio, control) = radio();
        control.hold_transmissions(true);
        assert!(radio.handle().send(&b"one"[..], PEER, false));
        radio.controller_mut().tick();

        assert!(radio.handle().send(&b"two"[..], PEER, false));
        assert!(!radio.handle().send(&b"three"[..], PEER, false));
        radio.controller_mut().tick();
        assert_eq!(control.sent_frames().len(), 1);
        assert!(!radio.handle().is_transmission_complete());

        control.release_transmissions();
        radio.controller_mut().tick();
        radio.controller_mut().tick();
        assert_eq!(control.sent_frames().len(), 2);
    }

    #[test]
    fn test_receive_filters_and_delivers() {
        let (mut radio, control) = radio();
        control.set_signal(-71, 6);
        assert!(radio.handle().start_receive(Duration::ZERO));
        radio.controller_mut().tick();
        assert!(control.is_listening());
        assert!(radio.handle().is_receiving());

        let peer = FrameCodec::new(PEER);
        let other = DeviceId([0xEE; 4]);

        // wrong destination
        control.inject_frame(
            peer.build(FrameType::Telemetry, b"x", other, Options::empty())
                .unwrap(),
        );
        // corrupted
        let mut corrupt = peer
            .build(FrameType::Telemetry, b"y", LOCAL, Options::empty())
            .unwrap()
            .to_vec();
        corrupt[15] ^= 0xFF;
        control.inject_frame(corrupt);
        // too short
        control.inject_frame(vec![0x85; 15]);
        radio.controller_mut().tick();
        assert!(results(&radio).is_empty());

        control.inject_frame(
            peer.build(FrameType::Metrics, b"cpu=3", LOCAL, Options::empty())
                .unwrap(),
        );
        radio.controller_mut().tick();
        let got = results(&radio);
        match got.as_slice() {
            [RadioResult::ReceiveComplete(rx)] => {
                assert_eq!(rx.payload, Bytes::from_static(b"cpu=3"));
                assert_eq!(rx.source_id, PEER);
                assert_eq!(rx.kind(), Some(FrameType::Metrics));
                assert_eq!(rx.total_chunks, 1);
                assert_eq!((rx.rssi, rx.snr), (-71, 6));
            }
            other => panic!("unexpected results: {:?}", other),
        }
        // still listening after a frame
        assert!(radio.handle().is_receiving());
    }

    #[test]
    fn test_reassembly_timeout_reported_once() {
        let (mut radio, control) = radio();
        radio.handle().start_receive(Duration::ZERO);
        let start = Instant::now();
        radio.controller_mut().tick_at(start);

        let frames = Chunker::new(FrameCodec::new(PEER))
            .chunk_frames(&[7u8; 700], LOCAL, Options::empty())
            .unwrap();
        control.inject_frame(frames[0].clone());
        radio.controller_mut().tick_at(start);
        assert!(radio.controller().is_reassembling());

        radio
            .controller_mut()
            .tick_at(start + DEFAULT_SESSION_TIMEOUT);
        assert!(results(&radio).is_empty());

        let later = start + DEFAULT_SESSION_TIMEOUT + Duration::from_millis(1);
        radio.controller_mut().tick_at(later);
        assert_eq!(
            results(&radio),
            vec![RadioResult::Error(RadioError::ReassemblyTimeout)]
        );
        assert!(!radio.controller().is_reassembling());

        radio
            .controller_mut()
            .tick_at(later + Duration::from_secs(10));
        assert!(results(&radio).is_empty());
    }

    #[test]
    fn test_receive_timeout_and_error_stop_listening() {
        let (mut radio, control) = radio();
        radio.handle().start_receive(Duration::from_millis(200));
        radio.controller_mut().tick();
        assert_eq!(control.rx_timeout(), Duration::from_millis(200));

        control.inject(RadioEvent::ReceiveTimeout);
        radio.controller_mut().tick();
        assert_eq!(radio.controller().receive_state(), ReceiveState::Idle);
        assert_eq!(
            results(&radio),
            vec![RadioResult::Error(RadioError::ReceiveTimeout)]
        );

        radio.handle().start_receive(Duration::ZERO);
        radio.controller_mut().tick();
        control.inject(RadioEvent::ReceiveError);
        radio.controller_mut().tick();
        assert!(!radio.handle().is_receiving());
        assert_eq!(
            results(&radio),
            vec![RadioResult::Error(RadioError::ReceiveError)]
        );
    }

    #[test]
    fn test_errors_wait_for_delivery() {
        let (mut radio, control) = radio();
        control.inject(RadioEvent::ReceiveTimeout);
        control.inject(RadioEvent::ReceiveError);
        radio.controller_mut().tick();
        radio.controller_mut().tick();

        assert_eq!(
            results(&radio),
            vec![RadioResult::Error(RadioError::ReceiveTimeout)]
        );
        assert!(!radio.shared().results.is_pending(ResultKind::Error));
        assert_eq!(radio.controller().backlog_len(), 1);

        radio.controller_mut().tick();
        assert_eq!(
            results(&radio),
            vec![RadioResult::Error(RadioError::ReceiveError)]
        );
        assert_eq!(radio.controller().backlog_len(), 0);
    }

    #[test]
    fn test_frames_in_one_tick_all_delivered() {
        let (mut radio, control) = radio();
        radio.handle().start_receive(Duration::ZERO);
        radio.controller_mut().tick();

        let peer = FrameCodec::new(PEER);
        for body in [&b"first"[..], b"second", b"third"] {
            control.inject_frame(
                peer.build(FrameType::Telemetry, body, LOCAL, Options::empty())
                    .unwrap(),
            );
        }

        // the issuing side falls behind for a few ticks
        for _ in 0..5 {
            radio.controller_mut().tick();
        }

        let mut delivered = Vec::new();
        for _ in 0..5 {
            for result in results(&radio) {
                if let RadioResult::ReceiveComplete(rx) = result {
                    delivered.push(rx.payload);
                }
            }
            radio.controller_mut().tick();
        }
        assert_eq!(
            delivered,
            vec![
                Bytes::from_static(b"first"),
                Bytes::from_static(b"second"),
                Bytes::from_static(b"third"),
            ]
        );
        assert_eq!(radio.controller().backlog_len(), 0);
    }

    #[test]
    fn test_transmit_done_waits_behind_undelivered_outcome() {
        let (mut radio, control) = radio();
        control.hold_transmissions(true);
        radio.handle().send(&b"one"[..], PEER, false);
        radio.controller_mut().tick();
        control.release_transmissions();
        radio.controller_mut().tick();
        assert!(radio.shared().results.is_pending(ResultKind::TransmitComplete));

        radio.handle().send(&b"four"[..], PEER, false);
        radio.controller_mut().tick();
        control.release_transmissions();
        radio.controller_mut().tick();
        assert_eq!(
            radio.controller().transmit_state(),
            TransmitState::Single { bytes: 4 }
        );

        assert_eq!(
            results(&radio),
            vec![RadioResult::TransmitComplete(TransmitOutcome {
                success: true,
                bytes_sent: 3,
                chunk_count: 1,
            })]
        );
        radio.controller_mut().tick();
        assert_eq!(radio.controller().transmit_state(), TransmitState::Idle);
        assert_eq!(
            results(&radio),
            vec![RadioResult::TransmitComplete(TransmitOutcome {
                success: true,
                bytes_sent: 4,
                chunk_count: 1,
            })]
        );
    }

    #[test]
    fn test_stop_receive_returns_to_idle() {
        let (mut radio, control) = radio();
        radio.handle().start_receive(Duration::ZERO);
        radio.controller_mut().tick();
        assert!(control.is_listening());

        assert!(radio.handle().stop_receive());
        radio.controller_mut().tick();
        assert_eq!(radio.controller().receive_state(), ReceiveState::Idle);
        assert!(!radio.handle().is_receiving());
        assert!(!control.is_listening());
    }

    #[test]
    fn test_stop_receive_during_transmit_skips_rearm() {
        let (mut radio, control) = radio();
        radio.handle().start_receive(Duration::ZERO);
        radio.controller_mut().tick();

        control.hold_transmissions(true);
        radio.handle().send(&b"ping"[..], PEER, false);
        radio.controller_mut().tick();
        assert!(radio.handle().stop_receive());
        radio.controller_mut().tick();
        assert!(!radio.handle().is_receiving());
        assert!(radio.handle().is_transmitting());

        control.release_transmissions();
        radio.controller_mut().tick();
        assert_eq!(radio.controller().transmit_state(), TransmitState::Idle);
        assert!(!control.is_listening());
        assert!(!radio.handle().is_receiving());
    }

    #[test]
    fn test_receiver_rearmed_after_transmit() {
        let (mut radio, control) = radio();
        radio.handle().start_receive(Duration::ZERO);
        radio.controller_mut().tick();
        assert!(control.is_listening());

        control.hold_transmissions(true);
        radio.handle().send(&b"ping"[..], PEER, false);
        radio.controller_mut().tick();
        assert!(!control.is_listening());

        control.release_transmissions();
        radio.controller_mut().tick();
        assert!(control.is_listening());
        assert!(radio.handle().is_receiving());
    }

    #[test]
    fn test_config_change_and_sleep() {
        let (mut radio, control) = radio();
        radio.handle().start_receive(Duration::ZERO);
        radio.controller_mut().tick();

        let mut config = RadioConfig::fsk_bulk();
        config.frequency = 868_100_000;
        assert!(radio.handle().set_config(config.clone()));
        radio.controller_mut().tick();
        assert_eq!(control.frequency(), 868_100_000);
        assert_eq!(control.tx_params().unwrap().datarate, 50_000);
        assert_eq!(radio.handle().get_config(), config);
        // listening resumes on the new channel
        assert!(control.is_listening());

        assert!(radio.handle().sleep());
        radio.controller_mut().tick();
        assert!(control.is_asleep());
        assert!(radio.handle().is_asleep());
        assert!(!radio.handle().is_receiving());

        assert!(radio.handle().wake());
        radio.controller_mut().tick();
        assert!(!control.is_asleep());
        assert!(!radio.handle().is_asleep());
        assert_eq!(control.frequency(), 868_100_000);
    }

    #[test]
    fn test_two_radios_exchange_chunked_payload() {
        let air = SimAir::new();
        let mut sender = RadioBuilder::new(LOCAL).build(air.radio()).unwrap();
        let mut receiver = RadioBuilder::new(PEER).build(air.radio()).unwrap();

        receiver.handle().start_receive(Duration::ZERO);
        receiver.controller_mut().tick();

        let payload: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        sender.handle().send(payload.clone(), PEER, false);

        for _ in 0..8 {
            sender.controller_mut().tick();
            receiver.controller_mut().tick();
        }

        match results(&receiver).as_slice() {
            [RadioResult::ReceiveComplete(rx)] => {
                assert_eq!(rx.payload, Bytes::from(payload.clone()));
                assert_eq!(rx.total_chunks, 5);
                assert_eq!(rx.source_id, LOCAL);
            }
            other => panic!("unexpected results: {:?}", other),
        }
        assert_eq!(
            results(&sender),
            vec![RadioResult::TransmitComplete(TransmitOutcome {
                success: true,
                bytes_sent: 1000,
                chunk_count: 5,
            })]
        );
    }
}
