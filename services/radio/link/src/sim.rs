//! In-memory transceiver for tests and the demo node.
//!
//! Every [`SimRadio`] created from the same [`SimAir`] shares one medium: a
//! frame sent by one radio shows up as a receive-done event on every other
//! radio that is listening on the same frequency. Transmit completion is
//! reported on the sender's next `process_events` call unless a timeout was
//! scripted or completions are being held back.

use crate::config::{RxParams, TxParams};
use crate::driver::{RadioDriver, RadioEvent, RadioEvents};
use crate::error::DriverError;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

#[derive(Debug)]
struct Endpoint {
    frequency: u32,
    listening: bool,
    asleep: bool,
    rssi: i16,
    snr: i8,
    fail_init: bool,
    transmit_timeouts: usize,
    hold_transmissions: bool,
    held: usize,
    events: VecDeque<RadioEvent>,
    sent: Vec<Bytes>,
    tx_params: Option<TxParams>,
    rx_params: Option<RxParams>,
    rx_timeout: Duration,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            frequency: 0,
            listening: false,
            asleep: false,
            rssi: -60,
            snr: 9,
            fail_init: false,
            transmit_timeouts: 0,
            hold_transmissions: false,
            held: 0,
            events: VecDeque::new(),
            sent: Vec::new(),
            tx_params: None,
            rx_params: None,
            rx_timeout: Duration::ZERO,
        }
    }
}

type SharedEndpoint = Arc<Mutex<Endpoint>>;

/// Shared radio medium
#[derive(Debug, Clone, Default)]
pub struct SimAir {
    endpoints: Arc<Mutex<Vec<SharedEndpoint>>>,
}

impl SimAir {
    /// Empty medium
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new radio to the medium
    pub fn radio(&self) -> SimRadio {
        let endpoint = SharedEndpoint::default();
        self.endpoints.lock().push(endpoint.clone());
        SimRadio {
            endpoint,
            air: self.clone(),
        }
    }

    fn deliver(&self, from: &SharedEndpoint, frequency: u32, frame: &Bytes) -> usize {
        let endpoints = self.endpoints.lock().clone();
        let mut delivered = 0;

        for endpoint in endpoints.iter().filter(|e| !Arc::ptr_eq(e, from)) {
            let mut peer = endpoint.lock();
            if peer.listening && !peer.asleep && peer.frequency == frequency {
                let event = RadioEvent::ReceiveDone {
                    payload: frame.clone(),
                    rssi: peer.rssi,
                    snr: peer.snr,
                };
                peer.events.push_back(event);
                delivered += 1;
            }
        }
        delivered
    }
}

/// A simulated transceiver attached to a [`SimAir`]
#[derive(Debug)]
pub struct SimRadio {
    endpoint: SharedEndpoint,
    air: SimAir,
}

impl SimRadio {
    /// A standalone radio with nobody else on the air
    pub fn standalone() -> Self {
        SimAir::new().radio()
    }

    /// Scripting and inspection handle that stays usable after the radio is moved
    pub fn control(&self) -> SimControl {
        SimControl {
            endpoint: self.endpoint.clone(),
        }
    }
}

impl RadioDriver for SimRadio {
    fn init(&mut self) -> Result<(), DriverError> {
        if self.endpoint.lock().fail_init {
            return Err(DriverError::Init("simulated transceiver did not respond".into()));
        }
        Ok(())
    }

    fn set_channel(&mut self, frequency: u32) {
        self.endpoint.lock().frequency = frequency;
    }

    fn set_tx_config(&mut self, params: &TxParams) {
        self.endpoint.lock().tx_params = Some(*params);
    }

    fn set_rx_config(&mut self, params: &RxParams) {
        self.endpoint.lock().rx_params = Some(*params);
    }

    fn send(&mut self, frame: &[u8]) {
        let frame = Bytes::copy_from_slice(frame);
        let frequency = {
            let mut endpoint = self.endpoint.lock();
            endpoint.listening = false;
            endpoint.asleep = false;
            endpoint.sent.push(frame.clone());

            if endpoint.transmit_timeouts > 0 {
                endpoint.transmit_timeouts -= 1;
                endpoint.events.push_back(RadioEvent::TransmitTimeout);
                return;
            }
            if endpoint.hold_transmissions {
                endpoint.held += 1;
            } else {
                endpoint.events.push_back(RadioEvent::TransmitDone);
            }
            endpoint.frequency
        };

        let delivered = self.air.deliver(&self.endpoint, frequency, &frame);
        trace!("sim: {} byte frame reached {} radios", frame.len(), delivered);
    }

    fn receive(&mut self, timeout: Duration) {
        let mut endpoint = self.endpoint.lock();
        endpoint.listening = true;
        endpoint.asleep = false;
        endpoint.rx_timeout = timeout;
    }

    fn standby(&mut self) {
        let mut endpoint = self.endpoint.lock();
        endpoint.listening = false;
        endpoint.asleep = false;
    }

    fn sleep(&mut self) {
        let mut endpoint = self.endpoint.lock();
        endpoint.listening = false;
        endpoint.asleep = true;
    }

    fn process_events(&mut self) -> RadioEvents {
        self.endpoint.lock().events.drain(..).collect()
    }
}

/// Script and inspect a [`SimRadio`]
#[derive(Debug, Clone)]
pub struct SimControl {
    endpoint: SharedEndpoint,
}

impl SimControl {
    /// Signal quality reported for frames this radio receives
    pub fn set_signal(&self, rssi: i16, snr: i8) {
        let mut endpoint = self.endpoint.lock();
        endpoint.rssi = rssi;
        endpoint.snr = snr;
    }

    /// Make the next `init` fail
    pub fn fail_init(&self) {
        self.endpoint.lock().fail_init = true;
    }

    /// Report the next `count` transmissions as timed out (they never reach the air)
    pub fn time_out_transmissions(&self, count: usize) {
        self.endpoint.lock().transmit_timeouts = count;
    }

    /// Hold back transmit-done events until released
    pub fn hold_transmissions(&self, hold: bool) {
        self.endpoint.lock().hold_transmissions = hold;
    }

    /// Complete every held transmission
    pub fn release_transmissions(&self) -> usize {
        let mut endpoint = self.endpoint.lock();
        let held = std::mem::take(&mut endpoint.held);
        for _ in 0..held {
            endpoint.events.push_back(RadioEvent::TransmitDone);
        }
        held
    }

    /// Receive `frame` as if it came over the air, regardless of listening state
    pub fn inject_frame(&self, frame: impl Into<Bytes>) {
        let mut endpoint = self.endpoint.lock();
        let event = RadioEvent::ReceiveDone {
            payload: frame.into(),
            rssi: endpoint.rssi,
            snr: endpoint.snr,
        };
        endpoint.events.push_back(event);
    }

    /// Queue an arbitrary driver event
    pub fn inject(&self, event: RadioEvent) {
        self.endpoint.lock().events.push_back(event);
    }

    /// Every frame handed to `send`
    pub fn sent_frames(&self) -> Vec<Bytes> {
        self.endpoint.lock().sent.clone()
    }

    /// Receiver armed and not interrupted by a send
    pub fn is_listening(&self) -> bool {
        self.endpoint.lock().listening
    }

    /// Last power call was `sleep`
    pub fn is_asleep(&self) -> bool {
        self.endpoint.lock().asleep
    }

    /// Channel set by the last `set_channel`
    pub fn frequency(&self) -> u32 {
        self.endpoint.lock().frequency
    }

    /// Parameters from the last `set_tx_config`
    pub fn tx_params(&self) -> Option<TxParams> {
        self.endpoint.lock().tx_params
    }

    /// Parameters from the last `set_rx_config`
    pub fn rx_params(&self) -> Option<RxParams> {
        self.endpoint.lock().rx_params
    }

    /// Timeout passed to the last `receive`
    pub fn rx_timeout(&self) -> Duration {
        self.endpoint.lock().rx_timeout
    }
}
