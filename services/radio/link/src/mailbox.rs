//! Single-slot request and result mailboxes between the issuing and driving contexts.
//!
//! Every request or result kind has exactly one slot. Posting into an
//! occupied slot is rejected rather than queued, so the driving context only
//! ever has a bounded amount of work per tick.

use crate::config::RadioConfig;
use crate::error::{LinkError, RadioError};
use bytes::Bytes;
use parking_lot::Mutex;
use radio_wire::{DeviceId, FrameType, Options};
use smallvec::SmallVec;
use std::time::Duration;

/// One flag-plus-payload slot
#[derive(Debug)]
pub struct Slot<T> {
    value: Mutex<Option<T>>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }
}

impl<T> Slot<T> {
    /// Store `value` if the slot is empty, otherwise hand it back
    pub fn post(&self, value: T) -> Result<(), T> {
        let mut slot = self.value.lock();
        if slot.is_some() {
            return Err(value);
        }
        *slot = Some(value);
        Ok(())
    }

    /// Consume the pending value
    pub fn take(&self) -> Option<T> {
        self.value.lock().take()
    }

    /// Whether a value is waiting
    pub fn is_pending(&self) -> bool {
        self.value.lock().is_some()
    }
}

/// Request kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Transmit a payload
    Send,
    /// Open the receiver
    StartReceive,
    /// Close the receiver
    StopReceive,
    /// Apply a new radio configuration
    ConfigChange,
    /// Put the transceiver to sleep
    Sleep,
}

/// Parameters of a send request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    /// Frame type used when the payload fits in one frame
    pub frame_type: FrameType,
    /// Bytes to deliver, chunked above one frame's capacity
    pub payload: Bytes,
    /// Target device or broadcast
    pub destination: DeviceId,
    /// Option bits copied into every frame
    pub options: Options,
}

/// A request posted by the issuing context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Transmit a payload
    Send(SendRequest),
    /// Open the receiver; zero listens until stopped
    StartReceive(Duration),
    /// Close the receiver
    StopReceive,
    /// Apply this configuration
    ConfigChange(RadioConfig),
    /// Standby, then sleep
    Sleep,
}

impl Request {
    /// Kind of this request
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Send(_) => RequestKind::Send,
            Request::StartReceive(_) => RequestKind::StartReceive,
            Request::StopReceive => RequestKind::StopReceive,
            Request::ConfigChange(_) => RequestKind::ConfigChange,
            Request::Sleep => RequestKind::Sleep,
        }
    }
}

/// Requests drained in one tick
pub type Requests = SmallVec<[Request; 5]>;

/// Requests written by the issuing context, read by the driving context
#[derive(Debug, Default)]
pub struct RequestMailbox {
    send: Slot<SendRequest>,
    start_receive: Slot<Duration>,
    stop_receive: Slot<()>,
    config_change: Slot<RadioConfig>,
    sleep: Slot<()>,
}

impl RequestMailbox {
    /// Post a request, rejecting it if one of the same kind is pending
    pub fn post(&self, request: Request) -> Result<(), LinkError> {
        let kind = request.kind();
        let posted = match request {
            Request::Send(send) => self.send.post(send).is_ok(),
            Request::StartReceive(timeout) => self.start_receive.post(timeout).is_ok(),
            Request::StopReceive => self.stop_receive.post(()).is_ok(),
            Request::ConfigChange(config) => self.config_change.post(config).is_ok(),
            Request::Sleep => self.sleep.post(()).is_ok(),
        };

        if posted {
            Ok(())
        } else {
            Err(LinkError::RequestPending(kind))
        }
    }

    /// Whether a request of `kind` is waiting
    pub fn is_pending(&self, kind: RequestKind) -> bool {
        match kind {
            RequestKind::Send => self.send.is_pending(),
            RequestKind::StartReceive => self.start_receive.is_pending(),
            RequestKind::StopReceive => self.stop_receive.is_pending(),
            RequestKind::ConfigChange => self.config_change.is_pending(),
            RequestKind::Sleep => self.sleep.is_pending(),
        }
    }

    /// Take every pending request in execution order.
    ///
    /// While the transmitter is busy, requests that would disturb the
    /// transmission (send, config change, sleep) stay in their slots. A send
    /// taken here counts as busy for the rest of the drain.
    pub fn drain(&self, transmitter_busy: bool) -> Requests {
        let mut requests = Requests::new();
        let mut busy = transmitter_busy;

        if !busy {
            if let Some(send) = self.send.take() {
                requests.push(Request::Send(send));
                busy = true;
            }
        }
        if let Some(timeout) = self.start_receive.take() {
            requests.push(Request::StartReceive(timeout));
        }
        if self.stop_receive.take().is_some() {
            requests.push(Request::StopReceive);
        }
        if !busy {
            if let Some(config) = self.config_change.take() {
                requests.push(Request::ConfigChange(config));
            }
            if self.sleep.take().is_some() {
                requests.push(Request::Sleep);
            }
        }

        requests
    }
}

/// Result kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    /// A send finished or failed
    TransmitComplete,
    /// A payload arrived
    ReceiveComplete,
    /// A link error occurred
    Error,
}

/// Outcome of a send request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransmitOutcome {
    /// Every frame of the send went out
    pub success: bool,
    /// Payload bytes handed to the radio
    pub bytes_sent: usize,
    /// Frames transmitted (1 for single sends)
    pub chunk_count: u8,
}

impl TransmitOutcome {
    /// Outcome of an aborted or rejected send
    pub fn failed() -> Self {
        Self::default()
    }
}

/// A payload received for this device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedPayload {
    /// Sender
    pub source_id: DeviceId,
    /// This device or broadcast
    pub destination_id: DeviceId,
    /// Raw type byte of the frame (multi-packet for reassembled payloads)
    pub frame_type: u8,
    /// Option bits set by the sender
    pub options: Options,
    /// Chunks the payload arrived in (1 for single frames)
    pub total_chunks: u8,
    /// The application payload
    pub payload: Bytes,
    /// Signal strength of the last frame in dBm
    pub rssi: i16,
    /// Signal-to-noise ratio of the last frame in dB
    pub snr: i8,
}

impl ReceivedPayload {
    /// Frame type, if the code is known
    pub fn kind(&self) -> Option<FrameType> {
        FrameType::try_from(self.frame_type).ok()
    }
}

/// A result published by the driving context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioResult {
    /// A send finished or failed
    TransmitComplete(TransmitOutcome),
    /// A payload arrived
    ReceiveComplete(ReceivedPayload),
    /// A link error occurred
    Error(RadioError),
}

impl RadioResult {
    /// Kind of this result
    pub fn kind(&self) -> ResultKind {
        match self {
            RadioResult::TransmitComplete(_) => ResultKind::TransmitComplete,
            RadioResult::ReceiveComplete(_) => ResultKind::ReceiveComplete,
            RadioResult::Error(_) => ResultKind::Error,
        }
    }
}

/// Results drained in one dispatch
pub type Results = SmallVec<[RadioResult; 3]>;

/// Results written by the driving context, read by the issuing context
#[derive(Debug, Default)]
pub struct ResultMailbox {
    transmit_complete: Slot<TransmitOutcome>,
    receive_complete: Slot<ReceivedPayload>,
    error: Slot<RadioError>,
}

impl ResultMailbox {
    /// Publish a result, rejecting it if the previous one of its kind is undelivered
    pub fn post(&self, result: RadioResult) -> Result<(), LinkError> {
        let kind = result.kind();
        let posted = match result {
            RadioResult::TransmitComplete(outcome) => self.transmit_complete.post(outcome).is_ok(),
            RadioResult::ReceiveComplete(payload) => self.receive_complete.post(payload).is_ok(),
            RadioResult::Error(error) => self.error.post(error).is_ok(),
        };

        if posted {
            Ok(())
        } else {
            Err(LinkError::ResultPending(kind))
        }
    }

    /// Whether a result of `kind` is waiting
    pub fn is_pending(&self, kind: ResultKind) -> bool {
        match kind {
            ResultKind::TransmitComplete => self.transmit_complete.is_pending(),
            ResultKind::ReceiveComplete => self.receive_complete.is_pending(),
            ResultKind::Error => self.error.is_pending(),
        }
    }

    /// Take at most one result of each kind
    pub fn drain(&self) -> Results {
        let mut results = Results::new();
        if let Some(outcome) = self.transmit_complete.take() {
            results.push(RadioResult::TransmitComplete(outcome));
        }
        if let Some(payload) = self.receive_complete.take() {
            results.push(RadioResult::ReceiveComplete(payload));
        }
        if let Some(error) = self.error.take() {
            results.push(RadioResult::Error(error));
        }
        results
    }
}
