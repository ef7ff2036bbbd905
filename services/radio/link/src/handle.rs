//! Issuing half of a radio link.
//!
//! Calls on a [`RadioHandle`] never touch the transceiver: they post a request
//! into its single slot and return whether it was accepted. Outcomes come back
//! through [`RadioHandle::dispatch_results`], which hands at most one result of
//! each kind to the registered callbacks.

use crate::config::RadioConfig;
use crate::error::RadioError;
use crate::mailbox::{
    RadioResult, ReceivedPayload, Request, RequestKind, SendRequest, TransmitOutcome,
};
use crate::state::Shared;
use bytes::Bytes;
use radio_wire::{DeviceId, FrameType, Options, MAX_CHUNKED_PAYLOAD};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Called with the outcome of every send
pub type TransmitCallback = Box<dyn FnMut(&TransmitOutcome) + Send>;

/// Called with every payload received for this device
pub type ReceiveCallback = Box<dyn FnMut(&ReceivedPayload) + Send>;

/// Called with every link error
pub type ErrorCallback = Box<dyn FnMut(RadioError) + Send>;

/// Application-facing half of a radio link
pub struct RadioHandle {
    pub(crate) shared: Arc<Shared>,
    device_id: DeviceId,
    on_transmit_complete: Option<TransmitCallback>,
    on_receive_complete: Option<ReceiveCallback>,
    on_error: Option<ErrorCallback>,
}

impl fmt::Debug for RadioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadioHandle")
            .field("device_id", &self.device_id)
            .field("transmitting", &self.is_transmitting())
            .field("receiving", &self.is_receiving())
            .finish_non_exhaustive()
    }
}

impl RadioHandle {
    pub(crate) fn new(shared: Arc<Shared>, device_id: DeviceId) -> Self {
        Self {
            shared,
            device_id,
            on_transmit_complete: None,
            on_receive_complete: None,
            on_error: None,
        }
    }

    /// This device's identifier
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Send a payload: one telemetry frame when it fits, multi-packet chunks otherwise.
    ///
    /// Returns false when a send is already pending or the payload cannot be
    /// carried by a chunked transfer.
    pub fn send(
        &self,
        payload: impl Into<Bytes>,
        destination: DeviceId,
        ack_requested: bool,
    ) -> bool {
        self.send_typed(
            FrameType::Telemetry,
            payload,
            destination,
            Options::with_ack(ack_requested),
        )
    }

    /// Send a payload with an explicit frame type and options
    pub fn send_typed(
        &self,
        frame_type: FrameType,
        payload: impl Into<Bytes>,
        destination: DeviceId,
        options: Options,
    ) -> bool {
        let payload = payload.into();
        if payload.len() > MAX_CHUNKED_PAYLOAD {
            warn!(
                "Refusing {} byte send, limit is {} bytes",
                payload.len(),
                MAX_CHUNKED_PAYLOAD
            );
            return false;
        }

        self.post(Request::Send(SendRequest {
            frame_type,
            payload,
            destination,
            options,
        }))
    }

    /// Open the receiver; a zero timeout listens until stopped
    pub fn start_receive(&self, timeout: Duration) -> bool {
        self.post(Request::StartReceive(timeout))
    }

    /// Close the receiver on the next tick
    pub fn stop_receive(&self) -> bool {
        self.post(Request::StopReceive)
    }

    /// Apply a new configuration on the next tick
    pub fn set_config(&self, config: RadioConfig) -> bool {
        if let Err(e) = config.validate() {
            warn!("Rejecting config: {}", e);
            return false;
        }
        self.post(Request::ConfigChange(config))
    }

    /// Configuration currently applied to the transceiver
    pub fn get_config(&self) -> RadioConfig {
        self.shared.config.read().clone()
    }

    /// Put the transceiver to sleep once it is idle
    pub fn sleep(&self) -> bool {
        self.post(Request::Sleep)
    }

    /// Leave sleep by re-applying the current configuration
    pub fn wake(&self) -> bool {
        self.post(Request::ConfigChange(self.get_config()))
    }

    /// Register the transmit-complete callback
    pub fn on_transmit_complete<F>(&mut self, callback: F)
    where
        F: FnMut(&TransmitOutcome) + Send + 'static,
    {
        self.on_transmit_complete = Some(Box::new(callback));
    }

    /// Register the receive-complete callback
    pub fn on_receive_complete<F>(&mut self, callback: F)
    where
        F: FnMut(&ReceivedPayload) + Send + 'static,
    {
        self.on_receive_complete = Some(Box::new(callback));
    }

    /// Register the error callback
    pub fn on_error<F>(&mut self, callback: F)
    where
        F: FnMut(RadioError) + Send + 'static,
    {
        self.on_error = Some(Box::new(callback));
    }

    /// Deliver at most one pending result of each kind. Returns the number delivered.
    pub fn dispatch_results(&mut self) -> usize {
        let results = self.shared.results.drain();
        let delivered = results.len();

        for result in results {
            match result {
                RadioResult::TransmitComplete(outcome) => match &mut self.on_transmit_complete {
                    Some(callback) => callback(&outcome),
                    None => debug!("no transmit callback, dropping {:?}", outcome),
                },
                RadioResult::ReceiveComplete(payload) => match &mut self.on_receive_complete {
                    Some(callback) => callback(&payload),
                    None => debug!(
                        "no receive callback, dropping {} bytes from {}",
                        payload.payload.len(),
                        payload.source_id
                    ),
                },
                RadioResult::Error(error) => match &mut self.on_error {
                    Some(callback) => callback(error),
                    None => debug!("no error callback, dropping {}", error),
                },
            }
        }

        delivered
    }

    /// Driver init and the first config apply succeeded
    pub fn is_initialized(&self) -> bool {
        self.shared.state.is_initialized()
    }

    /// Transmitting or listening
    pub fn is_busy(&self) -> bool {
        self.is_transmitting() || self.is_receiving()
    }

    /// A frame or chunked send is in flight
    pub fn is_transmitting(&self) -> bool {
        self.shared.state.is_transmitting()
    }

    /// The receiver is open
    pub fn is_receiving(&self) -> bool {
        self.shared.state.is_receiving()
    }

    /// The transceiver is asleep
    pub fn is_asleep(&self) -> bool {
        self.shared.state.is_asleep()
    }

    /// No send in flight and none waiting to start
    pub fn is_transmission_complete(&self) -> bool {
        !self.is_transmitting() && !self.shared.requests.is_pending(RequestKind::Send)
    }

    /// Frames handed to the transceiver, for persisting across power cycles
    pub fn transmission_count(&self) -> u64 {
        self.shared.state.transmission_count()
    }

    fn post(&self, request: Request) -> bool {
        match self.shared.requests.post(request) {
            Ok(()) => true,
            Err(e) => {
                debug!("{}", e);
                false
            }
        }
    }
}
