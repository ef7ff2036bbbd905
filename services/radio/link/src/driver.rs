//! Transceiver driver seam.
//!
//! The controller is the only caller of a driver. Hardware completions are
//! collected by the driver and handed back from [`RadioDriver::process_events`]
//! so the controller can run its handlers without the driver holding a
//! reference into it.

use crate::config::{RxParams, TxParams};
use crate::error::DriverError;
use bytes::Bytes;
use smallvec::SmallVec;
use std::time::Duration;

/// Hardware completion reported by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// The last `send` finished
    TransmitDone,
    /// The last `send` did not finish in time
    TransmitTimeout,
    /// A packet arrived
    ReceiveDone {
        /// Raw packet bytes
        payload: Bytes,
        /// Received signal strength in dBm
        rssi: i16,
        /// Signal-to-noise ratio in dB
        snr: i8,
    },
    /// The receive window closed without a packet
    ReceiveTimeout,
    /// The receiver reported an error (e.g. header or CRC failure)
    ReceiveError,
}

/// Events returned by one call to [`RadioDriver::process_events`]
pub type RadioEvents = SmallVec<[RadioEvent; 4]>;

/// A half-duplex packet transceiver
pub trait RadioDriver {
    /// Bring up the hardware
    fn init(&mut self) -> Result<(), DriverError>;

    /// Tune to `frequency` Hz
    fn set_channel(&mut self, frequency: u32);

    /// Configure the transmitter
    fn set_tx_config(&mut self, params: &TxParams);

    /// Configure the receiver
    fn set_rx_config(&mut self, params: &RxParams);

    /// Start transmitting one packet; completion arrives as an event
    fn send(&mut self, frame: &[u8]);

    /// Open the receiver; a zero timeout listens until stopped
    fn receive(&mut self, timeout: Duration);

    /// Idle the transceiver
    fn standby(&mut self);

    /// Put the transceiver into its lowest power state
    fn sleep(&mut self);

    /// Collect completions raised since the last call
    fn process_events(&mut self) -> RadioEvents;
}
