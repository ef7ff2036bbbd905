//! Radio link core: the request/result mailbox, the radio controller that
//! owns the transceiver, and the application handle.
//!
//! A link has two halves that share nothing but the mailboxes and a few
//! status atomics:
//!
//! - [`RadioController`] is the driving context. It alone calls into the
//!   [`RadioDriver`], runs chunked sends and reassembly, and publishes results.
//! - [`RadioHandle`] is the issuing context. It posts requests and delivers
//!   published results to the registered callbacks.
//!
//! ```no_run
//! use radio_link::{sim::SimAir, Radio, RadioConfig};
//! use radio_wire::DeviceId;
//! use std::time::Duration;
//!
//! let air = SimAir::new();
//! let mut radio = Radio::new(air.radio(), DeviceId([1, 2, 3, 4]), RadioConfig::lora_telemetry())?;
//! radio
//!     .handle_mut()
//!     .on_receive_complete(|rx| println!("{} bytes from {}", rx.payload.len(), rx.source_id));
//! radio.handle().start_receive(Duration::ZERO);
//! loop {
//!     radio.tick();
//!     std::thread::sleep(Duration::from_millis(5));
//! }
//! # Ok::<(), radio_link::LinkError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod handle;
pub mod mailbox;
pub mod radio;
pub mod sim;
pub mod state;

pub use config::{LoraBandwidth, Modem, RadioConfig, RxParams, TxParams};
pub use controller::{RadioController, ReceiveState, TransmitState};
pub use driver::{RadioDriver, RadioEvent, RadioEvents};
pub use error::{DriverError, LinkError, RadioError};
pub use handle::{ErrorCallback, ReceiveCallback, RadioHandle, TransmitCallback};
pub use mailbox::{
    RadioResult, ReceivedPayload, Request, RequestKind, ResultKind, SendRequest, TransmitOutcome,
};
pub use radio::{Radio, RadioBuilder};
pub use state::LinkState;
