//! State shared by the issuing and driving contexts

use crate::config::RadioConfig;
use crate::mailbox::{RequestMailbox, ResultMailbox};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Status flags published by the driving context.
///
/// Only the controller writes these; the handle reads them.
#[derive(Debug, Default)]
pub struct LinkState {
    initialized: AtomicBool,
    transmitting: AtomicBool,
    receiving: AtomicBool,
    asleep: AtomicBool,
    transmissions: AtomicU64,
}

impl LinkState {
    pub(crate) fn with_transmission_count(count: u64) -> Self {
        Self {
            transmissions: AtomicU64::new(count),
            ..Self::default()
        }
    }

    /// Set once the controller is up
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// A transmission is in flight
    pub fn is_transmitting(&self) -> bool {
        self.transmitting.load(Ordering::Acquire)
    }

    /// The receiver is requested open
    pub fn is_receiving(&self) -> bool {
        self.receiving.load(Ordering::Acquire)
    }

    /// The transceiver was put to sleep
    pub fn is_asleep(&self) -> bool {
        self.asleep.load(Ordering::Acquire)
    }

    /// Frames handed to the transceiver, including the seeded count
    pub fn transmission_count(&self) -> u64 {
        self.transmissions.load(Ordering::Acquire)
    }

    pub(crate) fn set_initialized(&self, value: bool) {
        self.initialized.store(value, Ordering::Release);
    }

    pub(crate) fn set_transmitting(&self, value: bool) {
        self.transmitting.store(value, Ordering::Release);
    }

    pub(crate) fn set_receiving(&self, value: bool) {
        self.receiving.store(value, Ordering::Release);
    }

    pub(crate) fn set_asleep(&self, value: bool) {
        self.asleep.store(value, Ordering::Release);
    }

    pub(crate) fn count_transmission(&self) -> u64 {
        self.transmissions.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Everything both contexts can reach
#[derive(Debug)]
pub(crate) struct Shared {
    pub requests: RequestMailbox,
    pub results: ResultMailbox,
    /// Applied configuration, replaced whole by the driving context
    pub config: RwLock<RadioConfig>,
    pub state: LinkState,
}

impl Shared {
    pub fn new(config: RadioConfig, transmission_count: u64) -> Self {
        Self {
            requests: RequestMailbox::default(),
            results: ResultMailbox::default(),
            config: RwLock::new(config),
            state: LinkState::with_transmission_count(transmission_count),
        }
    }
}
