//! Link construction and the single-context [`Radio`].

use crate::config::RadioConfig;
use crate::controller::RadioController;
use crate::driver::RadioDriver;
use crate::error::LinkError;
use crate::handle::RadioHandle;
use crate::state::Shared;
use radio_wire::{DeviceId, DEFAULT_SESSION_TIMEOUT};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Builder for a radio link
#[derive(Debug, Clone)]
pub struct RadioBuilder {
    device_id: DeviceId,
    config: RadioConfig,
    transmission_count: u64,
    session_timeout: Duration,
}

impl RadioBuilder {
    /// Builder for device `device_id` with the default configuration
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            device_id,
            config: RadioConfig::default(),
            transmission_count: 0,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }

    /// Initial configuration (defaults to the LoRa telemetry preset)
    pub fn config(mut self, config: RadioConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed the transmission counter, e.g. from retained memory
    pub fn transmission_count(mut self, count: u64) -> Self {
        self.transmission_count = count;
        self
    }

    /// How long a multi-packet reception may stay incomplete
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Initialize the driver and apply the configuration
    pub fn build<D: RadioDriver>(self, driver: D) -> Result<Radio<D>, LinkError> {
        self.config.validate()?;

        let shared = Arc::new(Shared::new(self.config, self.transmission_count));
        let controller = RadioController::new(
            driver,
            shared.clone(),
            self.device_id,
            self.session_timeout,
        )?;
        let handle = RadioHandle::new(shared, self.device_id);

        info!(
            "Radio link {} ready, {} prior transmissions",
            self.device_id, self.transmission_count
        );
        Ok(Radio { handle, controller })
    }
}

/// Both halves of a link driven from one context.
///
/// [`Radio::tick`] runs the controller and then dispatches results, which is
/// the whole driving loop for single-threaded use. [`Radio::split`] hands the
/// halves to separate contexts.
#[derive(Debug)]
pub struct Radio<D> {
    handle: RadioHandle,
    controller: RadioController<D>,
}

impl<D: RadioDriver> Radio<D> {
    /// Build a link with the given configuration
    /// Bring up a link with `config` and default settings otherwise
    pub fn new(driver: D, device_id: DeviceId, config: RadioConfig) -> Result<Self, LinkError> {
        RadioBuilder::new(device_id).config(config).build(driver)
    }

    /// Start a [`RadioBuilder`]
    pub fn builder(device_id: DeviceId) -> RadioBuilder {
        RadioBuilder::new(device_id)
    }

    /// Run the controller once and deliver results. Returns the number delivered.
    pub fn tick(&mut self) -> usize {
        self.tick_at(Instant::now())
    }

    /// [`Radio::tick`] with an explicit clock reading
    pub fn tick_at(&mut self, now: Instant) -> usize {
        self.controller.tick_at(now);
        self.handle.dispatch_results()
    }

    /// Issuing half
    pub fn handle(&self) -> &RadioHandle {
        &self.handle
    }

    /// Issuing half, for registering callbacks
    pub fn handle_mut(&mut self) -> &mut RadioHandle {
        &mut self.handle
    }

    /// Driving half
    pub fn controller(&self) -> &RadioController<D> {
        &self.controller
    }

    /// Driving half, mutably
    pub fn controller_mut(&mut self) -> &mut RadioController<D> {
        &mut self.controller
    }

    /// Separate the issuing and driving halves
    pub fn split(self) -> (RadioHandle, RadioController<D>) {
        (self.handle, self.controller)
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Shared {
        &self.handle.shared
    }
}
