//! Configuration handling for the radio node.
//!
//! Settings come from a YAML file, then environment variables, then the
//! command line (applied by the caller).

use anyhow::{anyhow, Context, Result};
use radio_link::RadioConfig;
use radio_wire::DeviceId;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Radio node configuration
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    /// Id of the local node
    pub device_id: DeviceId,
    /// Id of the simulated peer
    pub peer_id: DeviceId,
    /// Name of the preset the radio config started from
    pub preset: String,
    pub radio: RadioConfig,
    /// Driving loop cadence
    pub tick_interval: Duration,
    /// Multi-packet reassembly timeout
    pub session_timeout: Duration,
    /// Transmission counter restored at startup
    pub transmission_count: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            device_id: DeviceId([0x0A, 0x0B, 0x0C, 0x0D]),
            peer_id: DeviceId([0x01, 0x02, 0x03, 0x04]),
            preset: "lora_telemetry".to_string(),
            radio: RadioConfig::lora_telemetry(),
            tick_interval: Duration::from_millis(5),
            session_timeout: Duration::from_millis(5000),
            transmission_count: 0,
        }
    }
}

/// File layout
#[derive(Debug, Deserialize)]
struct RootConfig {
    node: Option<NodeSection>,
    radio: Option<RadioSection>,
}

#[derive(Debug, Deserialize)]
struct NodeSection {
    device_id: Option<String>,
    peer_id: Option<String>,
    tick_ms: Option<u64>,
    session_timeout_ms: Option<u64>,
    transmission_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RadioSection {
    preset: Option<String>,
    frequency: Option<u32>,
    tx_power: Option<i8>,
    tx_timeout_ms: Option<u32>,
    crc_on: Option<bool>,
}

impl NodeConfig {
    /// Load configuration from file and environment variables
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        let mut config = Self::default();

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<RootConfig>(&content) {
                Ok(root) => {
                    config
                        .apply_root_config(root)
                        .with_context(|| format!("invalid settings in {:?}", path))?;
                    info!("Loaded configuration from {:?}", path);
                }
                Err(e) => warn!("Failed to parse config file {:?}, using defaults: {}", path, e),
            },
            Err(_) => warn!("Config file {:?} not found, using defaults", path),
        }

        config.apply_environment_overrides();
        config.radio.validate().context("radio configuration")?;

        info!(
            "Final node configuration: device={}, peer={}, preset={}, frequency={} Hz, tick={:?}",
            config.device_id, config.peer_id, config.preset, config.radio.frequency,
            config.tick_interval
        );
        Ok(config)
    }

    fn apply_root_config(&mut self, root: RootConfig) -> Result<()> {
        if let Some(node) = root.node {
            if let Some(id) = node.device_id {
                self.device_id = parse_device_id(&id)?;
            }
            if let Some(id) = node.peer_id {
                self.peer_id = parse_device_id(&id)?;
            }
            if let Some(ms) = node.tick_ms {
                self.tick_interval = Duration::from_millis(ms);
            }
            if let Some(ms) = node.session_timeout_ms {
                self.session_timeout = Duration::from_millis(ms);
            }
            if let Some(count) = node.transmission_count {
                self.transmission_count = count;
            }
        }

        if let Some(radio) = root.radio {
            if let Some(preset) = radio.preset {
                self.set_preset(&preset)?;
            }
            if let Some(frequency) = radio.frequency {
                self.radio.frequency = frequency;
            }
            if let Some(power) = radio.tx_power {
                self.radio.tx_power = power;
            }
            if let Some(ms) = radio.tx_timeout_ms {
                self.radio.tx_timeout_ms = ms;
            }
            if let Some(crc) = radio.crc_on {
                self.radio.crc_on = crc;
            }
        }

        Ok(())
    }

    /// Switch to a named preset, keeping the configured frequency
    pub fn set_preset(&mut self, name: &str) -> Result<()> {
        let mut radio =
            RadioConfig::preset(name).ok_or_else(|| anyhow!("unknown radio preset '{}'", name))?;
        radio.frequency = self.radio.frequency;
        self.radio = radio;
        self.preset = name.to_string();
        Ok(())
    }

    fn apply_environment_overrides(&mut self) {
        if let Ok(value) = std::env::var("RADIO_DEVICE_ID") {
            match parse_device_id(&value) {
                Ok(id) => {
                    self.device_id = id;
                    info!("Device id overridden by environment: {}", id);
                }
                Err(e) => warn!("Ignoring RADIO_DEVICE_ID: {}", e),
            }
        }

        if let Ok(preset) = std::env::var("RADIO_PRESET") {
            match self.set_preset(&preset) {
                Ok(()) => info!("Preset overridden by environment: {}", preset),
                Err(e) => warn!("Ignoring RADIO_PRESET: {}", e),
            }
        }

        if let Ok(value) = std::env::var("RADIO_FREQUENCY") {
            if let Ok(frequency) = value.parse::<u32>() {
                self.radio.frequency = frequency;
                info!("Frequency overridden by environment: {} Hz", frequency);
            }
        }

        if let Ok(value) = std::env::var("RADIO_TICK_MS") {
            if let Ok(ms) = value.parse::<u64>() {
                self.tick_interval = Duration::from_millis(ms);
                info!("Tick interval overridden by environment: {} ms", ms);
            }
        }
    }
}

/// Parse an 8-digit hex device id such as `0a0b0c0d`
pub fn parse_device_id(value: &str) -> Result<DeviceId> {
    let value = value.trim().trim_start_matches("0x");
    if value.len() != 8 {
        return Err(anyhow!("device id '{}' must be 8 hex digits", value));
    }

    let raw = u32::from_str_radix(value, 16)
        .with_context(|| format!("device id '{}' is not hex", value))?;
    Ok(DeviceId(raw.to_be_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use radio_link::Modem;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.device_id, DeviceId([0x0A, 0x0B, 0x0C, 0x0D]));
        assert_eq!(config.radio, RadioConfig::lora_telemetry());
        assert_eq!(config.tick_interval, Duration::from_millis(5));
    }

    #[test]
    fn test_parse_device_id() {
        assert_eq!(
            parse_device_id("0x246f2801").unwrap(),
            DeviceId([0x24, 0x6F, 0x28, 0x01])
        );
        assert_eq!(parse_device_id("FFFFFFFF").unwrap(), DeviceId::BROADCAST);
        assert!(parse_device_id("1234").is_err());
        assert!(parse_device_id("zzzzzzzz").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let yaml_content = r#"
node:
  device_id: "c0ffee01"
  peer_id: "c0ffee02"
  tick_ms: 2
  transmission_count: 1234

radio:
  preset: fsk_bulk
  frequency: 868100000
  tx_power: 14
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = NodeConfig::load_from_file(temp_file.path()).unwrap();

        assert_eq!(config.device_id, DeviceId([0xC0, 0xFF, 0xEE, 0x01]));
        assert_eq!(config.peer_id, DeviceId([0xC0, 0xFF, 0xEE, 0x02]));
        assert_eq!(config.tick_interval, Duration::from_millis(2));
        assert_eq!(config.transmission_count, 1234);
        assert_eq!(config.preset, "fsk_bulk");
        assert_eq!(config.radio.modem, Modem::Fsk);
        assert_eq!(config.radio.frequency, 868_100_000);
        assert_eq!(config.radio.tx_power, 14);
    }

    #[test]
    fn test_missing_or_broken_file_uses_defaults() {
        let config = NodeConfig::load_from_file("/nonexistent/radio.yaml").unwrap();
        assert_eq!(config.peer_id, NodeConfig::default().peer_id);

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"node: [not, a, map").unwrap();
        let config = NodeConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.peer_id, NodeConfig::default().peer_id);
    }

    #[test]
    fn test_unknown_preset_is_an_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"radio:\n  preset: ook\n")
            .unwrap();
        assert!(NodeConfig::load_from_file(temp_file.path()).is_err());
    }
}
