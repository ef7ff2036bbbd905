//! Radio configuration and the driver parameter sets derived from it

use crate::error::LinkError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Modulation used by the transceiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modem {
    /// LoRa chirp spread spectrum
    Lora,
    /// Frequency shift keying
    Fsk,
}

/// LoRa channel bandwidth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoraBandwidth {
    /// 125 kHz
    #[serde(rename = "125khz")]
    Khz125,
    /// 250 kHz
    #[serde(rename = "250khz")]
    Khz250,
    /// 500 kHz
    #[serde(rename = "500khz")]
    Khz500,
}

impl LoraBandwidth {
    /// Bandwidth index understood by the transceiver (0: 125, 1: 250, 2: 500 kHz)
    pub fn index(&self) -> u32 {
        match self {
            LoraBandwidth::Khz125 => 0,
            LoraBandwidth::Khz250 => 1,
            LoraBandwidth::Khz500 => 2,
        }
    }

    /// Bandwidth in Hz
    pub fn hz(&self) -> u32 {
        match self {
            LoraBandwidth::Khz125 => 125_000,
            LoraBandwidth::Khz250 => 250_000,
            LoraBandwidth::Khz500 => 500_000,
        }
    }
}

/// Complete radio configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Modulation
    pub modem: Modem,
    /// Carrier frequency in Hz
    pub frequency: u32,
    /// Transmit power in dBm
    pub tx_power: i8,
    /// LoRa bandwidth
    pub lora_bandwidth: LoraBandwidth,
    /// LoRa spreading factor (5..=12)
    pub lora_spreading_factor: u8,
    /// LoRa coding rate (1: 4/5 .. 4: 4/8)
    pub lora_coding_rate: u8,
    /// Preamble length in symbols
    pub preamble_length: u16,
    /// Implicit header (fixed-length payload)
    pub fix_length_payload: bool,
    /// Invert IQ signals
    pub iq_inversion: bool,
    /// FSK bit rate in bps
    pub fsk_datarate: u32,
    /// FSK frequency deviation in Hz
    pub fsk_deviation: u32,
    /// FSK receive bandwidth in Hz
    pub fsk_bandwidth: u32,
    /// Transmit timeout in milliseconds
    pub tx_timeout_ms: u32,
    /// Hardware CRC on the radio packet
    pub crc_on: bool,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self::lora_telemetry()
    }
}

impl RadioConfig {
    /// Long-range telemetry preset: LoRa SF7, 500 kHz, CR 4/5
    pub fn lora_telemetry() -> Self {
        Self {
            modem: Modem::Lora,
            frequency: 915_600_000,
            tx_power: 22,
            lora_bandwidth: LoraBandwidth::Khz500,
            lora_spreading_factor: 7,
            lora_coding_rate: 1,
            preamble_length: 8,
            fix_length_payload: false,
            iq_inversion: false,
            fsk_datarate: 50_000,
            fsk_deviation: 25_000,
            fsk_bandwidth: 125_000,
            tx_timeout_ms: 5000,
            crc_on: true,
        }
    }

    /// Bulk transfer preset: FSK at 50 kbps
    pub fn fsk_bulk() -> Self {
        Self {
            modem: Modem::Fsk,
            ..Self::lora_telemetry()
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lora" | "lora_telemetry" | "lora-telemetry" => Some(Self::lora_telemetry()),
            "fsk" | "fsk_bulk" | "fsk-bulk" => Some(Self::fsk_bulk()),
            _ => None,
        }
    }

    /// Transmit timeout as a duration
    pub fn tx_timeout(&self) -> Duration {
        Duration::from_millis(self.tx_timeout_ms as u64)
    }

    /// Check ranges the transceiver cannot accept
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.frequency == 0 {
            return Err(LinkError::Config("frequency must be non-zero".into()));
        }
        if self.tx_timeout_ms == 0 {
            return Err(LinkError::Config("tx timeout must be non-zero".into()));
        }
        match self.modem {
            Modem::Lora => {
                if !(5..=12).contains(&self.lora_spreading_factor) {
                    return Err(LinkError::Config(format!(
                        "spreading factor {} outside 5..=12",
                        self.lora_spreading_factor
                    )));
                }
                if !(1..=4).contains(&self.lora_coding_rate) {
                    return Err(LinkError::Config(format!(
                        "coding rate {} outside 1..=4",
                        self.lora_coding_rate
                    )));
                }
            }
            Modem::Fsk => {
                if self.fsk_datarate == 0 || self.fsk_bandwidth == 0 {
                    return Err(LinkError::Config(
                        "fsk datarate and bandwidth must be non-zero".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Transmit parameters for the driver
    pub fn tx_params(&self) -> TxParams {
        let (deviation, bandwidth, datarate, coderate, iq_inverted) = match self.modem {
            Modem::Lora => (
                0,
                self.lora_bandwidth.index(),
                self.lora_spreading_factor as u32,
                self.lora_coding_rate,
                self.iq_inversion,
            ),
            Modem::Fsk => (
                self.fsk_deviation,
                self.fsk_bandwidth,
                self.fsk_datarate,
                0,
                false,
            ),
        };

        TxParams {
            modem: self.modem,
            power: self.tx_power,
            deviation,
            bandwidth,
            datarate,
            coderate,
            preamble_length: self.preamble_length,
            fix_length: self.fix_length_payload,
            crc_on: self.crc_on,
            iq_inverted,
            timeout: self.tx_timeout(),
        }
    }

    /// Receive parameters for the driver, always in continuous mode
    pub fn rx_params(&self) -> RxParams {
        let (bandwidth, datarate, coderate, bandwidth_afc, iq_inverted) = match self.modem {
            Modem::Lora => (
                self.lora_bandwidth.index(),
                self.lora_spreading_factor as u32,
                self.lora_coding_rate,
                0,
                self.iq_inversion,
            ),
            Modem::Fsk => (
                self.fsk_bandwidth,
                self.fsk_datarate,
                0,
                self.fsk_deviation,
                false,
            ),
        };

        RxParams {
            modem: self.modem,
            bandwidth,
            datarate,
            coderate,
            bandwidth_afc,
            preamble_length: self.preamble_length,
            symbol_timeout: 0,
            fix_length: self.fix_length_payload,
            payload_length: 0,
            crc_on: self.crc_on,
            iq_inverted,
            continuous: true,
        }
    }
}

/// Transmit configuration handed to [`crate::RadioDriver::set_tx_config`].
///
/// For LoRa, `bandwidth` is the transceiver's bandwidth index and `datarate`
/// the spreading factor; for FSK both are in Hz / bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxParams {
    /// Modulation
    pub modem: Modem,
    /// Output power in dBm
    pub power: i8,
    /// FSK frequency deviation in Hz, 0 for LoRa
    pub deviation: u32,
    /// Bandwidth index (LoRa) or bandwidth in Hz (FSK)
    pub bandwidth: u32,
    /// Spreading factor (LoRa) or bit rate in bps (FSK)
    pub datarate: u32,
    /// LoRa coding rate 1..=4 (4/5..4/8), 0 for FSK
    pub coderate: u8,
    /// Preamble length in symbols
    pub preamble_length: u16,
    /// Implicit header with a fixed payload length
    pub fix_length: bool,
    /// Append a payload CRC
    pub crc_on: bool,
    /// Invert the LoRa IQ signals
    pub iq_inverted: bool,
    /// Give up on a transmission after this long
    pub timeout: Duration,
}

/// Receive configuration handed to [`crate::RadioDriver::set_rx_config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxParams {
    /// Modulation
    pub modem: Modem,
    /// Bandwidth index (LoRa) or bandwidth in Hz (FSK)
    pub bandwidth: u32,
    /// Spreading factor (LoRa) or bit rate in bps (FSK)
    pub datarate: u32,
    /// LoRa coding rate, 0 for FSK
    pub coderate: u8,
    /// FSK AFC bandwidth in Hz, 0 for LoRa
    pub bandwidth_afc: u32,
    /// Preamble length in symbols
    pub preamble_length: u16,
    /// Symbols to wait for a preamble in single receive mode
    pub symbol_timeout: u16,
    /// Implicit header with a fixed payload length
    pub fix_length: bool,
    /// Payload length when `fix_length` is set
    pub payload_length: u8,
    /// Check the payload CRC
    pub crc_on: bool,
    /// Invert the LoRa IQ signals
    pub iq_inverted: bool,
    /// Stay in receive after each packet
    pub continuous: bool,
}
