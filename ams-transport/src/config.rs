//! Gateway configuration loaded from TOML

use crate::serial::SerialSettings;
use ams_core::{AmsError, AmsResult};
use ams_session::hdlc::MAX_FRAME_LENGTH;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Smallest reassembly buffer that still holds a useful APDU
pub const MIN_REASSEMBLY_CAPACITY: usize = 64;

/// Smallest read window that holds the longest HDLC frame
pub const MIN_BUFFER_SIZE: usize = MAX_FRAME_LENGTH;

/// Top level gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub serial: SerialConfig,

    #[serde(default)]
    pub decoder: DecoderConfig,
}

impl GatewayConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> AmsResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AmsError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> AmsResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AmsError::Config(format!(
                "Failed to read config {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> AmsResult<()> {
        if self.serial.port.trim().is_empty() {
            return Err(AmsError::Config("Serial port must not be empty".into()));
        }
        if self.serial.baud_rate == 0 {
            return Err(AmsError::Config("Baud rate must be non-zero".into()));
        }
        if self.decoder.reassembly_capacity < MIN_REASSEMBLY_CAPACITY {
            return Err(AmsError::Config(format!(
                "reassembly_capacity must be at least {MIN_REASSEMBLY_CAPACITY}, got {}",
                self.decoder.reassembly_capacity
            )));
        }
        if self.decoder.buffer_size < MIN_BUFFER_SIZE {
            return Err(AmsError::Config(format!(
                "buffer_size must be at least {MIN_BUFFER_SIZE}, got {}",
                self.decoder.buffer_size
            )));
        }
        Ok(())
    }
}

/// Parity setting as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParityConfig {
    None,
    Odd,
    #[default]
    Even,
}

impl From<ParityConfig> for tokio_serial::Parity {
    fn from(parity: ParityConfig) -> Self {
        match parity {
            ParityConfig::None => tokio_serial::Parity::None,
            ParityConfig::Odd => tokio_serial::Parity::Odd,
            ParityConfig::Even => tokio_serial::Parity::Even,
        }
    }
}

/// `[serial]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0`
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default)]
    pub parity: ParityConfig,

    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,

    /// Read timeout; absent means block until data arrives
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
}

impl SerialConfig {
    pub fn to_settings(&self) -> AmsResult<SerialSettings> {
        let data_bits = match self.data_bits {
            5 => tokio_serial::DataBits::Five,
            6 => tokio_serial::DataBits::Six,
            7 => tokio_serial::DataBits::Seven,
            8 => tokio_serial::DataBits::Eight,
            other => {
                return Err(AmsError::Config(format!("Unsupported data bits: {other}")));
            }
        };
        let stop_bits = match self.stop_bits {
            1 => tokio_serial::StopBits::One,
            2 => tokio_serial::StopBits::Two,
            other => {
                return Err(AmsError::Config(format!("Unsupported stop bits: {other}")));
            }
        };

        Ok(SerialSettings {
            port_name: self.port.clone(),
            baud_rate: self.baud_rate,
            data_bits,
            stop_bits,
            parity: self.parity.into(),
            timeout: self.read_timeout_ms.map(Duration::from_millis),
        })
    }
}

/// `[decoder]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Upper bound on one reassembled message
    #[serde(default = "default_reassembly_capacity")]
    pub reassembly_capacity: usize,

    /// Read window of the meter reader, at least one maximum-length frame
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Idle time after which an open dialogue is dropped, 0 disables
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
}

impl DecoderConfig {
    pub fn session_timeout(&self) -> Option<Duration> {
        (self.session_timeout_ms > 0).then(|| Duration::from_millis(self.session_timeout_ms))
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            reassembly_capacity: default_reassembly_capacity(),
            buffer_size: default_buffer_size(),
            session_timeout_ms: default_session_timeout_ms(),
        }
    }
}

fn default_baud_rate() -> u32 {
    2400
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_reassembly_capacity() -> usize {
    ams_session::hdlc::reassembly::DEFAULT_REASSEMBLY_CAPACITY
}

fn default_buffer_size() -> usize {
    4096
}

fn default_session_timeout_ms() -> u64 {
    10_000
}
