use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

use crate::protocol::runtime::{parity_from_char, OpenMode, ReconnectPolicy, SerialConfig};

/// Open mode as written in a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenModeSetting {
    /// Whatever the build target uses
    #[default]
    Auto,
    /// Open with O_NONBLOCK
    NonBlocking,
    /// Open blocking with O_NOCTTY
    NoControllingTerminal,
}

impl OpenModeSetting {
    pub fn resolve(self) -> OpenMode {
        match self {
            OpenModeSetting::Auto => OpenMode::platform_default(),
            OpenModeSetting::NonBlocking => OpenMode::NonBlocking,
            OpenModeSetting::NoControllingTerminal => OpenMode::NoControllingTerminal,
        }
    }
}

/// Reconnect parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectParams {
    /// Pause between attempts in milliseconds
    #[serde(default = "default_reconnect_delay_ms")]
    pub delay_ms: u64,
    /// Give up after this many attempts; absent means never give up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectParams {
    fn default() -> Self {
        Self {
            delay_ms: default_reconnect_delay_ms(),
            max_attempts: None,
        }
    }
}

/// Port profile loaded from a TOML or JSON file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortProfile {
    /// Port name or device path
    #[serde(default)]
    pub port_name: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// `N`, `E` or `O`
    #[serde(default = "default_parity")]
    pub parity: char,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub open_mode: OpenModeSetting,
    /// Inter-character read timeout in deciseconds
    #[serde(default = "default_read_timeout_ds")]
    pub read_timeout_ds: u8,
    /// Minimum bytes per blocking read
    #[serde(default = "default_min_read_size")]
    pub min_read_size: u8,
    #[serde(default)]
    pub low_latency: bool,
    #[serde(default = "default_restore_on_close")]
    pub restore_on_close: bool,
    #[serde(default)]
    pub reconnect: ReconnectParams,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_parity() -> char {
    'N'
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_read_timeout_ds() -> u8 {
    1
}

fn default_min_read_size() -> u8 {
    18
}

fn default_restore_on_close() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    500
}

impl Default for PortProfile {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: default_baud_rate(),
            parity: default_parity(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            open_mode: OpenModeSetting::default(),
            read_timeout_ds: default_read_timeout_ds(),
            min_read_size: default_min_read_size(),
            low_latency: false,
            restore_on_close: default_restore_on_close(),
            reconnect: ReconnectParams::default(),
        }
    }
}

impl PortProfile {
    /// Parse a profile from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Parse a profile from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Read a profile, picking the format from the file extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile {}", path.display()))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content)
                .with_context(|| format!("Invalid JSON profile {}", path.display())),
            Some("toml") => Self::from_toml(&content)
                .with_context(|| format!("Invalid TOML profile {}", path.display())),
            other => Err(anyhow!(
                "Unsupported profile format {:?} for {}, expected .toml or .json",
                other.unwrap_or(""),
                path.display()
            )),
        }
    }

    pub fn to_serial_config(&self) -> SerialConfig {
        SerialConfig::new(self.baud_rate)
            .with_parity(parity_from_char(self.parity))
            .with_data_bits(self.data_bits)
            .with_stop_bits(self.stop_bits)
            .with_open_mode(self.open_mode.resolve())
            .with_read_timing(self.read_timeout_ds, self.min_read_size)
            .with_low_latency(self.low_latency)
            .with_restore_on_close(self.restore_on_close)
            .with_reconnect(ReconnectPolicy {
                delay: Duration::from_millis(self.reconnect.delay_ms),
                max_attempts: self.reconnect.max_attempts,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::Parity;

    #[test]
    fn toml_profile_with_defaults() {
        let profile = PortProfile::from_toml(
            r#"
port_name = "/dev/ttyUSB0"
baud_rate = 115200
parity = "E"

[reconnect]
max_attempts = 20
"#,
        )
        .unwrap();

        assert_eq!(profile.port_name, "/dev/ttyUSB0");
        assert_eq!(profile.stop_bits, 1);
        assert_eq!(profile.reconnect.delay_ms, 500);

        let cfg = profile.to_serial_config();
        assert_eq!(cfg.baud, 115200);
        assert_eq!(cfg.parity, Parity::Even);
        assert_eq!(cfg.min_read_size, 18);
        assert_eq!(cfg.reconnect.max_attempts, Some(20));
        assert_eq!(cfg.open_mode, OpenMode::platform_default());
    }

    #[test]
    fn json_profile() {
        let profile = PortProfile::from_json(
            r#"{ "port_name": "ttyACM0", "parity": "o", "open_mode": "non_blocking", "low_latency": true }"#,
        )
        .unwrap();

        let cfg = profile.to_serial_config();
        assert_eq!(cfg.baud, 9600);
        assert_eq!(cfg.parity, Parity::Odd);
        assert_eq!(cfg.open_mode, OpenMode::NonBlocking);
        assert!(cfg.low_latency);
        assert_eq!(cfg.reconnect.max_attempts, None);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("port.yaml");
        std::fs::write(&path, "port_name: ttyS0").unwrap();
        assert!(PortProfile::from_file(&path).is_err());
    }

    #[test]
    fn file_round_trip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("port.toml");
        let profile = PortProfile {
            port_name: "ttyS1".into(),
            stop_bits: 2,
            ..PortProfile::default()
        };
        std::fs::write(&path, toml::to_string(&profile).unwrap()).unwrap();
        assert_eq!(PortProfile::from_file(&path).unwrap(), profile);
    }
}
