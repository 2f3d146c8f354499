//! Configuration system for airbridge.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $AIRBRIDGE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/airbridge/config.toml
//!   3. ~/.config/airbridge/config.toml
//!
//! Configuration is read once at startup. Nothing here is mutable at
//! runtime; the relay core only ever sees the derived [`RelayParams`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::timing::{send_timeout_for_baud, DEFAULT_SEND_TIMEOUT_BYTES};
use crate::wire::{PeerAddress, CHANNEL_MAX, CHANNEL_MIN, LINK_MAX_PAYLOAD};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AirbridgeConfig {
    pub serial: SerialConfig,
    pub link: LinkConfig,
    pub relay: RelaySettings,
    pub indicator: IndicatorConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial device path, e.g. /dev/ttyUSB0.
    pub port: String,
    /// Line rate. Also the basis of the send-side idle timeout.
    pub baud_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Local UDP address the emulated radio listens on.
    pub bind: String,
    /// UDP address frames are transmitted to. A subnet broadcast address
    /// reaches every bridge on the segment.
    pub remote: String,
    /// Our radio hardware address.
    pub local_address: PeerAddress,
    /// Destination of every datagram. FF:FF:FF:FF:FF:FF = broadcast.
    pub peer_address: PeerAddress,
    /// Logical radio channel, 1-14.
    pub channel: u8,
    /// If set, only datagrams declaring this source are accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_sender: Option<PeerAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Maximum datagram payload. Must not exceed the radio limit.
    pub chunk_cap: usize,
    /// Reassembly buffer capacity. Longer bursts are truncated.
    pub burst_cap: usize,
    /// Send idle timeout, in serial byte periods.
    pub send_timeout_bytes: u32,
    /// Receive silence timeout in milliseconds.
    pub recv_timeout_ms: u64,
    /// Scheduling loop period in microseconds.
    pub poll_interval_us: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub enabled: bool,
    /// sysfs LED brightness file. Empty = log-only indicator.
    pub led_path: PathBuf,
    /// How long one pulse stays on.
    pub pulse_ms: u64,
    pub on_send: bool,
    pub on_send_success: bool,
    pub on_send_failure: bool,
    pub on_receive: bool,
    /// Pulse when a flushed burst is at least this many bytes. 0 = off.
    pub burst_threshold: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    /// Loopback TCP port for the status API.
    pub port: u16,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_BURST_CAP: usize = 1024;
pub const DEFAULT_RECV_TIMEOUT_MS: u64 = 50;
pub const DEFAULT_API_PORT: u16 = 9101;

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:4210".to_string(),
            remote: "255.255.255.255:4210".to_string(),
            local_address: PeerAddress([0x02, 0, 0, 0, 0, 0x01]),
            peer_address: PeerAddress::BROADCAST,
            channel: 1,
            expected_sender: None,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            chunk_cap: LINK_MAX_PAYLOAD,
            burst_cap: DEFAULT_BURST_CAP,
            send_timeout_bytes: DEFAULT_SEND_TIMEOUT_BYTES,
            recv_timeout_ms: DEFAULT_RECV_TIMEOUT_MS,
            poll_interval_us: 500,
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            led_path: PathBuf::new(),
            pulse_ms: 50,
            on_send: false,
            on_send_success: true,
            on_send_failure: true,
            on_receive: false,
            burst_threshold: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: DEFAULT_API_PORT,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("airbridge")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Loading ───────────────────────────────────────────────────────────────────

fn parse_expected_sender(value: &str) -> Result<Option<PeerAddress>, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| ConfigError::Invalid {
        field: "link.expected_sender",
        reason: format!("{value:?} is not a link address"),
    })
}

impl AirbridgeConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::file_path())
    }

    /// Load from an explicit path, falling back to defaults if it is absent.
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            AirbridgeConfig::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("AIRBRIDGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&AirbridgeConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply AIRBRIDGE_* env var overrides.
    ///
    /// Most malformed values are ignored. A malformed expected sender is an
    /// error, since dropping it would open the filter; an empty value clears it.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("AIRBRIDGE_SERIAL__PORT") {
            self.serial.port = v;
        }
        if let Ok(v) = std::env::var("AIRBRIDGE_SERIAL__BAUD_RATE") {
            if let Ok(b) = v.parse() {
                self.serial.baud_rate = b;
            }
        }
        if let Ok(v) = std::env::var("AIRBRIDGE_LINK__BIND") {
            self.link.bind = v;
        }
        if let Ok(v) = std::env::var("AIRBRIDGE_LINK__REMOTE") {
            self.link.remote = v;
        }
        if let Ok(v) = std::env::var("AIRBRIDGE_LINK__PEER_ADDRESS") {
            if let Ok(a) = v.parse() {
                self.link.peer_address = a;
            }
        }
        if let Ok(v) = std::env::var("AIRBRIDGE_LINK__CHANNEL") {
            if let Ok(c) = v.parse() {
                self.link.channel = c;
            }
        }
        if let Ok(v) = std::env::var("AIRBRIDGE_LINK__EXPECTED_SENDER") {
            self.link.expected_sender = parse_expected_sender(&v)?;
        }
        if let Ok(v) = std::env::var("AIRBRIDGE_API__PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
        if let Ok(v) = std::env::var("AIRBRIDGE_INDICATOR__ENABLED") {
            self.indicator.enabled = v == "true" || v == "1";
        }
        Ok(())
    }

    /// Range-check the values the relay core depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let relay = &self.relay;
        if relay.chunk_cap == 0 || relay.chunk_cap > LINK_MAX_PAYLOAD {
            return Err(ConfigError::Invalid {
                field: "relay.chunk_cap",
                reason: format!("{} not in 1..={}", relay.chunk_cap, LINK_MAX_PAYLOAD),
            });
        }
        if relay.burst_cap < relay.chunk_cap {
            return Err(ConfigError::Invalid {
                field: "relay.burst_cap",
                reason: format!(
                    "{} is smaller than chunk_cap {}",
                    relay.burst_cap, relay.chunk_cap
                ),
            });
        }
        if relay.recv_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "relay.recv_timeout_ms",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "serial.baud_rate",
                reason: "must be non-zero".to_string(),
            });
        }
        if !(CHANNEL_MIN..=CHANNEL_MAX).contains(&self.link.channel) {
            return Err(ConfigError::Invalid {
                field: "link.channel",
                reason: format!(
                    "{} not in {}..={}",
                    self.link.channel, CHANNEL_MIN, CHANNEL_MAX
                ),
            });
        }
        Ok(())
    }
}

// ── Derived core parameters ──────────────────────────────────────────────────

/// Fixed inputs to the chunker and reassembler, built once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayParams {
    pub chunk_cap: usize,
    pub burst_cap: usize,
    pub send_timeout: Duration,
    pub recv_timeout: Duration,
}

impl RelayParams {
    pub fn from_config(config: &AirbridgeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            chunk_cap: config.relay.chunk_cap,
            burst_cap: config.relay.burst_cap,
            send_timeout: send_timeout_for_baud(
                config.serial.baud_rate,
                config.relay.send_timeout_bytes,
            ),
            recv_timeout: Duration::from_millis(config.relay.recv_timeout_ms),
        })
    }
}
