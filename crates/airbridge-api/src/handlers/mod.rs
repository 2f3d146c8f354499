//! HTTP API handlers: exposes relay state as JSON.

pub mod stats;
pub mod status;

use airbridge_core::{AirbridgeConfig, PeerAddress, RelayParams};
use airbridge_services::RelayStats;
use serde::Serialize;

#[derive(Clone)]
pub struct ApiState {
    pub stats: RelayStats,
    /// Effective configuration, captured once at startup.
    pub summary: ConfigSummary,
}

/// The parts of the configuration worth showing an operator.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub serial_port: String,
    pub baud_rate: u32,
    pub local_address: PeerAddress,
    pub peer_address: PeerAddress,
    pub channel: u8,
    pub expected_sender: Option<PeerAddress>,
    pub chunk_cap: usize,
    pub burst_cap: usize,
    pub send_timeout_us: u64,
    pub recv_timeout_ms: u64,
}

impl ConfigSummary {
    pub fn new(config: &AirbridgeConfig, params: &RelayParams) -> Self {
        Self {
            serial_port: config.serial.port.clone(),
            baud_rate: config.serial.baud_rate,
            local_address: config.link.local_address,
            peer_address: config.link.peer_address,
            channel: config.link.channel,
            expected_sender: config.link.expected_sender,
            chunk_cap: params.chunk_cap,
            burst_cap: params.burst_cap,
            send_timeout_us: params.send_timeout.as_micros() as u64,
            recv_timeout_ms: params.recv_timeout.as_millis() as u64,
        }
    }
}
