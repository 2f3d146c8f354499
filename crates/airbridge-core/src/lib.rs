//! airbridge-core: shared types, link wire format, timing and configuration.
//! All other airbridge crates depend on this one.

pub mod config;
pub mod timing;
pub mod wire;

pub use config::{AirbridgeConfig, ConfigError, RelayParams};
pub use timing::Deadline;
pub use wire::{LinkFrame, PeerAddress};
