//! LED indicator output through the Linux LED class interface
//! (`/sys/class/leds/<name>/brightness`).

use std::path::PathBuf;

use airbridge_core::config::IndicatorConfig;
use airbridge_services::IndicatorOutput;

pub struct LedIndicator {
    brightness: PathBuf,
    warned: bool,
}

impl LedIndicator {
    /// `path` may name the LED directory or its `brightness` file.
    pub fn new(path: PathBuf) -> Self {
        let brightness = if path.is_dir() {
            path.join("brightness")
        } else {
            path
        };
        Self {
            brightness,
            warned: false,
        }
    }
}

impl LedIndicator {
    /// The LED output the config asks for, if any. Without a path the
    /// indicator stays log-only.
    pub fn from_config(config: &IndicatorConfig) -> Option<Self> {
        if !config.enabled || config.led_path.as_os_str().is_empty() {
            return None;
        }
        Some(Self::new(config.led_path.clone()))
    }
}

impl IndicatorOutput for LedIndicator {
    fn set(&mut self, on: bool) {
        let value: &[u8] = if on { b"1" } else { b"0" };
        if let Err(e) = std::fs::write(&self.brightness, value) {
            // Once is enough; the relay keeps running without the LED.
            if !self.warned {
                tracing::warn!(path = %self.brightness.display(), error = %e, "failed to drive LED");
                self.warned = true;
            }
        }
    }
}
