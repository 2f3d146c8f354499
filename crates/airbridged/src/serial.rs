//! Serial port endpoint backed by the `serialport` crate.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use serialport::SerialPort;

use airbridge_core::config::SerialConfig;
use airbridge_services::{SerialEndpoint, SerialError};

/// Bound on how long a single write may block.
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

pub struct SerialPortEndpoint {
    port: Box<dyn SerialPort>,
    scratch: Vec<u8>,
}

impl SerialPortEndpoint {
    /// Open the port as 8N1 raw at the configured baud rate.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()
            .with_context(|| format!("failed to open serial port {}", config.port))?;

        // Drop whatever the device buffered before we were listening.
        port.clear(serialport::ClearBuffer::Input)
            .context("failed to clear serial input buffer")?;

        tracing::info!(port = %config.port, baud = config.baud_rate, "serial port open");
        Ok(Self {
            port,
            scratch: vec![0u8; 4096],
        })
    }
}

impl SerialEndpoint for SerialPortEndpoint {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, SerialError> {
        let available = self
            .port
            .bytes_to_read()
            .map_err(|e| SerialError::Read(e.into()))? as usize;
        if available == 0 {
            return Ok(0);
        }

        let want = available.min(self.scratch.len());
        match self.port.read(&mut self.scratch[..want]) {
            Ok(0) => Err(SerialError::Closed),
            Ok(n) => {
                buf.extend_from_slice(&self.scratch[..n]);
                Ok(n)
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(SerialError::Read(e)),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        self.port.write_all(bytes).map_err(SerialError::Write)?;
        self.port.flush().map_err(SerialError::Write)
    }
}
