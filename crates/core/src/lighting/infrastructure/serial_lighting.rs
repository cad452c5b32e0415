use std::io::Write;
use std::time::Duration;

use serialport::SerialPort;
use thiserror::Error;

use crate::lighting::domain::lighting_controller::{LightingCommand, LightingController};

const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum LightingError {
    #[error("failed to open lighting port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("failed to send lighting cue {command} on {port}: {source}")]
    Write {
        command: LightingCommand,
        port: String,
        #[source]
        source: std::io::Error,
    },
}

/// Lighting accessory on a serial line: one byte per cue, nothing read back.
pub struct SerialLighting<W: Write = Box<dyn SerialPort>> {
    port: Option<W>,
    name: String,
    failures: usize,
}

impl SerialLighting {
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, LightingError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(WRITE_TIMEOUT)
            .open()
            .map_err(|e| LightingError::Open {
                port: port_name.to_string(),
                source: e,
            })?;
        log::info!("Lighting channel open on {port_name} at {baud_rate} baud");
        Ok(Self::with_writer(port, port_name))
    }
}

impl<W: Write> SerialLighting<W> {
    pub fn with_writer(port: W, name: &str) -> Self {
        Self {
            port: Some(port),
            name: name.to_string(),
            failures: 0,
        }
    }

    /// Number of cues that could not be written.
    pub fn failures(&self) -> usize {
        self.failures
    }

    fn write_byte(port: &mut W, byte: u8) -> std::io::Result<()> {
        port.write_all(&[byte])?;
        port.flush()
    }
}

impl<W: Write> LightingController for SerialLighting<W> {
    fn send(&mut self, command: LightingCommand) {
        let Some(port) = self.port.as_mut() else {
            log::debug!("Lighting {} is closed, dropping cue {command}", self.name);
            return;
        };
        match Self::write_byte(port, command.byte()) {
            Ok(()) => log::debug!("Lighting cue: {command}"),
            Err(e) => {
                self.failures += 1;
                let err = LightingError::Write {
                    command,
                    port: self.name.clone(),
                    source: e,
                };
                // Only the first failure is loud; an unplugged cable fails every cue
                if self.failures == 1 {
                    log::warn!("{err}");
                } else {
                    log::debug!("{err}");
                }
            }
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            log::info!("Lighting channel {} released", self.name);
        }
    }
}
