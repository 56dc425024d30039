//! Synchronous register read/write protocol and the composite configuration
//! state machines built on top of it. Configuration is strictly serial on
//! the shared port: no data reads are interleaved while one of these
//! operations runs.

use crate::config::ConfigProtocolConfig;
use crate::error::{Error, Result};
use crate::framer::{FrameEvent, PacketFramer};
use crate::packet::RawPacket;
use crate::protocol::{read_command, register, save_value, write_command, UNLOCK_KEY};
use std::io::{Read, Write};
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

/// `RSW` value the sensor carries after a factory reset: `ACC | GYRO | ANGLE | MAG`.
pub const FACTORY_RESET_RSW: i16 = 0x001E;
/// `RRATE` code for 10 Hz, the factory default output rate.
pub const FACTORY_RESET_RRATE: i16 = 0x0006;
/// `BAUD` code for 9600 bps, the factory default baudrate.
pub const FACTORY_RESET_BAUD: i16 = 0x0002;

/// Maps a requested output rate in Hz to its register code.
pub fn rate_code(hz: f64) -> Option<u8> {
    let table = [
        (0.1, 1u8),
        (0.5, 2),
        (1.0, 3),
        (2.0, 4),
        (5.0, 5),
        (10.0, 6),
        (20.0, 7),
        (50.0, 8),
        (100.0, 9),
        (200.0, 11),
    ];
    table
        .iter()
        .find(|(v, _)| (*v - hz).abs() < f64::EPSILON)
        .map(|(_, c)| *c)
}

/// Maps a requested baudrate in bps to its register code.
pub fn baud_code(bps: u32) -> Option<u8> {
    let table = [
        (4800u32, 1u8),
        (9600, 2),
        (19200, 3),
        (38400, 4),
        (57600, 5),
        (115200, 6),
        (230400, 7),
        (460800, 8),
        (921600, 9),
    ];
    table.iter().find(|(v, _)| *v == bps).map(|(_, c)| *c)
}

/// Synchronous request/response layer for configuration, parameterized
/// over any duplex transport (a serial port, or a test double).
pub struct ConfigProtocol<T: Read + Write> {
    port: T,
    framer: PacketFramer,
    cfg: ConfigProtocolConfig,
}

impl<T: Read + Write> ConfigProtocol<T> {
    pub fn new(port: T, cfg: ConfigProtocolConfig) -> Self {
        Self {
            port,
            framer: PacketFramer::new(),
            cfg,
        }
    }

    pub fn into_inner(self) -> T {
        self.port
    }

    /// `write(reg, value)`: `[0xFF, 0xAA, reg, value&0xFF, value>>8]`, retried
    /// up to `write_retries` times on a transport error.
    pub fn write_register(&mut self, reg: u8, value: u16) -> Result<()> {
        let cmd = write_command(reg, value);
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.port.write_all(&cmd) {
                Ok(()) => return Ok(()),
                Err(e) if attempts < self.cfg.write_retries => {
                    warn!(register = reg, attempt = attempts, error = %e, "register write failed, retrying");
                }
                Err(_) => {
                    return Err(Error::ConfigWrite {
                        register: reg,
                        attempts,
                    })
                }
            }
        }
    }

    /// `read(reg)`: issues `[0xFF, 0xAA, 0x27, reg, 0x00]` and waits up to
    /// the configured timeout for a `0x5F` response, returning its first
    /// register value. A timeout yields `Ok(None)`, not an error.
    pub fn read_register(&mut self, reg: u8) -> Result<Option<i16>> {
        self.port
            .write_all(&read_command(reg))
            .map_err(Error::Transport)?;

        let deadline = Instant::now() + self.cfg.read_timeout;
        let mut scratch = [0u8; 256];
        loop {
            while let Some(event) = self.framer.next_packet() {
                if let FrameEvent::Packet(p) = event {
                    if p.type_byte == 0x5F {
                        if let Ok(RawPacket::RegisterReadResponse(r)) = PacketFramer::decode(p) {
                            return Ok(Some(r.register_1));
                        }
                    }
                }
            }
            if Instant::now() >= deadline {
                debug!(register = reg, "configuration read timed out");
                return Ok(None);
            }
            match self.port.read(&mut scratch) {
                Ok(0) => {}
                Ok(n) => self.framer.push_bytes(&scratch[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => return Err(Error::Transport(e)),
            }
        }
    }

    /// *Unlock*: write `KEY=0xB588`; settle for `unlock_settle` before the
    /// next configuration write.
    pub fn unlock(&mut self) -> Result<()> {
        self.write_register(register::KEY, UNLOCK_KEY)?;
        thread::sleep(self.cfg.unlock_settle);
        Ok(())
    }

    /// *Save*: write `SAVE=0x0000`; settle for `save_settle`.
    pub fn save(&mut self) -> Result<()> {
        self.write_register(register::SAVE, save_value::SAVE)?;
        thread::sleep(self.cfg.save_settle);
        Ok(())
    }

    /// *Restart*: write `SAVE=0x00FF`; settle for `restart_settle` while the
    /// sensor reboots.
    pub fn restart(&mut self) -> Result<()> {
        self.write_register(register::SAVE, save_value::RESTART)?;
        thread::sleep(self.cfg.restart_settle);
        Ok(())
    }

    /// *Factory reset*: Unlock → write(SAVE,0x0001) → settle → Save →
    /// Restart. Any failed step aborts the remainder and reports which one.
    pub fn factory_reset(&mut self) -> Result<()> {
        self.unlock()
            .map_err(|e| config_sequence_error("unlock", e))?;
        self.write_register(register::SAVE, save_value::FACTORY_RESET)
            .map_err(|e| config_sequence_error("factory_reset_write", e))?;
        thread::sleep(self.cfg.factory_reset_settle);
        self.save().map_err(|e| config_sequence_error("save", e))?;
        self.restart()
            .map_err(|e| config_sequence_error("restart", e))
    }

    /// *VerifyBaudrate*: a register read with a short timeout succeeds iff
    /// a valid `0x5F` packet arrives in time.
    pub fn verify_baudrate(&mut self) -> Result<bool> {
        Ok(self.read_register(register::RSW)?.is_some())
    }

    /// *VerifyFactoryReset*: RSW, RRATE and BAUD must all match the
    /// sensor's documented factory defaults.
    /// `raw_hex`: pass an already-encoded 5-byte command straight through,
    /// bypassing the register write helper.
    pub fn write_raw(&mut self, bytes: &[u8; 5]) -> Result<()> {
        self.port.write_all(bytes).map_err(Error::Transport)
    }

    pub fn verify_factory_reset_state(&mut self) -> Result<bool> {
        let rsw = self.read_register(register::RSW)?;
        let rrate = self.read_register(register::RRATE)?;
        let baud = self.read_register(register::BAUD)?;
        Ok(rsw == Some(FACTORY_RESET_RSW)
            && rrate == Some(FACTORY_RESET_RRATE)
            && baud == Some(FACTORY_RESET_BAUD))
    }
}

fn config_sequence_error(step: &'static str, source: Error) -> Error {
    Error::ConfigSequence {
        step,
        reason: source.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/configproto.rs"]
mod configproto_tests;
