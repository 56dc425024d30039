//! The abstract command surface an external controller drives. The
//! transport that carries these commands (a pub/sub channel, a CLI) is out
//! of scope; only the semantics live here, composed from
//! [`crate::configproto::ConfigProtocol`] primitives.

use crate::configproto::{baud_code, rate_code, ConfigProtocol};
use crate::error::{Error, Result};
use crate::packet::flags::OutputSwitch;
use crate::protocol::register;
use std::io::{Read, Write};
use tracing::warn;

/// Current register values, each `None` if its read timed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurrentConfig {
    pub rsw: Option<i16>,
    pub rrate: Option<i16>,
    pub baud: Option<i16>,
}

/// `read_config`: read RSW, RRATE, BAUD.
pub fn read_config<T: Read + Write>(proto: &mut ConfigProtocol<T>) -> Result<CurrentConfig> {
    Ok(CurrentConfig {
        rsw: proto.read_register(register::RSW)?,
        rrate: proto.read_register(register::RRATE)?,
        baud: proto.read_register(register::BAUD)?,
    })
}

/// `set_rate`: Unlock; write RRATE; Save.
pub fn set_rate<T: Read + Write>(proto: &mut ConfigProtocol<T>, rate_hz: f64) -> Result<()> {
    let code = rate_code(rate_hz)
        .ok_or_else(|| Error::ConfigSequence {
            step: "set_rate",
            reason: format!("unsupported output rate {rate_hz} Hz"),
        })?;
    proto.unlock()?;
    proto.write_register(register::RRATE, code as u16)?;
    proto.save()
}

/// Maps a content-tag string to its RSW bit. Unknown tags are the caller's
/// responsibility to warn on.
fn tag_to_switch(tag: &str) -> Option<OutputSwitch> {
    Some(match tag {
        "time" => OutputSwitch::TIME,
        "acc" => OutputSwitch::ACC,
        "gyro" => OutputSwitch::GYRO,
        "angle" => OutputSwitch::ANGLE,
        "mag" => OutputSwitch::MAG,
        "port" => OutputSwitch::PORT,
        "pressure" => OutputSwitch::PRESSURE,
        "gps_pos" => OutputSwitch::GPS_LONLAT,
        "gps_speed" => OutputSwitch::GPS_SPEED,
        "quaternion" => OutputSwitch::QUATERNION,
        "gps_acc" => OutputSwitch::GPS_ACCURACY,
        _ => return None,
    })
}

/// `set_output`: Unlock; write RSW bitmask; Save. Unknown tags are ignored
/// with a warning.
pub fn set_output<T: Read + Write>(
    proto: &mut ConfigProtocol<T>,
    tags: &[&str],
) -> Result<()> {
    let mut switch = OutputSwitch::empty();
    for tag in tags {
        match tag_to_switch(tag) {
            Some(bit) => switch |= bit,
            None => warn!(tag, "unknown content tag in set_output, ignoring"),
        }
    }
    proto.unlock()?;
    proto.write_register(register::RSW, switch.bits())?;
    proto.save()
}

/// `set_baudrate`: Unlock; write BAUD; Save. The caller must reopen the
/// port at the new rate afterward — this function does not do so itself.
pub fn set_baudrate<T: Read + Write>(proto: &mut ConfigProtocol<T>, bps: u32) -> Result<()> {
    let code = baud_code(bps).ok_or_else(|| Error::ConfigSequence {
        step: "set_baudrate",
        reason: format!("unsupported baudrate {bps} bps"),
    })?;
    proto.unlock()?;
    proto.write_register(register::BAUD, code as u16)?;
    proto.save()
}

/// `raw_hex`: decode exactly 5 bytes of hex and pass them straight through
/// as a write.
pub fn raw_hex<T: Read + Write>(proto: &mut ConfigProtocol<T>, hex: &str) -> Result<()> {
    let bytes = hex_to_bytes(hex).map_err(|reason| Error::ConfigSequence {
        step: "raw_hex",
        reason,
    })?;
    if bytes.len() != 5 {
        return Err(Error::ConfigSequence {
            step: "raw_hex",
            reason: format!("expected exactly 5 bytes, got {}", bytes.len()),
        });
    }
    let mut cmd = [0u8; 5];
    cmd.copy_from_slice(&bytes);
    proto.write_raw(&cmd)
}

/// `bytes_to_hex(hex_to_bytes(s)) == s.upper()`.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

pub fn hex_to_bytes(s: &str) -> std::result::Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err(format!("odd-length hex string: {s}"));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

#[cfg(test)]
#[path = "tests/command.rs"]
mod command_tests;
