pub mod flags;
pub mod wire;

use crate::error::{Error, Result};
use binrw::BinRead;
use std::io::Cursor;

/// The packet-type byte. Table-driven dispatch target for the decoder —
/// unknown bytes are represented separately rather than raising or
/// dropping the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    Time = 0x50,
    Acceleration = 0x51,
    AngularVelocity = 0x52,
    Angle = 0x53,
    Magnetic = 0x54,
    PortStatus = 0x55,
    PressureHeight = 0x56,
    GpsLonLat = 0x57,
    GpsSpeed = 0x58,
    Quaternion = 0x59,
    GpsAccuracy = 0x5A,
    RegisterReadResponse = 0x5F,
}

impl TryFrom<u8> for PacketType {
    type Error = u8;

    fn try_from(byte: u8) -> std::result::Result<Self, u8> {
        Ok(match byte {
            0x50 => PacketType::Time,
            0x51 => PacketType::Acceleration,
            0x52 => PacketType::AngularVelocity,
            0x53 => PacketType::Angle,
            0x54 => PacketType::Magnetic,
            0x55 => PacketType::PortStatus,
            0x56 => PacketType::PressureHeight,
            0x57 => PacketType::GpsLonLat,
            0x58 => PacketType::GpsSpeed,
            0x59 => PacketType::Quaternion,
            0x5A => PacketType::GpsAccuracy,
            0x5F => PacketType::RegisterReadResponse,
            other => return Err(other),
        })
    }
}

/// A decoded payload, still in raw (unscaled) wire form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawPacket {
    Time(wire::TimeRaw),
    Acceleration(wire::AccelerationRaw),
    AngularVelocity(wire::AngularVelocityRaw),
    Angle(wire::AngleRaw),
    Magnetic(wire::MagneticRaw),
    PortStatus(wire::PortStatusRaw),
    PressureHeight(wire::PressureHeightRaw),
    GpsLonLat(wire::GpsLonLatRaw),
    GpsSpeed(wire::GpsSpeedRaw),
    Quaternion(wire::QuaternionRaw),
    GpsAccuracy(wire::GpsAccuracyRaw),
    RegisterReadResponse(wire::RegisterReadResponseRaw),
}

/// Decode an 8-byte payload given its type byte. Returns
/// `Error::Decode` for an unknown type or an under-length payload; the
/// caller skips and continues, it never panics or tears down the stream.
pub fn decode_payload(type_byte: u8, payload: &[u8]) -> Result<RawPacket> {
    if payload.len() < 8 {
        return Err(Error::Decode(format!(
            "payload too short: {} bytes",
            payload.len()
        )));
    }
    let kind = PacketType::try_from(type_byte)
        .map_err(|b| Error::Decode(format!("unknown packet type 0x{:02X}", b)))?;

    let mut cursor = Cursor::new(payload);
    let raw = match kind {
        PacketType::Time => RawPacket::Time(wire::TimeRaw::read_le(&mut cursor)?),
        PacketType::Acceleration => {
            RawPacket::Acceleration(wire::AccelerationRaw::read_le(&mut cursor)?)
        }
        PacketType::AngularVelocity => {
            RawPacket::AngularVelocity(wire::AngularVelocityRaw::read_le(&mut cursor)?)
        }
        PacketType::Angle => RawPacket::Angle(wire::AngleRaw::read_le(&mut cursor)?),
        PacketType::Magnetic => RawPacket::Magnetic(wire::MagneticRaw::read_le(&mut cursor)?),
        PacketType::PortStatus => {
            RawPacket::PortStatus(wire::PortStatusRaw::read_le(&mut cursor)?)
        }
        PacketType::PressureHeight => {
            RawPacket::PressureHeight(wire::PressureHeightRaw::read_le(&mut cursor)?)
        }
        PacketType::GpsLonLat => RawPacket::GpsLonLat(wire::GpsLonLatRaw::read_le(&mut cursor)?),
        PacketType::GpsSpeed => RawPacket::GpsSpeed(wire::GpsSpeedRaw::read_le(&mut cursor)?),
        PacketType::Quaternion => {
            RawPacket::Quaternion(wire::QuaternionRaw::read_le(&mut cursor)?)
        }
        PacketType::GpsAccuracy => {
            RawPacket::GpsAccuracy(wire::GpsAccuracyRaw::read_le(&mut cursor)?)
        }
        PacketType::RegisterReadResponse => {
            RawPacket::RegisterReadResponse(wire::RegisterReadResponseRaw::read_le(&mut cursor)?)
        }
    };
    Ok(raw)
}

impl From<binrw::Error> for Error {
    fn from(e: binrw::Error) -> Self {
        Error::Decode(e.to_string())
    }
}
