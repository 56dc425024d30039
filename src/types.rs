//! Clean, scaled public types. Wire structs in [`crate::packet::wire`]
//! carry raw integers; this module turns them into the physical-unit
//! values a caller actually wants.

use crate::packet::wire;
use crate::packet::RawPacket;
use serde::{Deserialize, Serialize};

/// `32768 / 16` LSB per g.
pub const SCALE_ACCELERATION: f64 = 32768.0 / 16.0;
pub const SCALE_TEMPERATURE: f64 = 100.0;
/// `32768 / 2000` LSB per °/s.
pub const SCALE_ANGULAR_VELOCITY: f64 = 32768.0 / 2000.0;
/// `32768 / 180` LSB per degree.
pub const SCALE_ANGLE: f64 = 32768.0 / 180.0;
pub const SCALE_GPS_SPEED: f64 = 1000.0;
pub const SCALE_GPS_ALTITUDE: f64 = 10.0;
pub const SCALE_GPS_ACCURACY: f64 = 100.0;
pub const SCALE_GPS_LONLAT: f64 = 10_000_000.0;
pub const SCALE_GPS_HEADING: f64 = 100.0;
pub const SCALE_QUATERNION: f64 = 32768.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Time {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Acceleration {
    pub x_g: f64,
    pub y_g: f64,
    pub z_g: f64,
    pub temperature_c: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngularVelocity {
    pub x_dps: f64,
    pub y_dps: f64,
    pub z_dps: f64,
    pub temperature_c: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Angle {
    pub roll_deg: f64,
    pub pitch_deg: f64,
    pub yaw_deg: f64,
    pub temperature_c: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Magnetic {
    pub x_raw: i16,
    pub y_raw: i16,
    pub z_raw: i16,
    pub temperature_c: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortStatus {
    pub d0: i16,
    pub d1: i16,
    pub d2: i16,
    pub d3: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureHeight {
    pub pressure_pa: u32,
    pub height_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsLonLat {
    pub longitude_deg: f64,
    pub latitude_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsSpeed {
    pub ground_speed_kmh: f64,
    pub altitude_m: f64,
    pub heading_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub q0: f64,
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsAccuracy {
    pub num_satellites: i16,
    pub pdop: f64,
    pub hdop: f64,
    pub vdop: f64,
}

/// A register read response carries four consecutive registers on the
/// wire; only the one actually requested is exposed here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegisterReadResponse {
    pub value: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DecodedFields {
    Time(Time),
    Acceleration(Acceleration),
    AngularVelocity(AngularVelocity),
    Angle(Angle),
    Magnetic(Magnetic),
    PortStatus(PortStatus),
    PressureHeight(PressureHeight),
    GpsLonLat(GpsLonLat),
    GpsSpeed(GpsSpeed),
    Quaternion(Quaternion),
    GpsAccuracy(GpsAccuracy),
    RegisterReadResponse(RegisterReadResponse),
}

/// `{ timestamp_unix_s, type, fields }`. Immutable once decoded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodedSample {
    pub timestamp_unix_s: f64,
    pub fields: DecodedFields,
}

impl DecodedSample {
    pub fn from_raw(raw: RawPacket, timestamp_unix_s: f64) -> Self {
        Self {
            timestamp_unix_s,
            fields: DecodedFields::from(raw),
        }
    }

    /// The accelerometer reading in g, if this sample is an ACCELERATION
    /// packet. Used by the ingest pipeline to feed MotionProcessor.
    pub fn as_acceleration(&self) -> Option<Acceleration> {
        match self.fields {
            DecodedFields::Acceleration(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_angle(&self) -> Option<Angle> {
        match self.fields {
            DecodedFields::Angle(a) => Some(a),
            _ => None,
        }
    }
}

impl From<RawPacket> for DecodedFields {
    fn from(raw: RawPacket) -> Self {
        match raw {
            RawPacket::Time(t) => DecodedFields::Time(Time {
                year: t.year,
                month: t.month,
                day: t.day,
                hour: t.hour,
                minute: t.minute,
                second: t.second,
                millisecond: t.millisecond,
            }),
            RawPacket::Acceleration(wire::AccelerationRaw {
                x,
                y,
                z,
                temperature,
            }) => DecodedFields::Acceleration(Acceleration {
                x_g: x as f64 / SCALE_ACCELERATION,
                y_g: y as f64 / SCALE_ACCELERATION,
                z_g: z as f64 / SCALE_ACCELERATION,
                temperature_c: temperature as f64 / SCALE_TEMPERATURE,
            }),
            RawPacket::AngularVelocity(wire::AngularVelocityRaw {
                x,
                y,
                z,
                temperature,
            }) => DecodedFields::AngularVelocity(AngularVelocity {
                x_dps: x as f64 / SCALE_ANGULAR_VELOCITY,
                y_dps: y as f64 / SCALE_ANGULAR_VELOCITY,
                z_dps: z as f64 / SCALE_ANGULAR_VELOCITY,
                temperature_c: temperature as f64 / SCALE_TEMPERATURE,
            }),
            RawPacket::Angle(wire::AngleRaw {
                roll,
                pitch,
                yaw,
                temperature,
            }) => DecodedFields::Angle(Angle {
                roll_deg: roll as f64 / SCALE_ANGLE,
                pitch_deg: pitch as f64 / SCALE_ANGLE,
                yaw_deg: yaw as f64 / SCALE_ANGLE,
                temperature_c: temperature as f64 / SCALE_TEMPERATURE,
            }),
            RawPacket::Magnetic(wire::MagneticRaw {
                x,
                y,
                z,
                temperature,
            }) => DecodedFields::Magnetic(Magnetic {
                x_raw: x,
                y_raw: y,
                z_raw: z,
                temperature_c: temperature as f64 / SCALE_TEMPERATURE,
            }),
            RawPacket::PortStatus(wire::PortStatusRaw { d0, d1, d2, d3 }) => {
                DecodedFields::PortStatus(PortStatus { d0, d1, d2, d3 })
            }
            RawPacket::PressureHeight(wire::PressureHeightRaw { pressure, height }) => {
                DecodedFields::PressureHeight(PressureHeight {
                    pressure_pa: pressure,
                    height_m: height as f64 / SCALE_GPS_ALTITUDE,
                })
            }
            RawPacket::GpsLonLat(wire::GpsLonLatRaw { longitude, latitude }) => {
                DecodedFields::GpsLonLat(GpsLonLat {
                    longitude_deg: longitude as f64 / SCALE_GPS_LONLAT,
                    latitude_deg: latitude as f64 / SCALE_GPS_LONLAT,
                })
            }
            RawPacket::GpsSpeed(wire::GpsSpeedRaw {
                ground_speed,
                altitude,
                heading,
            }) => DecodedFields::GpsSpeed(GpsSpeed {
                ground_speed_kmh: ground_speed as f64 / SCALE_GPS_SPEED,
                altitude_m: altitude as f64 / SCALE_GPS_ALTITUDE,
                heading_deg: heading as f64 / SCALE_GPS_HEADING,
            }),
            RawPacket::Quaternion(wire::QuaternionRaw { q0, q1, q2, q3 }) => {
                DecodedFields::Quaternion(Quaternion {
                    q0: q0 as f64 / SCALE_QUATERNION,
                    q1: q1 as f64 / SCALE_QUATERNION,
                    q2: q2 as f64 / SCALE_QUATERNION,
                    q3: q3 as f64 / SCALE_QUATERNION,
                })
            }
            RawPacket::GpsAccuracy(wire::GpsAccuracyRaw {
                num_satellites,
                pdop,
                hdop,
                vdop,
            }) => DecodedFields::GpsAccuracy(GpsAccuracy {
                num_satellites,
                pdop: pdop as f64 / SCALE_GPS_ACCURACY,
                hdop: hdop as f64 / SCALE_GPS_ACCURACY,
                vdop: vdop as f64 / SCALE_GPS_ACCURACY,
            }),
            RawPacket::RegisterReadResponse(r) => {
                DecodedFields::RegisterReadResponse(RegisterReadResponse { value: r.register_1 })
            }
        }
    }
}
