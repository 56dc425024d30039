//! Raw wire-format payloads: one binrw struct per packet type, each exactly
//! the 8-byte payload that follows the header and type byte. Scale factors
//! are applied one layer up, in [`crate::types`], keeping these wire structs
//! free of derived units.

use binrw::{BinRead, BinWrite};

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct TimeRaw {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: i16,
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct AccelerationRaw {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub temperature: i16,
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct AngularVelocityRaw {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub temperature: i16,
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct AngleRaw {
    pub roll: i16,
    pub pitch: i16,
    pub yaw: i16,
    pub temperature: i16,
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct MagneticRaw {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub temperature: i16,
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct PortStatusRaw {
    pub d0: i16,
    pub d1: i16,
    pub d2: i16,
    pub d3: i16,
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct PressureHeightRaw {
    pub pressure: u32,
    pub height: u32,
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct GpsLonLatRaw {
    pub longitude: u32,
    pub latitude: u32,
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct GpsSpeedRaw {
    pub ground_speed: u32,
    pub altitude: i16,
    pub heading: i16,
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct QuaternionRaw {
    pub q0: i16,
    pub q1: i16,
    pub q2: i16,
    pub q3: i16,
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct GpsAccuracyRaw {
    pub num_satellites: i16,
    pub pdop: i16,
    pub hdop: i16,
    pub vdop: i16,
}

/// Response to a register read (type 0x5F): four consecutive registers
/// starting at the one requested. Only `register_1` is exposed by the
/// public API.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct RegisterReadResponseRaw {
    pub register_1: i16,
    pub register_2: i16,
    pub register_3: i16,
    pub register_4: i16,
}

#[cfg(test)]
#[path = "tests/wire.rs"]
mod wire_tests;
