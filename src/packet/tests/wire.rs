use super::*;
use binrw::{BinRead, BinWrite};
use std::io::Cursor;

fn roundtrip<T>(value: T)
where
    T: BinRead<Args<'static> = ()> + BinWrite<Args<'static> = ()> + PartialEq + std::fmt::Debug + Copy,
{
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    value.write_le(&mut cursor).unwrap();
    let mut read_cursor = Cursor::new(&buf);
    let back = T::read_le(&mut read_cursor).unwrap();
    assert_eq!(value, back);
}

#[test]
fn acceleration_roundtrip() {
    roundtrip(AccelerationRaw {
        x: 100,
        y: -200,
        z: 16384,
        temperature: 2500,
    });
}

#[test]
fn angle_roundtrip() {
    roundtrip(AngleRaw {
        roll: 1000,
        pitch: -1000,
        yaw: 32767,
        temperature: 0,
    });
}

#[test]
fn gps_lonlat_roundtrip() {
    roundtrip(GpsLonLatRaw {
        longitude: 1_050_000_000,
        latitude: 210_000_000,
    });
}

#[test]
fn register_read_response_roundtrip() {
    roundtrip(RegisterReadResponseRaw {
        register_1: 0x001E,
        register_2: 0x0006,
        register_3: 0x0002,
        register_4: 0,
    });
}
