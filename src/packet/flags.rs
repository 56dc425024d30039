//! RSW register bitmask: which packet types the sensor is commanded to
//! emit.

use binrw::{BinRead, BinWrite};
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OutputSwitch: u16 {
        const TIME          = 1 << 0;
        const ACC           = 1 << 1;
        const GYRO          = 1 << 2;
        const ANGLE         = 1 << 3;
        const MAG           = 1 << 4;
        const PORT          = 1 << 5;
        const PRESSURE      = 1 << 6;
        const GPS_LONLAT    = 1 << 7;
        const GPS_SPEED     = 1 << 8;
        const QUATERNION    = 1 << 9;
        const GPS_ACCURACY  = 1 << 10;
    }
}

impl BinRead for OutputSwitch {
    type Args<'a> = ();

    fn read_options<R: std::io::Read + std::io::Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        args: Self::Args<'_>,
    ) -> binrw::BinResult<Self> {
        let raw = u16::read_options(reader, endian, args)?;
        Ok(OutputSwitch::from_bits_truncate(raw))
    }
}

impl BinWrite for OutputSwitch {
    type Args<'a> = ();

    fn write_options<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        args: Self::Args<'_>,
    ) -> binrw::BinResult<()> {
        self.bits().write_options(writer, endian, args)
    }
}

/// Factory-reset default content switch: `0x001E = ACC | GYRO | ANGLE | MAG`.
pub const FACTORY_RESET_SWITCH: u16 = 0x001E;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_reset_switch_matches_flags() {
        let expected =
            OutputSwitch::ACC | OutputSwitch::GYRO | OutputSwitch::ANGLE | OutputSwitch::MAG;
        assert_eq!(expected.bits(), FACTORY_RESET_SWITCH);
    }
}
