use anyhow::Result;
use serde::{Deserialize, Serialize};

use abstutil::DataBuffer;

const RAMP: u8 = 1;
const ROUNDABOUT: u8 = 1 << 1;
const ROUNDABOUTISH: u8 = 1 << 2;
const MULTI_DIGITISED: u8 = 1 << 3;
const CONTROLLED_ACCESS: u8 = 1 << 4;

/// A driveable piece of road between two junctions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreetSegment {
    /// 0 is a motorway, 4 the smallest street
    pub road_class: u8,
    /// Meters
    pub width: u8,
    pub condition: u8,
    pub left_side_numbers: (u16, u16),
    pub right_side_numbers: (u16, u16),
    pub ramp: bool,
    pub roundabout: bool,
    pub roundaboutish: bool,
    pub multi_digitised: bool,
    pub controlled_access: bool,
}

impl StreetSegment {
    pub const MINOR_ROAD_CLASS: u8 = 4;

    pub fn new(road_class: u8) -> StreetSegment {
        StreetSegment {
            road_class,
            ..Default::default()
        }
    }

    pub fn has_house_numbers(&self) -> bool {
        self.left_side_numbers != (0, 0) || self.right_side_numbers != (0, 0)
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        for (set, bit) in [
            (self.ramp, RAMP),
            (self.roundabout, ROUNDABOUT),
            (self.roundaboutish, ROUNDABOUTISH),
            (self.multi_digitised, MULTI_DIGITISED),
            (self.controlled_access, CONTROLLED_ACCESS),
        ] {
            if set {
                flags |= bit;
            }
        }
        flags
    }

    pub(crate) fn save(&self, buf: &mut DataBuffer) {
        buf.write_u8(self.road_class);
        buf.write_u8(self.width);
        buf.write_u8(self.condition);
        buf.write_u8(self.flags());
        buf.write_u16(self.left_side_numbers.0);
        buf.write_u16(self.left_side_numbers.1);
        buf.write_u16(self.right_side_numbers.0);
        buf.write_u16(self.right_side_numbers.1);
    }

    pub(crate) fn load(buf: &mut DataBuffer) -> Result<StreetSegment> {
        let road_class = buf.read_u8()?;
        let width = buf.read_u8()?;
        let condition = buf.read_u8()?;
        let flags = buf.read_u8()?;
        let left_side_numbers = (buf.read_u16()?, buf.read_u16()?);
        let right_side_numbers = (buf.read_u16()?, buf.read_u16()?);
        Ok(StreetSegment {
            road_class,
            width,
            condition,
            left_side_numbers,
            right_side_numbers,
            ramp: flags & RAMP != 0,
            roundabout: flags & ROUNDABOUT != 0,
            roundaboutish: flags & ROUNDABOUTISH != 0,
            multi_digitised: flags & MULTI_DIGITISED != 0,
            controlled_access: flags & CONTROLLED_ACCESS != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_survive_save() {
        let ssi = StreetSegment {
            road_class: 2,
            ramp: true,
            multi_digitised: true,
            left_side_numbers: (1, 41),
            ..Default::default()
        };
        let mut buf = DataBuffer::new();
        ssi.save(&mut buf);
        assert_eq!(buf.len(), 12);
        let loaded = StreetSegment::load(&mut DataBuffer::from_bytes(buf.into_bytes())).unwrap();
        assert_eq!(loaded, ssi);
        assert!(loaded.has_house_numbers());
        assert!(!loaded.roundabout);
    }
}
