use anyhow::Result;
use serde::{Deserialize, Serialize};

use abstutil::DataBuffer;

use crate::ItemID;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoiType {
    CityCentre,
    Other(u8),
}

impl Default for PoiType {
    fn default() -> PoiType {
        PoiType::Other(0)
    }
}

impl PoiType {
    const CITY_CENTRE: u8 = 11;

    fn from_u8(x: u8) -> PoiType {
        if x == PoiType::CITY_CENTRE {
            PoiType::CityCentre
        } else {
            PoiType::Other(x)
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            PoiType::CityCentre => PoiType::CITY_CENTRE,
            PoiType::Other(x) => x,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreetSide {
    #[default]
    Unknown,
    Left,
    Right,
}

impl StreetSide {
    fn from_u8(x: u8) -> StreetSide {
        match x {
            1 => StreetSide::Left,
            2 => StreetSide::Right,
            _ => StreetSide::Unknown,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            StreetSide::Unknown => 0,
            StreetSide::Left => 1,
            StreetSide::Right => 2,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub poi_type: PoiType,
    /// The segment this POI is reached from
    pub street_segment: Option<ItemID>,
    /// Position along `street_segment`, 0 at node 0 and 0xFFFF at node 1
    pub offset_on_street: u16,
    pub side: StreetSide,
    pub wasp_id: u32,
}

impl PointOfInterest {
    pub fn is_city_centre(&self) -> bool {
        self.poi_type == PoiType::CityCentre
    }

    pub(crate) fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(ItemID::to_raw(self.street_segment));
        buf.write_u32(self.wasp_id);
        buf.write_u16(self.offset_on_street);
        buf.write_u8(self.poi_type.to_u8());
        buf.write_u8(self.side.to_u8());
    }

    pub(crate) fn load(buf: &mut DataBuffer) -> Result<PointOfInterest> {
        let street_segment = ItemID::from_raw(buf.read_u32()?);
        let wasp_id = buf.read_u32()?;
        let offset_on_street = buf.read_u16()?;
        let poi_type = PoiType::from_u8(buf.read_u8()?);
        let side = StreetSide::from_u8(buf.read_u8()?);
        Ok(PointOfInterest {
            poi_type,
            street_segment,
            offset_on_street,
            side,
            wasp_id,
        })
    }
}
