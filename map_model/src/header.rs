use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use abstutil::DataBuffer;

use crate::objects::LanguageCode;

pub const MAGIC: &[u8; 4] = b"GMAP";
/// The newest body layout this code writes.
pub const CURRENT_VERSION: u8 = 8;
/// Versions up to this one have no optional sections.
pub const LAST_LEGACY_VERSION: u8 = 5;
pub const OLDEST_SUPPORTED_VERSION: u8 = 1;

/// How much of the world a map covers. Larger extents get a finer spatial hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapLevel {
    Underview,
    Overview,
    SuperOverview,
}

impl MapLevel {
    pub fn hash_cells_per_side(self) -> usize {
        match self {
            MapLevel::Underview | MapLevel::Overview => 100,
            MapLevel::SuperOverview => 300,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            MapLevel::Underview => 0,
            MapLevel::Overview => 1,
            MapLevel::SuperOverview => 2,
        }
    }

    fn from_u8(x: u8) -> Result<MapLevel> {
        Ok(match x {
            0 => MapLevel::Underview,
            1 => MapLevel::Overview,
            2 => MapLevel::SuperOverview,
            _ => bail!("Unknown map level {}", x),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrivingSide {
    Right,
    Left,
}

/// The per-map settings stored in front of the body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapHeader {
    pub map_id: u32,
    pub level: MapLevel,
    pub version: u8,
    pub name: String,
    /// Seconds since the epoch
    pub creation_time: u32,
    pub country_code: u16,
    pub driving_side: DrivingSide,
    /// Most common first
    pub native_languages: Vec<LanguageCode>,
}

impl MapHeader {
    pub fn new(map_id: u32, level: MapLevel) -> MapHeader {
        MapHeader {
            map_id,
            level,
            version: CURRENT_VERSION,
            name: String::new(),
            creation_time: 0,
            country_code: 0,
            driving_side: DrivingSide::Right,
            native_languages: Vec::new(),
        }
    }

    pub(crate) fn save(&self, version: u8, buf: &mut DataBuffer) {
        buf.write_bytes(MAGIC);
        buf.write_u8(version);
        buf.write_u8(self.level.to_u8());
        buf.write_bool(self.driving_side == DrivingSide::Left);
        buf.write_u8(self.native_languages.len() as u8);
        buf.write_u32(self.map_id);
        buf.write_u32(self.creation_time);
        buf.write_u16(self.country_code);
        for lang in &self.native_languages {
            buf.write_u8(lang.0);
        }
        buf.write_string(&self.name);
        buf.align_to(4);
    }

    pub(crate) fn load(buf: &mut DataBuffer) -> Result<MapHeader> {
        if buf.read_bytes(4)? != MAGIC {
            bail!("Not a map file, the magic bytes are wrong");
        }
        let version = buf.read_u8()?;
        if version < OLDEST_SUPPORTED_VERSION {
            bail!(
                "Map format version {} is too old (only {} and later)",
                version,
                OLDEST_SUPPORTED_VERSION
            );
        }
        if version > CURRENT_VERSION {
            // Newer writers only append framed sections, which the body reader skips
            warn!(
                "Map format version {} is newer than {}, skipping what this code doesn't know",
                version,
                CURRENT_VERSION
            );
        }
        let level = MapLevel::from_u8(buf.read_u8()?)?;
        let driving_side = if buf.read_bool()? {
            DrivingSide::Left
        } else {
            DrivingSide::Right
        };
        let nbr_languages = buf.read_u8()?;
        let map_id = buf.read_u32()?;
        let creation_time = buf.read_u32()?;
        let country_code = buf.read_u16()?;
        let mut native_languages = Vec::new();
        for _ in 0..nbr_languages {
            native_languages.push(LanguageCode(buf.read_u8()?));
        }
        let name = buf.read_string()?;
        buf.align_to(4);
        Ok(MapHeader {
            map_id,
            level,
            version,
            name,
            creation_time,
            country_code,
            driving_side,
            native_languages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let mut header = MapHeader::new(0x1234, MapLevel::SuperOverview);
        header.name = "Skåne".to_string();
        header.country_code = 46;
        header.native_languages = vec![LanguageCode::SWEDISH, LanguageCode::ENGLISH];
        let mut buf = DataBuffer::new();
        header.save(CURRENT_VERSION, &mut buf);
        assert_eq!(buf.len() % 4, 0);
        let loaded = MapHeader::load(&mut DataBuffer::from_bytes(buf.into_bytes())).unwrap();
        assert_eq!(loaded, header);
        assert_eq!(loaded.level.hash_cells_per_side(), 300);
    }

    #[test]
    fn rejects_garbage() {
        assert!(MapHeader::load(&mut DataBuffer::from_bytes(b"NOPE....".to_vec())).is_err());
        let mut buf = DataBuffer::new();
        MapHeader::new(1, MapLevel::Underview).save(OLDEST_SUPPORTED_VERSION - 1, &mut buf);
        assert!(MapHeader::load(&mut DataBuffer::from_bytes(buf.into_bytes())).is_err());
    }

    #[test]
    fn newer_versions_are_kept() {
        let mut buf = DataBuffer::new();
        MapHeader::new(1, MapLevel::Underview).save(CURRENT_VERSION + 1, &mut buf);
        let loaded = MapHeader::load(&mut DataBuffer::from_bytes(buf.into_bytes())).unwrap();
        assert_eq!(loaded.version, CURRENT_VERSION + 1);
    }
}
