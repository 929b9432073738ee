//! The item model. `ItemType` is the one authoritative list of kinds; `ItemKind` carries the
//! kind-specific data, and every dispatch on it is an exhaustive match.

mod bus_route;
mod group;
mod poi;
mod street_segment;

use std::fmt;

use anyhow::{bail, Result};
use enumset::EnumSetType;
use serde::{Deserialize, Serialize};

use abstutil::DataBuffer;
use geom::GfxData;

pub use self::bus_route::BusRoute;
pub use self::group::{Category, Street};
pub use self::poi::{PointOfInterest, PoiType, StreetSide};
pub use self::street_segment::StreetSegment;
use crate::allocator::Handle;
use crate::routing::Node;
use crate::{GroupRef, ItemID};

/// Every kind of map item. The discriminant is the tag written to disk.
#[derive(Debug, Serialize, Deserialize, PartialOrd, Ord, Hash, EnumSetType)]
pub enum ItemType {
    StreetSegment,
    Municipal,
    Water,
    Park,
    Forest,
    Building,
    Railway,
    Island,
    Street,
    Null,
    ZipCode,
    BuiltUpArea,
    CityPart,
    ZipArea,
    PointOfInterest,
    Category,
    BusRoute,
    Ferry,
    Airport,
    AircraftRoad,
    PedestrianArea,
    MilitaryBase,
    IndividualBuilding,
    SubwayLine,
    Border,
    Cartographic,
}

pub const NBR_ITEM_TYPES: usize = 26;

impl ItemType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Unknown tags (written by newer code) are None; callers read those as tombstones.
    pub fn from_tag(tag: u8) -> Option<ItemType> {
        use ItemType::*;
        Some(match tag {
            0 => StreetSegment,
            1 => Municipal,
            2 => Water,
            3 => Park,
            4 => Forest,
            5 => Building,
            6 => Railway,
            7 => Island,
            8 => Street,
            9 => Null,
            10 => ZipCode,
            11 => BuiltUpArea,
            12 => CityPart,
            13 => ZipArea,
            14 => PointOfInterest,
            15 => Category,
            16 => BusRoute,
            17 => Ferry,
            18 => Airport,
            19 => AircraftRoad,
            20 => PedestrianArea,
            21 => MilitaryBase,
            22 => IndividualBuilding,
            23 => SubwayLine,
            24 => Border,
            25 => Cartographic,
            _ => return None,
        })
    }

    pub fn all() -> impl Iterator<Item = ItemType> {
        enumset::EnumSet::<ItemType>::all().iter()
    }

    /// Has two routing nodes
    pub fn is_routeable(self) -> bool {
        matches!(
            self,
            ItemType::StreetSegment | ItemType::Ferry | ItemType::BusRoute
        )
    }

    /// Other items name these in their group list, and the members aren't listed on the group.
    pub fn is_admin_area(self) -> bool {
        matches!(
            self,
            ItemType::Municipal | ItemType::BuiltUpArea | ItemType::ZipCode
        )
    }

    /// Groups that keep an explicit list of their members.
    pub fn has_member_list(self) -> bool {
        matches!(self, ItemType::Street | ItemType::Category)
    }

    /// Where new items land when the caller doesn't pick a zoom level.
    pub fn default_zoom(self) -> usize {
        use ItemType::*;
        match self {
            Municipal | ZipCode | ZipArea | Border => 0,
            BuiltUpArea | CityPart => 1,
            Water | Island | Forest | Park => 2,
            Railway | Airport | MilitaryBase | SubwayLine | Cartographic => 3,
            AircraftRoad | PedestrianArea => 4,
            Street | Category => 5,
            Ferry => 6,
            StreetSegment => 8,
            Building | IndividualBuilding => 12,
            BusRoute => 13,
            PointOfInterest => 14,
            Null => 15,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A language, as the numeric code stored in names.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LanguageCode(pub u8);

impl LanguageCode {
    pub const ENGLISH: LanguageCode = LanguageCode(0);
    pub const SWEDISH: LanguageCode = LanguageCode(1);
    pub const GERMAN: LanguageCode = LanguageCode(2);
    pub const DANISH: LanguageCode = LanguageCode(3);
    pub const FRENCH: LanguageCode = LanguageCode(5);
    pub const INVALID: LanguageCode = LanguageCode(0xFF);
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NameType {
    Official,
    Alternative,
    RoadNumber,
    Invalid,
    Abbreviation,
    Unique,
    Exit,
    Synonym,
}

impl NameType {
    fn from_u8(x: u8) -> NameType {
        match x {
            0 => NameType::Official,
            1 => NameType::Alternative,
            2 => NameType::RoadNumber,
            4 => NameType::Abbreviation,
            5 => NameType::Unique,
            6 => NameType::Exit,
            7 => NameType::Synonym,
            _ => NameType::Invalid,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            NameType::Official => 0,
            NameType::Alternative => 1,
            NameType::RoadNumber => 2,
            NameType::Invalid => 3,
            NameType::Abbreviation => 4,
            NameType::Unique => 5,
            NameType::Exit => 6,
            NameType::Synonym => 7,
        }
    }
}

/// One name of an item: an index into the map's string table, tagged with language and type.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct ItemName {
    pub language: LanguageCode,
    pub name_type: NameType,
    pub string_index: u32,
}

impl ItemName {
    fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(self.string_index);
        buf.write_u8(self.language.0);
        buf.write_u8(self.name_type.to_u8());
        buf.write_u16(0);
    }

    fn load(buf: &mut DataBuffer) -> Result<ItemName> {
        let string_index = buf.read_u32()?;
        let language = LanguageCode(buf.read_u8()?);
        let name_type = NameType::from_u8(buf.read_u8()?);
        buf.read_u16()?;
        Ok(ItemName {
            language,
            name_type,
            string_index,
        })
    }
}

/// The kind-specific part of an item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ItemKind {
    StreetSegment(StreetSegment),
    Municipal,
    Water { water_type: u8 },
    Park { park_type: u8 },
    Forest,
    Building { building_type: u32 },
    Railway,
    Island,
    Street(Street),
    Null,
    ZipCode,
    BuiltUpArea,
    CityPart,
    ZipArea,
    PointOfInterest(PointOfInterest),
    Category(Category),
    BusRoute(BusRoute),
    Ferry { ferry_type: u8 },
    Airport,
    AircraftRoad,
    PedestrianArea,
    MilitaryBase,
    IndividualBuilding { building_type: u32 },
    SubwayLine { color: u32 },
    Border,
    Cartographic { cartographic_type: u8 },
}

impl ItemKind {
    pub fn item_type(&self) -> ItemType {
        match self {
            ItemKind::StreetSegment(_) => ItemType::StreetSegment,
            ItemKind::Municipal => ItemType::Municipal,
            ItemKind::Water { .. } => ItemType::Water,
            ItemKind::Park { .. } => ItemType::Park,
            ItemKind::Forest => ItemType::Forest,
            ItemKind::Building { .. } => ItemType::Building,
            ItemKind::Railway => ItemType::Railway,
            ItemKind::Island => ItemType::Island,
            ItemKind::Street(_) => ItemType::Street,
            ItemKind::Null => ItemType::Null,
            ItemKind::ZipCode => ItemType::ZipCode,
            ItemKind::BuiltUpArea => ItemType::BuiltUpArea,
            ItemKind::CityPart => ItemType::CityPart,
            ItemKind::ZipArea => ItemType::ZipArea,
            ItemKind::PointOfInterest(_) => ItemType::PointOfInterest,
            ItemKind::Category(_) => ItemType::Category,
            ItemKind::BusRoute(_) => ItemType::BusRoute,
            ItemKind::Ferry { .. } => ItemType::Ferry,
            ItemKind::Airport => ItemType::Airport,
            ItemKind::AircraftRoad => ItemType::AircraftRoad,
            ItemKind::PedestrianArea => ItemType::PedestrianArea,
            ItemKind::MilitaryBase => ItemType::MilitaryBase,
            ItemKind::IndividualBuilding { .. } => ItemType::IndividualBuilding,
            ItemKind::SubwayLine { .. } => ItemType::SubwayLine,
            ItemKind::Border => ItemType::Border,
            ItemKind::Cartographic { .. } => ItemType::Cartographic,
        }
    }

    /// A zeroed payload of some kind, like a freshly allocated object.
    pub fn empty(item_type: ItemType) -> ItemKind {
        match item_type {
            ItemType::StreetSegment => ItemKind::StreetSegment(StreetSegment::default()),
            ItemType::Municipal => ItemKind::Municipal,
            ItemType::Water => ItemKind::Water { water_type: 0 },
            ItemType::Park => ItemKind::Park { park_type: 0 },
            ItemType::Forest => ItemKind::Forest,
            ItemType::Building => ItemKind::Building { building_type: 0 },
            ItemType::Railway => ItemKind::Railway,
            ItemType::Island => ItemKind::Island,
            ItemType::Street => ItemKind::Street(Street::default()),
            ItemType::Null => ItemKind::Null,
            ItemType::ZipCode => ItemKind::ZipCode,
            ItemType::BuiltUpArea => ItemKind::BuiltUpArea,
            ItemType::CityPart => ItemKind::CityPart,
            ItemType::ZipArea => ItemKind::ZipArea,
            ItemType::PointOfInterest => ItemKind::PointOfInterest(PointOfInterest::default()),
            ItemType::Category => ItemKind::Category(Category::default()),
            ItemType::BusRoute => ItemKind::BusRoute(BusRoute::default()),
            ItemType::Ferry => ItemKind::Ferry { ferry_type: 0 },
            ItemType::Airport => ItemKind::Airport,
            ItemType::AircraftRoad => ItemKind::AircraftRoad,
            ItemType::PedestrianArea => ItemKind::PedestrianArea,
            ItemType::MilitaryBase => ItemKind::MilitaryBase,
            ItemType::IndividualBuilding => ItemKind::IndividualBuilding { building_type: 0 },
            ItemType::SubwayLine => ItemKind::SubwayLine { color: 0 },
            ItemType::Border => ItemKind::Border,
            ItemType::Cartographic => ItemKind::Cartographic {
                cartographic_type: 0,
            },
        }
    }

    pub fn save(&self, buf: &mut DataBuffer) {
        match self {
            ItemKind::StreetSegment(ssi) => ssi.save(buf),
            ItemKind::Street(s) => s.save(buf),
            ItemKind::PointOfInterest(poi) => poi.save(buf),
            ItemKind::Category(c) => c.save(buf),
            ItemKind::BusRoute(b) => b.save(buf),
            ItemKind::Water { water_type: x }
            | ItemKind::Park { park_type: x }
            | ItemKind::Ferry { ferry_type: x }
            | ItemKind::Cartographic {
                cartographic_type: x,
            } => {
                buf.write_u8(*x);
                buf.align_to(4);
            }
            ItemKind::Building { building_type: x }
            | ItemKind::IndividualBuilding { building_type: x }
            | ItemKind::SubwayLine { color: x } => buf.write_u32(*x),
            ItemKind::Municipal
            | ItemKind::Forest
            | ItemKind::Railway
            | ItemKind::Island
            | ItemKind::Null
            | ItemKind::ZipCode
            | ItemKind::BuiltUpArea
            | ItemKind::CityPart
            | ItemKind::ZipArea
            | ItemKind::Airport
            | ItemKind::AircraftRoad
            | ItemKind::PedestrianArea
            | ItemKind::MilitaryBase
            | ItemKind::Border => {}
        }
    }

    pub fn load(item_type: ItemType, buf: &mut DataBuffer) -> Result<ItemKind> {
        let mut kind = ItemKind::empty(item_type);
        match kind {
            ItemKind::StreetSegment(ref mut ssi) => *ssi = StreetSegment::load(buf)?,
            ItemKind::Street(ref mut s) => *s = Street::load(buf)?,
            ItemKind::PointOfInterest(ref mut poi) => *poi = PointOfInterest::load(buf)?,
            ItemKind::Category(ref mut c) => *c = Category::load(buf)?,
            ItemKind::BusRoute(ref mut b) => *b = BusRoute::load(buf)?,
            ItemKind::Water { water_type: ref mut x }
            | ItemKind::Park { park_type: ref mut x }
            | ItemKind::Ferry { ferry_type: ref mut x }
            | ItemKind::Cartographic {
                cartographic_type: ref mut x,
            } => {
                *x = buf.read_u8()?;
                buf.align_to(4);
            }
            ItemKind::Building {
                building_type: ref mut x,
            }
            | ItemKind::IndividualBuilding {
                building_type: ref mut x,
            }
            | ItemKind::SubwayLine { color: ref mut x } => *x = buf.read_u32()?,
            ItemKind::Municipal
            | ItemKind::Forest
            | ItemKind::Railway
            | ItemKind::Island
            | ItemKind::Null
            | ItemKind::ZipCode
            | ItemKind::BuiltUpArea
            | ItemKind::CityPart
            | ItemKind::ZipArea
            | ItemKind::Airport
            | ItemKind::AircraftRoad
            | ItemKind::PedestrianArea
            | ItemKind::MilitaryBase
            | ItemKind::Border => {}
        }
        Ok(kind)
    }

    /// Heap bytes owned by the payload.
    pub fn memory_usage(&self) -> usize {
        match self {
            ItemKind::Street(s) => s.memory_usage(),
            ItemKind::Category(c) => c.memory_usage(),
            ItemKind::StreetSegment(_)
            | ItemKind::PointOfInterest(_)
            | ItemKind::BusRoute(_)
            | ItemKind::Municipal
            | ItemKind::Water { .. }
            | ItemKind::Park { .. }
            | ItemKind::Forest
            | ItemKind::Building { .. }
            | ItemKind::Railway
            | ItemKind::Island
            | ItemKind::Null
            | ItemKind::ZipCode
            | ItemKind::BuiltUpArea
            | ItemKind::CityPart
            | ItemKind::ZipArea
            | ItemKind::Ferry { .. }
            | ItemKind::Airport
            | ItemKind::AircraftRoad
            | ItemKind::PedestrianArea
            | ItemKind::MilitaryBase
            | ItemKind::IndividualBuilding { .. }
            | ItemKind::SubwayLine { .. }
            | ItemKind::Border
            | ItemKind::Cartographic { .. } => 0,
        }
    }

    /// The member list of groups that keep one.
    pub fn members(&self) -> Option<&Vec<ItemID>> {
        match self {
            ItemKind::Street(s) => Some(&s.members),
            ItemKind::Category(c) => Some(&c.members),
            _ => None,
        }
    }

    pub fn members_mut(&mut self) -> Option<&mut Vec<ItemID>> {
        match self {
            ItemKind::Street(s) => Some(&mut s.members),
            ItemKind::Category(c) => Some(&mut c.members),
            _ => None,
        }
    }

    /// Road class for cost calculations; non-roads are treated as the most minor class.
    pub fn road_class(&self) -> u8 {
        match self {
            ItemKind::StreetSegment(ssi) => ssi.road_class,
            _ => StreetSegment::MINOR_ROAD_CLASS,
        }
    }
}

/// One map feature. Items live in per-kind arenas owned by the map; their geometry and routing
/// nodes live in their own arenas and are referenced by handle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub(crate) id: ItemID,
    pub(crate) names: Vec<ItemName>,
    pub(crate) groups: Vec<GroupRef>,
    #[serde(skip)]
    pub(crate) gfx: Option<Handle<GfxData>>,
    #[serde(skip)]
    pub(crate) nodes: Option<[Handle<Node>; 2]>,
    pub(crate) kind: ItemKind,
}

impl Item {
    pub(crate) fn new(id: ItemID, kind: ItemKind) -> Item {
        Item {
            id,
            names: Vec::new(),
            groups: Vec::new(),
            gfx: None,
            nodes: None,
            kind,
        }
    }

    /// The placeholder left in a removed item's slot.
    pub(crate) fn tombstone(id: ItemID) -> Item {
        Item::new(id, ItemKind::Null)
    }

    pub fn id(&self) -> ItemID {
        self.id
    }

    pub fn item_type(&self) -> ItemType {
        self.kind.item_type()
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ItemKind {
        &mut self.kind
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ItemKind::Null)
    }

    pub fn names(&self) -> &[ItemName] {
        &self.names
    }

    pub fn groups(&self) -> &[GroupRef] {
        &self.groups
    }

    pub fn has_gfx(&self) -> bool {
        self.gfx.is_some()
    }

    pub fn is_member_of(&self, group: ItemID) -> bool {
        self.groups.iter().any(|g| g.id() == group)
    }

    /// Returns false if already a member.
    pub(crate) fn add_group(&mut self, group: GroupRef) -> bool {
        if self.is_member_of(group.id()) {
            return false;
        }
        self.groups.push(group);
        true
    }

    /// Returns true if something was removed.
    pub(crate) fn remove_group(&mut self, group: ItemID) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g.id() != group);
        before != self.groups.len()
    }

    pub(crate) fn add_name(&mut self, name: ItemName) -> bool {
        if self.names.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    pub fn official_names(&self) -> impl Iterator<Item = &ItemName> {
        self.names
            .iter()
            .filter(|n| n.name_type == NameType::Official)
    }

    /// Inline and owned bytes, not counting geometry and nodes.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Item>()
            + self.names.capacity() * std::mem::size_of::<ItemName>()
            + self.groups.capacity() * std::mem::size_of::<GroupRef>()
            + self.kind.memory_usage()
    }

    /// The fields shared by every kind. Geometry and nodes are written by the map.
    pub(crate) fn save_common(&self, buf: &mut DataBuffer) -> Result<()> {
        let nbr_names = match u16::try_from(self.names.len()) {
            Ok(n) => n,
            Err(_) => bail!("{} has {} names, more than can be saved", self.id, self.names.len()),
        };
        let nbr_groups = match u16::try_from(self.groups.len()) {
            Ok(n) => n,
            Err(_) => bail!("{} is in {} groups, more than can be saved", self.id, self.groups.len()),
        };
        buf.write_u32(self.id.0);
        buf.write_u16(nbr_names);
        buf.write_u16(nbr_groups);
        for name in &self.names {
            name.save(buf);
        }
        for group in &self.groups {
            buf.write_u32(group.raw());
        }
        Ok(())
    }

    pub(crate) fn load_common(item_type: ItemType, buf: &mut DataBuffer) -> Result<Item> {
        let id = ItemID(buf.read_u32()?);
        let nbr_names = buf.read_u16()?;
        let nbr_groups = buf.read_u16()?;
        let mut item = Item::new(id, ItemKind::empty(item_type));
        for _ in 0..nbr_names {
            item.names.push(ItemName::load(buf)?);
        }
        for _ in 0..nbr_groups {
            item.groups.push(GroupRef::from_raw(buf.read_u32()?));
        }
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        let mut count = 0;
        for t in ItemType::all() {
            assert_eq!(ItemType::from_tag(t.tag()), Some(t));
            assert_eq!(ItemKind::empty(t).item_type(), t);
            count += 1;
        }
        assert_eq!(count, NBR_ITEM_TYPES);
        assert_eq!(ItemType::from_tag(NBR_ITEM_TYPES as u8), None);
    }

    #[test]
    fn payloads_round_trip() {
        let kinds = vec![
            ItemKind::Water { water_type: 3 },
            ItemKind::Building { building_type: 77 },
            ItemKind::Street(Street {
                members: vec![ItemID::new(8, 1), ItemID::new(8, 2)],
            }),
            ItemKind::PointOfInterest(PointOfInterest {
                poi_type: PoiType::CityCentre,
                street_segment: Some(ItemID::new(8, 1)),
                offset_on_street: 1200,
                side: StreetSide::Left,
                wasp_id: 99,
            }),
            ItemKind::Forest,
        ];
        for kind in kinds {
            let mut buf = DataBuffer::new();
            kind.save(&mut buf);
            assert_eq!(buf.len() % 4, 0);
            let mut read = DataBuffer::from_bytes(buf.into_bytes());
            assert_eq!(ItemKind::load(kind.item_type(), &mut read).unwrap(), kind);
        }
    }

    #[test]
    fn groups_are_unique() {
        let mut item = Item::new(ItemID::new(8, 0), ItemKind::Forest);
        let g = GroupRef::new(ItemID::new(0, 1), false);
        assert!(item.add_group(g));
        assert!(!item.add_group(GroupRef::new(ItemID::new(0, 1), true)));
        assert!(item.is_member_of(ItemID::new(0, 1)));
        assert!(item.remove_group(ItemID::new(0, 1)));
        assert!(!item.remove_group(ItemID::new(0, 1)));
    }

    #[test]
    fn counts_past_u16_dont_save() {
        let name = ItemName {
            language: LanguageCode::ENGLISH,
            name_type: NameType::Official,
            string_index: 0,
        };
        let mut item = Item::new(ItemID::new(8, 0), ItemKind::Forest);
        item.names = vec![name; u16::MAX as usize];
        assert!(item.save_common(&mut DataBuffer::new()).is_ok());
        item.names.push(name);
        assert!(item.save_common(&mut DataBuffer::new()).is_err());

        let mut item = Item::new(ItemID::new(8, 1), ItemKind::Forest);
        item.groups = vec![GroupRef::new(ItemID::new(0, 1), false); u16::MAX as usize + 1];
        assert!(item.save_common(&mut DataBuffer::new()).is_err());
    }
}
