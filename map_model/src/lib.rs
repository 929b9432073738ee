//! An in-memory store for one geographic map: items of many kinds partitioned into zoom
//! levels, the routing graph between street segments, a spatial index, and the binary format
//! maps are loaded from and saved to.

#[macro_use]
mod macros;

mod allocator;
pub mod aux_tables;
mod header;
mod ids;
mod map;
mod names;
mod national;
pub mod objects;
pub mod routing;
mod spatial;

pub use crate::allocator::{Arena, Handle};
pub use crate::aux_tables::{AuxTable, AuxiliaryTables, SignPost};
pub use crate::header::{
    DrivingSide, MapHeader, MapLevel, CURRENT_VERSION, LAST_LEGACY_VERSION,
    OLDEST_SUPPORTED_VERSION,
};
pub use crate::ids::{GroupRef, ItemID, MapRights, NodeID, MAX_SLOTS_PER_ZOOM, NUMBER_GFX_ZOOMLEVELS};
pub use crate::map::{GenericMap, MapState};
pub use crate::names::{names_match, ItemNames};
pub use crate::national::{NationalProperties, StandstillTimes};
pub use crate::objects::{
    BusRoute, Category, Item, ItemKind, ItemName, ItemType, LanguageCode, NameType,
    PointOfInterest, PoiType, Street, StreetSegment, StreetSide,
};
pub use crate::routing::{Connection, ConnectionCost, Node, TurnDirection};
pub use crate::spatial::MapHashTable;
