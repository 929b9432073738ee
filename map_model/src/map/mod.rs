//! `GenericMap` owns every arena and table of one map, and hands out items by ID.

mod centroids;
mod io;
mod query;
mod removal;

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use abstutil::prettyprint_usize;
use geom::{Bounds, Coord, GfxData};

use crate::allocator::{Arena, Handle};
use crate::aux_tables::AuxiliaryTables;
use crate::header::MapHeader;
use crate::names::ItemNames;
use crate::national::NationalProperties;
use crate::objects::{Item, ItemKind, ItemName, ItemType, LanguageCode, NameType};
use crate::routing::{BoundarySegments, Connection, LandmarkTable, Node, NodeExpansionTable};
use crate::spatial::MapHashTable;
use crate::{GroupRef, ItemID, NodeID, MAX_SLOTS_PER_ZOOM, NUMBER_GFX_ZOOMLEVELS};

/// Where a map is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapState {
    /// Constructed, nothing allocated
    Empty,
    AllocatorsReady,
    /// Read from disk, spatial index built
    Loaded,
}

/// Which arena an item lives in, and where.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ItemRef {
    pub item_type: ItemType,
    pub handle: Handle<Item>,
}

pub struct GenericMap {
    pub(crate) header: MapHeader,
    pub(crate) state: MapState,
    pub(crate) national: NationalProperties,

    /// Indexed by item type tag
    pub(crate) item_arenas: Vec<Arena<Item>>,
    pub(crate) nodes: Arena<Node>,
    pub(crate) connections: Arena<Connection>,
    pub(crate) gfx: Arena<GfxData>,
    pub(crate) zoom_levels: Vec<Vec<ItemRef>>,

    /// Extent of the whole map
    pub(crate) map_gfx: Option<GfxData>,
    pub(crate) names: ItemNames,
    pub(crate) hash: MapHashTable,
    pub(crate) boundary: BoundarySegments,
    pub(crate) landmarks: LandmarkTable,
    pub(crate) expansion: NodeExpansionTable,
    pub(crate) aux: AuxiliaryTables,
}

impl GenericMap {
    /// A map with nothing allocated yet.
    pub fn empty(header: MapHeader) -> GenericMap {
        GenericMap {
            header,
            state: MapState::Empty,
            national: NationalProperties::default(),
            item_arenas: Vec::new(),
            nodes: Arena::new("nodes"),
            connections: Arena::new("connections"),
            gfx: Arena::new("gfx data"),
            zoom_levels: vec![Vec::new(); NUMBER_GFX_ZOOMLEVELS],
            map_gfx: None,
            names: ItemNames::new(),
            hash: MapHashTable::empty(),
            boundary: BoundarySegments::new(),
            landmarks: LandmarkTable::new(),
            expansion: NodeExpansionTable::new(),
            aux: AuxiliaryTables::new(),
        }
    }

    /// A map ready for items to be added.
    pub fn new(header: MapHeader) -> GenericMap {
        let mut map = GenericMap::empty(header);
        map.create_allocators();
        map
    }

    /// One arena per item kind.
    pub fn create_allocators(&mut self) {
        if self.state != MapState::Empty {
            return;
        }
        self.item_arenas = ItemType::all()
            .map(|t| Arena::new(arena_name(t)))
            .collect();
        self.state = MapState::AllocatorsReady;
    }

    pub fn state(&self) -> MapState {
        self.state
    }

    pub fn header(&self) -> &MapHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut MapHeader {
        &mut self.header
    }

    pub fn map_id(&self) -> u32 {
        self.header.map_id
    }

    pub fn national_properties(&self) -> &NationalProperties {
        &self.national
    }

    pub fn set_national_properties(&mut self, national: NationalProperties) {
        self.national = national;
    }

    pub fn names(&self) -> &ItemNames {
        &self.names
    }

    pub fn aux_tables(&self) -> &AuxiliaryTables {
        &self.aux
    }

    pub fn aux_tables_mut(&mut self) -> &mut AuxiliaryTables {
        &mut self.aux
    }

    pub fn boundary_segments(&self) -> &BoundarySegments {
        &self.boundary
    }

    pub fn boundary_segments_mut(&mut self) -> &mut BoundarySegments {
        &mut self.boundary
    }

    pub fn landmarks(&self) -> &LandmarkTable {
        &self.landmarks
    }

    pub fn landmarks_mut(&mut self) -> &mut LandmarkTable {
        &mut self.landmarks
    }

    pub fn node_expansion(&self) -> &NodeExpansionTable {
        &self.expansion
    }

    pub fn node_expansion_mut(&mut self) -> &mut NodeExpansionTable {
        &mut self.expansion
    }

    pub fn hash_table(&self) -> &MapHashTable {
        &self.hash
    }

    pub fn map_gfx(&self) -> Option<&GfxData> {
        self.map_gfx.as_ref()
    }

    /// Sets the extent of the map. The spatial index needs this before it can be built.
    pub fn set_map_gfx(&mut self, gfx: GfxData) {
        self.map_gfx = Some(gfx);
    }

    pub(crate) fn item_ref(&self, id: ItemID) -> Option<ItemRef> {
        self.zoom_levels
            .get(id.zoom())?
            .get(id.slot() as usize)
            .copied()
    }

    /// A removed item comes back as its tombstone.
    pub fn item(&self, id: ItemID) -> Option<&Item> {
        let r = self.item_ref(id)?;
        self.item_arenas[r.item_type.tag() as usize].get(r.handle)
    }

    pub fn item_mut(&mut self, id: ItemID) -> Option<&mut Item> {
        let r = self.item_ref(id)?;
        self.item_arenas[r.item_type.tag() as usize].get_mut(r.handle)
    }

    /// Like `item`, but tombstones count as missing.
    pub fn live_item(&self, id: ItemID) -> Option<&Item> {
        self.item(id).filter(|i| !i.is_null())
    }

    pub fn item_type(&self, id: ItemID) -> Option<ItemType> {
        self.item_ref(id).map(|r| r.item_type)
    }

    pub fn nbr_items_on_zoom(&self, zoom: usize) -> usize {
        self.zoom_levels.get(zoom).map(|z| z.len()).unwrap_or(0)
    }

    /// Counting tombstones
    pub fn nbr_items(&self) -> usize {
        self.zoom_levels.iter().map(|z| z.len()).sum()
    }

    pub fn nbr_items_of_type(&self, item_type: ItemType) -> usize {
        self.item_arenas
            .get(item_type.tag() as usize)
            .map(|a| a.len())
            .unwrap_or(0)
    }

    /// Every item in ID order, tombstones included.
    pub fn all_items(&self) -> impl Iterator<Item = &Item> {
        self.zoom_levels.iter().flatten().filter_map(move |r| {
            self.item_arenas[r.item_type.tag() as usize].get(r.handle)
        })
    }

    /// All items of one kind, in no particular order.
    pub fn items_of_type(&self, item_type: ItemType) -> impl Iterator<Item = &Item> {
        self.item_arenas
            .get(item_type.tag() as usize)
            .into_iter()
            .flat_map(|a| a.iter().map(|(_, item)| item))
    }

    pub(crate) fn all_ids(&self) -> Vec<ItemID> {
        let mut ids = Vec::with_capacity(self.nbr_items());
        for (zoom, level) in self.zoom_levels.iter().enumerate() {
            for slot in 0..level.len() {
                ids.push(ItemID::new(zoom, slot as u32));
            }
        }
        ids
    }

    pub fn gfx_of(&self, id: ItemID) -> Option<&GfxData> {
        self.item_gfx(self.item(id)?)
    }

    pub fn item_gfx(&self, item: &Item) -> Option<&GfxData> {
        self.gfx.get(item.gfx?)
    }

    /// Replaces an item's geometry. Routeable geometry must be a single polyline.
    pub fn set_gfx(&mut self, id: ItemID, gfx: GfxData) -> Result<()> {
        let routeable = match self.live_item(id) {
            Some(item) => item.item_type().is_routeable(),
            None => bail!("Can't set geometry of missing {}", id),
        };
        if routeable && gfx.nbr_polygons() > 1 {
            bail!(
                "{} is routeable, but got {} polygons",
                id,
                gfx.nbr_polygons()
            );
        }
        let handle = self.gfx.alloc(gfx);
        let old = self.item_mut(id).and_then(|item| item.gfx.replace(handle));
        if let Some(old) = old {
            self.gfx.hand_over(old);
        }
        Ok(())
    }

    /// The length of an item's first polyline.
    pub fn item_length(&self, id: ItemID) -> Option<geom::Distance> {
        self.gfx_of(id).map(|g| g.length(0))
    }

    /// Bounding box of an item's own geometry.
    pub fn item_bounds(&self, id: ItemID) -> Option<Bounds> {
        let b = self.gfx_of(id)?.bounds();
        if b.is_empty() {
            None
        } else {
            Some(b)
        }
    }

    pub fn node(&self, node_id: NodeID) -> Option<&Node> {
        let nodes = self.live_item(node_id.item())?.nodes?;
        self.nodes.get(nodes[node_id.index()])
    }

    pub fn node_mut(&mut self, node_id: NodeID) -> Option<&mut Node> {
        let nodes = self.live_item(node_id.item())?.nodes?;
        self.nodes.get_mut(nodes[node_id.index()])
    }

    pub fn connection(&self, handle: Handle<Connection>) -> Option<&Connection> {
        self.connections.get(handle)
    }

    /// All connections leading into a node.
    pub fn connections_to(&self, node_id: NodeID) -> impl Iterator<Item = &Connection> {
        self.node(node_id)
            .into_iter()
            .flat_map(|n| n.connections.iter())
            .filter_map(move |h| self.connections.get(*h))
    }

    pub fn find_connection(&self, from: NodeID, to: NodeID) -> Option<&Connection> {
        self.connections_to(to).find(|c| c.from == from)
    }

    /// Adds an edge into `to`. Refuses duplicates and nodes that don't exist.
    pub fn add_connection(&mut self, to: NodeID, conn: Connection) -> bool {
        if self.node(to).is_none() || self.find_connection(conn.from, to).is_some() {
            return false;
        }
        let handle = self.connections.alloc(conn);
        match self.node_mut(to) {
            Some(node) => {
                node.connections.push(handle);
                true
            }
            None => {
                self.connections.hand_over(handle);
                false
            }
        }
    }

    /// Removes every connection into either node of `item` whose source is `from`.
    pub fn delete_connections_from(&mut self, item: ItemID, from: NodeID) -> bool {
        let nodes = match self.live_item(item).and_then(|i| i.nodes) {
            Some(nodes) => nodes,
            None => return false,
        };
        let mut removed = Vec::new();
        for h in nodes {
            if let Some(node) = self.nodes.get_mut(h) {
                let connections = &self.connections;
                node.connections.retain(|c| {
                    let matches = connections.get(*c).map(|c| c.from == from).unwrap_or(true);
                    if matches {
                        removed.push(*c);
                    }
                    !matches
                });
            }
        }
        for h in &removed {
            self.connections.hand_over(*h);
        }
        !removed.is_empty()
    }

    /// Assigns the next free slot at the zoom level, which defaults per kind.
    pub fn add_item(&mut self, kind: ItemKind, zoom: Option<usize>) -> Result<ItemID> {
        self.create_allocators();
        let item_type = kind.item_type();
        let zoom = zoom.unwrap_or_else(|| item_type.default_zoom());
        if zoom >= NUMBER_GFX_ZOOMLEVELS {
            bail!("No zoom level {}", zoom);
        }
        let slot = self.zoom_levels[zoom].len() as u32;
        if slot >= MAX_SLOTS_PER_ZOOM {
            bail!("Zoom level {} is full", zoom);
        }
        let id = ItemID::new(zoom, slot);
        let mut item = Item::new(id, kind);
        if item_type.is_routeable() {
            let n0 = self.nodes.alloc(Node::new(id.node0()));
            let n1 = self.nodes.alloc(Node::new(id.node1()));
            item.nodes = Some([n0, n1]);
        }
        let handle = self.item_arenas[item_type.tag() as usize].alloc(item);
        self.zoom_levels[zoom].push(ItemRef { item_type, handle });
        Ok(id)
    }

    /// Attaches a name, adding the string to the table if needed.
    pub fn add_name(
        &mut self,
        id: ItemID,
        name: &str,
        language: LanguageCode,
        name_type: NameType,
    ) -> bool {
        if self.live_item(id).is_none() {
            return false;
        }
        let string_index = self.names.add(name);
        match self.item_mut(id) {
            Some(item) => item.add_name(ItemName {
                language,
                name_type,
                string_index,
            }),
            None => false,
        }
    }

    pub fn name(&self, name: &ItemName) -> Option<&str> {
        self.names.get(name.string_index)
    }

    /// The first official name, or any name at all.
    pub fn best_name(&self, id: ItemID) -> Option<&str> {
        let item = self.item(id)?;
        let name = item.official_names().next().or_else(|| item.names().first())?;
        self.name(name)
    }

    pub fn item_names(&self, id: ItemID) -> Vec<&str> {
        match self.item(id) {
            Some(item) => item.names().iter().filter_map(|n| self.name(n)).collect(),
            None => Vec::new(),
        }
    }

    /// Makes `item` a member of `group`. Streets and categories also list the member.
    pub fn add_region(&mut self, item: ItemID, group: ItemID, location_excluded: bool) -> bool {
        if item == group || self.live_item(item).is_none() || self.live_item(group).is_none() {
            return false;
        }
        let added = match self.item_mut(item) {
            Some(i) => i.add_group(GroupRef::new(group, location_excluded)),
            None => false,
        };
        if added {
            if let Some(members) = self.item_mut(group).and_then(|g| g.kind.members_mut()) {
                if !members.contains(&item) {
                    members.push(item);
                }
            }
        }
        added
    }

    pub fn remove_region(&mut self, item: ItemID, group: ItemID) -> bool {
        let removed = match self.item_mut(item) {
            Some(i) => i.remove_group(group),
            None => false,
        };
        if let Some(members) = self.item_mut(group).and_then(|g| g.kind.members_mut()) {
            members.retain(|m| *m != item);
        }
        removed
    }

    /// The items naming `group` in their group list.
    pub fn members_of(&self, group: ItemID) -> Vec<ItemID> {
        if let Some(members) = self.live_item(group).and_then(|g| g.kind.members()) {
            return members.clone();
        }
        self.all_items()
            .filter(|i| i.is_member_of(group))
            .map(|i| i.id())
            .collect()
    }

    /// Languages of the official names of municipals and built-up areas, most common first.
    pub fn recompute_native_languages(&mut self) -> Vec<LanguageCode> {
        let mut counts: BTreeMap<LanguageCode, usize> = BTreeMap::new();
        for t in [ItemType::Municipal, ItemType::BuiltUpArea] {
            for item in self.items_of_type(t) {
                for name in item.official_names() {
                    *counts.entry(name.language).or_insert(0) += 1;
                }
            }
        }
        let mut langs: Vec<(LanguageCode, usize)> = counts.into_iter().collect();
        langs.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        self.header.native_languages = langs.into_iter().map(|(l, _)| l).collect();
        self.header.native_languages.clone()
    }

    /// A representative point: the admin centroid if there is one, else the middle of the
    /// geometry.
    pub fn item_center(&self, id: ItemID) -> Option<Coord> {
        if let Some(pt) = self.aux.admin_centroids.get(id) {
            return Some(*pt);
        }
        let gfx = self.gfx_of(id)?;
        if gfx.nbr_polygons() == 1 && gfx.total_coordinates() == 1 {
            return gfx.first_coord();
        }
        gfx.center()
    }

    /// Approximate bytes owned by the map.
    pub fn memory_usage(&self) -> usize {
        let items: usize = self
            .item_arenas
            .iter()
            .map(|a| a.slot_memory() + a.iter().map(|(_, i)| i.memory_usage()).sum::<usize>())
            .sum();
        let nodes = self.nodes.slot_memory()
            + self
                .nodes
                .iter()
                .map(|(_, n)| n.memory_usage())
                .sum::<usize>();
        let gfx = self.gfx.slot_memory()
            + self
                .gfx
                .iter()
                .map(|(_, g)| g.memory_usage())
                .sum::<usize>();
        items
            + nodes
            + self.connections.slot_memory()
            + gfx
            + self.zoom_levels.iter().map(|z| z.capacity() * std::mem::size_of::<ItemRef>()).sum::<usize>()
            + self.names.memory_usage()
            + self.hash.memory_usage()
            + self.boundary.memory_usage()
            + self.landmarks.memory_usage()
            + self.expansion.memory_usage()
            + self.aux.memory_usage()
    }

    /// A line per populated zoom level and item kind.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Map {} ({:?}, version {}): {} items",
            self.header.map_id,
            self.header.level,
            self.header.version,
            prettyprint_usize(self.nbr_items())
        )];
        for (zoom, level) in self.zoom_levels.iter().enumerate() {
            if !level.is_empty() {
                lines.push(format!("  zoom {}: {}", zoom, prettyprint_usize(level.len())));
            }
        }
        for t in ItemType::all() {
            let n = self.nbr_items_of_type(t);
            if n > 0 {
                lines.push(format!("  {}: {}", t, prettyprint_usize(n)));
            }
        }
        lines.push(format!(
            "  {} nodes, {} connections, {} names",
            prettyprint_usize(self.nodes.len()),
            prettyprint_usize(self.connections.len()),
            prettyprint_usize(self.names.len())
        ));
        lines
    }
}

fn arena_name(t: ItemType) -> &'static str {
    match t {
        ItemType::StreetSegment => "street segments",
        ItemType::Municipal => "municipals",
        ItemType::Water => "water",
        ItemType::Park => "parks",
        ItemType::Forest => "forests",
        ItemType::Building => "buildings",
        ItemType::Railway => "railways",
        ItemType::Island => "islands",
        ItemType::Street => "streets",
        ItemType::Null => "null items",
        ItemType::ZipCode => "zip codes",
        ItemType::BuiltUpArea => "built-up areas",
        ItemType::CityPart => "city parts",
        ItemType::ZipArea => "zip areas",
        ItemType::PointOfInterest => "points of interest",
        ItemType::Category => "categories",
        ItemType::BusRoute => "bus routes",
        ItemType::Ferry => "ferries",
        ItemType::Airport => "airports",
        ItemType::AircraftRoad => "aircraft roads",
        ItemType::PedestrianArea => "pedestrian areas",
        ItemType::MilitaryBase => "military bases",
        ItemType::IndividualBuilding => "individual buildings",
        ItemType::SubwayLine => "subway lines",
        ItemType::Border => "borders",
        ItemType::Cartographic => "cartographic",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::MapLevel;
    use crate::objects::{StreetSegment, NBR_ITEM_TYPES};
    use crate::routing::TurnDirection;

    fn map() -> GenericMap {
        GenericMap::new(MapHeader::new(1, MapLevel::Underview))
    }

    #[test]
    fn states() {
        let mut m = GenericMap::empty(MapHeader::new(1, MapLevel::Underview));
        assert_eq!(m.state(), MapState::Empty);
        m.create_allocators();
        assert_eq!(m.state(), MapState::AllocatorsReady);
        assert_eq!(m.item_arenas.len(), NBR_ITEM_TYPES);
    }

    #[test]
    fn add_item_defaults_zoom() {
        let mut m = map();
        let a = m.add_item(ItemKind::Forest, None).unwrap();
        let b = m.add_item(ItemKind::Forest, None).unwrap();
        let ssi = m
            .add_item(ItemKind::StreetSegment(StreetSegment::new(2)), Some(9))
            .unwrap();
        assert_eq!(a, ItemID::new(ItemType::Forest.default_zoom(), 0));
        assert_eq!(b.slot(), 1);
        assert_eq!(ssi, ItemID::new(9, 0));
        assert!(m.node(ssi.node0()).is_some());
        assert!(m.node(ssi.node1()).is_some());
        assert!(m.node(a.node0()).is_none());
        assert!(m.add_item(ItemKind::Forest, Some(NUMBER_GFX_ZOOMLEVELS)).is_err());
    }

    #[test]
    fn connections() {
        let mut m = map();
        let a = m
            .add_item(ItemKind::StreetSegment(StreetSegment::new(2)), None)
            .unwrap();
        let b = m
            .add_item(ItemKind::StreetSegment(StreetSegment::new(2)), None)
            .unwrap();
        assert!(m.add_connection(b.node0(), Connection::new(a.node0(), TurnDirection::Ahead)));
        assert!(!m.add_connection(b.node0(), Connection::new(a.node0(), TurnDirection::Left)));
        assert!(m.add_connection(b.node1(), Connection::new(a.node0(), TurnDirection::UTurn)));
        assert!(m.find_connection(a.node0(), b.node0()).is_some());

        assert!(m.delete_connections_from(b, a.node0()));
        assert!(!m.delete_connections_from(b, a.node0()));
        assert_eq!(m.connections_to(b.node0()).count(), 0);
        assert_eq!(m.connections_to(b.node1()).count(), 0);
        assert_eq!(m.connections.len(), 0);
    }

    #[test]
    fn regions_and_names() {
        let mut m = map();
        let street = m
            .add_item(ItemKind::Street(Default::default()), None)
            .unwrap();
        let ssi = m
            .add_item(ItemKind::StreetSegment(StreetSegment::new(3)), None)
            .unwrap();
        assert!(m.add_region(ssi, street, false));
        assert!(!m.add_region(ssi, street, false));
        assert_eq!(m.members_of(street), vec![ssi]);
        assert!(m.add_name(street, "Storgatan", LanguageCode::SWEDISH, NameType::Official));
        assert_eq!(m.best_name(street), Some("Storgatan"));

        assert!(m.remove_region(ssi, street));
        assert!(m.members_of(street).is_empty());
        assert!(m.item(ssi).unwrap().groups().is_empty());
    }

    #[test]
    fn native_languages() {
        let mut m = map();
        for (name, lang) in [
            ("Lund", LanguageCode::SWEDISH),
            ("Malmö", LanguageCode::SWEDISH),
            ("Helsingør", LanguageCode::DANISH),
        ] {
            let id = m.add_item(ItemKind::Municipal, None).unwrap();
            m.add_name(id, name, lang, NameType::Official);
        }
        let park = m.add_item(ItemKind::Park { park_type: 0 }, None).unwrap();
        m.add_name(park, "Park", LanguageCode::ENGLISH, NameType::Official);
        assert_eq!(
            m.recompute_native_languages(),
            vec![LanguageCode::SWEDISH, LanguageCode::DANISH]
        );
    }
}
