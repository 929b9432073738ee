//! The ID-keyed side tables of a map. They all sit behind one trait and one ordered list, so
//! removal, swapping, loading and saving can't disagree about which tables exist.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use abstutil::DataBuffer;
use geom::Coord;

use crate::{ItemID, MapRights, NodeID};

/// The uniform contract every side table follows.
pub trait AuxTable {
    fn name(&self) -> &'static str;
    /// The first format version that stores this table
    fn since_version(&self) -> u8;
    /// Drops everything keyed by the item or its nodes. Returns true if anything went.
    fn remove_item(&mut self, id: ItemID) -> bool;
    /// Exchanges whatever is keyed by `a` with whatever is keyed by `b`.
    fn swap_items(&mut self, a: ItemID, b: ItemID);
    fn save(&self, buf: &mut DataBuffer);
    fn load(&mut self, buf: &mut DataBuffer) -> Result<()>;
    fn len(&self) -> usize;
    fn clear(&mut self);
    fn memory_usage(&self) -> usize;
}

pub trait TableKey: Ord + Copy {
    fn touches(self, id: ItemID) -> bool;
    fn swapped(self, a: ItemID, b: ItemID) -> Self;
    fn save(self, buf: &mut DataBuffer);
    fn load(buf: &mut DataBuffer) -> Result<Self>;
}

fn swap_id(x: ItemID, a: ItemID, b: ItemID) -> ItemID {
    if x == a {
        b
    } else if x == b {
        a
    } else {
        x
    }
}

impl TableKey for ItemID {
    fn touches(self, id: ItemID) -> bool {
        self == id
    }

    fn swapped(self, a: ItemID, b: ItemID) -> ItemID {
        swap_id(self, a, b)
    }

    fn save(self, buf: &mut DataBuffer) {
        buf.write_u32(self.0);
    }

    fn load(buf: &mut DataBuffer) -> Result<ItemID> {
        Ok(ItemID(buf.read_u32()?))
    }
}

impl TableKey for NodeID {
    fn touches(self, id: ItemID) -> bool {
        self.item() == id
    }

    fn swapped(self, a: ItemID, b: ItemID) -> NodeID {
        swap_id(self.item(), a, b).node(self.is_node1())
    }

    fn save(self, buf: &mut DataBuffer) {
        buf.write_u32(self.0);
    }

    fn load(buf: &mut DataBuffer) -> Result<NodeID> {
        Ok(NodeID(buf.read_u32()?))
    }
}

impl TableKey for (NodeID, NodeID) {
    fn touches(self, id: ItemID) -> bool {
        self.0.touches(id) || self.1.touches(id)
    }

    fn swapped(self, a: ItemID, b: ItemID) -> (NodeID, NodeID) {
        (self.0.swapped(a, b), self.1.swapped(a, b))
    }

    fn save(self, buf: &mut DataBuffer) {
        self.0.save(buf);
        self.1.save(buf);
    }

    fn load(buf: &mut DataBuffer) -> Result<(NodeID, NodeID)> {
        Ok((NodeID::load(buf)?, NodeID::load(buf)?))
    }
}

pub trait TableValue: Clone {
    fn save(&self, buf: &mut DataBuffer);
    fn load(buf: &mut DataBuffer) -> Result<Self>;
    fn heap_size(&self) -> usize {
        0
    }
}

impl TableValue for () {
    fn save(&self, _: &mut DataBuffer) {}

    fn load(_: &mut DataBuffer) -> Result<()> {
        Ok(())
    }
}

impl TableValue for u32 {
    fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(*self);
    }

    fn load(buf: &mut DataBuffer) -> Result<u32> {
        buf.read_u32()
    }
}

impl TableValue for u8 {
    fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(u32::from(*self));
    }

    fn load(buf: &mut DataBuffer) -> Result<u8> {
        Ok(buf.read_u32()? as u8)
    }
}

impl TableValue for MapRights {
    fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(self.0);
    }

    fn load(buf: &mut DataBuffer) -> Result<MapRights> {
        Ok(MapRights(buf.read_u32()?))
    }
}

impl TableValue for Coord {
    fn save(&self, buf: &mut DataBuffer) {
        buf.write_i32(self.lat);
        buf.write_i32(self.lon);
    }

    fn load(buf: &mut DataBuffer) -> Result<Coord> {
        let lat = buf.read_i32()?;
        let lon = buf.read_i32()?;
        Ok(Coord::new(lat, lon))
    }
}

impl TableValue for Vec<u32> {
    fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(self.len() as u32);
        for x in self {
            buf.write_u32(*x);
        }
    }

    fn load(buf: &mut DataBuffer) -> Result<Vec<u32>> {
        let mut list = Vec::new();
        for _ in 0..buf.read_u32()? {
            list.push(buf.read_u32()?);
        }
        Ok(list)
    }

    fn heap_size(&self) -> usize {
        self.capacity() * 4
    }
}

impl TableValue for BTreeSet<u16> {
    fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(self.len() as u32);
        for x in self {
            buf.write_u16(*x);
        }
        buf.align_to(4);
    }

    fn load(buf: &mut DataBuffer) -> Result<BTreeSet<u16>> {
        let mut set = BTreeSet::new();
        for _ in 0..buf.read_u32()? {
            set.insert(buf.read_u16()?);
        }
        buf.align_to(4);
        Ok(set)
    }

    fn heap_size(&self) -> usize {
        self.len() * 8
    }
}

/// A sign at a junction, shown when driving from one node to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignPost {
    /// Index into the map's string table
    pub text: u32,
    pub sign_type: u8,
    pub text_color: u8,
    pub background_color: u8,
    /// Meters before the junction
    pub distance: u16,
}

impl TableValue for Vec<SignPost> {
    fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(self.len() as u32);
        for s in self {
            buf.write_u32(s.text);
            buf.write_u8(s.sign_type);
            buf.write_u8(s.text_color);
            buf.write_u8(s.background_color);
            buf.write_u8(0);
            buf.write_u16(s.distance);
            buf.write_u16(0);
        }
    }

    fn load(buf: &mut DataBuffer) -> Result<Vec<SignPost>> {
        let mut list = Vec::new();
        for _ in 0..buf.read_u32()? {
            let text = buf.read_u32()?;
            let sign_type = buf.read_u8()?;
            let text_color = buf.read_u8()?;
            let background_color = buf.read_u8()?;
            buf.read_u8()?;
            let distance = buf.read_u16()?;
            buf.read_u16()?;
            list.push(SignPost {
                text,
                sign_type,
                text_color,
                background_color,
                distance,
            });
        }
        Ok(list)
    }

    fn heap_size(&self) -> usize {
        self.capacity() * std::mem::size_of::<SignPost>()
    }
}

/// One side table: sorted entries by key.
#[derive(Clone, Debug)]
pub struct KeyedTable<K, V> {
    name: &'static str,
    since_version: u8,
    entries: BTreeMap<K, V>,
}

impl<K: TableKey, V: TableValue> KeyedTable<K, V> {
    fn new(name: &'static str, since_version: u8) -> KeyedTable<K, V> {
        KeyedTable {
            name,
            since_version,
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: K) -> Option<&V> {
        self.entries.get(&key)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.entries.get_mut(&key)
    }

    pub fn contains(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn remove(&mut self, key: K) -> Option<V> {
        self.entries.remove(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: TableKey, V: TableValue> AuxTable for KeyedTable<K, V> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn since_version(&self) -> u8 {
        self.since_version
    }

    fn remove_item(&mut self, id: ItemID) -> bool {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.touches(id));
        before != self.entries.len()
    }

    fn swap_items(&mut self, a: ItemID, b: ItemID) {
        let moved: Vec<K> = self
            .entries
            .keys()
            .filter(|k| k.touches(a) || k.touches(b))
            .copied()
            .collect();
        let mut taken = Vec::new();
        for k in moved {
            if let Some(v) = self.entries.remove(&k) {
                taken.push((k.swapped(a, b), v));
            }
        }
        self.entries.extend(taken);
    }

    fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(self.entries.len() as u32);
        for (k, v) in &self.entries {
            k.save(buf);
            v.save(buf);
        }
    }

    fn load(&mut self, buf: &mut DataBuffer) -> Result<()> {
        self.entries.clear();
        for _ in 0..buf.read_u32()? {
            let k = K::load(buf)?;
            let v = V::load(buf)?;
            self.entries.insert(k, v);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn memory_usage(&self) -> usize {
        self.entries
            .values()
            .map(|v| std::mem::size_of::<(K, V)>() + v.heap_size())
            .sum()
    }
}

/// Every ID-keyed side table of a map, in on-disk order.
#[derive(Clone, Debug)]
pub struct AuxiliaryTables {
    pub user_rights: KeyedTable<ItemID, MapRights>,
    /// Representative points of admin areas, used instead of their geometric centre
    pub admin_centroids: KeyedTable<ItemID, Coord>,
    pub official_codes: KeyedTable<ItemID, u32>,
    pub item_categories: KeyedTable<ItemID, BTreeSet<u16>>,
    pub node_lanes: KeyedTable<NodeID, Vec<u32>>,
    pub connecting_lanes: KeyedTable<(NodeID, NodeID), u32>,
    pub sign_posts: KeyedTable<(NodeID, NodeID), Vec<SignPost>>,
    pub index_area_order: KeyedTable<ItemID, u32>,
    pub non_searchable: KeyedTable<ItemID, ()>,
    pub road_display_class: KeyedTable<ItemID, u8>,
    pub area_display_class: KeyedTable<ItemID, u8>,
}

impl Default for AuxiliaryTables {
    fn default() -> AuxiliaryTables {
        AuxiliaryTables::new()
    }
}

impl AuxiliaryTables {
    pub fn new() -> AuxiliaryTables {
        AuxiliaryTables {
            user_rights: KeyedTable::new("user rights", 1),
            admin_centroids: KeyedTable::new("admin area centroids", 1),
            official_codes: KeyedTable::new("official codes", 6),
            item_categories: KeyedTable::new("item categories", 6),
            node_lanes: KeyedTable::new("node lanes", 7),
            connecting_lanes: KeyedTable::new("connecting lanes", 7),
            sign_posts: KeyedTable::new("sign posts", 7),
            index_area_order: KeyedTable::new("index area order", 7),
            non_searchable: KeyedTable::new("non-searchable items", 8),
            road_display_class: KeyedTable::new("road display classes", 8),
            area_display_class: KeyedTable::new("area display classes", 8),
        }
    }

    /// The one list of tables. Anything added to the struct must be added here.
    pub fn tables(&self) -> [&dyn AuxTable; 11] {
        [
            &self.user_rights,
            &self.admin_centroids,
            &self.official_codes,
            &self.item_categories,
            &self.node_lanes,
            &self.connecting_lanes,
            &self.sign_posts,
            &self.index_area_order,
            &self.non_searchable,
            &self.road_display_class,
            &self.area_display_class,
        ]
    }

    pub fn tables_mut(&mut self) -> [&mut dyn AuxTable; 11] {
        [
            &mut self.user_rights,
            &mut self.admin_centroids,
            &mut self.official_codes,
            &mut self.item_categories,
            &mut self.node_lanes,
            &mut self.connecting_lanes,
            &mut self.sign_posts,
            &mut self.index_area_order,
            &mut self.non_searchable,
            &mut self.road_display_class,
            &mut self.area_display_class,
        ]
    }

    pub fn remove_item(&mut self, id: ItemID) {
        for table in self.tables_mut() {
            if table.remove_item(id) {
                debug!("Purged {} from {}", id, table.name());
            }
        }
    }

    pub fn swap_items(&mut self, a: ItemID, b: ItemID) {
        for table in self.tables_mut() {
            table.swap_items(a, b);
        }
    }

    pub fn is_non_searchable(&self, id: ItemID) -> bool {
        self.non_searchable.contains(id)
    }

    pub fn rights(&self, id: ItemID) -> MapRights {
        self.user_rights
            .get(id)
            .copied()
            .unwrap_or(MapRights::EVERYONE)
    }

    pub fn is_index_area(&self, id: ItemID) -> bool {
        self.index_area_order.contains(id)
    }

    pub fn memory_usage(&self) -> usize {
        self.tables().iter().map(|t| t.memory_usage()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(a: ItemID, b: ItemID) -> AuxiliaryTables {
        let mut aux = AuxiliaryTables::new();
        aux.admin_centroids.insert(a, Coord::new(10, 20));
        aux.official_codes.insert(b, 1234);
        aux.non_searchable.insert(a, ());
        aux.road_display_class.insert(b, 3);
        aux.node_lanes.insert(a.node1(), vec![1, 2]);
        aux.sign_posts.insert(
            (a.node0(), b.node1()),
            vec![SignPost {
                text: 0,
                sign_type: 1,
                text_color: 2,
                background_color: 3,
                distance: 200,
            }],
        );
        aux
    }

    #[test]
    fn swap_moves_every_table() {
        let a = ItemID::new(0, 1);
        let b = ItemID::new(0, 2);
        let mut aux = filled(a, b);
        aux.swap_items(a, b);
        assert_eq!(aux.admin_centroids.get(b), Some(&Coord::new(10, 20)));
        assert!(aux.admin_centroids.get(a).is_none());
        assert_eq!(aux.official_codes.get(a), Some(&1234));
        assert!(aux.is_non_searchable(b));
        assert_eq!(aux.node_lanes.get(b.node1()), Some(&vec![1, 2]));
        assert!(aux.sign_posts.contains((b.node0(), a.node1())));
    }

    #[test]
    fn remove_purges_node_keys() {
        let a = ItemID::new(0, 1);
        let b = ItemID::new(0, 2);
        let mut aux = filled(a, b);
        aux.remove_item(a);
        assert!(aux.admin_centroids.is_empty());
        assert!(aux.node_lanes.is_empty());
        assert!(aux.sign_posts.is_empty());
        assert_eq!(aux.official_codes.get(b), Some(&1234));
    }

    #[test]
    fn tables_round_trip() {
        let a = ItemID::new(3, 9);
        let b = ItemID::new(14, 0);
        let aux = filled(a, b);
        let mut buf = DataBuffer::new();
        for t in aux.tables() {
            t.save(&mut buf);
        }
        let mut read = DataBuffer::from_bytes(buf.into_bytes());
        let mut loaded = AuxiliaryTables::new();
        for t in loaded.tables_mut() {
            t.load(&mut read).unwrap();
        }
        assert_eq!(read.remaining(), 0);
        for (x, y) in aux.tables().iter().zip(loaded.tables().iter()) {
            assert_eq!(x.len(), y.len(), "{}", x.name());
        }
        assert_eq!(loaded.sign_posts.get((a.node0(), b.node1())).unwrap()[0].distance, 200);
    }
}
