use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use abstutil::DataBuffer;

use crate::{ItemID, NodeID};

/// The intermediate node chains behind multi-connections, keyed by (from, to). A chain starts
/// at `from` and ends at `to`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeExpansionTable {
    chains: BTreeMap<(NodeID, NodeID), Vec<NodeID>>,
}

impl NodeExpansionTable {
    pub fn new() -> NodeExpansionTable {
        NodeExpansionTable::default()
    }

    pub fn insert(&mut self, from: NodeID, to: NodeID, chain: Vec<NodeID>) {
        self.chains.insert((from, to), chain);
    }

    pub fn get(&self, from: NodeID, to: NodeID) -> Option<&Vec<NodeID>> {
        self.chains.get(&(from, to))
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Drops every chain that passes through either node of an item.
    pub fn remove_item(&mut self, id: ItemID) -> usize {
        let before = self.chains.len();
        self.chains
            .retain(|(from, to), chain| {
                from.item() != id && to.item() != id && chain.iter().all(|n| n.item() != id)
            });
        before - self.chains.len()
    }

    pub fn memory_usage(&self) -> usize {
        self.chains
            .values()
            .map(|c| {
                std::mem::size_of::<((NodeID, NodeID), Vec<NodeID>)>()
                    + c.capacity() * std::mem::size_of::<NodeID>()
            })
            .sum()
    }

    pub(crate) fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(self.chains.len() as u32);
        for ((from, to), chain) in &self.chains {
            buf.write_u32(from.0);
            buf.write_u32(to.0);
            buf.write_u32(chain.len() as u32);
            for n in chain {
                buf.write_u32(n.0);
            }
        }
    }

    pub(crate) fn load(buf: &mut DataBuffer) -> Result<NodeExpansionTable> {
        let mut table = NodeExpansionTable::new();
        for _ in 0..buf.read_u32()? {
            let from = NodeID(buf.read_u32()?);
            let to = NodeID(buf.read_u32()?);
            let mut chain = Vec::new();
            for _ in 0..buf.read_u32()? {
                chain.push(NodeID(buf.read_u32()?));
            }
            table.insert(from, to, chain);
        }
        Ok(table)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LandmarkLocation {
    Before,
    At,
    After,
    Through,
    Pass,
}

impl LandmarkLocation {
    fn from_u8(x: u8) -> LandmarkLocation {
        match x {
            0 => LandmarkLocation::Before,
            2 => LandmarkLocation::After,
            3 => LandmarkLocation::Through,
            4 => LandmarkLocation::Pass,
            _ => LandmarkLocation::At,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            LandmarkLocation::Before => 0,
            LandmarkLocation::At => 1,
            LandmarkLocation::After => 2,
            LandmarkLocation::Through => 3,
            LandmarkLocation::Pass => 4,
        }
    }
}

/// Something a driver sees while making a turn, like a church or a traffic light.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkInfo {
    pub landmark: ItemID,
    pub importance: u8,
    pub side: u8,
    pub location: LandmarkLocation,
    pub landmark_type: u8,
    /// Meters from the turn, negative when before it
    pub distance: i32,
}

/// Landmarks per connection, keyed by (from, to).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkTable {
    entries: BTreeMap<(NodeID, NodeID), Vec<LandmarkInfo>>,
}

impl LandmarkTable {
    pub fn new() -> LandmarkTable {
        LandmarkTable::default()
    }

    pub fn add(&mut self, from: NodeID, to: NodeID, info: LandmarkInfo) {
        self.entries.entry((from, to)).or_default().push(info);
    }

    pub fn get(&self, from: NodeID, to: NodeID) -> &[LandmarkInfo] {
        self.entries
            .get(&(from, to))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Purges connections touching an item, and landmarks that are the item.
    pub fn remove_item(&mut self, id: ItemID) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|(from, to), _| from.item() != id && to.item() != id);
        for list in self.entries.values_mut() {
            list.retain(|l| l.landmark != id);
        }
        self.entries.retain(|_, list| !list.is_empty());
        before - self.entries.len()
    }

    pub(crate) fn swap_landmarks(&mut self, a: ItemID, b: ItemID) {
        for list in self.entries.values_mut() {
            for l in list {
                if l.landmark == a {
                    l.landmark = b;
                } else if l.landmark == b {
                    l.landmark = a;
                }
            }
        }
    }

    pub fn memory_usage(&self) -> usize {
        self.entries
            .values()
            .map(|v| {
                std::mem::size_of::<((NodeID, NodeID), Vec<LandmarkInfo>)>()
                    + v.capacity() * std::mem::size_of::<LandmarkInfo>()
            })
            .sum()
    }

    pub(crate) fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(self.entries.len() as u32);
        for ((from, to), list) in &self.entries {
            buf.write_u32(from.0);
            buf.write_u32(to.0);
            buf.write_u32(list.len() as u32);
            for l in list {
                buf.write_u32(l.landmark.0);
                buf.write_i32(l.distance);
                buf.write_u8(l.importance);
                buf.write_u8(l.side);
                buf.write_u8(l.location.to_u8());
                buf.write_u8(l.landmark_type);
            }
        }
    }

    pub(crate) fn load(buf: &mut DataBuffer) -> Result<LandmarkTable> {
        let mut table = LandmarkTable::new();
        for _ in 0..buf.read_u32()? {
            let from = NodeID(buf.read_u32()?);
            let to = NodeID(buf.read_u32()?);
            for _ in 0..buf.read_u32()? {
                let landmark = ItemID(buf.read_u32()?);
                let distance = buf.read_i32()?;
                let importance = buf.read_u8()?;
                let side = buf.read_u8()?;
                let location = LandmarkLocation::from_u8(buf.read_u8()?);
                let landmark_type = buf.read_u8()?;
                table.add(
                    from,
                    to,
                    LandmarkInfo {
                        landmark,
                        importance,
                        side,
                        location,
                        landmark_type,
                        distance,
                    },
                );
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_purge() {
        let a = ItemID::new(8, 1);
        let b = ItemID::new(8, 2);
        let c = ItemID::new(8, 3);
        let mut table = NodeExpansionTable::new();
        table.insert(a.node0(), c.node0(), vec![a.node0(), b.node1(), c.node0()]);
        table.insert(a.node1(), c.node1(), vec![a.node1(), c.node1()]);
        assert_eq!(table.remove_item(b), 1);
        assert!(table.get(a.node0(), c.node0()).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn landmarks_round_trip() {
        let a = ItemID::new(8, 1);
        let b = ItemID::new(8, 2);
        let mut table = LandmarkTable::new();
        table.add(
            a.node0(),
            b.node1(),
            LandmarkInfo {
                landmark: ItemID::new(12, 9),
                importance: 2,
                side: 1,
                location: LandmarkLocation::Pass,
                landmark_type: 4,
                distance: -30,
            },
        );
        let mut buf = DataBuffer::new();
        table.save(&mut buf);
        let loaded = LandmarkTable::load(&mut DataBuffer::from_bytes(buf.into_bytes())).unwrap();
        assert_eq!(loaded, table);

        let mut purged = loaded.clone();
        assert_eq!(purged.remove_item(ItemID::new(12, 9)), 1);
        assert!(purged.is_empty());
    }
}
