use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use abstutil::DataBuffer;

use super::TurnDirection;
use crate::{ItemID, NodeID};

/// A connection into a neighbouring map. Crossing a map boundary costs nothing on either side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalConnection {
    pub map_id: u32,
    pub remote_node: NodeID,
    pub turn_direction: TurnDirection,
    pub vehicle_restrictions: u32,
}

/// A routeable item touching the map boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundarySegment {
    pub item: ItemID,
    /// Which end lies on the boundary
    pub close_node_is_node1: bool,
    /// Indexed by node, like the item's own nodes
    pub connections: [Vec<ExternalConnection>; 2],
}

impl BoundarySegment {
    pub fn new(item: ItemID, close_node_is_node1: bool) -> BoundarySegment {
        BoundarySegment {
            item,
            close_node_is_node1,
            connections: [Vec::new(), Vec::new()],
        }
    }

    pub fn close_node(&self) -> NodeID {
        self.item.node(self.close_node_is_node1)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundarySegments {
    segments: BTreeMap<ItemID, BoundarySegment>,
}

impl BoundarySegments {
    pub fn new() -> BoundarySegments {
        BoundarySegments::default()
    }

    pub fn insert(&mut self, segment: BoundarySegment) {
        self.segments.insert(segment.item, segment);
    }

    pub fn get(&self, item: ItemID) -> Option<&BoundarySegment> {
        self.segments.get(&item)
    }

    pub fn contains(&self, item: ItemID) -> bool {
        self.segments.contains_key(&item)
    }

    pub fn remove(&mut self, item: ItemID) -> Option<BoundarySegment> {
        self.segments.remove(&item)
    }

    pub fn add_external_connection(&mut self, to: NodeID, conn: ExternalConnection) -> bool {
        match self.segments.get_mut(&to.item()) {
            Some(seg) => {
                seg.connections[to.index()].push(conn);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundarySegment> {
        self.segments.values()
    }

    pub fn memory_usage(&self) -> usize {
        self.segments
            .values()
            .map(|s| {
                std::mem::size_of::<BoundarySegment>()
                    + (s.connections[0].capacity() + s.connections[1].capacity())
                        * std::mem::size_of::<ExternalConnection>()
            })
            .sum()
    }

    pub(crate) fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(self.segments.len() as u32);
        for seg in self.segments.values() {
            buf.write_u32(seg.item.0);
            buf.write_bool(seg.close_node_is_node1);
            buf.write_u8(0);
            buf.write_u16(0);
            for list in &seg.connections {
                buf.write_u32(list.len() as u32);
                for c in list {
                    buf.write_u32(c.map_id);
                    buf.write_u32(c.remote_node.0);
                    buf.write_u32(c.vehicle_restrictions);
                    buf.write_u8(c.turn_direction.to_u8());
                    buf.align_to(4);
                }
            }
        }
    }

    pub(crate) fn load(buf: &mut DataBuffer) -> Result<BoundarySegments> {
        let mut table = BoundarySegments::new();
        for _ in 0..buf.read_u32()? {
            let item = ItemID(buf.read_u32()?);
            let close_node_is_node1 = buf.read_bool()?;
            buf.read_u8()?;
            buf.read_u16()?;
            let mut seg = BoundarySegment::new(item, close_node_is_node1);
            for list in seg.connections.iter_mut() {
                for _ in 0..buf.read_u32()? {
                    let map_id = buf.read_u32()?;
                    let remote_node = NodeID(buf.read_u32()?);
                    let vehicle_restrictions = buf.read_u32()?;
                    let turn_direction = TurnDirection::from_u8(buf.read_u8()?);
                    buf.align_to(4);
                    list.push(ExternalConnection {
                        map_id,
                        remote_node,
                        turn_direction,
                        vehicle_restrictions,
                    });
                }
            }
            table.insert(seg);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let item = ItemID::new(8, 17);
        let mut table = BoundarySegments::new();
        table.insert(BoundarySegment::new(item, true));
        assert!(table.add_external_connection(
            item.node1(),
            ExternalConnection {
                map_id: 9,
                remote_node: NodeID(0x8000_0042),
                turn_direction: TurnDirection::Ahead,
                vehicle_restrictions: 0xFF,
            }
        ));
        assert!(!table.add_external_connection(
            ItemID::new(8, 18).node0(),
            ExternalConnection {
                map_id: 9,
                remote_node: NodeID(1),
                turn_direction: TurnDirection::Ahead,
                vehicle_restrictions: 0,
            }
        ));

        let mut buf = DataBuffer::new();
        table.save(&mut buf);
        let loaded = BoundarySegments::load(&mut DataBuffer::from_bytes(buf.into_bytes())).unwrap();
        assert_eq!(loaded, table);
        assert_eq!(loaded.get(item).unwrap().close_node(), item.node1());
    }
}
