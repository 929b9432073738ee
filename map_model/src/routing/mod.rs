//! The routing graph. Every routeable item owns two directional nodes; each node keeps the
//! connections that lead into it.

mod boundary;
mod cost;
mod tables;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use abstutil::DataBuffer;

pub use self::boundary::{BoundarySegment, BoundarySegments, ExternalConnection};
pub use self::cost::ConnectionCost;
pub use self::tables::{LandmarkInfo, LandmarkLocation, LandmarkTable, NodeExpansionTable};
use crate::allocator::{Arena, Handle};
use crate::NodeID;

/// How a connection turns, from the driver's point of view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TurnDirection {
    #[default]
    Undefined,
    Left,
    Ahead,
    Right,
    UTurn,
    FollowRoad,
    EnterRoundabout,
    ExitRoundabout,
    AheadInRoundabout,
    OnRamp,
    OffRamp,
    EnterBus,
    ExitBus,
    ChangeBus,
    KeepLeft,
    KeepRight,
    EnterFerry,
    ExitFerry,
    ChangeFerry,
}

impl TurnDirection {
    const ALL: [TurnDirection; 19] = [
        TurnDirection::Undefined,
        TurnDirection::Left,
        TurnDirection::Ahead,
        TurnDirection::Right,
        TurnDirection::UTurn,
        TurnDirection::FollowRoad,
        TurnDirection::EnterRoundabout,
        TurnDirection::ExitRoundabout,
        TurnDirection::AheadInRoundabout,
        TurnDirection::OnRamp,
        TurnDirection::OffRamp,
        TurnDirection::EnterBus,
        TurnDirection::ExitBus,
        TurnDirection::ChangeBus,
        TurnDirection::KeepLeft,
        TurnDirection::KeepRight,
        TurnDirection::EnterFerry,
        TurnDirection::ExitFerry,
        TurnDirection::ChangeFerry,
    ];

    pub fn from_u8(x: u8) -> TurnDirection {
        TurnDirection::ALL
            .get(x as usize)
            .copied()
            .unwrap_or(TurnDirection::Undefined)
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossingKind {
    #[default]
    NoCrossing,
    Crossing3Ways,
    Crossing4Ways,
    CrossingMultiway,
    Roundabout,
}

impl CrossingKind {
    fn from_u8(x: u8) -> CrossingKind {
        match x {
            1 => CrossingKind::Crossing3Ways,
            2 => CrossingKind::Crossing4Ways,
            3 => CrossingKind::CrossingMultiway,
            4 => CrossingKind::Roundabout,
            _ => CrossingKind::NoCrossing,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            CrossingKind::NoCrossing => 0,
            CrossingKind::Crossing3Ways => 1,
            CrossingKind::Crossing4Ways => 2,
            CrossingKind::CrossingMultiway => 3,
            CrossingKind::Roundabout => 4,
        }
    }
}

/// An edge into the node that owns it. `from` is the node being left; its node1 bit says which
/// end of the source item that is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: NodeID,
    pub turn_direction: TurnDirection,
    pub crossing_kind: CrossingKind,
    /// Vehicle kinds that may not use this connection
    pub vehicle_restrictions: u32,
    pub exit_count: u8,
    /// The real path is the node chain in the map's expansion table
    pub multi: bool,
}

impl Connection {
    pub fn new(from: NodeID, turn_direction: TurnDirection) -> Connection {
        Connection {
            from,
            turn_direction,
            crossing_kind: CrossingKind::NoCrossing,
            vehicle_restrictions: 0,
            exit_count: 0,
            multi: false,
        }
    }

    pub fn multi(from: NodeID, turn_direction: TurnDirection) -> Connection {
        Connection {
            multi: true,
            ..Connection::new(from, turn_direction)
        }
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(self.from.0);
        buf.write_u32(self.vehicle_restrictions);
        buf.write_u8(self.turn_direction.to_u8());
        buf.write_u8(self.crossing_kind.to_u8());
        buf.write_u8(self.exit_count);
        buf.write_bool(self.multi);
    }

    fn load(buf: &mut DataBuffer) -> Result<Connection> {
        let from = NodeID(buf.read_u32()?);
        let vehicle_restrictions = buf.read_u32()?;
        let turn_direction = TurnDirection::from_u8(buf.read_u8()?);
        let crossing_kind = CrossingKind::from_u8(buf.read_u8()?);
        let exit_count = buf.read_u8()?;
        let multi = buf.read_bool()?;
        Ok(Connection {
            from,
            turn_direction,
            crossing_kind,
            vehicle_restrictions,
            exit_count,
            multi,
        })
    }
}

const MAJOR_ROAD: u8 = 1;
const ROAD_TOLL: u8 = 1 << 1;

/// One direction of a routeable item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub(crate) node_id: NodeID,
    #[serde(skip)]
    pub(crate) connections: Vec<Handle<Connection>>,
    /// km/h
    pub speed_limit: u8,
    pub entry_restrictions: u8,
    pub level: i8,
    pub major_road: bool,
    pub road_toll: bool,
    /// Tonnes, 0 for unlimited
    pub max_weight: u8,
    /// Decimeters, 0 for unlimited
    pub max_height: u8,
}

impl Node {
    pub fn new(node_id: NodeID) -> Node {
        Node {
            node_id,
            ..Default::default()
        }
    }

    pub fn node_id(&self) -> NodeID {
        self.node_id
    }

    pub fn connections(&self) -> &[Handle<Connection>] {
        &self.connections
    }

    pub fn nbr_connections(&self) -> usize {
        self.connections.len()
    }

    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Node>()
            + self.connections.capacity() * std::mem::size_of::<Handle<Connection>>()
    }

    pub(crate) fn save(&self, arena: &Arena<Connection>, buf: &mut DataBuffer) {
        let conns: Vec<&Connection> = self
            .connections
            .iter()
            .filter_map(|h| arena.get(*h))
            .collect();
        buf.write_u16(conns.len() as u16);
        buf.write_u8(self.speed_limit);
        let mut flags = 0;
        if self.major_road {
            flags |= MAJOR_ROAD;
        }
        if self.road_toll {
            flags |= ROAD_TOLL;
        }
        buf.write_u8(flags);
        buf.write_i8(self.level);
        buf.write_u8(self.entry_restrictions);
        buf.write_u8(self.max_weight);
        buf.write_u8(self.max_height);
        for conn in conns {
            conn.save(buf);
        }
    }

    pub(crate) fn load(
        node_id: NodeID,
        arena: &mut Arena<Connection>,
        buf: &mut DataBuffer,
    ) -> Result<Node> {
        let nbr_connections = buf.read_u16()?;
        let speed_limit = buf.read_u8()?;
        let flags = buf.read_u8()?;
        let level = buf.read_i8()?;
        let entry_restrictions = buf.read_u8()?;
        let max_weight = buf.read_u8()?;
        let max_height = buf.read_u8()?;
        let mut connections = Vec::with_capacity(nbr_connections as usize);
        for _ in 0..nbr_connections {
            connections.push(arena.alloc(Connection::load(buf)?));
        }
        Ok(Node {
            node_id,
            connections,
            speed_limit,
            entry_restrictions,
            level,
            major_road: flags & MAJOR_ROAD != 0,
            road_toll: flags & ROAD_TOLL != 0,
            max_weight,
            max_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ItemID;

    #[test]
    fn node_round_trip() {
        let mut arena = Arena::new("connections");
        let mut node = Node::new(ItemID::new(8, 3).node1());
        node.speed_limit = 70;
        node.level = -1;
        node.road_toll = true;
        node.connections.push(arena.alloc(Connection::new(
            ItemID::new(8, 4).node0(),
            TurnDirection::Left,
        )));
        node.connections.push(arena.alloc(Connection::multi(
            ItemID::new(8, 5).node1(),
            TurnDirection::Right,
        )));

        let mut buf = DataBuffer::new();
        node.save(&arena, &mut buf);
        assert_eq!(buf.len() % 4, 0);

        let mut other = Arena::new("connections");
        let mut read = DataBuffer::from_bytes(buf.into_bytes());
        let loaded = Node::load(node.node_id, &mut other, &mut read).unwrap();
        assert_eq!(loaded.speed_limit, 70);
        assert_eq!(loaded.level, -1);
        assert!(loaded.road_toll && !loaded.major_road);
        let conns: Vec<&Connection> = loaded
            .connections
            .iter()
            .map(|h| other.get(*h).unwrap())
            .collect();
        assert_eq!(conns[0].turn_direction, TurnDirection::Left);
        assert!(conns[1].is_multi());
        assert_eq!(conns[1].from, ItemID::new(8, 5).node1());
    }

    #[test]
    fn turn_codes() {
        for t in TurnDirection::ALL {
            assert_eq!(TurnDirection::from_u8(t.to_u8()), t);
        }
        assert_eq!(TurnDirection::from_u8(200), TurnDirection::Undefined);
    }
}
