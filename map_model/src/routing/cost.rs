//! What it costs to follow a connection.

use std::ops;

use serde::{Deserialize, Serialize};

use geom::{Distance, Duration};

use super::{Connection, ExternalConnection};
use crate::objects::ItemKind;
use crate::{GenericMap, NodeID};

/// Multi-connections expanding into other multi-connections stop here.
const MAX_EXPANSION_DEPTH: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionCost {
    /// Driving time plus standstill time
    pub time: Duration,
    pub standstill: Duration,
    pub length: Distance,
}

impl ConnectionCost {
    pub const ZERO: ConnectionCost = ConnectionCost {
        time: Duration::ZERO,
        standstill: Duration::ZERO,
        length: Distance::ZERO,
    };
}

impl ops::Add for ConnectionCost {
    type Output = ConnectionCost;

    fn add(self, other: ConnectionCost) -> ConnectionCost {
        ConnectionCost {
            time: self.time + other.time,
            standstill: self.standstill + other.standstill,
            length: self.length + other.length,
        }
    }
}

impl ops::AddAssign for ConnectionCost {
    fn add_assign(&mut self, other: ConnectionCost) {
        *self = *self + other;
    }
}

impl GenericMap {
    /// The full cost of a connection into `to`. Multi-connections with a chain of at least 3
    /// nodes cost the sum of their hops; None if a hop is missing.
    pub fn connection_data(&self, conn: &Connection, to: NodeID) -> Option<ConnectionCost> {
        self.connection_data_at_depth(conn, to, 0)
    }

    fn connection_data_at_depth(
        &self,
        conn: &Connection,
        to: NodeID,
        depth: usize,
    ) -> Option<ConnectionCost> {
        if conn.multi && depth < MAX_EXPANSION_DEPTH {
            if let Some(chain) = self.expansion.get(conn.from, to) {
                if chain.len() >= 3 {
                    let mut total = ConnectionCost::ZERO;
                    for pair in chain.windows(2) {
                        let hop = self.find_connection(pair[0], pair[1])?;
                        total += self.connection_data_at_depth(hop, pair[1], depth + 1)?;
                    }
                    return Some(total);
                }
            }
        }
        let length = self.single_connection_length(conn.from, to);
        let (time, standstill) = self.single_connection_time(conn, to, length);
        Some(ConnectionCost {
            time,
            standstill,
            length,
        })
    }

    /// Connections into neighbouring maps are free on this side.
    pub fn external_connection_data(&self, _: &ExternalConnection) -> ConnectionCost {
        ConnectionCost::ZERO
    }

    /// How far one travels from leaving `from` until reaching `to`.
    pub fn single_connection_length(&self, from: NodeID, to: NodeID) -> Distance {
        let from_item = match self.live_item(from.item()) {
            Some(item) => item,
            // The source is on another map
            None => return Distance::ZERO,
        };
        if self.boundary.contains(from.item()) && self.live_item(to.item()).is_none() {
            return Distance::ZERO;
        }
        let from_length = self.item_length(from.item()).unwrap_or(Distance::ZERO);
        let to_kind = self.live_item(to.item()).map(|i| i.kind());

        match (from_item.kind(), to_kind) {
            (ItemKind::StreetSegment(_), Some(ItemKind::StreetSegment(_))) => from_length,
            (ItemKind::StreetSegment(_), Some(ItemKind::BusRoute(bus))) => {
                // The stop sits at the offset, measured from the street's node 0
                let frac = bus.offset_fraction();
                if from.is_node1() {
                    from_length * (1.0 - frac)
                } else {
                    from_length * frac
                }
            }
            (ItemKind::BusRoute(bus), Some(ItemKind::StreetSegment(_))) => {
                let street_length = self.item_length(to.item()).unwrap_or(Distance::ZERO);
                let frac = bus.offset_fraction();
                if to.is_node1() {
                    street_length * frac
                } else {
                    street_length * (1.0 - frac)
                }
            }
            (ItemKind::BusRoute(a), Some(ItemKind::BusRoute(b))) => {
                if a.bus_route_id == b.bus_route_id {
                    from_length
                } else {
                    match self.connecting_street_length(from, to) {
                        Some(street_length) => {
                            street_length * (a.offset_fraction() - b.offset_fraction()).abs()
                        }
                        None => from_length,
                    }
                }
            }
            // Everything else, ferries included, uses the raw length of what's being left
            _ => from_length,
        }
    }

    /// The length of a street segment linking two bus routes, if one connects into either.
    fn connecting_street_length(&self, from: NodeID, to: NodeID) -> Option<Distance> {
        let street = self
            .connections_to(to)
            .chain(self.connections_to(from))
            .map(|c| c.from.item())
            .find(|id| {
                matches!(
                    self.live_item(*id).map(|i| i.kind()),
                    Some(ItemKind::StreetSegment(_))
                )
            })?;
        self.item_length(street)
    }

    /// (time including standstill, standstill) for a connection of the given length.
    pub fn single_connection_time(
        &self,
        conn: &Connection,
        to: NodeID,
        length: Distance,
    ) -> (Duration, Duration) {
        let from_kind = self.live_item(conn.from.item()).map(|i| i.kind());
        let from_class = from_kind
            .map(|k| k.road_class())
            .unwrap_or(crate::objects::StreetSegment::MINOR_ROAD_CLASS);
        let ramp = matches!(from_kind, Some(ItemKind::StreetSegment(ssi)) if ssi.ramp);
        let to_class = self
            .live_item(to.item())
            .map(|i| i.kind().road_class())
            .unwrap_or(crate::objects::StreetSegment::MINOR_ROAD_CLASS);
        let speed_limit = self
            .national
            .effective_speed_limit(self.node(conn.from).map(|n| n.speed_limit).unwrap_or(0));

        let speed = self.national.speed(speed_limit);
        let factor = self.national.time_penalty(from_class, ramp, speed_limit);
        let driving = (length / speed) * factor;
        let standstill = self
            .national
            .standstill_time(conn.turn_direction, from_class, to_class);
        (driving + standstill, standstill)
    }
}

#[cfg(test)]
mod tests {
    use geom::{Coord, GfxData};

    use super::*;
    use crate::header::{MapHeader, MapLevel};
    use crate::objects::{BusRoute, StreetSegment};
    use crate::routing::TurnDirection;
    use crate::ItemID;

    /// A straight street heading north, roughly `meters` long.
    fn street(map: &mut GenericMap, start_lat: i32, meters: f64, class: u8) -> ItemID {
        let id = map
            .add_item(ItemKind::StreetSegment(StreetSegment::new(class)), None)
            .unwrap();
        let start = Coord::new(start_lat, 0);
        map.set_gfx(id, GfxData::polyline(vec![start, start.offset_meters(meters, 0.0)]))
            .unwrap();
        id
    }

    fn bus(map: &mut GenericMap, route: u32, offset: u16) -> ItemID {
        let id = map
            .add_item(
                ItemKind::BusRoute(BusRoute {
                    bus_route_id: route,
                    offset_in_closest_street: offset,
                }),
                None,
            )
            .unwrap();
        map.set_gfx(id, GfxData::polyline(vec![Coord::new(0, 0), Coord::new(0, 10)]))
            .unwrap();
        id
    }

    fn close(a: Distance, b: f64) -> bool {
        (a.inner_meters() - b).abs() < 0.01
    }

    #[test]
    fn bus_halfway_in_both_orientations() {
        let mut map = GenericMap::new(MapHeader::new(1, MapLevel::Underview));
        let ssi = street(&mut map, 0, 100.0, 3);
        let b = bus(&mut map, 7, 32768);
        let full = map.item_length(ssi).unwrap().inner_meters();

        for from in ssi.both_nodes() {
            for to in b.both_nodes() {
                assert!(close(map.single_connection_length(from, to), full / 2.0));
            }
        }
        for from in b.both_nodes() {
            for to in ssi.both_nodes() {
                assert!(close(map.single_connection_length(from, to), full / 2.0));
            }
        }
    }

    #[test]
    fn bus_to_bus() {
        let mut map = GenericMap::new(MapHeader::new(1, MapLevel::Underview));
        let ssi = street(&mut map, 0, 100.0, 3);
        let a = bus(&mut map, 1, 16384);
        let same_route = bus(&mut map, 1, 49152);
        let other_route = bus(&mut map, 2, 49152);
        let bus_length = map.item_length(a).unwrap();
        let street_length = map.item_length(ssi).unwrap().inner_meters();

        assert_eq!(map.single_connection_length(a.node0(), same_route.node0()), bus_length);
        // No street connects them yet
        assert_eq!(map.single_connection_length(a.node0(), other_route.node0()), bus_length);
        assert!(map.add_connection(
            other_route.node0(),
            Connection::new(ssi.node0(), TurnDirection::EnterBus)
        ));
        assert!(close(
            map.single_connection_length(a.node0(), other_route.node0()),
            street_length * 0.5
        ));
    }

    #[test]
    fn external_sources_are_free() {
        let mut map = GenericMap::new(MapHeader::new(1, MapLevel::Underview));
        let ssi = street(&mut map, 0, 100.0, 3);
        let elsewhere = ItemID::new(8, 5000);
        assert_eq!(map.single_connection_length(elsewhere.node0(), ssi.node0()), Distance::ZERO);
    }

    #[test]
    fn time_uses_speed_penalty_and_standstill() {
        let mut map = GenericMap::new(MapHeader::new(1, MapLevel::Underview));
        let a = street(&mut map, 0, 100.0, 4);
        let b = street(&mut map, 100_000, 100.0, 4);
        map.node_mut(a.node0()).unwrap().speed_limit = 36;
        let conn = Connection::new(a.node0(), TurnDirection::Left);
        let (time, standstill) = map.single_connection_time(&conn, b.node0(), Distance::meters(100.0));
        assert_eq!(standstill, Duration::seconds(5.0));
        // 100m at 10m/s, class 4 penalty
        assert!((time.inner_seconds() - (10.0 * 1.2 + 5.0)).abs() < 1e-6);
    }

    #[test]
    fn multi_connection_sums_its_hops() {
        let mut map = GenericMap::new(MapHeader::new(1, MapLevel::Underview));
        let a = street(&mut map, 0, 100.0, 3);
        let b = street(&mut map, 100_000, 250.0, 3);
        let c = street(&mut map, 200_000, 400.0, 3);

        assert!(map.add_connection(b.node0(), Connection::new(a.node0(), TurnDirection::Ahead)));
        assert!(map.add_connection(c.node0(), Connection::new(b.node0(), TurnDirection::Right)));
        let multi = Connection::multi(a.node0(), TurnDirection::Ahead);
        assert!(map.add_connection(c.node0(), multi.clone()));
        map.node_expansion_mut()
            .insert(a.node0(), c.node0(), vec![a.node0(), b.node0(), c.node0()]);

        let hop1 = map
            .connection_data(map.find_connection(a.node0(), b.node0()).unwrap(), b.node0())
            .unwrap();
        let hop2 = map
            .connection_data(map.find_connection(b.node0(), c.node0()).unwrap(), c.node0())
            .unwrap();
        let total = map.connection_data(&multi, c.node0()).unwrap();
        assert_eq!(total, hop1 + hop2);
        let expected = map.item_length(a).unwrap() + map.item_length(b).unwrap();
        assert!(close(total.length, expected.inner_meters()));
        assert_eq!(total.standstill, Duration::seconds(2.0));

        // A short chain is only a direct hop
        map.node_expansion_mut()
            .insert(a.node0(), c.node0(), vec![a.node0(), c.node0()]);
        let direct = map.connection_data(&multi, c.node0()).unwrap();
        assert_eq!(direct.length, map.item_length(a).unwrap());

        // A missing hop makes the whole thing unknown
        map.node_expansion_mut()
            .insert(a.node0(), c.node0(), vec![a.node0(), c.node1(), c.node0()]);
        assert_eq!(map.connection_data(&multi, c.node0()), None);
    }
}
