use std::collections::BTreeSet;

use enumset::EnumSet;

use abstutil::Timer;

use super::{GenericMap, ItemRef};
use crate::objects::{Item, ItemKind, ItemType};
use crate::ItemID;

/// About 10 meters in MC2 units. Routeable items this close to a removed one are checked for
/// connections that still point at it.
const CONNECTION_CLEANUP_RADIUS: i32 = 1072;

impl GenericMap {
    /// Logically removes an item: references to it are cleaned up and its slot becomes a
    /// tombstone with the same ID. Returns false if there was nothing to remove.
    pub fn remove_item(&mut self, id: ItemID, update_index: bool) -> bool {
        self.remove_item_with(id, update_index, true)
    }

    /// Like `remove_item`, but an admin area's members keep their group reference to it.
    /// Needed for zip codes that get replaced by a sibling carrying the same ID.
    pub fn remove_item_keeping_members(&mut self, id: ItemID, update_index: bool) -> bool {
        self.remove_item_with(id, update_index, false)
    }

    /// Removes many items, rebuilding the spatial index once at the end.
    pub fn remove_items(&mut self, ids: &BTreeSet<ItemID>) -> usize {
        let mut timer = Timer::new(format!("remove {} items", ids.len()));
        timer.start_iter("remove items", ids.len());
        let mut removed = 0;
        for id in ids {
            timer.next();
            if self.remove_item_with(*id, false, true) {
                removed += 1;
            }
        }
        self.build_hash_table(&mut timer);
        removed
    }

    fn remove_item_with(&mut self, id: ItemID, update_index: bool, strip_members: bool) -> bool {
        let item_type = match self.live_item(id) {
            Some(item) => item.item_type(),
            None => return false,
        };

        match item_type {
            ItemType::StreetSegment | ItemType::Ferry | ItemType::BusRoute => {
                self.remove_routeable_links(id);
            }
            ItemType::Municipal | ItemType::BuiltUpArea | ItemType::ZipCode => {
                if strip_members {
                    for other in self.all_ids() {
                        if let Some(item) = self.item_mut(other) {
                            item.remove_group(id);
                        }
                    }
                }
            }
            ItemType::Street | ItemType::Category => {
                let members = self
                    .item(id)
                    .and_then(|i| i.kind.members())
                    .cloned()
                    .unwrap_or_default();
                for member in members {
                    if let Some(item) = self.item_mut(member) {
                        item.remove_group(id);
                    }
                }
            }
            ItemType::Water
            | ItemType::Park
            | ItemType::Forest
            | ItemType::Building
            | ItemType::Railway
            | ItemType::Island
            | ItemType::Null
            | ItemType::CityPart
            | ItemType::ZipArea
            | ItemType::PointOfInterest
            | ItemType::Airport
            | ItemType::AircraftRoad
            | ItemType::PedestrianArea
            | ItemType::MilitaryBase
            | ItemType::IndividualBuilding
            | ItemType::SubwayLine
            | ItemType::Border
            | ItemType::Cartographic => {}
        }

        // Leave the groups this item belongs to
        let groups: Vec<ItemID> = self
            .item(id)
            .map(|i| i.groups.iter().map(|g| g.id()).collect())
            .unwrap_or_default();
        for group in groups {
            if let Some(members) = self.item_mut(group).and_then(|g| g.kind.members_mut()) {
                members.retain(|m| *m != id);
            }
        }

        self.tombstone(id);
        self.aux.remove_item(id);
        self.landmarks.remove_item(id);
        if update_index {
            self.build_hash_table(&mut Timer::throwaway());
        }
        true
    }

    /// Street segments, ferries and bus routes: drop connections elsewhere that start at this
    /// item, and everything keyed by its nodes.
    fn remove_routeable_links(&mut self, id: ItemID) {
        let own_nodes = id.both_nodes();
        let mut neighbours: BTreeSet<ItemID> = own_nodes
            .iter()
            .flat_map(|n| self.connections_to(*n).map(|c| c.from.item()))
            .collect();

        // Connections aren't guaranteed to mirror each other, so also look at whatever is
        // physically close to the ends.
        let routeable: EnumSet<ItemType> =
            ItemType::StreetSegment | ItemType::Ferry | ItemType::BusRoute;
        let ends: Vec<_> = self
            .gfx_of(id)
            .map(|g| g.first_coord().into_iter().chain(g.last_coord()).collect())
            .unwrap_or_default();
        for pt in ends {
            neighbours.extend(self.items_within_radius(pt, CONNECTION_CLEANUP_RADIUS, routeable, None));
        }
        neighbours.remove(&id);

        for other in neighbours {
            for from in own_nodes {
                if self.delete_connections_from(other, from) {
                    debug!("Dropped connections from {} into {}", from, other);
                }
            }
        }

        if self.boundary.remove(id).is_some() {
            debug!("{} was a boundary segment", id);
        }
        self.expansion.remove_item(id);

        // POIs reached from this segment go with it
        let pois: Vec<ItemID> = self
            .items_of_type(ItemType::PointOfInterest)
            .filter(|i| match i.kind() {
                ItemKind::PointOfInterest(poi) => poi.street_segment == Some(id),
                _ => false,
            })
            .map(|i| i.id())
            .collect();
        for poi in pois {
            self.remove_item_with(poi, false, true);
        }
    }

    /// Replaces the item at `id` with a null item, freeing its geometry, nodes and
    /// connections through their own arenas.
    fn tombstone(&mut self, id: ItemID) {
        let r = match self.item_ref(id) {
            Some(r) => r,
            None => return,
        };
        if let Some(item) = self.item_arenas[r.item_type.tag() as usize].hand_over(r.handle) {
            if let Some(gfx) = item.gfx {
                self.gfx.hand_over(gfx);
            }
            for node in item.nodes.into_iter().flatten() {
                if let Some(node) = self.nodes.hand_over(node) {
                    for conn in node.connections {
                        self.connections.hand_over(conn);
                    }
                }
            }
        }
        let handle = self.item_arenas[ItemType::Null.tag() as usize].alloc(Item::tombstone(id));
        self.zoom_levels[id.zoom()][id.slot() as usize] = ItemRef {
            item_type: ItemType::Null,
            handle,
        };
    }

    /// Exchanges the IDs of two items, rewriting every reference and side table entry.
    ///
    /// Returns false and changes nothing if either ID is missing, or if either item is routeable
    /// (a street segment, ferry or bus route). Node IDs are derived from the item ID and aren't
    /// rewritten, so routeable items keep their IDs. Swapping an item with itself returns true.
    pub fn swap_items(&mut self, a: ItemID, b: ItemID) -> bool {
        let (ref_a, ref_b) = match (self.item_ref(a), self.item_ref(b)) {
            (Some(x), Some(y)) => (x, y),
            _ => return false,
        };
        if a == b {
            return true;
        }
        if ref_a.item_type.is_routeable() || ref_b.item_type.is_routeable() {
            warn!("Can't swap routeable items {} and {}", a, b);
            return false;
        }

        self.zoom_levels[a.zoom()][a.slot() as usize] = ref_b;
        self.zoom_levels[b.zoom()][b.slot() as usize] = ref_a;
        if let Some(item) = self.item_mut(a) {
            item.id = a;
        }
        if let Some(item) = self.item_mut(b) {
            item.id = b;
        }

        let swap = |x: ItemID| {
            if x == a {
                b
            } else if x == b {
                a
            } else {
                x
            }
        };
        for arena in &mut self.item_arenas {
            let handles: Vec<_> = arena.iter().map(|(h, _)| h).collect();
            for h in handles {
                let item = match arena.get_mut(h) {
                    Some(item) => item,
                    None => continue,
                };
                for g in item.groups.iter_mut() {
                    *g = g.with_id(swap(g.id()));
                }
                match item.kind {
                    ItemKind::Street(ref mut s) => {
                        s.members.iter_mut().for_each(|m| *m = swap(*m));
                    }
                    ItemKind::Category(ref mut c) => {
                        c.members.iter_mut().for_each(|m| *m = swap(*m));
                    }
                    ItemKind::PointOfInterest(ref mut poi) => {
                        poi.street_segment = poi.street_segment.map(swap);
                    }
                    _ => {}
                }
            }
        }
        self.aux.swap_items(a, b);
        self.landmarks.swap_landmarks(a, b);
        self.hash.swap_ids(a, b);
        true
    }
}
