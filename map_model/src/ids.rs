use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of zoom levels items are partitioned into. The zoom lives in the high bits of every
/// ItemID; 16 levels keep bit 31 free for node and group flags.
pub const NUMBER_GFX_ZOOMLEVELS: usize = 16;
/// Slots per zoom level
pub const MAX_SLOTS_PER_ZOOM: u32 = 1 << 27;

const SLOT_MASK: u32 = 0x07FF_FFFF;
const NODE1_BIT: u32 = 0x8000_0000;
const EXCLUDED_BIT: u32 = 0x8000_0000;

/// Identifies an item by where it's stored: the top 5 bits are the zoom level, the low 27 bits
/// the slot within that level.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemID(pub u32);

impl ItemID {
    /// The on-disk "no item" sentinel.
    pub const INVALID: ItemID = ItemID(u32::MAX);

    /// Panics if the zoom or slot is out of range. Use `try_new` for untrusted input.
    pub fn new(zoom: usize, slot: u32) -> ItemID {
        assert!(zoom < NUMBER_GFX_ZOOMLEVELS, "zoom {} out of range", zoom);
        assert!(slot <= SLOT_MASK, "slot {} out of range", slot);
        ItemID(((zoom as u32) << 27) | slot)
    }

    pub fn try_new(zoom: usize, slot: u32) -> Option<ItemID> {
        if zoom < NUMBER_GFX_ZOOMLEVELS && slot <= SLOT_MASK {
            Some(ItemID::new(zoom, slot))
        } else {
            None
        }
    }

    pub fn zoom(self) -> usize {
        (self.0 >> 27) as usize
    }

    pub fn slot(self) -> u32 {
        self.0 & SLOT_MASK
    }

    pub fn is_valid(self) -> bool {
        self != ItemID::INVALID && self.zoom() < NUMBER_GFX_ZOOMLEVELS
    }

    pub fn node0(self) -> NodeID {
        NodeID(self.0 & !NODE1_BIT)
    }

    pub fn node1(self) -> NodeID {
        NodeID(self.0 | NODE1_BIT)
    }

    pub fn node(self, is_node1: bool) -> NodeID {
        if is_node1 {
            self.node1()
        } else {
            self.node0()
        }
    }

    pub fn both_nodes(self) -> [NodeID; 2] {
        [self.node0(), self.node1()]
    }

    /// None for the on-disk sentinel.
    pub fn from_raw(raw: u32) -> Option<ItemID> {
        if raw == u32::MAX {
            None
        } else {
            Some(ItemID(raw))
        }
    }

    pub fn to_raw(id: Option<ItemID>) -> u32 {
        id.unwrap_or(ItemID::INVALID).0
    }
}

impl fmt::Display for ItemID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Item #{}.{}", self.zoom(), self.slot())
    }
}

/// One traversal direction of a routeable item. Bit 31 selects node 1; the rest is the item's
/// ID.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeID(pub u32);

impl NodeID {
    pub fn item(self) -> ItemID {
        ItemID(self.0 & !NODE1_BIT)
    }

    pub fn is_node1(self) -> bool {
        self.0 & NODE1_BIT != 0
    }

    /// The other direction of the same item.
    pub fn opposite(self) -> NodeID {
        NodeID(self.0 ^ NODE1_BIT)
    }

    /// 0 or 1, for indexing an item's nodes.
    pub fn index(self) -> usize {
        usize::from(self.is_node1())
    }
}

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Node {}/{}", self.item(), self.index())
    }
}

/// A membership of an item in a group or region. The high bit marks regions that shouldn't be
/// used to describe the item's location.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupRef(u32);

impl GroupRef {
    pub fn new(group: ItemID, location_excluded: bool) -> GroupRef {
        let raw = group.0 & !EXCLUDED_BIT;
        if location_excluded {
            GroupRef(raw | EXCLUDED_BIT)
        } else {
            GroupRef(raw)
        }
    }

    pub fn from_raw(raw: u32) -> GroupRef {
        GroupRef(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn id(self) -> ItemID {
        ItemID(self.0 & !EXCLUDED_BIT)
    }

    pub fn is_location_excluded(self) -> bool {
        self.0 & EXCLUDED_BIT != 0
    }

    pub fn with_id(self, id: ItemID) -> GroupRef {
        GroupRef::new(id, self.is_location_excluded())
    }
}

/// Which users may see an item. Opaque beyond the bitmask.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapRights(pub u32);

impl MapRights {
    /// Items without an entry in the rights table are visible to everyone.
    pub const EVERYONE: MapRights = MapRights(0);

    pub fn allows(self, user: MapRights) -> bool {
        self.0 == 0 || self.0 & user.0 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_new_checks_ranges() {
        assert_eq!(ItemID::try_new(3, 17), Some(ItemID::new(3, 17)));
        assert_eq!(
            ItemID::try_new(NUMBER_GFX_ZOOMLEVELS - 1, SLOT_MASK),
            Some(ItemID::new(NUMBER_GFX_ZOOMLEVELS - 1, SLOT_MASK))
        );
        assert_eq!(ItemID::try_new(NUMBER_GFX_ZOOMLEVELS, 0), None);
        assert_eq!(ItemID::try_new(0, SLOT_MASK + 1), None);
    }

    #[test]
    fn zoom_and_slot_round_trip() {
        for zoom in 0..NUMBER_GFX_ZOOMLEVELS {
            for slot in [0, 1, 12345, SLOT_MASK] {
                let id = ItemID::new(zoom, slot);
                assert_eq!(id.zoom(), zoom);
                assert_eq!(id.slot(), slot);
                assert_eq!(ItemID::new(id.zoom(), id.slot()), id);
            }
        }
    }

    #[test]
    fn node_ids() {
        let id = ItemID::new(3, 77);
        assert!(!id.node0().is_node1());
        assert!(id.node1().is_node1());
        assert_eq!(id.node0().item(), id);
        assert_eq!(id.node1().item(), id);
        assert_eq!(id.node0().opposite(), id.node1());
        assert_eq!(id.node1().index(), 1);
    }

    #[test]
    fn group_flags() {
        let g = GroupRef::new(ItemID::new(2, 9), true);
        assert!(g.is_location_excluded());
        assert_eq!(g.id(), ItemID::new(2, 9));
        assert!(!GroupRef::new(ItemID::new(2, 9), false).is_location_excluded());
    }

    #[test]
    fn rights() {
        assert!(MapRights::EVERYONE.allows(MapRights(0)));
        assert!(MapRights(0b10).allows(MapRights(0b11)));
        assert!(!MapRights(0b10).allows(MapRights(0b01)));
    }
}
