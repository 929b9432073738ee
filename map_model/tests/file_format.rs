mod common;

use abstutil::Timer;
use map_model::{AuxTable, GenericMap, ItemID, ItemType, MapRights, CURRENT_VERSION, NUMBER_GFX_ZOOMLEVELS};

use common::{temp_path, town};

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn put_u32(bytes: &mut [u8], at: usize, x: u32) {
    bytes[at..at + 4].copy_from_slice(&x.to_le_bytes());
}

/// Where the body size sits, right after the header.
fn body_size_offset(bytes: &[u8]) -> usize {
    (8..bytes.len() - 4)
        .step_by(4)
        .find(|at| u32_at(bytes, *at) as usize == bytes.len() - at - 4)
        .unwrap()
}

/// Where the item header of `id` starts within the static block, matched on the tag, the ID
/// and both counts that follow it.
fn item_offset(map: &GenericMap, bytes: &[u8], id: ItemID) -> usize {
    let item = map.item(id).unwrap();
    let counts = (item.names().len() as u32) | ((item.groups().len() as u32) << 16);
    (0..bytes.len() - 12)
        .find(|at| {
            bytes[at + 3] == item.item_type().tag()
                && u32_at(bytes, *at) & 0x00FF_FFFF != 0
                && u32_at(bytes, at + 4) == id.0
                && u32_at(bytes, at + 8) == counts
        })
        .unwrap()
}

fn all_ids(map: &GenericMap) -> Vec<ItemID> {
    map.all_items().map(|i| i.id()).collect()
}

fn table_sizes(map: &GenericMap) -> Vec<(String, usize)> {
    map.aux_tables()
        .tables()
        .iter()
        .map(|t| (t.name().to_string(), t.len()))
        .collect()
}

#[test]
fn save_and_load_keeps_everything() {
    let t = town();
    let path = temp_path("round_trip");
    t.map.save(&path).unwrap();
    let loaded = GenericMap::load(&path).unwrap();
    fs_err::remove_file(&path).unwrap();

    assert_eq!(loaded.header().name, "Lund");
    assert_eq!(loaded.header().version, CURRENT_VERSION);
    assert_eq!(loaded.map_gfx(), t.map.map_gfx());
    for zoom in 0..NUMBER_GFX_ZOOMLEVELS {
        assert_eq!(
            loaded.nbr_items_on_zoom(zoom),
            t.map.nbr_items_on_zoom(zoom),
            "zoom {}",
            zoom
        );
    }
    let mut expected = all_ids(&t.map);
    let mut actual = all_ids(&loaded);
    expected.sort();
    actual.sort();
    assert_eq!(actual, expected);

    for id in expected {
        let (a, b) = (t.map.item(id).unwrap(), loaded.item(id).unwrap());
        assert_eq!(a.kind(), b.kind(), "{}", id);
        assert_eq!(a.names(), b.names(), "{}", id);
        assert_eq!(a.groups(), b.groups(), "{}", id);
        assert_eq!(t.map.gfx_of(id), loaded.gfx_of(id), "{}", id);
        assert_eq!(t.map.item_names(id), loaded.item_names(id), "{}", id);
    }

    assert!(loaded
        .find_connection(t.west_segment.node1(), t.east_segment.node0())
        .is_some());
    assert!(loaded
        .find_connection(t.east_segment.node0(), t.west_segment.node1())
        .is_some());
    assert_eq!(table_sizes(&loaded), table_sizes(&t.map));
    assert_eq!(
        loaded.aux_tables().user_rights.get(t.forest),
        Some(&MapRights(2))
    );
    assert_eq!(
        loaded.aux_tables().node_lanes.get(t.west_segment.node1()),
        Some(&vec![1, 2])
    );
    assert_eq!(loaded.members_of(t.street), vec![t.west_segment, t.east_segment]);
}

#[test]
fn older_versions_leave_out_newer_tables() {
    let t = town();
    let bytes = t.map.to_bytes(6).unwrap();
    let loaded = GenericMap::load_from_bytes(bytes, &mut Timer::throwaway()).unwrap();

    assert_eq!(loaded.header().version, 6);
    let aux = loaded.aux_tables();
    assert_eq!(aux.user_rights.len(), 1);
    assert_eq!(aux.official_codes.get(t.municipal), Some(&1281));
    assert_eq!(aux.item_categories.len(), 1);
    assert_eq!(aux.node_lanes.len(), 0);
    assert_eq!(aux.connecting_lanes.len(), 0);
    assert_eq!(aux.index_area_order.len(), 0);
    assert_eq!(aux.road_display_class.len(), 0);
    assert_eq!(aux.area_display_class.len(), 0);
    assert_eq!(loaded.nbr_items(), t.map.nbr_items());
}

#[test]
fn legacy_format() {
    let t = town();
    let bytes = t.map.to_bytes(5).unwrap();
    let loaded = GenericMap::load_from_bytes(bytes, &mut Timer::throwaway()).unwrap();

    assert_eq!(loaded.header().version, 5);
    assert_eq!(loaded.aux_tables().user_rights.len(), 1);
    assert_eq!(loaded.aux_tables().official_codes.len(), 0);
    assert_eq!(loaded.item_type(t.cafe), Some(ItemType::PointOfInterest));
    assert_eq!(loaded.best_name(t.park), Some("Lundagård"));
}

#[test]
fn bad_files() {
    let t = town();
    assert!(t.map.to_bytes(CURRENT_VERSION + 1).is_err());
    assert!(t.map.to_bytes(0).is_err());

    let mut bytes = t.map.to_bytes(CURRENT_VERSION).unwrap();
    bytes.truncate(bytes.len() - 16);
    assert!(GenericMap::load_from_bytes(bytes, &mut Timer::throwaway()).is_err());

    let mut bytes = t.map.to_bytes(CURRENT_VERSION).unwrap();
    bytes[0] = b'X';
    assert!(GenericMap::load_from_bytes(bytes, &mut Timer::throwaway()).is_err());
}

#[test]
fn removed_items_stay_removed_on_disk() {
    let mut t = town();
    assert!(t.map.remove_item(t.park, true));
    let bytes = t.map.to_bytes(CURRENT_VERSION).unwrap();
    let loaded = GenericMap::load_from_bytes(bytes, &mut Timer::throwaway()).unwrap();

    let tombstone = loaded.item(t.park).unwrap();
    assert!(tombstone.is_null());
    assert_eq!(tombstone.id(), t.park);
    assert!(loaded.live_item(t.park).is_none());
    assert!(loaded.aux_tables().area_display_class.is_empty());
    // Everything else keeps its slot
    assert_eq!(loaded.item_type(t.forest), Some(ItemType::Forest));
    assert_eq!(loaded.nbr_items_of_type(ItemType::Park), 0);
}

#[test]
fn newer_versions_skip_trailing_sections() {
    let t = town();
    let mut bytes = t.map.to_bytes(CURRENT_VERSION).unwrap();
    let size_at = body_size_offset(&bytes);
    // One more framed section, as a newer writer would append
    bytes.extend_from_slice(&4u32.to_le_bytes());
    bytes.extend_from_slice(&[1, 2, 3, 4]);
    let body_size = u32_at(&bytes, size_at) + 8;
    put_u32(&mut bytes, size_at, body_size);

    for version in [CURRENT_VERSION, CURRENT_VERSION + 1] {
        let mut bytes = bytes.clone();
        bytes[4] = version;
        let loaded = GenericMap::load_from_bytes(bytes, &mut Timer::throwaway()).unwrap();
        assert_eq!(loaded.header().version, version);
        assert_eq!(all_ids(&loaded).len(), all_ids(&t.map).len());
        assert_eq!(table_sizes(&loaded), table_sizes(&t.map));
        assert_eq!(loaded.best_name(t.park), Some("Lundagård"));
    }
}

#[test]
fn unknown_kinds_load_as_tombstones() {
    let t = town();
    let mut bytes = t.map.to_bytes(CURRENT_VERSION).unwrap();
    let at = item_offset(&t.map, &bytes, t.municipal);
    bytes[at + 3] = 200;
    let loaded = GenericMap::load_from_bytes(bytes, &mut Timer::throwaway()).unwrap();

    assert!(loaded.item(t.municipal).unwrap().is_null());
    assert!(loaded.live_item(t.municipal).is_none());
    assert_eq!(loaded.nbr_items_of_type(ItemType::Municipal), 0);
    // Nothing is left pointing at it, and other memberships survive
    let west = loaded.item(t.west_segment).unwrap();
    assert!(!west.is_member_of(t.municipal));
    assert!(west.is_member_of(t.street));
    assert!(!loaded.item(t.city_centre).unwrap().is_member_of(t.municipal));
    assert_eq!(loaded.members_of(t.street), vec![t.west_segment, t.east_segment]);
    assert_eq!(loaded.item_type(t.park), Some(ItemType::Park));
}

#[test]
#[should_panic(expected = "Corrupt map")]
fn items_in_the_wrong_slot_are_fatal() {
    let t = town();
    let mut bytes = t.map.to_bytes(CURRENT_VERSION).unwrap();
    let at = item_offset(&t.map, &bytes, t.municipal);
    put_u32(&mut bytes, at + 4, t.park.0);
    let _ = GenericMap::load_from_bytes(bytes, &mut Timer::throwaway());
}
