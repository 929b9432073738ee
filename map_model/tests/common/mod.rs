//! A small synthetic town used by the integration tests.

#![allow(dead_code)]

use abstutil::Timer;
use geom::{Coord, GfxData};
use map_model::{
    Connection, GenericMap, ItemID, ItemKind, LanguageCode, MapHeader, MapLevel, MapRights,
    NameType, PointOfInterest, PoiType, Street, StreetSegment, StreetSide, TurnDirection,
};

pub fn pt(lat: f64, lon: f64) -> Coord {
    Coord::from_degrees(lat, lon)
}

pub struct Town {
    pub map: GenericMap,
    pub municipal: ItemID,
    /// No geometry of its own, only a member building
    pub suburb: ItemID,
    pub suburb_building: ItemID,
    pub city_centre: ItemID,
    pub street: ItemID,
    pub west_segment: ItemID,
    pub east_segment: ItemID,
    pub cafe: ItemID,
    pub park: ItemID,
    pub forest: ItemID,
}

pub fn town() -> Town {
    let mut map = GenericMap::new(MapHeader::new(42, MapLevel::Underview));
    map.header_mut().name = "Lund".to_string();
    map.set_map_gfx(GfxData::polygon(vec![
        pt(55.690, 13.160),
        pt(55.690, 13.220),
        pt(55.730, 13.220),
        pt(55.730, 13.160),
    ]));

    let municipal = map.add_item(ItemKind::Municipal, None).unwrap();
    map.add_name(municipal, "Lund", LanguageCode::SWEDISH, NameType::Official);
    map.set_gfx(
        municipal,
        GfxData::polygon(vec![
            pt(55.695, 13.165),
            pt(55.695, 13.215),
            pt(55.725, 13.215),
            pt(55.725, 13.165),
        ]),
    )
    .unwrap();

    let suburb = map.add_item(ItemKind::BuiltUpArea, None).unwrap();
    map.add_name(suburb, "Klostergården", LanguageCode::SWEDISH, NameType::Official);
    let suburb_building = map
        .add_item(ItemKind::Building { building_type: 1 }, None)
        .unwrap();
    map.set_gfx(
        suburb_building,
        GfxData::polygon(vec![
            pt(55.6920, 13.1800),
            pt(55.6920, 13.1820),
            pt(55.6940, 13.1820),
            pt(55.6940, 13.1800),
        ]),
    )
    .unwrap();
    map.add_region(suburb_building, suburb, false);

    let city_centre = map
        .add_item(
            ItemKind::PointOfInterest(PointOfInterest {
                poi_type: PoiType::CityCentre,
                ..Default::default()
            }),
            None,
        )
        .unwrap();
    map.add_name(city_centre, "Lund", LanguageCode::SWEDISH, NameType::Official);
    map.set_gfx(city_centre, GfxData::point(pt(55.704, 13.193)))
        .unwrap();
    map.add_region(city_centre, municipal, false);

    let street = map.add_item(ItemKind::Street(Street::default()), None).unwrap();
    map.add_name(street, "Stora Södergatan", LanguageCode::SWEDISH, NameType::Official);

    let west_segment = map
        .add_item(ItemKind::StreetSegment(StreetSegment::new(3)), None)
        .unwrap();
    map.set_gfx(
        west_segment,
        GfxData::polyline(vec![pt(55.700, 13.180), pt(55.700, 13.190)]),
    )
    .unwrap();
    let east_segment = map
        .add_item(ItemKind::StreetSegment(StreetSegment::new(3)), None)
        .unwrap();
    map.set_gfx(
        east_segment,
        GfxData::polyline(vec![pt(55.700, 13.190), pt(55.700, 13.200)]),
    )
    .unwrap();
    for segment in [west_segment, east_segment] {
        map.add_region(segment, street, false);
        map.add_region(segment, municipal, false);
    }
    assert!(map.add_connection(
        east_segment.node0(),
        Connection::new(west_segment.node1(), TurnDirection::Ahead)
    ));
    assert!(map.add_connection(
        west_segment.node1(),
        Connection::new(east_segment.node0(), TurnDirection::Ahead)
    ));

    let cafe = map
        .add_item(
            ItemKind::PointOfInterest(PointOfInterest {
                poi_type: PoiType::Other(3),
                street_segment: Some(west_segment),
                offset_on_street: 0x8000,
                side: StreetSide::Left,
                wasp_id: 7,
            }),
            None,
        )
        .unwrap();
    map.add_name(cafe, "Café Ariman", LanguageCode::SWEDISH, NameType::Official);
    map.set_gfx(cafe, GfxData::point(pt(55.7001, 13.1850))).unwrap();

    let park = map.add_item(ItemKind::Park { park_type: 2 }, None).unwrap();
    map.add_name(park, "Lundagård", LanguageCode::SWEDISH, NameType::Official);
    map.set_gfx(
        park,
        GfxData::polygon(vec![
            pt(55.7050, 13.1950),
            pt(55.7050, 13.1980),
            pt(55.7070, 13.1980),
            pt(55.7070, 13.1950),
        ]),
    )
    .unwrap();

    let forest = map.add_item(ItemKind::Forest, None).unwrap();
    map.set_gfx(
        forest,
        GfxData::polygon(vec![
            pt(55.7200, 13.2000),
            pt(55.7200, 13.2100),
            pt(55.7250, 13.2100),
            pt(55.7250, 13.2000),
        ]),
    )
    .unwrap();

    let aux = map.aux_tables_mut();
    aux.user_rights.insert(forest, MapRights(2));
    aux.official_codes.insert(municipal, 1281);
    aux.item_categories.insert(park, [4, 9].into_iter().collect());
    aux.node_lanes.insert(west_segment.node1(), vec![1, 2]);
    aux.connecting_lanes
        .insert((west_segment.node1(), east_segment.node0()), 3);
    aux.index_area_order.insert(park, 1);
    aux.road_display_class.insert(west_segment, 5);
    aux.area_display_class.insert(park, 2);

    map.build_hash_table(&mut Timer::throwaway());

    Town {
        map,
        municipal,
        suburb,
        suburb_building,
        city_centre,
        street,
        west_segment,
        east_segment,
        cafe,
        park,
        forest,
    }
}

/// Somewhere fresh under the system temp directory.
pub fn temp_path(name: &str) -> String {
    let mut path = std::env::temp_dir();
    path.push(format!("map_model_{}_{}.gmap", name, std::process::id()));
    path.to_string_lossy().into_owned()
}
