use std::collections::BTreeMap;

use abstutil::Timer;
use geom::{Bounds, Coord};

use super::GenericMap;
use crate::aux_tables::AuxTable;
use crate::names::names_match;
use crate::objects::{ItemKind, ItemType};
use crate::ItemID;

/// Recomputed centroids closer than this to the stored one are left alone.
const CENTROID_UPDATE_THRESHOLD_METERS: f64 = 2.0;
const MAX_INDEX_AREA_DEPTH: usize = 8;

struct CityCentre<'a> {
    id: ItemID,
    pt: Coord,
    names: Vec<&'a str>,
}

impl GenericMap {
    /// Throws away derived admin area centroids and computes them again. Zip codes and index
    /// areas keep what they had, since this map alone doesn't say where those belong.
    pub fn create_centre_coordinates_for_admin_areas(&mut self, timer: &mut Timer) -> usize {
        let derived = self.derive_admin_centroids(timer);
        let preserved: Vec<(ItemID, Coord)> = self
            .aux
            .admin_centroids
            .iter()
            .filter(|(id, _)| self.keeps_centroid(**id))
            .map(|(id, pt)| (*id, *pt))
            .collect();
        self.aux.admin_centroids.clear();
        for (id, pt) in preserved {
            self.aux.admin_centroids.insert(id, pt);
        }
        let mut assigned = 0;
        for (id, pt) in derived {
            if !self.aux.admin_centroids.contains(id) {
                self.aux.admin_centroids.insert(id, pt);
                assigned += 1;
            }
        }
        info!("Assigned centroids to {} admin areas", assigned);
        assigned
    }

    /// Like `create_centre_coordinates_for_admin_areas`, but only overwrites centroids that
    /// moved noticeably. Returns how many changed.
    pub fn update_centre_coordinates_for_admin_areas(&mut self, timer: &mut Timer) -> usize {
        let derived = self.derive_admin_centroids(timer);
        let mut changed = 0;
        for (id, pt) in derived {
            match self.aux.admin_centroids.get(id) {
                Some(_) if self.keeps_centroid(id) => {}
                Some(old) if old.dist(pt).inner_meters() < CENTROID_UPDATE_THRESHOLD_METERS => {}
                _ => {
                    self.aux.admin_centroids.insert(id, pt);
                    changed += 1;
                }
            }
        }
        info!("Updated {} admin area centroids", changed);
        changed
    }

    fn keeps_centroid(&self, id: ItemID) -> bool {
        self.item_type(id) == Some(ItemType::ZipCode) || self.aux.is_index_area(id)
    }

    fn derive_admin_centroids(&self, timer: &mut Timer) -> Vec<(ItemID, Coord)> {
        timer.start("derive admin area centroids");
        let centres: Vec<CityCentre> = self
            .items_of_type(ItemType::PointOfInterest)
            .filter(|i| matches!(i.kind(), ItemKind::PointOfInterest(poi) if poi.is_city_centre()))
            .filter_map(|i| {
                let pt = self.item_gfx(i)?.first_coord()?;
                Some(CityCentre {
                    id: i.id(),
                    pt,
                    names: self.item_names(i.id()),
                })
            })
            .collect();

        // Union of member geometry per group, for areas without their own
        let mut member_bounds: BTreeMap<ItemID, Bounds> = BTreeMap::new();
        for item in self.all_items() {
            if let Some(gfx) = self.item_gfx(item) {
                for g in item.groups() {
                    member_bounds
                        .entry(g.id())
                        .or_insert_with(Bounds::new)
                        .union(&gfx.bounds());
                }
            }
        }

        let areas: Vec<ItemID> = [ItemType::Municipal, ItemType::BuiltUpArea]
            .into_iter()
            .flat_map(|t| self.items_of_type(t).map(|i| i.id()))
            .filter(|id| !self.aux.is_non_searchable(*id))
            .collect();
        timer.start_iter("admin areas", areas.len());
        let mut result = Vec::new();
        for area in areas {
            timer.next();
            let pt = self.city_centre_for(area, &centres).or_else(|| {
                self.item_bounds(area)
                    .or_else(|| member_bounds.get(&area).copied().filter(|b| !b.is_empty()))
                    .map(|b| b.center())
            });
            if let Some(pt) = pt {
                result.push((area, pt));
            }
        }
        timer.stop("derive admin area centroids");
        result
    }

    /// The one city centre named like the area and lying inside it. Several candidates are
    /// narrowed down by exact name, then distance; a tie is no answer.
    fn city_centre_for(&self, area: ItemID, centres: &[CityCentre]) -> Option<Coord> {
        let area_names = self.item_names(area);
        if area_names.is_empty() {
            return None;
        }
        let mut matches: Vec<&CityCentre> = centres
            .iter()
            .filter(|c| {
                c.names
                    .iter()
                    .any(|n| area_names.iter().any(|a| names_match(n, a)))
            })
            .filter(|c| self.poi_inside(c.id, c.pt, area))
            .collect();
        if matches.len() > 1 {
            let exact: Vec<&CityCentre> = matches
                .iter()
                .copied()
                .filter(|c| c.names.iter().any(|n| area_names.contains(n)))
                .collect();
            if !exact.is_empty() {
                matches = exact;
            }
        }
        match matches.len() {
            0 => None,
            1 => Some(matches[0].pt),
            _ => {
                let middle = self.item_bounds(area)?.center();
                matches.sort_by(|a, b| {
                    a.pt.squared_dist(middle)
                        .total_cmp(&b.pt.squared_dist(middle))
                        .then(a.id.cmp(&b.id))
                });
                if matches[0].pt.squared_dist(middle) == matches[1].pt.squared_dist(middle) {
                    warn!(
                        "{} city centres match {} equally well, not picking one",
                        matches.len(),
                        area
                    );
                    return None;
                }
                Some(matches[0].pt)
            }
        }
    }

    fn poi_inside(&self, poi: ItemID, pt: Coord, area: ItemID) -> bool {
        let item = match self.live_item(poi) {
            Some(item) => item,
            None => return false,
        };
        if item.is_member_of(area) {
            return true;
        }
        if let Some(gfx) = self.gfx_of(area) {
            if gfx.is_closed() && gfx.contains(pt) {
                return true;
            }
        }
        self.national.use_index_areas_for_centroids && self.in_index_area_of(poi, area, 0)
    }

    /// Is `item` inside `region` through a chain of nested index areas?
    fn in_index_area_of(&self, item: ItemID, region: ItemID, depth: usize) -> bool {
        if depth >= MAX_INDEX_AREA_DEPTH {
            return false;
        }
        let groups = match self.live_item(item) {
            Some(i) => i.groups(),
            None => return false,
        };
        groups.iter().any(|g| {
            g.id() == region
                || (self.aux.is_index_area(g.id()) && self.in_index_area_of(g.id(), region, depth + 1))
        })
    }
}
