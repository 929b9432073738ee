//! A uniform grid over the map's extent, used to narrow down spatial queries before the exact
//! geometry tests.

use std::collections::BTreeSet;

use enumset::EnumSet;

use geom::{Bounds, Coord};

use crate::objects::ItemType;
use crate::ItemID;

type Cell = Vec<(ItemID, ItemType)>;

/// Points of interest cluster heavily in city centres, so they get their own cells and are
/// only stored at their position. Everything else is stored in every cell its bounding box
/// overlaps.
pub struct MapHashTable {
    bounds: Bounds,
    cells_per_side: usize,
    cells: Vec<Cell>,
    poi_cells: Vec<Cell>,
    nbr_entries: usize,
}

impl MapHashTable {
    /// An index without any cells, for maps with no geometry yet. Every query comes back
    /// empty.
    pub fn empty() -> MapHashTable {
        MapHashTable {
            bounds: Bounds::new(),
            cells_per_side: 0,
            cells: Vec::new(),
            poi_cells: Vec::new(),
            nbr_entries: 0,
        }
    }

    pub fn new(bounds: Bounds, cells_per_side: usize) -> MapHashTable {
        if bounds.is_empty() || cells_per_side == 0 {
            return MapHashTable::empty();
        }
        let n = cells_per_side * cells_per_side;
        MapHashTable {
            bounds,
            cells_per_side,
            cells: vec![Vec::new(); n],
            poi_cells: vec![Vec::new(); n],
            nbr_entries: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells_per_side(&self) -> usize {
        self.cells_per_side
    }

    pub fn nbr_entries(&self) -> usize {
        self.nbr_entries
    }

    fn row(&self, lat: i32) -> usize {
        let height = self.bounds.height().max(1) as f64;
        let frac = (f64::from(lat) - f64::from(self.bounds.min_lat)) / height;
        ((frac * self.cells_per_side as f64) as i64).clamp(0, self.cells_per_side as i64 - 1)
            as usize
    }

    fn col(&self, lon: i32) -> usize {
        let width = self.bounds.width().max(1) as f64;
        let frac = (f64::from(lon) - f64::from(self.bounds.min_lon)) / width;
        ((frac * self.cells_per_side as f64) as i64).clamp(0, self.cells_per_side as i64 - 1)
            as usize
    }

    fn cell_bounds(&self, row: usize, col: usize) -> Bounds {
        let n = self.cells_per_side as f64;
        let h = self.bounds.height() as f64 / n;
        let w = self.bounds.width() as f64 / n;
        let lat0 = f64::from(self.bounds.min_lat);
        let lon0 = f64::from(self.bounds.min_lon);
        Bounds {
            min_lat: (lat0 + h * row as f64) as i32,
            max_lat: (lat0 + h * (row + 1) as f64) as i32,
            min_lon: (lon0 + w * col as f64) as i32,
            max_lon: (lon0 + w * (col + 1) as f64) as i32,
        }
    }

    /// Row and column ranges touched by a box, or None if it misses the map.
    fn cell_range(&self, b: &Bounds) -> Option<((usize, usize), (usize, usize))> {
        if self.is_empty() || !self.bounds.overlaps(b) {
            return None;
        }
        Some((
            (self.row(b.min_lat), self.row(b.max_lat)),
            (self.col(b.min_lon), self.col(b.max_lon)),
        ))
    }

    /// Buckets an item. No-op on an empty index or for items outside the map.
    pub fn add_item(&mut self, id: ItemID, item_type: ItemType, bbox: &Bounds) {
        if self.is_empty() || bbox.is_empty() {
            return;
        }
        if item_type == ItemType::PointOfInterest {
            let pt = bbox.center();
            if !self.bounds.contains(pt) {
                return;
            }
            let idx = self.row(pt.lat) * self.cells_per_side + self.col(pt.lon);
            self.poi_cells[idx].push((id, item_type));
            self.nbr_entries += 1;
            return;
        }
        let ((r0, r1), (c0, c1)) = match self.cell_range(bbox) {
            Some(range) => range,
            None => return,
        };
        for row in r0..=r1 {
            for col in c0..=c1 {
                self.cells[row * self.cells_per_side + col].push((id, item_type));
            }
        }
        self.nbr_entries += 1;
    }

    fn cell_items(&self, idx: usize, kinds: EnumSet<ItemType>) -> impl Iterator<Item = ItemID> + '_ {
        let pois: &[(ItemID, ItemType)] = if kinds.contains(ItemType::PointOfInterest) {
            &self.poi_cells[idx]
        } else {
            &[]
        };
        self.cells[idx]
            .iter()
            .chain(pois.iter())
            .filter(move |(_, t)| kinds.contains(*t))
            .map(|(id, _)| *id)
    }

    /// Every item of the wanted kinds bucketed into a cell the box touches. The caller does
    /// the exact geometry test.
    pub fn candidates_in_bounds(&self, b: &Bounds, kinds: EnumSet<ItemType>) -> BTreeSet<ItemID> {
        let mut found = BTreeSet::new();
        if let Some(((r0, r1), (c0, c1))) = self.cell_range(b) {
            for row in r0..=r1 {
                for col in c0..=c1 {
                    found.extend(self.cell_items(row * self.cells_per_side + col, kinds));
                }
            }
        }
        found
    }

    /// Visits cells in growing square rings around `pt`, asking `squared_dist` for the exact
    /// distance of each candidate. Equal distances go to the lowest ID.
    pub fn closest<F: Fn(ItemID) -> Option<f64>>(
        &self,
        pt: Coord,
        kinds: EnumSet<ItemType>,
        squared_dist: F,
    ) -> Option<(ItemID, f64)> {
        if self.is_empty() || kinds.is_empty() {
            return None;
        }
        let n = self.cells_per_side as i64;
        let center_row = self.row(pt.lat) as i64;
        let center_col = self.col(pt.lon) as i64;
        let cos_lat = pt.cos_lat();
        let cell_size = (self.bounds.height() as f64 / n as f64)
            .min(self.bounds.width() as f64 / n as f64 * cos_lat)
            .max(1.0);

        let mut best: Option<(ItemID, f64)> = None;
        let mut seen = BTreeSet::new();
        for ring in 0..n {
            let mut visited_any = false;
            for row in (center_row - ring)..=(center_row + ring) {
                for col in (center_col - ring)..=(center_col + ring) {
                    let on_ring = (row - center_row).abs() == ring || (col - center_col).abs() == ring;
                    if !on_ring || row < 0 || col < 0 || row >= n || col >= n {
                        continue;
                    }
                    visited_any = true;
                    let (row, col) = (row as usize, col as usize);
                    if let Some((_, best_dist)) = best {
                        if self.cell_bounds(row, col).squared_dist(pt, cos_lat) > best_dist {
                            continue;
                        }
                    }
                    for id in self.cell_items(row * self.cells_per_side + col, kinds) {
                        if !seen.insert(id) {
                            continue;
                        }
                        if let Some(dist) = squared_dist(id) {
                            let better = match best {
                                None => true,
                                Some((best_id, best_dist)) => {
                                    dist < best_dist || (dist == best_dist && id < best_id)
                                }
                            };
                            if better {
                                best = Some((id, dist));
                            }
                        }
                    }
                }
            }
            if !visited_any {
                break;
            }
            // Anything in a farther ring is at least this far away
            if let Some((_, best_dist)) = best {
                let reach = ring as f64 * cell_size;
                if best_dist <= reach * reach {
                    break;
                }
            }
        }
        best
    }

    /// Renames entries after two items exchanged IDs.
    pub fn swap_ids(&mut self, a: ItemID, b: ItemID) {
        for cell in self.cells.iter_mut().chain(self.poi_cells.iter_mut()) {
            for (id, _) in cell.iter_mut() {
                if *id == a {
                    *id = b;
                } else if *id == b {
                    *id = a;
                }
            }
        }
    }

    pub fn memory_usage(&self) -> usize {
        self.cells
            .iter()
            .chain(self.poi_cells.iter())
            .map(|c| std::mem::size_of::<Cell>() + c.capacity() * std::mem::size_of::<(ItemID, ItemType)>())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MapHashTable {
        MapHashTable::new(Bounds::from(&[Coord::new(0, 0), Coord::new(10_000, 10_000)]), 10)
    }

    #[test]
    fn empty_index_is_a_no_op() {
        let mut t = MapHashTable::empty();
        t.add_item(ItemID::new(8, 0), ItemType::StreetSegment, &Bounds::around(Coord::new(5, 5), 3));
        assert!(t
            .candidates_in_bounds(&Bounds::around(Coord::new(5, 5), 100), EnumSet::all())
            .is_empty());
        assert_eq!(t.closest(Coord::new(5, 5), EnumSet::all(), |_| Some(0.0)), None);
    }

    #[test]
    fn kinds_filter() {
        let mut t = table();
        let park = ItemID::new(2, 0);
        let poi = ItemID::new(14, 0);
        let b = Bounds::from(&[Coord::new(100, 100), Coord::new(2500, 2500)]);
        t.add_item(park, ItemType::Park, &b);
        t.add_item(poi, ItemType::PointOfInterest, &Bounds::from(&[Coord::new(200, 200)]));

        let query = Bounds::from(&[Coord::new(0, 0), Coord::new(300, 300)]);
        let all = t.candidates_in_bounds(&query, EnumSet::all());
        assert_eq!(all.into_iter().collect::<Vec<_>>(), vec![park, poi]);
        let pois = t.candidates_in_bounds(&query, EnumSet::only(ItemType::PointOfInterest));
        assert_eq!(pois.into_iter().collect::<Vec<_>>(), vec![poi]);
        assert!(t
            .candidates_in_bounds(&query, EnumSet::only(ItemType::Water))
            .is_empty());
    }

    #[test]
    fn closest_ties_go_to_lowest_id() {
        let mut t = table();
        let pts = [
            (ItemID::new(14, 3), Coord::new(5000, 5100)),
            (ItemID::new(14, 1), Coord::new(5000, 4900)),
            (ItemID::new(14, 2), Coord::new(9000, 9000)),
        ];
        for (id, pt) in pts {
            t.add_item(id, ItemType::PointOfInterest, &Bounds::from(&[pt]));
        }
        let query = Coord::new(5000, 5000);
        let dist = |id: ItemID| {
            pts.iter()
                .find(|(x, _)| *x == id)
                .map(|(_, pt)| pt.squared_dist_with_cos(query, 1.0))
        };
        let (id, d) = t.closest(query, EnumSet::all(), dist).unwrap();
        assert_eq!(id, ItemID::new(14, 1));
        assert_eq!(d, 100.0 * 100.0);
    }
}
