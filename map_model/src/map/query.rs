use std::collections::BTreeSet;

use enumset::EnumSet;

use abstutil::Timer;
use geom::{Bounds, Coord, GfxData};

use super::GenericMap;
use crate::objects::ItemType;
use crate::spatial::MapHashTable;
use crate::{ItemID, MapRights};

impl GenericMap {
    /// Rebuilds the spatial index from scratch. Without map geometry the index stays empty.
    pub fn build_hash_table(&mut self, timer: &mut Timer) {
        let bounds = match self.map_gfx {
            Some(ref gfx) => gfx.bounds(),
            None => {
                self.hash = MapHashTable::empty();
                return;
            }
        };
        timer.start("build spatial index");
        let mut hash = MapHashTable::new(bounds, self.header.level.hash_cells_per_side());
        for item in self.all_items() {
            if item.is_null() {
                continue;
            }
            if let Some(gfx) = self.item_gfx(item) {
                hash.add_item(item.id(), item.item_type(), &gfx.bounds());
            }
        }
        info!(
            "Spatial index has {} items in {}x{} cells",
            hash.nbr_entries(),
            hash.cells_per_side(),
            hash.cells_per_side()
        );
        self.hash = hash;
        timer.stop("build spatial index");
    }

    fn visible(&self, id: ItemID, rights: Option<MapRights>) -> bool {
        if self.live_item(id).is_none() {
            return false;
        }
        match rights {
            Some(user) => self.aux.rights(id).allows(user),
            None => true,
        }
    }

    /// Items whose geometry comes within `radius` MC2 units of `center`.
    pub fn items_within_radius(
        &self,
        center: Coord,
        radius: i32,
        kinds: EnumSet<ItemType>,
        rights: Option<MapRights>,
    ) -> BTreeSet<ItemID> {
        let max_sq = f64::from(radius) * f64::from(radius);
        self.hash
            .candidates_in_bounds(&Bounds::around(center, radius), kinds)
            .into_iter()
            .filter(|id| self.visible(*id, rights))
            .filter(|id| {
                self.gfx_of(*id)
                    .and_then(|g| g.squared_dist(center))
                    .map(|d| d <= max_sq)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Items whose bounding box overlaps the given one.
    pub fn items_within_bounds(
        &self,
        bounds: &Bounds,
        kinds: EnumSet<ItemType>,
        rights: Option<MapRights>,
    ) -> BTreeSet<ItemID> {
        self.hash
            .candidates_in_bounds(bounds, kinds)
            .into_iter()
            .filter(|id| self.visible(*id, rights))
            .filter(|id| {
                self.item_bounds(*id)
                    .map(|b| b.overlaps(bounds))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Items with a representative point inside a closed area.
    pub fn items_within_gfx(
        &self,
        area: &GfxData,
        kinds: EnumSet<ItemType>,
        rights: Option<MapRights>,
    ) -> BTreeSet<ItemID> {
        self.items_within_bounds(&area.bounds(), kinds, rights)
            .into_iter()
            .filter(|id| {
                let pt = self
                    .gfx_of(*id)
                    .and_then(|g| g.first_coord())
                    .or_else(|| self.item_bounds(*id).map(|b| b.center()));
                pt.map(|pt| area.contains(pt)).unwrap_or(false)
            })
            .collect()
    }

    /// The nearest item and its squared distance in MC2 units, ties going to the lowest ID.
    pub fn closest_item(
        &self,
        pt: Coord,
        kinds: EnumSet<ItemType>,
        rights: Option<MapRights>,
    ) -> Option<(ItemID, f64)> {
        self.hash.closest(pt, kinds, |id| {
            if !self.visible(id, rights) {
                return None;
            }
            self.gfx_of(id)?.squared_dist(pt)
        })
    }
}
