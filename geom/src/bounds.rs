use serde::{Deserialize, Serialize};

use crate::Coord;

/// An axis-aligned box in MC2 units. A freshly created Bounds is empty and contains nothing
/// until the first `update`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: i32,
    pub max_lat: i32,
    pub min_lon: i32,
    pub max_lon: i32,
}

impl Default for Bounds {
    fn default() -> Bounds {
        Bounds::new()
    }
}

impl Bounds {
    pub fn new() -> Bounds {
        Bounds {
            min_lat: i32::MAX,
            max_lat: i32::MIN,
            min_lon: i32::MAX,
            max_lon: i32::MIN,
        }
    }

    pub fn from(pts: &[Coord]) -> Bounds {
        let mut b = Bounds::new();
        for pt in pts {
            b.update(*pt);
        }
        b
    }

    /// The box of all points within `radius` MC2 units of `center`, scaling longitude.
    pub fn around(center: Coord, radius: i32) -> Bounds {
        let cos = center.cos_lat().max(1e-9);
        let lon_radius = (f64::from(radius) / cos).min(f64::from(i32::MAX)) as i64;
        let clamp = |x: i64| x.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        Bounds {
            min_lat: clamp(i64::from(center.lat) - i64::from(radius)),
            max_lat: clamp(i64::from(center.lat) + i64::from(radius)),
            min_lon: clamp(i64::from(center.lon) - lon_radius),
            max_lon: clamp(i64::from(center.lon) + lon_radius),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_lat > self.max_lat || self.min_lon > self.max_lon
    }

    pub fn update(&mut self, pt: Coord) {
        self.min_lat = self.min_lat.min(pt.lat);
        self.max_lat = self.max_lat.max(pt.lat);
        self.min_lon = self.min_lon.min(pt.lon);
        self.max_lon = self.max_lon.max(pt.lon);
    }

    pub fn union(&mut self, other: &Bounds) {
        if other.is_empty() {
            return;
        }
        self.update(Coord::new(other.min_lat, other.min_lon));
        self.update(Coord::new(other.max_lat, other.max_lon));
    }

    pub fn contains(&self, pt: Coord) -> bool {
        pt.lat >= self.min_lat
            && pt.lat <= self.max_lat
            && pt.lon >= self.min_lon
            && pt.lon <= self.max_lon
    }

    /// Touching edges count as overlapping.
    pub fn overlaps(&self, other: &Bounds) -> bool {
        !(self.is_empty()
            || other.is_empty()
            || other.min_lat > self.max_lat
            || other.max_lat < self.min_lat
            || other.min_lon > self.max_lon
            || other.max_lon < self.min_lon)
    }

    pub fn intersection(&self, other: &Bounds) -> Option<Bounds> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Bounds {
            min_lat: self.min_lat.max(other.min_lat),
            max_lat: self.max_lat.min(other.max_lat),
            min_lon: self.min_lon.max(other.min_lon),
            max_lon: self.max_lon.min(other.max_lon),
        })
    }

    pub fn center(&self) -> Coord {
        Coord::new(
            ((i64::from(self.min_lat) + i64::from(self.max_lat)) / 2) as i32,
            ((i64::from(self.min_lon) + i64::from(self.max_lon)) / 2) as i32,
        )
    }

    pub fn height(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        (i64::from(self.max_lat) - i64::from(self.min_lat)) as u64
    }

    pub fn width(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        (i64::from(self.max_lon) - i64::from(self.min_lon)) as u64
    }

    /// 0 if inside. Longitude is scaled by `cos_lat`.
    pub fn squared_dist(&self, pt: Coord, cos_lat: f64) -> f64 {
        let dlat = if pt.lat < self.min_lat {
            f64::from(self.min_lat) - f64::from(pt.lat)
        } else if pt.lat > self.max_lat {
            f64::from(pt.lat) - f64::from(self.max_lat)
        } else {
            0.0
        };
        let raw_dlon = if pt.lon < self.min_lon {
            f64::from(self.min_lon) - f64::from(pt.lon)
        } else if pt.lon > self.max_lon {
            f64::from(pt.lon) - f64::from(self.max_lon)
        } else {
            0.0
        };
        let dlon = raw_dlon * cos_lat;
        dlat * dlat + dlon * dlon
    }

    pub fn corners(&self) -> Vec<Coord> {
        vec![
            Coord::new(self.min_lat, self.min_lon),
            Coord::new(self.min_lat, self.max_lon),
            Coord::new(self.max_lat, self.max_lon),
            Coord::new(self.max_lat, self.min_lon),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bounds_contain_nothing() {
        let b = Bounds::new();
        assert!(b.is_empty());
        assert!(!b.contains(Coord::new(0, 0)));
        assert!(!b.overlaps(&Bounds::from(&[Coord::new(0, 0)])));
    }

    #[test]
    fn union_and_center() {
        let mut b = Bounds::from(&[Coord::new(0, 0), Coord::new(10, 20)]);
        b.union(&Bounds::from(&[Coord::new(30, -20)]));
        assert_eq!(b.min_lat, 0);
        assert_eq!(b.max_lat, 30);
        assert_eq!(b.min_lon, -20);
        assert_eq!(b.max_lon, 20);
        assert_eq!(b.center(), Coord::new(15, 0));
    }

    #[test]
    fn squared_distance_outside() {
        let b = Bounds::from(&[Coord::new(0, 0), Coord::new(10, 10)]);
        assert_eq!(b.squared_dist(Coord::new(5, 5), 1.0), 0.0);
        assert_eq!(b.squared_dist(Coord::new(13, 14), 1.0), 9.0 + 16.0);
    }
}
