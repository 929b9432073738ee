use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Distance, MC2SCALE_PER_DEGREE, MC2SCALE_TO_METER, MC2SCALE_TO_RADIANS};

/// A point in MC2 units. Latitude is y, longitude is x.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub lat: i32,
    pub lon: i32,
}

impl Coord {
    /// Used on disk and in side tables for "no coordinate yet".
    pub const INVALID: Coord = Coord {
        lat: i32::MAX,
        lon: i32::MAX,
    };

    pub fn new(lat: i32, lon: i32) -> Coord {
        Coord { lat, lon }
    }

    pub fn from_degrees(lat: f64, lon: f64) -> Coord {
        Coord {
            lat: (lat * MC2SCALE_PER_DEGREE).round() as i32,
            lon: (lon * MC2SCALE_PER_DEGREE).round() as i32,
        }
    }

    pub fn to_degrees(self) -> (f64, f64) {
        (
            f64::from(self.lat) / MC2SCALE_PER_DEGREE,
            f64::from(self.lon) / MC2SCALE_PER_DEGREE,
        )
    }

    pub fn is_valid(self) -> bool {
        self != Coord::INVALID
    }

    /// Longitudes shrink towards the poles; multiply a longitude difference by this to get
    /// comparable units.
    pub fn cos_lat(self) -> f64 {
        (f64::from(self.lat) * MC2SCALE_TO_RADIANS).cos()
    }

    /// Squared distance in MC2 units, scaling longitude by the cosine of this point's latitude.
    pub fn squared_dist(self, other: Coord) -> f64 {
        self.squared_dist_with_cos(other, self.cos_lat())
    }

    pub fn squared_dist_with_cos(self, other: Coord, cos_lat: f64) -> f64 {
        let dlat = f64::from(self.lat) - f64::from(other.lat);
        let dlon = (f64::from(self.lon) - f64::from(other.lon)) * cos_lat;
        dlat * dlat + dlon * dlon
    }

    pub fn dist(self, other: Coord) -> Distance {
        Distance::meters(self.squared_dist(other).sqrt() * MC2SCALE_TO_METER)
    }

    /// Moves by a number of meters north and east. Used to build test geometry and search
    /// boxes.
    pub fn offset_meters(self, north: f64, east: f64) -> Coord {
        let dlat = north / MC2SCALE_TO_METER;
        let cos = self.cos_lat().max(1e-9);
        let dlon = east / MC2SCALE_TO_METER / cos;
        Coord {
            lat: (f64::from(self.lat) + dlat).round() as i32,
            lon: (f64::from(self.lon) + dlon).round() as i32,
        }
    }

    /// Projected into a plane where both axes have the same scale at `cos_lat`.
    pub(crate) fn to_plane(self, cos_lat: f64) -> (f64, f64) {
        (f64::from(self.lon) * cos_lat, f64::from(self.lat))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees_round_trip() {
        let c = Coord::from_degrees(57.7, 11.97);
        let (lat, lon) = c.to_degrees();
        assert!((lat - 57.7).abs() < 1e-6);
        assert!((lon - 11.97).abs() < 1e-6);
    }

    #[test]
    fn offsets_are_measured_in_meters() {
        let base = Coord::from_degrees(55.6, 13.0);
        let north = base.offset_meters(100.0, 0.0);
        assert!((base.dist(north).inner_meters() - 100.0).abs() < 0.05);
        let east = base.offset_meters(0.0, 250.0);
        assert!((base.dist(east).inner_meters() - 250.0).abs() < 0.5);
    }
}
