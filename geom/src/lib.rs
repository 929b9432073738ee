//! Geometry in MC2 units: scaled integer latitude/longitude, where 2^32 units span the whole
//! circle. Everything the map storage engine needs to measure, contain, and clip items lives
//! here.

pub use crate::bounds::Bounds;
pub use crate::coord::Coord;
pub use crate::gfx::{GfxData, GfxPolygon};
pub use crate::units::{Distance, Duration, Speed};

mod bounds;
mod coord;
mod gfx;
mod units;

/// The circumference of the earth in meters, divided by the full MC2 range.
pub const MC2SCALE_TO_METER: f64 = 40_075_016.685578488 / 4_294_967_296.0;
pub const METER_TO_MC2SCALE: f64 = 1.0 / MC2SCALE_TO_METER;
/// Converts MC2 units to radians.
pub const MC2SCALE_TO_RADIANS: f64 = std::f64::consts::PI * 2.0 / 4_294_967_296.0;
pub const MC2SCALE_PER_DEGREE: f64 = 4_294_967_296.0 / 360.0;

/// Squared MC2 distances are compared as f64; this is how a radius in meters becomes one.
pub fn squared_mc2_from_meters(meters: f64) -> f64 {
    let mc2 = meters * METER_TO_MC2SCALE;
    mc2 * mc2
}

pub fn meters_from_squared_mc2(sq_dist: f64) -> Distance {
    Distance::meters(sq_dist.sqrt() * MC2SCALE_TO_METER)
}

/// Orientation of one point relative to a segment, in the same coordinate space.
fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}
