use anyhow::{bail, Result};
use geo::Intersects;
use serde::{Deserialize, Serialize};

use abstutil::DataBuffer;

use crate::{cross, Bounds, Coord, Distance};

/// One ring or line of coordinates. For closed geometry the first point is not repeated at the
/// end; the closing edge is implied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GfxPolygon {
    coords: Vec<Coord>,
}

impl GfxPolygon {
    pub fn new(coords: Vec<Coord>) -> GfxPolygon {
        GfxPolygon { coords }
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    fn segments(&self, closed: bool) -> impl Iterator<Item = (Coord, Coord)> + '_ {
        let closing = if closed && self.coords.len() > 2 {
            Some((self.coords[self.coords.len() - 1], self.coords[0]))
        } else {
            None
        };
        self.coords
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .chain(closing)
    }
}

/// The geometry of one item, or of a whole map: polylines when open, polygons when closed.
/// Routeable items have exactly one open polygon, with node 0 at the first coordinate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GfxData {
    polygons: Vec<GfxPolygon>,
    closed: bool,
    #[serde(skip)]
    bounds: Bounds,
}

/// Where on some geometry a query point is closest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClosestPoint {
    pub polygon: usize,
    /// Index of the segment's first coordinate
    pub segment: usize,
    pub pt: Coord,
    pub squared_dist: f64,
}

impl GfxData {
    pub fn new(closed: bool) -> GfxData {
        GfxData {
            polygons: Vec::new(),
            closed,
            bounds: Bounds::new(),
        }
    }

    pub fn polyline(coords: Vec<Coord>) -> GfxData {
        let mut gfx = GfxData::new(false);
        gfx.add_polygon(coords);
        gfx
    }

    pub fn polygon(coords: Vec<Coord>) -> GfxData {
        let mut gfx = GfxData::new(true);
        gfx.add_polygon(coords);
        gfx
    }

    pub fn point(pt: Coord) -> GfxData {
        GfxData::polyline(vec![pt])
    }

    /// A closed rectangle covering some bounds, used for map extents.
    pub fn from_bounds(b: &Bounds) -> GfxData {
        GfxData::polygon(b.corners())
    }

    pub fn add_polygon(&mut self, coords: Vec<Coord>) {
        for pt in &coords {
            self.bounds.update(*pt);
        }
        self.polygons.push(GfxPolygon::new(coords));
    }

    pub fn add_coordinate(&mut self, polygon: usize, pt: Coord) {
        self.polygons[polygon].coords.push(pt);
        self.bounds.update(pt);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn polygons(&self) -> &[GfxPolygon] {
        &self.polygons
    }

    pub fn nbr_polygons(&self) -> usize {
        self.polygons.len()
    }

    pub fn nbr_coordinates(&self, polygon: usize) -> usize {
        self.polygons.get(polygon).map(|p| p.len()).unwrap_or(0)
    }

    pub fn total_coordinates(&self) -> usize {
        self.polygons.iter().map(|p| p.len()).sum()
    }

    pub fn first_coord(&self) -> Option<Coord> {
        self.polygons.first()?.coords.first().copied()
    }

    pub fn last_coord(&self) -> Option<Coord> {
        self.polygons.first()?.coords.last().copied()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn center(&self) -> Option<Coord> {
        if self.bounds.is_empty() {
            None
        } else {
            Some(self.bounds.center())
        }
    }

    fn recompute_bounds(&mut self) {
        let mut b = Bounds::new();
        for poly in &self.polygons {
            for pt in &poly.coords {
                b.update(*pt);
            }
        }
        self.bounds = b;
    }

    /// Length of one polygon. The closing edge counts for closed geometry.
    pub fn length(&self, polygon: usize) -> Distance {
        match self.polygons.get(polygon) {
            Some(poly) => poly.segments(self.closed).map(|(a, b)| a.dist(b)).sum(),
            None => Distance::ZERO,
        }
    }

    pub fn total_length(&self) -> Distance {
        (0..self.polygons.len()).map(|idx| self.length(idx)).sum()
    }

    /// Is the point inside (or on the edge of) any polygon? Always false for open geometry.
    pub fn contains(&self, pt: Coord) -> bool {
        if !self.closed || !self.bounds.contains(pt) {
            return false;
        }
        let cos = pt.cos_lat();
        let query = geo::Point::from(pt.to_plane(cos));
        self.polygons
            .iter()
            .filter(|poly| poly.len() >= 3)
            .any(|poly| {
                let ring: Vec<(f64, f64)> = poly.coords.iter().map(|c| c.to_plane(cos)).collect();
                geo::Polygon::new(geo::LineString::from(ring), Vec::new()).intersects(&query)
            })
    }

    /// Finds the closest point on the geometry's edges. Scales longitude by the query point's
    /// latitude.
    pub fn closest_point(&self, pt: Coord) -> Option<ClosestPoint> {
        let cos = pt.cos_lat();
        let q = pt.to_plane(cos);
        let mut best: Option<ClosestPoint> = None;
        for (poly_idx, poly) in self.polygons.iter().enumerate() {
            if poly.len() == 1 {
                let sq = pt.squared_dist_with_cos(poly.coords[0], cos);
                if best.map(|b| sq < b.squared_dist).unwrap_or(true) {
                    best = Some(ClosestPoint {
                        polygon: poly_idx,
                        segment: 0,
                        pt: poly.coords[0],
                        squared_dist: sq,
                    });
                }
                continue;
            }
            for (seg_idx, (a, b)) in poly.segments(self.closed).enumerate() {
                let (t, proj) = project_on_segment(q, a.to_plane(cos), b.to_plane(cos));
                let sq = (proj.0 - q.0).powi(2) + (proj.1 - q.1).powi(2);
                if best.map(|x| sq < x.squared_dist).unwrap_or(true) {
                    best = Some(ClosestPoint {
                        polygon: poly_idx,
                        segment: seg_idx,
                        pt: interpolate(a, b, t),
                        squared_dist: sq,
                    });
                }
            }
        }
        best
    }

    /// Squared MC2 distance to the geometry; 0 inside closed geometry.
    pub fn squared_dist(&self, pt: Coord) -> Option<f64> {
        if self.contains(pt) {
            return Some(0.0);
        }
        self.closest_point(pt).map(|c| c.squared_dist)
    }

    /// The point at some fraction in [0, 1] of the way along one polyline.
    pub fn coord_at_fraction(&self, polygon: usize, fraction: f64) -> Option<Coord> {
        let poly = self.polygons.get(polygon)?;
        if poly.len() == 1 {
            return poly.coords.first().copied();
        }
        let total = self.length(polygon).inner_meters();
        let mut left = total * fraction.clamp(0.0, 1.0);
        for (a, b) in poly.segments(self.closed) {
            let len = a.dist(b).inner_meters();
            if left <= len {
                let t = if len == 0.0 { 0.0 } else { left / len };
                return Some(interpolate(a, b, t));
            }
            left -= len;
        }
        poly.coords.last().copied()
    }

    /// How far along one polyline the point closest to `pt` is, as a fraction in [0, 1].
    pub fn fraction_along(&self, polygon: usize, pt: Coord) -> Option<f64> {
        let poly = self.polygons.get(polygon)?;
        let total = self.length(polygon).inner_meters();
        if total == 0.0 {
            return Some(0.0);
        }
        let cos = pt.cos_lat();
        let q = pt.to_plane(cos);
        let mut so_far = 0.0;
        let mut best: Option<(f64, f64)> = None;
        for (a, b) in poly.segments(self.closed) {
            let len = a.dist(b).inner_meters();
            let (t, proj) = project_on_segment(q, a.to_plane(cos), b.to_plane(cos));
            let sq = (proj.0 - q.0).powi(2) + (proj.1 - q.1).powi(2);
            if best.map(|(x, _)| sq < x).unwrap_or(true) {
                best = Some((sq, so_far + t * len));
            }
            so_far += len;
        }
        best.map(|(_, along)| (along / total).clamp(0.0, 1.0))
    }

    /// Clips to a box. Closed polygons are clipped with Sutherland-Hodgman; open lines are cut
    /// into the pieces that lie inside. None if nothing remains.
    pub fn clip(&self, b: &Bounds) -> Option<GfxData> {
        if !self.bounds.overlaps(b) {
            return None;
        }
        let mut result = GfxData::new(self.closed);
        for poly in &self.polygons {
            if self.closed {
                let clipped = clip_ring(&poly.coords, b);
                if clipped.len() >= 3 {
                    result.add_polygon(clipped);
                }
            } else {
                for piece in clip_line(&poly.coords, b) {
                    result.add_polygon(piece);
                }
            }
        }
        if result.polygons.is_empty() {
            None
        } else {
            Some(result)
        }
    }

    /// Bytes used on the heap and inline, for diagnostics.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<GfxData>()
            + self
                .polygons
                .iter()
                .map(|p| {
                    std::mem::size_of::<GfxPolygon>()
                        + p.coords.capacity() * std::mem::size_of::<Coord>()
                })
                .sum::<usize>()
    }

    pub fn save(&self, buf: &mut DataBuffer) -> Result<()> {
        let nbr_polygons = match u16::try_from(self.polygons.len()) {
            Ok(n) => n,
            Err(_) => bail!("{} polygons is more than can be saved", self.polygons.len()),
        };
        buf.write_bool(self.closed);
        buf.write_u8(0);
        buf.write_u16(nbr_polygons);
        for poly in &self.polygons {
            buf.write_u32(poly.coords.len() as u32);
            for pt in &poly.coords {
                buf.write_i32(pt.lat);
                buf.write_i32(pt.lon);
            }
        }
        Ok(())
    }

    pub fn load(buf: &mut DataBuffer) -> Result<GfxData> {
        let closed = buf.read_bool()?;
        buf.read_u8()?;
        let nbr_polygons = buf.read_u16()?;
        let mut gfx = GfxData::new(closed);
        for _ in 0..nbr_polygons {
            let n = buf.read_u32()? as usize;
            if n * 8 > buf.remaining() {
                bail!("GfxData claims {} coordinates, but the buffer is too short", n);
            }
            let mut coords = Vec::with_capacity(n);
            for _ in 0..n {
                let lat = buf.read_i32()?;
                let lon = buf.read_i32()?;
                coords.push(Coord::new(lat, lon));
            }
            gfx.polygons.push(GfxPolygon::new(coords));
        }
        gfx.recompute_bounds();
        Ok(gfx)
    }
}

fn project_on_segment(q: (f64, f64), a: (f64, f64), b: (f64, f64)) -> (f64, (f64, f64)) {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return (0.0, a);
    }
    let t = (((q.0 - a.0) * dx + (q.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0);
    (t, (a.0 + t * dx, a.1 + t * dy))
}

fn interpolate(a: Coord, b: Coord, t: f64) -> Coord {
    Coord::new(
        (f64::from(a.lat) + t * (f64::from(b.lat) - f64::from(a.lat))).round() as i32,
        (f64::from(a.lon) + t * (f64::from(b.lon) - f64::from(a.lon))).round() as i32,
    )
}

#[derive(Clone, Copy)]
enum Edge {
    MinLat,
    MaxLat,
    MinLon,
    MaxLon,
}

impl Edge {
    fn inside(self, pt: Coord, b: &Bounds) -> bool {
        match self {
            Edge::MinLat => pt.lat >= b.min_lat,
            Edge::MaxLat => pt.lat <= b.max_lat,
            Edge::MinLon => pt.lon >= b.min_lon,
            Edge::MaxLon => pt.lon <= b.max_lon,
        }
    }

    fn intersect(self, p: Coord, q: Coord, b: &Bounds) -> Coord {
        let (p_lat, p_lon) = (f64::from(p.lat), f64::from(p.lon));
        let (q_lat, q_lon) = (f64::from(q.lat), f64::from(q.lon));
        match self {
            Edge::MinLat | Edge::MaxLat => {
                let lat = if let Edge::MinLat = self { b.min_lat } else { b.max_lat };
                let t = (f64::from(lat) - p_lat) / (q_lat - p_lat);
                Coord::new(lat, (p_lon + t * (q_lon - p_lon)).round() as i32)
            }
            Edge::MinLon | Edge::MaxLon => {
                let lon = if let Edge::MinLon = self { b.min_lon } else { b.max_lon };
                let t = (f64::from(lon) - p_lon) / (q_lon - p_lon);
                Coord::new((p_lat + t * (q_lat - p_lat)).round() as i32, lon)
            }
        }
    }
}

const EDGES: [Edge; 4] = [Edge::MinLat, Edge::MaxLat, Edge::MinLon, Edge::MaxLon];

fn clip_ring(pts: &[Coord], b: &Bounds) -> Vec<Coord> {
    let mut output: Vec<Coord> = pts.to_vec();
    for edge in EDGES {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        let mut prev = input[input.len() - 1];
        for pt in input {
            let cur_in = edge.inside(pt, b);
            let prev_in = edge.inside(prev, b);
            if cur_in {
                if !prev_in {
                    output.push(edge.intersect(prev, pt, b));
                }
                output.push(pt);
            } else if prev_in {
                output.push(edge.intersect(prev, pt, b));
            }
            prev = pt;
        }
    }
    output.dedup();
    output
}

fn clip_line(pts: &[Coord], b: &Bounds) -> Vec<Vec<Coord>> {
    let mut pieces = Vec::new();
    let mut current: Vec<Coord> = Vec::new();
    if pts.len() == 1 {
        if b.contains(pts[0]) {
            pieces.push(pts.to_vec());
        }
        return pieces;
    }
    for pair in pts.windows(2) {
        match clip_segment(pair[0], pair[1], b) {
            Some((p, q)) => {
                if current.last() != Some(&p) {
                    if current.len() >= 2 {
                        pieces.push(std::mem::take(&mut current));
                    }
                    current.clear();
                    current.push(p);
                }
                current.push(q);
            }
            None => {
                if current.len() >= 2 {
                    pieces.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
    }
    if current.len() >= 2 {
        pieces.push(current);
    }
    pieces
}

// Liang-Barsky
fn clip_segment(p: Coord, q: Coord, b: &Bounds) -> Option<(Coord, Coord)> {
    let (x0, y0) = (f64::from(p.lon), f64::from(p.lat));
    let (dx, dy) = (f64::from(q.lon) - x0, f64::from(q.lat) - y0);
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (pk, qk) in [
        (-dx, x0 - f64::from(b.min_lon)),
        (dx, f64::from(b.max_lon) - x0),
        (-dy, y0 - f64::from(b.min_lat)),
        (dy, f64::from(b.max_lat) - y0),
    ] {
        if pk == 0.0 {
            if qk < 0.0 {
                return None;
            }
        } else {
            let r = qk / pk;
            if pk < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }
    if t0 > t1 {
        return None;
    }
    let start = if t0 == 0.0 { p } else { interpolate(p, q, t0) };
    let end = if t1 == 1.0 { q } else { interpolate(p, q, t1) };
    Some((start, end))
}

/// Do segments ab and cd properly cross? Touching endpoints don't count.
pub(crate) fn segments_cross(a: Coord, b: Coord, c: Coord, d: Coord) -> bool {
    let (a, b, c, d) = (a.to_plane(1.0), b.to_plane(1.0), c.to_plane(1.0), d.to_plane(1.0));
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

impl GfxData {
    /// Does any edge of this geometry cross any edge of the other?
    pub fn crosses(&self, other: &GfxData) -> bool {
        if !self.bounds.overlaps(&other.bounds) {
            return false;
        }
        for p1 in &self.polygons {
            for (a, b) in p1.segments(self.closed) {
                for p2 in &other.polygons {
                    for (c, d) in p2.segments(other.closed) {
                        if segments_cross(a, b, c, d) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    use super::*;

    fn square(size: i32) -> GfxData {
        GfxData::polygon(vec![
            Coord::new(0, 0),
            Coord::new(0, size),
            Coord::new(size, size),
            Coord::new(size, 0),
        ])
    }

    #[test]
    fn polygon_contains() {
        let sq = square(1000);
        assert!(sq.contains(Coord::new(500, 500)));
        assert!(sq.contains(Coord::new(0, 500)));
        assert!(!sq.contains(Coord::new(1500, 500)));
        assert_eq!(sq.squared_dist(Coord::new(500, 500)), Some(0.0));
        // Lines never contain anything
        let line = GfxData::polyline(vec![Coord::new(0, 0), Coord::new(1000, 1000)]);
        assert!(!line.contains(Coord::new(500, 500)));
    }

    #[test]
    fn polyline_length_and_fractions() {
        let start = Coord::from_degrees(59.3, 18.0);
        let end = start.offset_meters(100.0, 0.0);
        let line = GfxData::polyline(vec![start, end]);
        assert!((line.length(0).inner_meters() - 100.0).abs() < 0.05);

        let middle = line.coord_at_fraction(0, 0.5).unwrap();
        assert!((start.dist(middle).inner_meters() - 50.0).abs() < 0.05);
        let frac = line.fraction_along(0, middle).unwrap();
        assert!((frac - 0.5).abs() < 1e-3);
    }

    #[test]
    fn closest_point_on_line() {
        let line = GfxData::polyline(vec![Coord::new(0, 0), Coord::new(0, 1000)]);
        let closest = line.closest_point(Coord::new(30, 400)).unwrap();
        assert_eq!(closest.pt, Coord::new(0, 400));
        assert!((closest.squared_dist - 900.0).abs() < 1e-6);
    }

    #[test]
    fn clipping() {
        let sq = square(1000);
        let clipped = sq
            .clip(&Bounds::from(&[Coord::new(500, 500), Coord::new(2000, 2000)]))
            .unwrap();
        assert_eq!(
            clipped.bounds(),
            Bounds::from(&[Coord::new(500, 500), Coord::new(1000, 1000)])
        );

        let line = GfxData::polyline(vec![Coord::new(0, -500), Coord::new(0, 500), Coord::new(0, 1500)]);
        let clipped = line
            .clip(&Bounds::from(&[Coord::new(-10, 0), Coord::new(10, 1000)]))
            .unwrap();
        assert_eq!(clipped.nbr_polygons(), 1);
        assert_eq!(clipped.first_coord(), Some(Coord::new(0, 0)));
        assert_eq!(clipped.last_coord(), Some(Coord::new(0, 1000)));

        assert!(sq
            .clip(&Bounds::from(&[Coord::new(5000, 5000), Coord::new(6000, 6000)]))
            .is_none());
    }

    #[test]
    fn crossing_lines() {
        let a = GfxData::polyline(vec![Coord::new(0, 0), Coord::new(100, 100)]);
        let b = GfxData::polyline(vec![Coord::new(0, 100), Coord::new(100, 0)]);
        let c = GfxData::polyline(vec![Coord::new(200, 200), Coord::new(300, 300)]);
        assert!(a.crosses(&b));
        assert!(!a.crosses(&c));
    }

    #[test]
    fn save_and_load_random_geometry() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        for closed in [false, true] {
            let mut gfx = GfxData::new(closed);
            for _ in 0..3 {
                let coords = (0..rng.gen_range(1..20))
                    .map(|_| Coord::new(rng.gen(), rng.gen()))
                    .collect();
                gfx.add_polygon(coords);
            }
            let mut buf = DataBuffer::new();
            gfx.save(&mut buf).unwrap();
            let mut read = DataBuffer::from_bytes(buf.into_bytes());
            let loaded = GfxData::load(&mut read).unwrap();
            assert_eq!(loaded, gfx);
            assert_eq!(loaded.bounds(), gfx.bounds());
        }
    }

    #[test]
    fn too_many_polygons_dont_save() {
        let mut gfx = GfxData::new(false);
        for i in 0..=u16::MAX as i32 {
            gfx.add_polygon(vec![Coord::new(i, i)]);
        }
        assert_eq!(gfx.nbr_polygons(), u16::MAX as usize + 1);
        assert!(gfx.save(&mut DataBuffer::new()).is_err());
    }
}
