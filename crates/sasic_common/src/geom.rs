//! Integer geometry in database units.
//!
//! Coordinates are stored as `i64` database units (DBU) at
//! [`DBU_PER_MICRON`] per micron. Wirelength arithmetic is therefore exact:
//! an HPWL delta recomputed from scratch always equals the tracked delta.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Database units per micron.
pub const DBU_PER_MICRON: i64 = 1000;

/// Converts a micron value to database units, rounding to the nearest unit.
pub fn um_to_dbu(um: f64) -> i64 {
    (um * DBU_PER_MICRON as f64).round() as i64
}

/// Converts database units to microns.
pub fn dbu_to_um(dbu: i64) -> f64 {
    dbu as f64 / DBU_PER_MICRON as f64
}

/// A point on the fabric in database units.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i64,
    /// Vertical coordinate.
    pub y: i64,
}

impl Point {
    /// Creates a point from database-unit coordinates.
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Creates a point from micron coordinates.
    pub fn from_um(x: f64, y: f64) -> Self {
        Self {
            x: um_to_dbu(x),
            y: um_to_dbu(y),
        }
    }

    /// Horizontal coordinate in microns.
    pub fn x_um(self) -> f64 {
        dbu_to_um(self.x)
    }

    /// Vertical coordinate in microns.
    pub fn y_um(self) -> f64 {
        dbu_to_um(self.y)
    }

    /// Manhattan (L1) distance to `other`.
    pub fn manhattan(self, other: Point) -> i64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Squared Euclidean distance to `other`.
    pub fn dist2(self, other: Point) -> i128 {
        let dx = (self.x - other.x) as i128;
        let dy = (self.y - other.y) as i128;
        dx * dx + dy * dy
    }

    /// Ranking key for nearest-site queries: L1 first, L2 breaks ties.
    pub fn nearness(self, target: Point) -> (i64, i128) {
        (self.manhattan(target), self.dist2(target))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x_um(), self.y_um())
    }
}

/// An axis-aligned bounding box accumulated from points.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BBox {
    /// Lower-left corner.
    pub min: Point,
    /// Upper-right corner.
    pub max: Point,
}

impl BBox {
    /// A box covering a single point.
    pub fn from_point(p: Point) -> Self {
        Self { min: p, max: p }
    }

    /// The smallest box covering every point, or `None` for an empty input.
    pub fn of_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut bbox = Self::from_point(iter.next()?);
        for p in iter {
            bbox.include(p);
        }
        Some(bbox)
    }

    /// Grows the box to cover `p`.
    pub fn include(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Width plus height.
    pub fn half_perimeter(&self) -> i64 {
        (self.max.x - self.min.x) + (self.max.y - self.min.y)
    }

    /// Box width.
    pub fn width(&self) -> i64 {
        self.max.x - self.min.x
    }

    /// Box height.
    pub fn height(&self) -> i64 {
        self.max.y - self.min.y
    }

    /// Exact center as a pair of doubled coordinates.
    ///
    /// Keeping the center doubled avoids rounding when comparing points
    /// against it: `2 * p.x > cx2` is the exact form of `p.x > center_x`.
    pub fn center2(&self) -> (i64, i64) {
        (self.min.x + self.max.x, self.min.y + self.max.y)
    }

    /// Center rounded toward negative infinity.
    pub fn center(&self) -> Point {
        let (cx2, cy2) = self.center2();
        Point::new(cx2.div_euclid(2), cy2.div_euclid(2))
    }
}

/// Median of a set of values, or `None` if empty.
///
/// For an even count the two middle values are averaged, rounding down.
pub fn median(values: &mut [i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]).div_euclid(2))
    }
}

/// Coordinate-wise median of a point set.
pub fn median_point(points: &[Point]) -> Option<Point> {
    let mut xs: Vec<i64> = points.iter().map(|p| p.x).collect();
    let mut ys: Vec<i64> = points.iter().map(|p| p.y).collect();
    Some(Point::new(median(&mut xs)?, median(&mut ys)?))
}

/// Arithmetic mean of a point set, rounding down.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as i128;
    let sx: i128 = points.iter().map(|p| p.x as i128).sum();
    let sy: i128 = points.iter().map(|p| p.y as i128).sum();
    Some(Point::new(sx.div_euclid(n) as i64, sy.div_euclid(n) as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micron_conversion_is_exact_at_nanometer_grid() {
        let p = Point::from_um(12.345, 0.46);
        assert_eq!(p, Point::new(12345, 460));
        assert!((p.x_um() - 12.345).abs() < 1e-9);
    }

    #[test]
    fn manhattan_and_euclid() {
        let a = Point::new(0, 0);
        let b = Point::new(3000, 4000);
        assert_eq!(a.manhattan(b), 7000);
        assert_eq!(a.dist2(b), 25_000_000);
    }

    #[test]
    fn nearness_breaks_l1_ties_with_l2() {
        let target = Point::new(0, 0);
        let diagonal = Point::new(2, 2);
        let straight = Point::new(4, 0);
        assert_eq!(diagonal.manhattan(target), straight.manhattan(target));
        assert!(diagonal.nearness(target) < straight.nearness(target));
    }

    #[test]
    fn bbox_half_perimeter() {
        let bbox = BBox::of_points([Point::new(0, 0), Point::new(10, 2), Point::new(4, -3)])
            .unwrap();
        assert_eq!(bbox.half_perimeter(), 10 + 5);
        assert_eq!(bbox.width(), 10);
        assert_eq!(bbox.height(), 5);
    }

    #[test]
    fn bbox_empty_is_none() {
        assert!(BBox::of_points(std::iter::empty()).is_none());
    }

    #[test]
    fn center2_is_exact() {
        let bbox = BBox::of_points([Point::new(0, 0), Point::new(5, 9)]).unwrap();
        assert_eq!(bbox.center2(), (5, 9));
        assert_eq!(bbox.center(), Point::new(2, 4));
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&mut [5, 1, 3]), Some(3));
        assert_eq!(median(&mut [4, 1, 3, 10]), Some(3));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn median_point_is_coordinatewise() {
        let pts = [Point::new(0, 100), Point::new(10, 0), Point::new(20, 50)];
        assert_eq!(median_point(&pts), Some(Point::new(10, 50)));
    }

    #[test]
    fn centroid_of_square() {
        let pts = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(0, 10),
            Point::new(10, 10),
        ];
        assert_eq!(centroid(&pts), Some(Point::new(5, 5)));
        assert_eq!(centroid(&[]), None);
    }
}
