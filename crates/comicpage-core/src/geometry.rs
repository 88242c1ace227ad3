use serde::{Deserialize, Serialize};

/// A 2D point in page pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.distance_sq(other) as f64).sqrt()
    }

    /// Squared distance, exact in integers.
    pub fn distance_sq(&self, other: &Point) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// An axis-aligned bounding box, inclusive on both corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Box with its top-left corner at (x, y) and the given extent.
    pub fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            min: Point::new(x, y),
            max: Point::new(x + width, y + height),
        }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = BBox::new(*first, *first);
        for p in &points[1..] {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    /// Centre in continuous coordinates; may fall on a half pixel.
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.min.x) + f64::from(self.width()) / 2.0,
            f64::from(self.min.y) + f64::from(self.height()) / 2.0,
        )
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ]
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// Sign of the turn a -> b -> c: positive for counter-clockwise in a y-up frame.
pub(crate) fn orientation(a: Point, b: Point, c: Point) -> i64 {
    let abx = i64::from(b.x) - i64::from(a.x);
    let aby = i64::from(b.y) - i64::from(a.y);
    let acx = i64::from(c.x) - i64::from(a.x);
    let acy = i64::from(c.y) - i64::from(a.y);
    (abx * acy - aby * acx).signum()
}

/// True when the open segments cross at a single interior point.
pub(crate) fn segments_cross(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);
    d1 * d2 < 0 && d3 * d4 < 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0, 0);
        let b = Point::new(3, 4);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
        assert_eq!(a.distance_sq(&b), 25);
    }

    #[test]
    fn test_bbox_from_points() {
        let points = [Point::new(5, 1), Point::new(-2, 7), Point::new(3, 3)];
        let bbox = BBox::from_points(&points).unwrap();
        assert_eq!(bbox, BBox::new(Point::new(-2, 1), Point::new(5, 7)));
        assert_eq!((bbox.width(), bbox.height()), (7, 6));
        assert!(BBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_bbox_center_on_half_pixel() {
        let bbox = BBox::from_origin_size(10, 10, 5, 4);
        let (cx, cy) = bbox.center();
        assert!((cx - 12.5).abs() < 1e-10);
        assert!((cy - 12.0).abs() < 1e-10);
    }

    #[test]
    fn test_bbox_intersection() {
        let a = BBox::new(Point::new(0, 0), Point::new(10, 10));
        let b = BBox::new(Point::new(5, 5), Point::new(15, 15));
        let c = BBox::new(Point::new(20, 20), Point::new(30, 30));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_segments_cross_excludes_touching() {
        let (a, b) = (Point::new(0, 0), Point::new(10, 10));
        assert!(segments_cross(a, b, Point::new(0, 10), Point::new(10, 0)));
        assert!(!segments_cross(a, b, Point::new(10, 10), Point::new(20, 0)));
        assert!(!segments_cross(a, b, Point::new(0, 5), Point::new(0, 20)));
    }
}
