//! Layer borders: closed integer polygons confined to the page with an
//! optional snapping grid.
//!
//! Grid lines sit at `g/2, g/2 + g, g/2 + 2g, ...` on both axes, so with the
//! grid active every vertex satisfies `x mod g == g/2` and `y mod g == g/2`.

use serde::{Deserialize, Serialize};

use crate::error::BorderError;
use crate::geometry::{segments_cross, BBox, Point};

/// Fewest vertices a border may have.
pub const MIN_VERTICES: usize = 3;

/// Smallest usable grid spacing.
pub const MIN_GRID_SPACING: u32 = 2;

type Result<T> = std::result::Result<T, BorderError>;

/// Closed polygon bounding a layer's visible region.
///
/// Vertex order defines the edges; the last vertex connects back to the
/// first. Every validated edit keeps the vertices inside `[0, max_x] x [0, max_y]`
/// and on the grid when it is active. [`BorderPolygon::translate`] is the one
/// unchecked mutation, used while dragging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BorderData", into = "BorderData")]
pub struct BorderPolygon {
    vertices: Vec<Point>,
    max_x: i32,
    max_y: i32,
    grid: Option<u32>,
    /// Bounding box of `vertices`, refreshed after every mutation.
    bounds: BBox,
}

/// Serialized form; the bounding box is derived on load.
#[derive(Serialize, Deserialize)]
struct BorderData {
    vertices: Vec<Point>,
    max_x: i32,
    max_y: i32,
    grid: Option<u32>,
}

impl TryFrom<BorderData> for BorderPolygon {
    type Error = BorderError;

    fn try_from(data: BorderData) -> Result<Self> {
        if data.vertices.len() < MIN_VERTICES {
            return Err(BorderError::TooFewVertices(data.vertices.len()));
        }
        if let Some(g) = data.grid {
            check_grid_spacing(g, data.max_x, data.max_y)?;
        }
        Ok(Self::from_parts(data.vertices, data.max_x, data.max_y, data.grid))
    }
}

impl From<BorderPolygon> for BorderData {
    fn from(border: BorderPolygon) -> Self {
        Self {
            vertices: border.vertices,
            max_x: border.max_x,
            max_y: border.max_y,
            grid: border.grid,
        }
    }
}

impl BorderPolygon {
    /// Creates a border with the grid inactive.
    pub fn new(vertices: Vec<Point>, max_x: i32, max_y: i32) -> Result<Self> {
        if vertices.len() < MIN_VERTICES {
            return Err(BorderError::TooFewVertices(vertices.len()));
        }
        let border = Self::from_parts(Vec::new(), max_x, max_y, None);
        for p in &vertices {
            border.check_bounds(*p)?;
        }
        Ok(Self::from_parts(vertices, max_x, max_y, None))
    }

    /// The default layer border: a rectangle covering the middle half of a
    /// `width` x `height` page.
    pub fn centered_rect(width: u32, height: u32) -> Self {
        let (w, h) = (width as i32, height as i32);
        let (x, y) = (w / 4, h / 4);
        let (cw, ch) = (w / 2, h / 2);
        let vertices = vec![
            Point::new(x, y),
            Point::new(x + cw, y),
            Point::new(x + cw, y + ch),
            Point::new(x, y + ch),
        ];
        Self::from_parts(vertices, w, h, None)
    }

    fn from_parts(vertices: Vec<Point>, max_x: i32, max_y: i32, grid: Option<u32>) -> Self {
        let bounds = BBox::from_points(&vertices).unwrap_or_default();
        Self {
            vertices,
            max_x,
            max_y,
            grid,
            bounds,
        }
    }

    fn refresh_bounds(&mut self) {
        self.bounds = BBox::from_points(&self.vertices).unwrap_or_default();
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn point(&self, index: usize) -> Option<Point> {
        self.vertices.get(index).copied()
    }

    pub fn max_x(&self) -> i32 {
        self.max_x
    }

    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    /// Bounding box of the vertices.
    pub fn bounds(&self) -> BBox {
        self.bounds
    }

    /// Index of the first vertex equal to `p`.
    pub fn vertex_index(&self, p: Point) -> Option<usize> {
        self.vertices.iter().position(|v| *v == p)
    }

    /// Every edge as (start, end), including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Whether every vertex is inside the page bounds. Only a drag via
    /// [`BorderPolygon::translate`] can break this.
    pub fn is_within_bounds(&self) -> bool {
        self.vertices.iter().all(|p| self.in_bounds(*p))
    }

    // ── Grid ─────────────────────────────────────────────────────────

    /// Current grid spacing, `None` when the grid is inactive.
    pub fn grid(&self) -> Option<u32> {
        self.grid
    }

    pub fn grid_active(&self) -> bool {
        self.grid.is_some()
    }

    /// Activates a grid of spacing `g` and snaps the existing vertices onto it.
    ///
    /// Fails with [`BorderError::InvalidGridSpacing`] when `g` is below
    /// [`MIN_GRID_SPACING`] or the first grid line `g/2` lies past either bound.
    pub fn set_grid(&mut self, g: u32) -> Result<()> {
        check_grid_spacing(g, self.max_x, self.max_y)?;
        self.grid = Some(g);
        let snapped: Vec<Point> = self.vertices.iter().map(|p| self.to_grid(*p)).collect();
        self.vertices = snapped;
        self.refresh_bounds();
        log::debug!("Border grid activated with spacing {}", g);
        Ok(())
    }

    pub fn deactivate_grid(&mut self) {
        self.grid = None;
        log::debug!("Border grid deactivated");
    }

    /// Nearest grid point to `p`, clamped into bounds. Without a grid this is
    /// [`BorderPolygon::to_bounds`].
    pub fn to_grid(&self, p: Point) -> Point {
        let Some(g) = self.grid else {
            return self.to_bounds(p);
        };
        let g = g as i32;
        let half = g / 2;
        let snap = |v: i32| {
            let over = (v - half).rem_euclid(g);
            if over < half {
                v - over
            } else {
                v - over + g
            }
        };
        self.to_bounds(Point::new(snap(p.x), snap(p.y)))
    }

    /// Clamps `p` into the bounds. With the grid active the usable range is
    /// `[g/2, last grid line <= max]` on each axis.
    pub fn to_bounds(&self, p: Point) -> Point {
        let (min, max_x, max_y) = match self.grid {
            Some(g) => {
                let g = g as i32;
                let min = g / 2;
                (
                    min,
                    self.max_x - (self.max_x - min).rem_euclid(g),
                    self.max_y - (self.max_y - min).rem_euclid(g),
                )
            }
            None => (0, self.max_x, self.max_y),
        };
        Point::new(p.x.max(min).min(max_x), p.y.max(min).min(max_y))
    }

    fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.x <= self.max_x && p.y >= 0 && p.y <= self.max_y
    }

    fn on_grid(&self, p: Point) -> bool {
        match self.grid {
            Some(g) => {
                let g = g as i32;
                p.x.rem_euclid(g) == g / 2 && p.y.rem_euclid(g) == g / 2
            }
            None => true,
        }
    }

    fn check_bounds(&self, p: Point) -> Result<()> {
        if self.in_bounds(p) {
            Ok(())
        } else {
            Err(BorderError::OutOfBounds {
                x: p.x,
                y: p.y,
                max_x: self.max_x,
                max_y: self.max_y,
            })
        }
    }

    fn check_point(&self, p: Point) -> Result<()> {
        self.check_bounds(p)?;
        match self.grid {
            Some(grid) if !self.on_grid(p) => Err(BorderError::OffGrid { x: p.x, y: p.y, grid }),
            _ => Ok(()),
        }
    }

    // ── Vertex editing ───────────────────────────────────────────────

    pub fn add_point(&mut self, p: Point) -> Result<()> {
        self.check_point(p)?;
        self.vertices.push(p);
        self.refresh_bounds();
        Ok(())
    }

    /// Inserts `p` before the vertex currently at `index`; `index == len` appends.
    pub fn insert_point(&mut self, index: usize, p: Point) -> Result<()> {
        self.check_point(p)?;
        if index > self.vertices.len() {
            return Err(BorderError::IndexOutOfRange {
                index,
                len: self.vertices.len(),
            });
        }
        self.vertices.insert(index, p);
        self.refresh_bounds();
        Ok(())
    }

    pub fn set_point(&mut self, index: usize, p: Point) -> Result<()> {
        self.check_point(p)?;
        let len = self.vertices.len();
        let slot = self
            .vertices
            .get_mut(index)
            .ok_or(BorderError::IndexOutOfRange { index, len })?;
        *slot = p;
        self.refresh_bounds();
        Ok(())
    }

    /// Removes a vertex, refusing with [`BorderError::TooFewVertices`] when
    /// that would leave fewer than three.
    pub fn remove_point(&mut self, index: usize) -> Result<Point> {
        let len = self.vertices.len();
        if len <= MIN_VERTICES {
            return Err(BorderError::TooFewVertices(len - 1));
        }
        if index >= len {
            return Err(BorderError::IndexOutOfRange { index, len });
        }
        let removed = self.vertices.remove(index);
        self.refresh_bounds();
        Ok(removed)
    }

    // ── Whole-polygon transforms ─────────────────────────────────────

    /// Shifts every vertex. Bounds and grid are not checked.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        for v in &mut self.vertices {
            *v = v.translate(dx, dy);
        }
        self.refresh_bounds();
    }

    /// Scales about the bounding-box centre, rounding half up. A vertex that
    /// lands out of bounds or off the grid is snapped with [`BorderPolygon::to_grid`].
    pub fn scale(&mut self, factor: f64) -> Result<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(BorderError::InvalidScaleFactor(factor));
        }
        let (cx, cy) = self.bounds.center();
        let scaled: Vec<Point> = self
            .vertices
            .iter()
            .map(|v| {
                let x = round_half_up((f64::from(v.x) - cx) * factor + cx);
                let y = round_half_up((f64::from(v.y) - cy) * factor + cy);
                let p = Point::new(x, y);
                if self.in_bounds(p) && self.on_grid(p) {
                    p
                } else {
                    self.to_grid(p)
                }
            })
            .collect();
        self.vertices = scaled;
        self.refresh_bounds();
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Vertex nearest to `p`; the first one wins ties.
    pub fn closest_vertex(&self, p: Point) -> Point {
        let mut best = self.vertices[0];
        let mut best_d = best.distance_sq(&p);
        for v in &self.vertices[1..] {
            let d = v.distance_sq(&p);
            if d < best_d {
                best = *v;
                best_d = d;
            }
        }
        best
    }

    /// Point on the boundary nearest to `p`.
    pub fn closest_edge_point(&self, p: Point) -> Point {
        self.closest_edge(p).1
    }

    /// Index of the edge nearest to `p`; edge `i` runs from vertex `i` to `i + 1`.
    pub fn closest_edge_index(&self, p: Point) -> usize {
        self.closest_edge(p).0
    }

    fn closest_edge(&self, p: Point) -> (usize, Point) {
        let mut best = (0, self.vertices[0]);
        let mut best_d = best.1.distance_sq(&p);
        for (i, (a, b)) in self.edges().enumerate() {
            let candidate = closest_point_on_segment(a, b, p);
            let d = candidate.distance_sq(&p);
            if d < best_d {
                best = (i, candidate);
                best_d = d;
            }
        }
        best
    }

    /// Even-odd point-in-polygon test. Points on a left or top edge count as
    /// inside, points on a right or bottom edge as outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            let (ax, ay) = (f64::from(a.x), f64::from(a.y));
            let (bx, by) = (f64::from(b.x), f64::from(b.y));
            if (ay > y) != (by > y) {
                let crossing = ax + (y - ay) * (bx - ax) / (by - ay);
                if x < crossing {
                    inside = !inside;
                }
            }
        }
        inside
    }

    pub fn contains_point(&self, p: Point) -> bool {
        self.contains(f64::from(p.x), f64::from(p.y))
    }

    /// Whether the whole rectangle lies inside: all corners are inside and the
    /// boundary never enters the rectangle.
    pub fn contains_rect(&self, rect: BBox) -> bool {
        if rect.width() <= 0 || rect.height() <= 0 {
            return false;
        }
        let corners = rect.corners();
        if !corners.iter().all(|c| self.contains_point(*c)) {
            return false;
        }
        let strictly_inside = |v: &Point| {
            v.x > rect.min.x && v.x < rect.max.x && v.y > rect.min.y && v.y < rect.max.y
        };
        if self.vertices.iter().any(strictly_inside) {
            return false;
        }
        let sides = [
            (corners[0], corners[1]),
            (corners[1], corners[2]),
            (corners[2], corners[3]),
            (corners[3], corners[0]),
        ];
        !self
            .edges()
            .any(|(a, b)| sides.iter().any(|&(c, d)| segments_cross(a, b, c, d)))
    }
}

fn check_grid_spacing(g: u32, max_x: i32, max_y: i32) -> Result<()> {
    let half = i64::from(g / 2);
    if g < MIN_GRID_SPACING || half > i64::from(max_x) || half > i64::from(max_y) {
        return Err(BorderError::InvalidGridSpacing(g));
    }
    Ok(())
}

/// Nearest integer, halves toward positive infinity.
fn round_half_up(v: f64) -> i32 {
    (v + 0.5).floor() as i32
}

/// `num / den` rounded to the nearest integer, halves away from zero. `den > 0`.
fn div_round(num: i128, den: i128) -> i128 {
    if num >= 0 {
        (2 * num + den) / (2 * den)
    } else {
        -((-2 * num + den) / (2 * den))
    }
}

/// Nearest point to `p` on segment `a`-`b`.
///
/// The perpendicular foot on the infinite line is computed exactly and
/// rounded to the pixel grid; when it falls outside the segment the nearer
/// endpoint is used instead, with `a` winning ties.
fn closest_point_on_segment(a: Point, b: Point, p: Point) -> Point {
    let foot = if a.x == b.x {
        Point::new(a.x, p.y)
    } else if a.y == b.y {
        Point::new(p.x, a.y)
    } else {
        let (ax, ay) = (i128::from(a.x), i128::from(a.y));
        let (dx, dy) = (i128::from(b.x) - ax, i128::from(b.y) - ay);
        let len_sq = dx * dx + dy * dy;
        let dot = (i128::from(p.x) - ax) * dx + (i128::from(p.y) - ay) * dy;
        let x = div_round(ax * len_sq + dot * dx, len_sq);
        let y = div_round(ay * len_sq + dot * dy, len_sq);
        Point::new(x as i32, y as i32)
    };

    let within_x = a.x.min(b.x) <= foot.x && foot.x <= a.x.max(b.x);
    let within_y = a.y.min(b.y) <= foot.y && foot.y <= a.y.max(b.y);
    if within_x && within_y {
        foot
    } else if a.distance_sq(&p) <= b.distance_sq(&p) {
        a
    } else {
        b
    }
}
