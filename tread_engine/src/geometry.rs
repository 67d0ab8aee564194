use serde::{Deserialize, Serialize};

/// Integer pixel coordinates. The world grid is non-square: a world tile is
/// roughly twice as tall as it is wide, which is why vertical step quotas
/// and tolerances are half the horizontal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    pub fn manhattan(self, other: Point) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn dist_squared(self, other: Point) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

/// Closed axis-aligned rectangle, all edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Point>,
    {
        let mut iter = points.into_iter();
        let first = iter.next().unwrap_or_default();
        let mut rect = Rect {
            left: first.x,
            top: first.y,
            right: first.x,
            bottom: first.y,
        };
        for p in iter {
            rect.left = rect.left.min(p.x);
            rect.right = rect.right.max(p.x);
            rect.top = rect.top.min(p.y);
            rect.bottom = rect.bottom.max(p.y);
        }
        rect
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }
}

/// Line equation `a*x + b*y + c` derived from two points. The sign of the
/// evaluation tells which side of the line a point lies on; polygon edges
/// are oriented at build time so the interior side evaluates >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEq {
    pub a: i64,
    pub b: i64,
    pub c: i64,
}

impl LineEq {
    pub fn through(p: Point, q: Point) -> Self {
        let a = (q.y - p.y) as i64;
        let b = (p.x - q.x) as i64;
        let c = -(a * p.x as i64 + b * p.y as i64);
        LineEq { a, b, c }
    }

    pub fn side(&self, p: Point) -> i64 {
        self.a * p.x as i64 + self.b * p.y as i64 + self.c
    }

    pub fn negate(&mut self) {
        self.a = -self.a;
        self.b = -self.b;
        self.c = -self.c;
    }
}

/// Perpendicular projection of `t` onto the segment `p..q`. Returns the
/// projected point only when it falls between the endpoints.
pub fn project_onto_segment(p: Point, q: Point, t: Point) -> Option<Point> {
    let vx = (q.x - p.x) as i64;
    let vy = (q.y - p.y) as i64;
    let len2 = vx * vx + vy * vy;
    if len2 == 0 {
        return None;
    }
    let wx = (t.x - p.x) as i64;
    let wy = (t.y - p.y) as i64;
    let dot = wx * vx + wy * vy;
    if dot < 0 || dot > len2 {
        return None;
    }
    let px = p.x as i64 + (dot * vx + len2 / 2) / len2;
    let py = p.y as i64 + (dot * vy + len2 / 2) / len2;
    Some(Point::new(px as i32, py as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_from_points_spans_extremes() {
        let rect = Rect::from_points([
            Point::new(10, 5),
            Point::new(-2, 8),
            Point::new(4, -1),
            Point::new(7, 7),
        ]);
        assert_eq!(rect.left, -2);
        assert_eq!(rect.right, 10);
        assert_eq!(rect.top, -1);
        assert_eq!(rect.bottom, 8);
        assert!(rect.contains(Point::new(0, 0)));
        assert!(!rect.contains(Point::new(11, 0)));
    }

    #[test]
    fn line_side_distinguishes_halves() {
        let line = LineEq::through(Point::new(0, 0), Point::new(10, 0));
        let above = line.side(Point::new(5, -3));
        let below = line.side(Point::new(5, 3));
        assert!(above != 0 && below != 0);
        assert!(above.signum() != below.signum());
        assert_eq!(line.side(Point::new(5, 0)), 0);
    }

    #[test]
    fn projection_stays_within_segment() {
        let p = Point::new(0, 0);
        let q = Point::new(10, 0);
        assert_eq!(
            project_onto_segment(p, q, Point::new(4, 7)),
            Some(Point::new(4, 0))
        );
        assert_eq!(project_onto_segment(p, q, Point::new(-3, 2)), None);
        assert_eq!(project_onto_segment(p, q, Point::new(13, 2)), None);
    }

    #[test]
    fn degenerate_segment_has_no_projection() {
        let p = Point::new(5, 5);
        assert_eq!(project_onto_segment(p, p, Point::new(1, 1)), None);
    }
}
