use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tread_formats::{PolygonDef, PolygonKind, SceneFile};

use crate::error::NavError;
use crate::geometry::{LineEq, Point, Rect};

/// Fixed per-polygon capacity for the derived adjacency list. Exceeding it
/// is a scene-configuration fault, not a runtime condition.
pub const MAX_ADJACENT: usize = 10;

/// Number of depth zones a path polygon's vertical span is divided into
/// when interpolating between its far and near scale values.
pub const SCALE_ZONES: i32 = 6;

/// Stable handle into the polygon arena. Handles stay valid until the scene
/// is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolyId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolyKind {
    Path,
    NodePath,
    Block,
    Refer,
    Tag,
    Exit,
    Effect,
    DeadBlock,
    DeadTag,
    DeadExit,
}

impl PolyKind {
    fn from_def(kind: PolygonKind) -> Self {
        match kind {
            PolygonKind::Path => PolyKind::Path,
            PolygonKind::Node => PolyKind::NodePath,
            PolygonKind::Block => PolyKind::Block,
            PolygonKind::Refer => PolyKind::Refer,
            PolygonKind::Tag => PolyKind::Tag,
            PolygonKind::Exit => PolyKind::Exit,
            PolygonKind::Effect => PolyKind::Effect,
        }
    }

    /// The paired kind a runtime disable flips to, if this kind supports it.
    pub fn disabled(self) -> Option<PolyKind> {
        match self {
            PolyKind::Block => Some(PolyKind::DeadBlock),
            PolyKind::Tag => Some(PolyKind::DeadTag),
            PolyKind::Exit => Some(PolyKind::DeadExit),
            _ => None,
        }
    }

    pub fn enabled(self) -> Option<PolyKind> {
        match self {
            PolyKind::DeadBlock => Some(PolyKind::Block),
            PolyKind::DeadTag => Some(PolyKind::Tag),
            PolyKind::DeadExit => Some(PolyKind::Exit),
            _ => None,
        }
    }

    /// Path-class polygons are the ones actors may occupy and the only ones
    /// that participate in adjacency and routing.
    pub fn is_path(self) -> bool {
        matches!(self, PolyKind::Path | PolyKind::NodePath)
    }
}

#[derive(Debug, Clone)]
struct Edge {
    bound: Rect,
    line: LineEq,
}

#[derive(Debug, Clone)]
pub struct Polygon {
    /// Definition-order uid, stable across scene reloads; the dead/alive
    /// flags persisted in save games are keyed by it.
    pub uid: u32,
    pub name: String,
    pub kind: PolyKind,
    pub corners: [Point; 4],
    pub nodes: Vec<Point>,
    /// Line coefficients per node segment, used for perpendicular projection.
    pub segments: Vec<LineEq>,
    pub scale_near: i32,
    pub scale_far: i32,
    bound: Rect,
    edges: [Edge; 4],
    inner: Rect,
    pseudo_centre: Point,
    adjacent: Vec<PolyId>,
}

impl Polygon {
    fn build(uid: u32, def: &PolygonDef) -> Result<Self, NavError> {
        let kind = PolyKind::from_def(def.kind);
        let corners = [
            Point::new(def.corners[0].0, def.corners[0].1),
            Point::new(def.corners[1].0, def.corners[1].1),
            Point::new(def.corners[2].0, def.corners[2].1),
            Point::new(def.corners[3].0, def.corners[3].1),
        ];
        let nodes: Vec<Point> = def.nodes.iter().map(|&(x, y)| Point::new(x, y)).collect();
        if kind == PolyKind::NodePath && nodes.len() < 2 {
            return Err(NavError::MalformedNodePath(def.name.clone()));
        }
        let segments = nodes
            .windows(2)
            .map(|pair| LineEq::through(pair[0], pair[1]))
            .collect();

        let bound = Rect::from_points(corners);
        let centroid = Point::new(
            (corners[0].x + corners[1].x + corners[2].x + corners[3].x) / 4,
            (corners[0].y + corners[1].y + corners[2].y + corners[3].y) / 4,
        );

        // Orient every edge so the interior side evaluates >= 0. The shoelace
        // sign handles reversed windings; a degenerate quad falls back to a
        // per-edge check against the centroid.
        let shoelace: i64 = (0..4)
            .map(|i| {
                let p = corners[i];
                let q = corners[(i + 1) % 4];
                p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64
            })
            .sum();
        let mut edges = Vec::with_capacity(4);
        for i in 0..4 {
            let p = corners[i];
            let q = corners[(i + 1) % 4];
            let mut line = LineEq::through(p, q);
            if shoelace > 0 || (shoelace == 0 && line.side(centroid) < 0) {
                line.negate();
            }
            edges.push(Edge {
                bound: Rect::from_points([p, q]),
                line,
            });
        }
        let edges: [Edge; 4] = [
            edges[0].clone(),
            edges[1].clone(),
            edges[2].clone(),
            edges[3].clone(),
        ];

        let inner = internal_rect(&corners);

        let mut poly = Polygon {
            uid,
            name: def.name.clone(),
            kind,
            corners,
            nodes,
            segments,
            scale_near: def.scale_near,
            scale_far: def.scale_far,
            bound,
            edges,
            inner,
            pseudo_centre: centroid,
            adjacent: Vec::new(),
        };
        poly.pseudo_centre = poly.sample_pseudo_centre(centroid);
        Ok(poly)
    }

    /// Containment contract: inside the bounding box, a point is in the
    /// polygon iff it passes the half-plane test on at least one edge whose
    /// sub-rectangle covers it; if no edge sub-rectangle covers it, the
    /// internal rectangle decides. Corners of a blocking polygon count as
    /// outside so actors can brush past them.
    pub fn contains(&self, p: Point) -> bool {
        if !self.bound.contains(p) {
            return false;
        }
        if matches!(self.kind, PolyKind::Block | PolyKind::DeadBlock)
            && self.corners.iter().any(|&c| c == p)
        {
            return false;
        }
        let mut tested = false;
        for edge in &self.edges {
            if edge.bound.contains(p) {
                tested = true;
                if edge.line.side(p) >= 0 {
                    return true;
                }
            }
        }
        if !tested {
            return self.inner.contains(p);
        }
        false
    }

    pub fn pseudo_centre(&self) -> Point {
        self.pseudo_centre
    }

    pub fn bound(&self) -> Rect {
        self.bound
    }

    pub fn adjacent_paths(&self) -> &[PolyId] {
        &self.adjacent
    }

    /// Scale band for a y coordinate: linear interpolation from the far
    /// scale at the top of the polygon to the near scale at the bottom,
    /// quantized into `SCALE_ZONES` depth zones. Constant when the two
    /// scale values agree.
    pub fn scale_at(&self, y: i32) -> i32 {
        if self.scale_near == self.scale_far {
            return self.scale_near;
        }
        let span = (self.bound.bottom - self.bound.top).max(1);
        let offset = (y - self.bound.top).clamp(0, span);
        let zone = (offset * SCALE_ZONES / span).min(SCALE_ZONES - 1);
        let delta = (self.scale_near - self.scale_far) * zone / (SCALE_ZONES - 1).max(1);
        self.scale_far + delta
    }

    fn sample_pseudo_centre(&self, centroid: Point) -> Point {
        if self.contains(centroid) {
            return centroid;
        }
        // Centroid landed outside (non-convex or reversed polygon): sample
        // the centroid column, then the centroid row, for interior points
        // and take the middle one.
        let column: Vec<i32> = (self.bound.top..=self.bound.bottom)
            .filter(|&y| self.contains(Point::new(centroid.x, y)))
            .collect();
        if !column.is_empty() {
            return Point::new(centroid.x, column[column.len() / 2]);
        }
        let row: Vec<i32> = (self.bound.left..=self.bound.right)
            .filter(|&x| self.contains(Point::new(x, centroid.y)))
            .collect();
        if !row.is_empty() {
            return Point::new(row[row.len() / 2], centroid.y);
        }
        centroid
    }
}

/// Middle-two sorted corner coordinates: the rectangle certainly interior
/// to any non-degenerate quadrilateral, used when no edge sub-rectangle
/// covers the queried point.
fn internal_rect(corners: &[Point; 4]) -> Rect {
    let mut xs: Vec<i32> = corners.iter().map(|c| c.x).collect();
    let mut ys: Vec<i32> = corners.iter().map(|c| c.y).collect();
    xs.sort_unstable();
    ys.sort_unstable();
    Rect {
        left: xs[1],
        right: xs[2],
        top: ys[1],
        bottom: ys[2],
    }
}

/// Arena of the current scene's polygons plus the dead/alive flags that
/// outlive any single scene.
#[derive(Debug, Default)]
pub struct PolygonStore {
    polys: Vec<Polygon>,
    no_path: bool,
    /// Uids of disabled block/tag/exit polygons; survives scene reloads and
    /// is captured into save state.
    dead: BTreeSet<u32>,
}

impl PolygonStore {
    pub fn new() -> Self {
        PolygonStore::default()
    }

    /// Build the scene's polygons, apply persisted dead flags, and derive
    /// the path adjacency lists. Replaces any previously loaded scene.
    pub fn load_scene(&mut self, scene: &SceneFile) -> Result<(), NavError> {
        self.polys.clear();
        self.no_path = scene.no_path;
        for (index, def) in scene.polygons.iter().enumerate() {
            let mut poly = Polygon::build(index as u32, def)?;
            if self.dead.contains(&poly.uid) {
                if let Some(dead_kind) = poly.kind.disabled() {
                    poly.kind = dead_kind;
                }
            }
            self.polys.push(poly);
        }
        self.link_adjacencies()
    }

    /// Scene teardown: polygons go away, persistent dead flags stay.
    pub fn drop_scene(&mut self) {
        self.polys.clear();
        self.no_path = false;
    }

    pub fn no_path(&self) -> bool {
        self.no_path
    }

    pub fn len(&self) -> usize {
        self.polys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polys.is_empty()
    }

    pub fn poly(&self, id: PolyId) -> Option<&Polygon> {
        self.polys.get(id.0)
    }

    pub fn ids(&self) -> impl Iterator<Item = PolyId> + '_ {
        (0..self.polys.len()).map(PolyId)
    }

    pub fn is_inside(&self, p: Point, id: PolyId) -> bool {
        self.poly(id).map(|poly| poly.contains(p)).unwrap_or(false)
    }

    /// Definition-order scan over live polygons of the requested kind;
    /// first match wins. Callers must not rely on overlap priority beyond
    /// that ordering.
    pub fn find_containing(&self, p: Point, kind: PolyKind) -> Option<PolyId> {
        self.polys
            .iter()
            .enumerate()
            .find(|(_, poly)| poly.kind == kind && poly.contains(p))
            .map(|(index, _)| PolyId(index))
    }

    /// First path-class polygon (ordinary before node is not imposed; scene
    /// definition order decides) containing the point.
    pub fn find_path_at(&self, p: Point) -> Option<PolyId> {
        self.polys
            .iter()
            .enumerate()
            .find(|(_, poly)| poly.kind.is_path() && poly.contains(p))
            .map(|(index, _)| PolyId(index))
    }

    /// First enabled blocking polygon containing the point.
    pub fn blocking_at(&self, p: Point) -> Option<PolyId> {
        self.find_containing(p, PolyKind::Block)
    }

    pub fn adjacent(&self, a: PolyId, b: PolyId) -> bool {
        if a == b {
            return true;
        }
        self.poly(a)
            .map(|poly| poly.adjacent.contains(&b))
            .unwrap_or(false)
    }

    pub fn pseudo_centre(&self, id: PolyId) -> Point {
        self.poly(id).map(|poly| poly.pseudo_centre).unwrap_or_default()
    }

    pub fn corner(&self, id: PolyId, index: usize) -> Option<Point> {
        self.poly(id).and_then(|poly| poly.corners.get(index).copied())
    }

    /// Corner points the two polygons have in common, deduplicated; the
    /// corner-seeking recovery strategies walk this list.
    pub fn shared_corners(&self, a: PolyId, b: PolyId) -> Vec<Point> {
        let (Some(pa), Some(pb)) = (self.poly(a), self.poly(b)) else {
            return Vec::new();
        };
        let mut shared = Vec::new();
        for &corner in &pa.corners {
            if pb.corners.contains(&corner) && !shared.contains(&corner) {
                shared.push(corner);
            }
        }
        shared
    }

    /// Disable a block/tag/exit polygon by uid. A no-op for other kinds.
    /// The flag persists across scene reloads until re-enabled.
    pub fn disable_polygon(&mut self, uid: u32) {
        self.dead.insert(uid);
        if let Some(poly) = self.polys.iter_mut().find(|poly| poly.uid == uid) {
            if let Some(kind) = poly.kind.disabled() {
                poly.kind = kind;
            }
        }
    }

    pub fn enable_polygon(&mut self, uid: u32) {
        self.dead.remove(&uid);
        if let Some(poly) = self.polys.iter_mut().find(|poly| poly.uid == uid) {
            if let Some(kind) = poly.kind.enabled() {
                poly.kind = kind;
            }
        }
    }

    pub fn dead_uids(&self) -> Vec<u32> {
        self.dead.iter().copied().collect()
    }

    /// Restore-time override of the persistent dead set. Takes effect for
    /// live polygons immediately.
    pub fn set_dead_uids(&mut self, uids: &[u32]) {
        let previous: Vec<u32> = self.dead.iter().copied().collect();
        for uid in previous {
            self.enable_polygon(uid);
        }
        for &uid in uids {
            self.disable_polygon(uid);
        }
    }

    /// O(P^2) shared-corner pass over path-class polygons: two paths are
    /// adjacent when they share at least 2 distinct corner points.
    fn link_adjacencies(&mut self) -> Result<(), NavError> {
        for i in 0..self.polys.len() {
            for j in (i + 1)..self.polys.len() {
                if !self.polys[i].kind.is_path() || !self.polys[j].kind.is_path() {
                    continue;
                }
                if self.count_shared(i, j) < 2 {
                    continue;
                }
                if self.polys[i].adjacent.len() >= MAX_ADJACENT {
                    return Err(NavError::AdjacencyOverflow(self.polys[i].name.clone()));
                }
                if self.polys[j].adjacent.len() >= MAX_ADJACENT {
                    return Err(NavError::AdjacencyOverflow(self.polys[j].name.clone()));
                }
                self.polys[i].adjacent.push(PolyId(j));
                self.polys[j].adjacent.push(PolyId(i));
            }
        }
        Ok(())
    }

    fn count_shared(&self, i: usize, j: usize) -> usize {
        let mut seen: Vec<Point> = Vec::new();
        for &corner in &self.polys[i].corners {
            if self.polys[j].corners.contains(&corner) && !seen.contains(&corner) {
                seen.push(corner);
            }
        }
        seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tread_formats::SceneFile;

    fn square_def(name: &str, kind: &str, x: i32, y: i32, size: i32) -> String {
        format!(
            "\tpolygon\t{name}\n\ttype\t{kind}\n\tcorners:\t{} {}\t{} {}\t{} {}\t{} {}\n",
            x,
            y,
            x + size,
            y,
            x + size,
            y + size,
            x,
            y + size
        )
    }

    fn load(defs: &[String]) -> PolygonStore {
        let mut text = String::from("section: polygons\n");
        for def in defs {
            text.push_str(def);
            text.push('\n');
        }
        let scene = SceneFile::parse(text.as_bytes()).expect("scene");
        let mut store = PolygonStore::new();
        store.load_scene(&scene).expect("load");
        store
    }

    #[test]
    fn containment_inside_and_outside() {
        let store = load(&[square_def("yard", "path", 0, 0, 100)]);
        let yard = PolyId(0);
        assert!(store.is_inside(Point::new(50, 50), yard));
        assert!(store.is_inside(Point::new(1, 1), yard));
        assert!(!store.is_inside(Point::new(150, 50), yard));
        assert!(!store.is_inside(Point::new(50, -20), yard));
    }

    #[test]
    fn containment_handles_reversed_winding() {
        // Same square with corners listed in the opposite order.
        let def = "\tpolygon\tyard\n\ttype\tpath\n\tcorners:\t0 100\t100 100\t100 0\t0 0\n"
            .to_string();
        let store = load(&[def]);
        assert!(store.is_inside(Point::new(50, 50), PolyId(0)));
        assert!(!store.is_inside(Point::new(120, 50), PolyId(0)));
    }

    #[test]
    fn blocking_corner_counts_as_outside() {
        let store = load(&[square_def("crate", "block", 40, 40, 20)]);
        let block = PolyId(0);
        assert!(store.is_inside(Point::new(50, 50), block));
        assert!(!store.is_inside(Point::new(40, 40), block));
        assert!(!store.is_inside(Point::new(60, 60), block));
    }

    #[test]
    fn adjacency_needs_two_shared_corners() {
        let store = load(&[
            square_def("a", "path", 0, 0, 100),
            square_def("b", "path", 100, 0, 100),
            square_def("c", "path", 300, 0, 100),
        ]);
        let (a, b, c) = (PolyId(0), PolyId(1), PolyId(2));
        assert!(store.adjacent(a, b));
        assert!(store.adjacent(b, a));
        assert!(!store.adjacent(a, c));
        assert!(store.adjacent(a, a));
    }

    #[test]
    fn single_shared_corner_is_not_adjacency() {
        let store = load(&[
            square_def("a", "path", 0, 0, 100),
            square_def("b", "path", 100, 100, 100),
        ]);
        assert!(!store.adjacent(PolyId(0), PolyId(1)));
    }

    #[test]
    fn find_containing_respects_definition_order() {
        let store = load(&[
            square_def("first", "path", 0, 0, 100),
            square_def("second", "path", 0, 0, 100),
        ]);
        assert_eq!(store.find_path_at(Point::new(50, 50)), Some(PolyId(0)));
    }

    #[test]
    fn disabled_block_is_invisible_to_lookups() {
        let store = {
            let mut store = load(&[square_def("crate", "block", 0, 0, 50)]);
            store.disable_polygon(0);
            store
        };
        assert_eq!(store.blocking_at(Point::new(25, 25)), None);
        assert_eq!(store.dead_uids(), vec![0]);
    }

    #[test]
    fn dead_flags_survive_scene_reload() {
        let mut store = load(&[square_def("crate", "block", 0, 0, 50)]);
        store.disable_polygon(0);
        let scene_text = format!(
            "section: polygons\n{}\n",
            square_def("crate", "block", 0, 0, 50)
        );
        let scene = SceneFile::parse(scene_text.as_bytes()).expect("scene");
        store.drop_scene();
        store.load_scene(&scene).expect("reload");
        assert_eq!(store.blocking_at(Point::new(25, 25)), None);
        store.enable_polygon(0);
        assert_eq!(store.blocking_at(Point::new(25, 25)), Some(PolyId(0)));
    }

    #[test]
    fn pseudo_centre_is_interior() {
        let store = load(&[square_def("yard", "path", 0, 0, 100)]);
        let centre = store.pseudo_centre(PolyId(0));
        assert!(store.is_inside(centre, PolyId(0)));
        assert_eq!(centre, Point::new(50, 50));
    }

    #[test]
    fn corner_lookup_is_bounds_checked() {
        let store = load(&[square_def("yard", "path", 0, 0, 100)]);
        assert_eq!(store.corner(PolyId(0), 0), Some(Point::new(0, 0)));
        assert_eq!(store.corner(PolyId(0), 2), Some(Point::new(100, 100)));
        assert_eq!(store.corner(PolyId(0), 4), None);
        assert_eq!(store.corner(PolyId(7), 0), None);
    }

    #[test]
    fn scale_interpolates_across_vertical_span() {
        let def = "\tpolygon\tyard\n\ttype\tpath\n\tcorners:\t0 0\t100 0\t100 120\t0 120\n\tscales\t6 2\n"
            .to_string();
        let store = load(&[def]);
        let poly = store.poly(PolyId(0)).unwrap();
        assert_eq!(poly.scale_at(0), 2);
        assert_eq!(poly.scale_at(119), 6);
        let mid = poly.scale_at(60);
        assert!(mid > 2 && mid <= 6, "mid-span scale was {mid}");
    }

    #[test]
    fn constant_scale_ignores_y() {
        let store = load(&[square_def("yard", "path", 0, 0, 100)]);
        let poly = store.poly(PolyId(0)).unwrap();
        assert_eq!(poly.scale_at(0), poly.scale_at(99));
    }

    #[test]
    fn shared_corners_are_deduplicated() {
        let store = load(&[
            square_def("a", "path", 0, 0, 100),
            square_def("b", "path", 100, 0, 100),
        ]);
        let shared = store.shared_corners(PolyId(0), PolyId(1));
        assert_eq!(shared.len(), 2);
        assert!(shared.contains(&Point::new(100, 0)));
        assert!(shared.contains(&Point::new(100, 100)));
    }
}
