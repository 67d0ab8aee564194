use std::collections::VecDeque;

use crate::error::NavError;
use crate::geometry::{project_onto_segment, Point};
use crate::polygon::{PolyId, PolyKind, PolygonStore};

/// Nearest feature of a node path: either one of its nodes or a point on
/// one of its segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearTarget {
    Node(usize),
    Segment(usize),
}

/// Full route from the last search, kept so a repeat request for the same
/// destination can be answered without another graph walk.
#[derive(Debug, Clone)]
struct CachedRoute {
    dest: PolyId,
    hops: Vec<PolyId>,
}

/// Next-path routing over the derived path adjacency graph.
#[derive(Debug, Default)]
pub struct Router {
    cache: Option<CachedRoute>,
}

impl Router {
    pub fn new() -> Self {
        Router::default()
    }

    /// The next path polygon to traverse on the way from `from` to `to`.
    /// Equal and adjacent pairs short-circuit without a search; otherwise a
    /// breadth-first walk finds a shortest hop sequence, whose first hop is
    /// adjacent to `from` by construction. A missing route is a scene
    /// configuration fault: the path graph must be connected by design.
    pub fn next_path(
        &mut self,
        store: &PolygonStore,
        from: PolyId,
        to: PolyId,
    ) -> Result<PolyId, NavError> {
        if from == to {
            return Ok(from);
        }
        if store.adjacent(from, to) {
            return Ok(to);
        }

        if let Some(cached) = self.cache.as_ref().filter(|cached| cached.dest == to) {
            if let Some(pos) = cached.hops.iter().position(|&hop| hop == from) {
                if pos + 1 < cached.hops.len() {
                    return Ok(cached.hops[pos + 1]);
                }
            }
            if let Some(&hop) = cached
                .hops
                .iter()
                .find(|&&hop| hop != from && store.adjacent(from, hop))
            {
                return Ok(hop);
            }
        }

        let hops = bfs_route(store, from, to).ok_or_else(|| NavError::DisconnectedPaths {
            from: poly_name(store, from),
            to: poly_name(store, to),
        })?;
        let next = hops[1];
        self.cache = Some(CachedRoute { dest: to, hops });
        Ok(next)
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}

/// Breadth-first search over path adjacency with an explicit worklist.
/// Returns the hop sequence `from..=to`, length >= 2, or None when the
/// graph is disconnected.
fn bfs_route(store: &PolygonStore, from: PolyId, to: PolyId) -> Option<Vec<PolyId>> {
    let mut parent: Vec<Option<PolyId>> = vec![None; store.len()];
    let mut visited: Vec<bool> = vec![false; store.len()];
    let mut queue = VecDeque::new();

    visited[from.0] = true;
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        if current == to {
            let mut hops = vec![current];
            let mut cursor = current;
            while let Some(prev) = parent[cursor.0] {
                hops.push(prev);
                cursor = prev;
            }
            hops.reverse();
            return Some(hops);
        }
        let Some(poly) = store.poly(current) else {
            continue;
        };
        for &next in poly.adjacent_paths() {
            if !visited[next.0] {
                visited[next.0] = true;
                parent[next.0] = Some(current);
                queue.push_back(next);
            }
        }
    }
    None
}

fn poly_name(store: &PolygonStore, id: PolyId) -> String {
    store
        .poly(id)
        .map(|poly| poly.name.clone())
        .unwrap_or_else(|| format!("#{}", id.0))
}

/// Which end node of a node path is nearer the point, by Manhattan
/// distance. Returns the node index (0 or last).
pub fn nearest_end_node(store: &PolygonStore, node_path: PolyId, point: Point) -> usize {
    let Some(poly) = store.poly(node_path) else {
        return 0;
    };
    let last = poly.nodes.len().saturating_sub(1);
    if last == 0 {
        return 0;
    }
    if point.manhattan(poly.nodes[0]) <= point.manhattan(poly.nodes[last]) {
        0
    } else {
        last
    }
}

/// Which end node of `source` is nearest the destination path, comparing
/// Manhattan distances over every endpoint combination. A destination
/// without end nodes (an ordinary 4-corner path) is represented by its
/// pseudo-centre.
pub fn near_end_node(store: &PolygonStore, source: PolyId, dest: PolyId) -> usize {
    let Some(src) = store.poly(source) else {
        return 0;
    };
    let last = src.nodes.len().saturating_sub(1);
    if last == 0 {
        return 0;
    }
    let targets: Vec<Point> = match store.poly(dest) {
        Some(poly) if poly.kind == PolyKind::NodePath && !poly.nodes.is_empty() => {
            vec![poly.nodes[0], poly.nodes[poly.nodes.len() - 1]]
        }
        Some(poly) => vec![poly.pseudo_centre()],
        None => return 0,
    };

    let ends = [src.nodes[0], src.nodes[last]];
    let mut best = (0usize, i32::MAX);
    for (slot, end) in ends.iter().enumerate() {
        for target in &targets {
            let dist = end.manhattan(*target);
            if dist < best.1 {
                best = (slot, dist);
            }
        }
    }
    if best.0 == 0 {
        0
    } else {
        last
    }
}

/// Globally nearest feature of the node path to `point`: in-segment
/// perpendicular projections compete with the nodes themselves, and ties
/// go to nodes. Segment distances come from the precomputed line
/// equations, as the squared perpendicular distance `side(p)^2 / (a^2 +
/// b^2)`, compared exactly by cross-multiplication.
pub fn project_onto_node_path(
    store: &PolygonStore,
    node_path: PolyId,
    point: Point,
) -> Option<(Point, NearTarget)> {
    let poly = store.poly(node_path)?;
    if poly.nodes.is_empty() {
        return None;
    }

    // (projected point, segment index, distance numerator, denominator)
    let mut best_seg: Option<(Point, usize, i128, i128)> = None;
    for (index, pair) in poly.nodes.windows(2).enumerate() {
        let Some(projected) = project_onto_segment(pair[0], pair[1], point) else {
            continue;
        };
        let line = &poly.segments[index];
        let num = (line.side(point) as i128).pow(2);
        let den = (line.a * line.a + line.b * line.b) as i128;
        let better = match best_seg {
            Some((_, _, best_num, best_den)) => num * best_den < best_num * den,
            None => true,
        };
        if better {
            best_seg = Some((projected, index, num, den));
        }
    }

    let mut best_node: Option<(usize, i64)> = None;
    for (index, &node) in poly.nodes.iter().enumerate() {
        let dist = point.dist_squared(node);
        if best_node.map(|(_, d)| dist < d).unwrap_or(true) {
            best_node = Some((index, dist));
        }
    }

    let (node_index, node_dist) = best_node?;
    match best_seg {
        Some((projected, seg_index, num, den)) if num < node_dist as i128 * den => {
            Some((projected, NearTarget::Segment(seg_index)))
        }
        _ => Some((poly.nodes[node_index], NearTarget::Node(node_index))),
    }
}

/// Nearest aim point inside a polygon for scripted "walk to this polygon"
/// requests: the nearest node of a node path, the pseudo-centre otherwise.
pub fn nearest_poly_node(store: &PolygonStore, poly_id: PolyId, point: Point) -> Point {
    let Some(poly) = store.poly(poly_id) else {
        return point;
    };
    if poly.kind != PolyKind::NodePath || poly.nodes.is_empty() {
        return poly.pseudo_centre();
    }
    let mut best = poly.nodes[0];
    let mut best_dist = point.manhattan(best);
    for &node in &poly.nodes[1..] {
        let dist = point.manhattan(node);
        if dist < best_dist {
            best = node;
            best_dist = dist;
        }
    }
    best
}
