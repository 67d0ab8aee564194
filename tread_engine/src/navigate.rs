use crate::error::NavError;
use crate::geometry::Point;
use crate::mover::{Mover, NodeState, Recovery};
use crate::polygon::{PolyId, PolyKind, PolygonStore};
use crate::route::{self, NearTarget, Router};
use crate::step;

/// Result of advancing the goal hierarchy after an immediate target was
/// reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    Arrived,
    Continue,
    /// No further progress is possible; the actor holds its position.
    Stopped,
}

/// Record the final goal of a walk and derive the first intermediate
/// target. Fails when the destination lies outside every path polygon and
/// the actor does not ignore paths. A destination inside a node path is
/// projected onto the path's segment sequence first, since movement there
/// is constrained to it.
pub fn set_ultimate_dest(
    mover: &mut Mover,
    store: &PolygonStore,
    router: &mut Router,
    target: Point,
) -> Result<(), NavError> {
    if mover.ignore_paths {
        mover.ultimate = Some(target);
        mover.ult_path = None;
        mover.from = mover.pos;
        mover.inter = Some(target);
        mover.inter_path = None;
        mover.immediate = Some(target);
        return Ok(());
    }

    let path = store
        .find_path_at(target)
        .ok_or(NavError::DestinationOutsidePaths {
            x: target.x,
            y: target.y,
        })?;

    let adjusted = match store.poly(path) {
        Some(poly) if poly.kind == PolyKind::NodePath => {
            route::project_onto_node_path(store, path, target)
                .map(|(point, _)| point)
                .unwrap_or(target)
        }
        _ => target,
    };

    mover.ultimate = Some(adjusted);
    mover.ult_path = Some(path);
    derive_intermediate(mover, store, router)
}

/// Choose what to aim for next, from the actor's current position. This is
/// re-run every time the actor reaches an intermediate target or crosses a
/// polygon boundary.
pub fn derive_intermediate(
    mover: &mut Mover,
    store: &PolygonStore,
    router: &mut Router,
) -> Result<(), NavError> {
    let Some(ult) = mover.ultimate else {
        return Ok(());
    };
    mover.from = mover.pos;
    mover.over_run = false;

    if mover.ignore_paths {
        aim(mover, ult, mover.ult_path);
        return Ok(());
    }

    let cur = store.find_path_at(mover.pos);
    mover.cur_path = cur;
    let (Some(cur), Some(ult_path)) = (cur, mover.ult_path) else {
        // Off every path (a scripted teleport can do this): aim straight
        // and let the legality checks resolve it.
        aim(mover, ult, mover.ult_path);
        return Ok(());
    };

    // Standing inside a node path that has not been entered yet means the
    // walk starts with the entry leg.
    if mover.node_path.is_none() {
        if let Some(poly) = store.poly(cur) {
            if poly.kind == PolyKind::NodePath {
                enter_node_path(mover, store, cur);
                return Ok(());
            }
        }
    }

    if cur == ult_path || store.is_inside(ult, cur) {
        aim(mover, ult, Some(ult_path));
        return Ok(());
    }

    if store.adjacent(cur, ult_path) {
        match store.poly(ult_path).map(|poly| poly.kind) {
            Some(PolyKind::NodePath) => {
                let entry = route::nearest_end_node(store, ult_path, mover.pos);
                let node = store
                    .poly(ult_path)
                    .and_then(|poly| poly.nodes.get(entry).copied())
                    .unwrap_or(ult);
                aim(mover, node, Some(ult_path));
            }
            _ => aim(mover, ult, Some(ult_path)),
        }
        return Ok(());
    }

    // Distant destination: a straight shot beats a detour through the
    // route when the geometry allows it.
    if step::can_reach_directly(mover, store, ult) {
        aim(mover, ult, Some(ult_path));
        return Ok(());
    }

    let hop = router.next_path(store, cur, ult_path)?;
    match store.poly(hop).map(|poly| poly.kind) {
        Some(PolyKind::NodePath) => {
            let entry = route::nearest_end_node(store, hop, mover.pos);
            let node = store
                .poly(hop)
                .and_then(|poly| poly.nodes.get(entry).copied())
                .unwrap_or(ult);
            aim(mover, node, Some(hop));
        }
        _ => {
            aim(mover, store.pseudo_centre(hop), Some(hop));
            // A transit polygon is passed through, not stopped in.
            mover.over_run = true;
        }
    }
    Ok(())
}

/// Called when the current immediate target has been reached. Declares
/// arrival, advances node-path traversal, or re-derives the next
/// intermediate goal.
pub fn advance_goal(
    mover: &mut Mover,
    store: &PolygonStore,
    router: &mut Router,
) -> Result<Goal, NavError> {
    let Some(ult) = mover.ultimate else {
        return Ok(Goal::Stopped);
    };
    mover.recovery = Recovery::None;
    mover.recovery_corner = 0;

    if Mover::close_enough(mover.pos, ult) {
        return Ok(Goal::Arrived);
    }

    if mover.node_path.is_some() && mover.node_state != NodeState::NotIn {
        return node_advance(mover, store, router);
    }

    derive_intermediate(mover, store, router)?;
    if mover.immediate == Some(mover.pos) {
        // Re-derivation produced no motion; treat as a dead end rather
        // than spinning on the spot forever.
        mover.clear_targets();
        return Ok(Goal::Stopped);
    }
    Ok(Goal::Continue)
}

/// Boundary-crossing hook: the step simulator calls this when the mover's
/// containing path changed. Handles node-path entry and exit.
pub fn on_path_crossed(mover: &mut Mover, store: &PolygonStore, new_path: Option<PolyId>) {
    if let Some(node_path) = mover.node_path {
        if new_path != Some(node_path) {
            // Left the node path; traversal is over.
            mover.node_path = None;
            mover.node_state = NodeState::NotIn;
            mover.target_line = None;
        }
    }
    mover.cur_path = new_path;

    if let Some(path) = new_path {
        if mover.node_path.is_none()
            && store
                .poly(path)
                .map(|poly| poly.kind == PolyKind::NodePath)
                .unwrap_or(false)
            && mover.walking
        {
            enter_node_path(mover, store, path);
        }
    }
}

/// Entering a node path: the nearer end node becomes the entry node and
/// the first aim point.
fn enter_node_path(mover: &mut Mover, store: &PolygonStore, path: PolyId) {
    let entry = route::nearest_end_node(store, path, mover.pos);
    mover.node_path = Some(path);
    mover.node_state = NodeState::Entering;
    mover.line = entry;
    mover.target_line = None;
    if let Some(node) = store.poly(path).and_then(|poly| poly.nodes.get(entry).copied()) {
        aim(mover, node, Some(path));
    }
}

fn node_advance(
    mover: &mut Mover,
    store: &PolygonStore,
    router: &mut Router,
) -> Result<Goal, NavError> {
    let Some(np) = mover.node_path else {
        return Ok(Goal::Stopped);
    };
    let Some(ult) = mover.ultimate else {
        return Ok(Goal::Stopped);
    };
    let node_count = store.poly(np).map(|poly| poly.nodes.len()).unwrap_or(0);
    if node_count < 2 {
        mover.clear_targets();
        return Ok(Goal::Stopped);
    }

    match mover.node_state {
        NodeState::Entering => {
            // Standing on the entry node; decide where the traversal goes.
            if mover.ult_path == Some(np) {
                let target = destination_node(store, np, ult, mover.line);
                mover.target_line = Some(target);
                if target == mover.line {
                    aim(mover, ult, Some(np));
                } else {
                    mover.node_state = if target > mover.line {
                        NodeState::GoingUp
                    } else {
                        NodeState::GoingDown
                    };
                    aim_node(mover, store, np, next_index(mover.line, target));
                }
            } else {
                let ult_path = mover.ult_path.unwrap_or(np);
                let toward = if store.adjacent(np, ult_path) {
                    ult_path
                } else {
                    router.next_path(store, np, ult_path)?
                };
                let exit = route::near_end_node(store, np, toward);
                if exit == mover.line {
                    // Pseudo-one-node case: the entry node doubles as the
                    // exit node, so the path is effectively already done.
                    mover.node_state = NodeState::Leaving;
                    derive_exit(mover, store, router)?;
                } else {
                    mover.target_line = Some(exit);
                    mover.node_state = if exit > mover.line {
                        NodeState::GoingUp
                    } else {
                        NodeState::GoingDown
                    };
                    aim_node(mover, store, np, next_index(mover.line, exit));
                }
            }
            Ok(Goal::Continue)
        }
        NodeState::GoingUp | NodeState::GoingDown => {
            let target = mover.target_line.unwrap_or(mover.line);
            mover.line = next_index(mover.line, target);
            if mover.line == target {
                if mover.ult_path == Some(np) {
                    aim(mover, ult, Some(np));
                } else {
                    mover.node_state = NodeState::Leaving;
                    derive_exit(mover, store, router)?;
                }
            } else {
                aim_node(mover, store, np, next_index(mover.line, target));
            }
            Ok(Goal::Continue)
        }
        NodeState::Leaving | NodeState::NotIn => {
            derive_exit(mover, store, router)?;
            Ok(Goal::Continue)
        }
    }
}

/// Aim out of the node path toward the rest of the route. Traversal state
/// flips to NotIn once the boundary crossing is observed.
fn derive_exit(
    mover: &mut Mover,
    store: &PolygonStore,
    router: &mut Router,
) -> Result<(), NavError> {
    let Some(ult) = mover.ultimate else {
        return Ok(());
    };
    let Some(ult_path) = mover.ult_path else {
        aim(mover, ult, None);
        return Ok(());
    };
    let Some(np) = mover.node_path else {
        return derive_intermediate(mover, store, router);
    };
    if store.adjacent(np, ult_path) {
        aim(mover, ult, Some(ult_path));
        return Ok(());
    }
    let hop = router.next_path(store, np, ult_path)?;
    match store.poly(hop).map(|poly| poly.kind) {
        Some(PolyKind::NodePath) => {
            let entry = route::nearest_end_node(store, hop, mover.pos);
            if let Some(node) = store.poly(hop).and_then(|poly| poly.nodes.get(entry).copied()) {
                aim(mover, node, Some(hop));
            }
        }
        _ => {
            aim(mover, store.pseudo_centre(hop), Some(hop));
            mover.over_run = true;
        }
    }
    Ok(())
}

/// Node index the in-path destination resolves to: the projection's own
/// node, or the segment endpoint on the traversal side.
fn destination_node(store: &PolygonStore, np: PolyId, ult: Point, from_line: usize) -> usize {
    match route::project_onto_node_path(store, np, ult) {
        Some((_, NearTarget::Node(index))) => index,
        Some((_, NearTarget::Segment(index))) => {
            if from_line <= index {
                index
            } else {
                index + 1
            }
        }
        None => from_line,
    }
}

fn next_index(line: usize, target: usize) -> usize {
    if target > line {
        line + 1
    } else if target < line {
        line - 1
    } else {
        line
    }
}

fn aim_node(mover: &mut Mover, store: &PolygonStore, np: PolyId, index: usize) {
    if let Some(node) = store.poly(np).and_then(|poly| poly.nodes.get(index).copied()) {
        aim(mover, node, Some(np));
    }
}

fn aim(mover: &mut Mover, target: Point, path: Option<PolyId>) {
    mover.inter = Some(target);
    mover.inter_path = path;
    mover.immediate = Some(target);
    mover.over_run = false;
}
