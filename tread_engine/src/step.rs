use crate::block::{in_silhouette_block, Silhouette};
use crate::error::NavError;
use crate::geometry::Point;
use crate::mover::{choose_direction, Mover, Recovery, HORIZ_STEP_MAX, VERT_STEP_MAX};
use crate::navigate::{self, Goal};
use crate::polygon::PolygonStore;
use crate::route::Router;

/// Upper bound on the dry-run feasibility probe. Generous for any scene
/// that fits on a handful of screens while still bounding the work.
const PROBE_TICK_LIMIT: usize = 1024;

/// What a single tick of stepping did to the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// No target set; nothing to do.
    Idle,
    Moved,
    Arrived,
    /// No legal position on any axis; the walk was abandoned in place.
    Stuck,
    /// A blocking polygon rejected the step; a recovery strategy was armed
    /// (or the ladder ran out and the actor stopped).
    Blocked,
    /// Another mover's silhouette rejected the step; the goal was truncated
    /// to the current position.
    ActorBlocked,
}

/// Per-axis step quota toward a target: proportional to the remaining
/// distance so diagonals trace a straight line, capped at 4 px horizontal
/// and 2 px vertical. In over-run mode the final short step is stretched
/// back to a full stride so a pass-through target is overshot instead of
/// stopped at.
pub(crate) fn step_quota(from: Point, to: Point, over_run: bool) -> Point {
    let rx = to.x - from.x;
    let ry = to.y - from.y;
    if rx == 0 && ry == 0 {
        return Point::new(0, 0);
    }
    let nx = div_ceil(rx.abs(), HORIZ_STEP_MAX);
    let ny = div_ceil(ry.abs(), VERT_STEP_MAX);
    let ticks = nx.max(ny).max(1);
    let mut dx = rx.signum() * div_ceil(rx.abs(), ticks);
    let mut dy = ry.signum() * div_ceil(ry.abs(), ticks);
    if over_run && ticks == 1 {
        if rx != 0 {
            dx = rx.signum() * HORIZ_STEP_MAX;
        }
        if ry != 0 {
            dy = ry.signum() * VERT_STEP_MAX;
        }
    }
    Point::new(dx, dy)
}

fn div_ceil(value: i32, divisor: i32) -> i32 {
    (value + divisor - 1) / divisor
}

/// Static legality: on some path polygon and outside every enabled
/// blocking polygon. Dynamic actor blocks are deliberately not consulted
/// here; the probe runs before the other movers have moved.
fn legal_static(store: &PolygonStore, p: Point) -> bool {
    store.find_path_at(p).is_some() && store.blocking_at(p).is_none()
}

/// Dry-run feasibility: can the actor walk straight to `target` with the
/// normal stepping rules against static geometry alone?
pub(crate) fn can_reach_directly(mover: &Mover, store: &PolygonStore, target: Point) -> bool {
    let mut pos = mover.pos;
    for _ in 0..PROBE_TICK_LIMIT {
        if Mover::close_enough(pos, target) {
            return true;
        }
        let delta = step_quota(pos, target, false);
        let next = [
            Point::new(pos.x + delta.x, pos.y + delta.y),
            Point::new(pos.x + delta.x, pos.y),
            Point::new(pos.x, pos.y + delta.y),
        ]
        .into_iter()
        .find(|&candidate| candidate != pos && legal_static(store, candidate));
        match next {
            Some(candidate) => pos = candidate,
            None => return false,
        }
    }
    false
}

/// Advance one mover by one scheduler tick. `others` are the silhouettes
/// of every mover as of the start of the tick (including the one being
/// stepped; it is filtered out by id).
pub fn step_mover(
    mover: &mut Mover,
    others: &[Silhouette],
    store: &PolygonStore,
    router: &mut Router,
    events: &mut Vec<String>,
) -> Result<StepOutcome, NavError> {
    let Some(target) = mover.immediate else {
        return Ok(StepOutcome::Idle);
    };
    if !mover.walking {
        return Ok(StepOutcome::Idle);
    }

    // Arrival is observed at the top of the tick, so a walk of distance D
    // along one axis costs exactly ceil(D / cap) ticks.
    if Mover::close_enough(mover.pos, target) {
        return finish_leg(mover, store, router, events);
    }

    let delta = step_quota(mover.pos, target, mover.over_run);
    let candidate = Point::new(mover.pos.x + delta.x, mover.pos.y + delta.y);

    let committed = if mover.ignore_paths {
        candidate
    } else {
        // Legality ladder: path surface first, then blocking polygons,
        // then other movers; each failure retries one axis at a time.
        match legalize(mover, others, store, candidate) {
            Legal::At(point) => point,
            Legal::OffPath => {
                events.push(format!("walk.stuck actor={} off_path", mover.id.0));
                mover.clear_targets();
                return Ok(StepOutcome::Stuck);
            }
            Legal::Blocked(_poly_uid) => {
                blocked_recovery(mover, store, events);
                return Ok(StepOutcome::Blocked);
            }
            Legal::ActorInWay(other) => {
                // No queueing for actor contention: the goal is truncated
                // to wherever the actor already is.
                events.push(format!(
                    "walk.contention actor={} other={}",
                    mover.id.0, other.0
                ));
                mover.clear_targets();
                mover.ultimate = Some(mover.pos);
                return Ok(StepOutcome::ActorBlocked);
            }
        }
    };

    let moved_by = Point::new(committed.x - mover.pos.x, committed.y - mover.pos.y);
    mover.pos = committed;
    mover.step_count = mover.step_count.wrapping_add(1);

    // Over-run extends the (moving) target to the overshoot point so the
    // stride does not shorten while passing through.
    if mover.over_run && passed(mover.pos, target) {
        mover.immediate = Some(mover.pos);
    }

    let old_direction = mover.direction;
    let old_scale = mover.scale;
    mover.direction = choose_direction(mover.direction, moved_by);

    let new_path = store.find_path_at(mover.pos);
    if new_path != mover.cur_path {
        navigate::on_path_crossed(mover, store, new_path);
    }
    if let Some(path) = mover.cur_path.and_then(|id| store.poly(id)) {
        mover.scale = path.scale_at(mover.pos.y);
    }
    if mover.direction != old_direction || mover.scale != old_scale {
        // A finished scale-change reel falls back to the plain walk reel.
        mover.cur_reel = mover.walk_reel();
    }

    Ok(StepOutcome::Moved)
}

/// The immediate target was reached: declare arrival or let the
/// destination decomposer pick the next goal.
fn finish_leg(
    mover: &mut Mover,
    store: &PolygonStore,
    router: &mut Router,
    events: &mut Vec<String>,
) -> Result<StepOutcome, NavError> {
    match navigate::advance_goal(mover, store, router)? {
        Goal::Arrived => {
            mover.clear_targets();
            mover.tags_suspended = false;
            mover.cur_reel = mover.stand_reel();
            events.push(format!(
                "walk.arrived actor={} at={},{}",
                mover.id.0, mover.pos.x, mover.pos.y
            ));
            Ok(StepOutcome::Arrived)
        }
        Goal::Continue => Ok(StepOutcome::Moved),
        Goal::Stopped => {
            events.push(format!("walk.stopped actor={}", mover.id.0));
            mover.clear_targets();
            Ok(StepOutcome::Stuck)
        }
    }
}

enum Legal {
    At(Point),
    OffPath,
    Blocked(u32),
    ActorInWay(crate::mover::ActorId),
}

/// Apply the three legality checks to the candidate, retrying with motion
/// restricted to a single axis before giving up. The failure reported is
/// the one hit by the full-delta candidate, which is what the recovery
/// strategies key off.
fn legalize(
    mover: &Mover,
    others: &[Silhouette],
    store: &PolygonStore,
    candidate: Point,
) -> Legal {
    let pos = mover.pos;
    let candidates = [
        candidate,
        Point::new(candidate.x, pos.y),
        Point::new(pos.x, candidate.y),
    ];

    // The caller may already overlap a silhouette (movers spawn close
    // together); such pre-existing overlap never blocks.
    let ignore_actor = in_silhouette_block(
        others.iter().copied(),
        mover.id,
        mover.half_width,
        pos,
    );

    let mut first_failure: Option<Legal> = None;
    for point in candidates {
        if point == pos {
            continue;
        }
        if store.find_path_at(point).is_none() {
            if first_failure.is_none() {
                first_failure = Some(Legal::OffPath);
            }
            continue;
        }
        if let Some(block) = store.blocking_at(point) {
            if first_failure.is_none() {
                let uid = store.poly(block).map(|poly| poly.uid).unwrap_or(0);
                first_failure = Some(Legal::Blocked(uid));
            }
            continue;
        }
        if let Some(other) =
            in_silhouette_block(others.iter().copied(), mover.id, mover.half_width, point)
        {
            if Some(other) != ignore_actor {
                if first_failure.is_none() {
                    first_failure = Some(Legal::ActorInWay(other));
                }
                continue;
            }
        }
        return Legal::At(point);
    }
    first_failure.unwrap_or(Legal::OffPath)
}

/// A blocking polygon stopped the step. Successive ticks escalate through
/// the recovery ladder: aim at the target path's pseudo-centre, then at
/// the nearest shared corner, then at the next one. Running out of rungs
/// stops the actor where it stands; this is a design limitation, not a
/// fault.
fn blocked_recovery(mover: &mut Mover, store: &PolygonStore, events: &mut Vec<String>) {
    let target_path = mover.inter_path.or(mover.ult_path);
    match mover.recovery {
        Recovery::None => {
            mover.recovery = Recovery::TryCentre;
            if let Some(path) = target_path {
                let centre = store.pseudo_centre(path);
                mover.immediate = Some(centre);
                events.push(format!("walk.retry actor={} strategy=centre", mover.id.0));
                return;
            }
            events.push(format!("walk.gave_up actor={}", mover.id.0));
            mover.clear_targets();
        }
        Recovery::TryCentre => {
            mover.recovery = Recovery::TryCorner;
            if let (Some(cur), Some(path)) = (mover.cur_path, target_path) {
                let corners = store.shared_corners(cur, path);
                if let Some((index, &corner)) = corners
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, corner)| mover.pos.manhattan(**corner))
                {
                    mover.recovery_corner = index;
                    mover.immediate = Some(corner);
                    events.push(format!("walk.retry actor={} strategy=corner", mover.id.0));
                    return;
                }
            }
            events.push(format!("walk.gave_up actor={}", mover.id.0));
            mover.clear_targets();
        }
        Recovery::TryCorner => {
            mover.recovery = Recovery::TryNextCorner;
            if let (Some(cur), Some(path)) = (mover.cur_path, target_path) {
                let corners = store.shared_corners(cur, path);
                if !corners.is_empty() {
                    let index = (mover.recovery_corner + 1) % corners.len();
                    mover.recovery_corner = index;
                    mover.immediate = Some(corners[index]);
                    events.push(format!(
                        "walk.retry actor={} strategy=next_corner",
                        mover.id.0
                    ));
                    return;
                }
            }
            events.push(format!("walk.gave_up actor={}", mover.id.0));
            mover.clear_targets();
        }
        Recovery::TryNextCorner => {
            events.push(format!("walk.gave_up actor={}", mover.id.0));
            mover.clear_targets();
        }
    }
}

/// Has `pos` reached or passed the target on every axis it was moving on?
fn passed(pos: Point, target: Point) -> bool {
    pos == target
        || ((pos.x - target.x).abs() <= HORIZ_STEP_MAX
            && (pos.y - target.y).abs() <= VERT_STEP_MAX)
}
