use tread_formats::SceneFile;

use crate::block::Silhouette;
use crate::error::NavError;
use crate::geometry::Point;
use crate::mover::{ActorId, Mover, NodeState, ReelHandle};
use crate::navigate;
use crate::polygon::{PolyId, PolygonStore};
use crate::route::{self, Router};
use crate::snapshot::{MoverSnapshot, SaveState};
use crate::step;

/// Capability to observe one walk request. The ticket pins the walk
/// generation it was issued for; a newer request on the same actor leaves
/// stale handles resolving to `Superseded`. Cancellation is purely
/// cooperative: a superseded walk simply stops being advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkHandle {
    pub actor: ActorId,
    pub ticket: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStatus {
    InProgress,
    /// The walk ended within tolerance of the requested target.
    Arrived,
    /// The walk ended elsewhere: stuck, stopped, or goal truncated.
    Stopped,
    /// A newer walk request took over the actor.
    Superseded,
}

/// Cooperative, single-threaded navigation host: one movement step per
/// mover per tick, with all mutation confined to `tick` and the explicit
/// request calls.
#[derive(Debug, Default)]
pub struct WalkScheduler {
    store: PolygonStore,
    router: Router,
    movers: Vec<Mover>,
    events: Vec<String>,
    ticks: u64,
}

impl WalkScheduler {
    pub fn new() -> Self {
        WalkScheduler::default()
    }

    pub fn load_scene(&mut self, scene: &SceneFile) -> Result<(), NavError> {
        self.router.invalidate();
        self.store.load_scene(scene)
    }

    /// Scene teardown: movers and polygons go away, persistent polygon
    /// dead flags stay for the next visit.
    pub fn end_scene(&mut self) {
        self.store.drop_scene();
        self.movers.clear();
        self.router.invalidate();
    }

    pub fn store(&self) -> &PolygonStore {
        &self.store
    }

    pub fn enable_polygon(&mut self, uid: u32) {
        self.store.enable_polygon(uid);
        self.events.push(format!("poly.enable uid={uid}"));
    }

    pub fn disable_polygon(&mut self, uid: u32) {
        self.store.disable_polygon(uid);
        self.events.push(format!("poly.disable uid={uid}"));
    }

    /// Declare an actor as moving for this scene. Redeclaring an id
    /// replaces the previous state wholesale.
    pub fn declare_mover(&mut self, id: ActorId, pos: Point, half_width: i32) {
        let mut mover = Mover::new(id, pos, half_width);
        mover.ignore_paths = self.store.no_path();
        mover.cur_path = self.store.find_path_at(pos);
        if let Some(path) = mover.cur_path.and_then(|path| self.store.poly(path)) {
            mover.scale = path.scale_at(pos.y);
        }
        self.movers.retain(|existing| existing.id != id);
        self.movers.push(mover);
    }

    pub fn mover(&self, id: ActorId) -> Option<&Mover> {
        self.movers.iter().find(|mover| mover.id == id)
    }

    pub fn mover_mut(&mut self, id: ActorId) -> Option<&mut Mover> {
        self.movers.iter_mut().find(|mover| mover.id == id)
    }

    pub fn is_walking(&self, id: ActorId) -> bool {
        self.mover(id).map(|mover| mover.walking).unwrap_or(false)
    }

    /// Start a walk. Any in-flight walk on the same actor is superseded:
    /// its ticket goes stale and its waiters observe `Superseded` rather
    /// than completion.
    pub fn request_walk(
        &mut self,
        id: ActorId,
        target: Point,
        ignore_path: bool,
        reel_override: Option<ReelHandle>,
    ) -> Result<WalkHandle, NavError> {
        let no_path = self.store.no_path();
        let WalkScheduler {
            store,
            router,
            movers,
            events,
            ..
        } = self;
        let mover = movers
            .iter_mut()
            .find(|mover| mover.id == id)
            .ok_or(NavError::UnknownActor(id.0))?;

        mover.ticket = mover.ticket.wrapping_add(1);
        mover.clear_targets();
        mover.requested = Some(target);
        mover.ignore_paths = ignore_path || no_path;
        mover.walking = true;
        mover.tags_suspended = true;

        if let Err(err) = navigate::set_ultimate_dest(mover, store, router, target) {
            mover.walking = false;
            mover.tags_suspended = false;
            mover.requested = None;
            return Err(err);
        }
        mover.cur_reel = reel_override.unwrap_or_else(|| mover.walk_reel());
        events.push(format!(
            "walk.request actor={} to={},{} ticket={}",
            id.0, target.x, target.y, mover.ticket
        ));
        Ok(WalkHandle {
            actor: id,
            ticket: mover.ticket,
        })
    }

    /// Scripted walk toward a polygon: the nearest node of a node path,
    /// the pseudo-centre otherwise.
    pub fn walk_to_poly(&mut self, id: ActorId, poly: PolyId) -> Result<WalkHandle, NavError> {
        let pos = self
            .mover(id)
            .map(|mover| mover.pos)
            .ok_or(NavError::UnknownActor(id.0))?;
        if self.store.poly(poly).is_none() {
            return Err(NavError::UnknownPolygon);
        }
        let target = route::nearest_poly_node(&self.store, poly, pos);
        self.request_walk(id, target, false, None)
    }

    /// Immediate placement: kill any walk, set the position and a standing
    /// reel, and re-derive the containing path and scale.
    pub fn stand(
        &mut self,
        id: ActorId,
        pos: Point,
        reel: Option<ReelHandle>,
    ) -> Result<(), NavError> {
        let path = self.store.find_path_at(pos);
        let scale = path
            .and_then(|path| self.store.poly(path))
            .map(|poly| poly.scale_at(pos.y));
        let mover = self
            .mover_mut(id)
            .ok_or(NavError::UnknownActor(id.0))?;
        mover.ticket = mover.ticket.wrapping_add(1);
        mover.clear_targets();
        mover.requested = None;
        mover.pos = pos;
        mover.from = pos;
        mover.cur_path = path;
        mover.node_path = None;
        mover.node_state = NodeState::NotIn;
        mover.target_line = None;
        mover.tags_suspended = false;
        if let Some(scale) = scale {
            mover.scale = scale;
        }
        mover.cur_reel = reel.unwrap_or_else(|| mover.stand_reel());
        self.events.push(format!(
            "actor.stand actor={} at={},{}",
            id.0, pos.x, pos.y
        ));
        Ok(())
    }

    /// Kill a walk in place. The actor keeps its position; waiters observe
    /// `Stopped` (the ticket is untouched, so this is not a supersession).
    pub fn stop_walk(&mut self, id: ActorId) -> Result<(), NavError> {
        let mover = self
            .mover_mut(id)
            .ok_or(NavError::UnknownActor(id.0))?;
        mover.clear_targets();
        mover.tags_suspended = false;
        self.events.push(format!("walk.stop actor={}", id.0));
        Ok(())
    }

    /// Poll-based completion, resolved by the tick loop; never blocks.
    pub fn poll(&self, handle: WalkHandle) -> WalkStatus {
        let Some(mover) = self.mover(handle.actor) else {
            return WalkStatus::Stopped;
        };
        if mover.ticket != handle.ticket {
            return WalkStatus::Superseded;
        }
        if mover.walking {
            return WalkStatus::InProgress;
        }
        match mover.requested {
            Some(requested) if Mover::close_enough(mover.pos, requested) => WalkStatus::Arrived,
            _ => WalkStatus::Stopped,
        }
    }

    /// One cooperative frame: every mover advances by at most one step.
    /// Other movers' silhouettes are sampled at the start of the tick.
    pub fn tick(&mut self) -> Result<(), NavError> {
        let WalkScheduler {
            store,
            router,
            movers,
            events,
            ticks,
        } = self;
        let silhouettes: Vec<Silhouette> = movers.iter().map(Silhouette::from).collect();
        for index in 0..movers.len() {
            step::step_mover(&mut movers[index], &silhouettes, store, router, events)?;
        }
        *ticks += 1;
        Ok(())
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<String> {
        std::mem::take(&mut self.events)
    }

    /// Save-game subset: per mover the identity, position, reel state and
    /// any pending destination; for the store the dead polygon uids.
    pub fn snapshot(&self) -> SaveState {
        SaveState {
            movers: self
                .movers
                .iter()
                .map(|mover| MoverSnapshot {
                    id: mover.id.0,
                    position: mover.pos,
                    half_width: mover.half_width,
                    reel: mover.cur_reel,
                    reels: mover.reels,
                    pending_target: if mover.walking { mover.ultimate } else { None },
                })
                .collect(),
            dead_polygons: self.store.dead_uids(),
        }
    }

    /// Restore after a load: dead flags come back verbatim, movers are
    /// placed at their saved positions, and pending destinations are
    /// re-issued as fresh walks (never resumed mid-step). Returns the
    /// handles of the re-issued walks.
    pub fn restore(&mut self, state: &SaveState) -> Result<Vec<WalkHandle>, NavError> {
        self.store.set_dead_uids(&state.dead_polygons);
        let mut handles = Vec::new();
        for saved in &state.movers {
            let id = ActorId(saved.id);
            self.declare_mover(id, saved.position, saved.half_width);
            if let Some(mover) = self.mover_mut(id) {
                mover.reels = saved.reels;
                mover.cur_reel = saved.reel;
            }
            if let Some(target) = saved.pending_target {
                handles.push(self.request_walk(id, target, false, None)?);
            }
        }
        Ok(handles)
    }
}
