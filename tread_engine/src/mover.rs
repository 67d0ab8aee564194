use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::polygon::PolyId;

/// Number of depth-band scales an actor carries reel tables for.
pub const SCALE_COUNT: usize = 6;

/// Per-tick pixel caps. Vertical motion is half the horizontal because a
/// world tile is roughly twice as tall as it is wide; the same constants
/// double as the arrival tolerances, which is what terminates the step
/// loop.
pub const HORIZ_STEP_MAX: i32 = 4;
pub const VERT_STEP_MAX: i32 = 2;

pub type ReelHandle = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    /// Facing the viewer, i.e. moving down the screen.
    Forward,
    /// Facing away from the viewer, i.e. moving up the screen.
    Away,
}

impl Direction {
    pub fn index(self) -> usize {
        match self {
            Direction::Left => 0,
            Direction::Right => 1,
            Direction::Forward => 2,
            Direction::Away => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Forward => "forward",
            Direction::Away => "away",
        }
    }
}

/// Traversal state while following a node path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    NotIn,
    Entering,
    GoingUp,
    GoingDown,
    Leaving,
}

/// Which fallback strategy is currently being attempted after a direct
/// step failed against a blocking polygon. The ladder advances one rung
/// per tick; exhausting it stops the actor without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    None,
    TryCentre,
    TryCorner,
    TryNextCorner,
}

/// Walk/stand/talk reel handles for one scale band, indexed by direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelSet {
    pub walk: [ReelHandle; 4],
    pub stand: [ReelHandle; 4],
    pub talk: [ReelHandle; 4],
}

/// Per-actor movement state. One exists for each actor declared "moving"
/// for the scene; the whole struct is rebuilt on scene change and only a
/// reduced subset is captured into save games.
#[derive(Debug, Clone)]
pub struct Mover {
    pub id: ActorId,
    pub pos: Point,
    /// Position at the start of the current leg.
    pub from: Point,

    pub ultimate: Option<Point>,
    pub ult_path: Option<PolyId>,
    pub inter: Option<Point>,
    pub inter_path: Option<PolyId>,
    pub immediate: Option<Point>,
    /// The original click target of the walk in flight, used to decide
    /// arrived-vs-stopped when the walk ends (a truncated goal still ends
    /// the walk away from what the caller asked for).
    pub requested: Option<Point>,

    pub cur_path: Option<PolyId>,
    pub node_path: Option<PolyId>,
    pub node_state: NodeState,
    pub line: usize,
    pub target_line: Option<usize>,

    pub direction: Direction,
    pub scale: i32,
    pub step_count: u32,
    pub over_run: bool,
    pub ignore_paths: bool,
    pub walking: bool,
    /// Tag interaction is suspended while a walk is in flight and restored
    /// on arrival.
    pub tags_suspended: bool,

    /// Walk generation counter. Every new walk request bumps it; a waiter
    /// holding a stale ticket observes its walk as superseded.
    pub ticket: u64,

    pub recovery: Recovery,
    pub recovery_corner: usize,

    pub half_width: i32,
    pub reels: [ReelSet; SCALE_COUNT],
    pub cur_reel: ReelHandle,
}

impl Mover {
    pub fn new(id: ActorId, pos: Point, half_width: i32) -> Self {
        Mover {
            id,
            pos,
            from: pos,
            ultimate: None,
            ult_path: None,
            inter: None,
            inter_path: None,
            immediate: None,
            requested: None,
            cur_path: None,
            node_path: None,
            node_state: NodeState::NotIn,
            line: 0,
            target_line: None,
            direction: Direction::Forward,
            scale: 1,
            step_count: 0,
            over_run: false,
            ignore_paths: false,
            walking: false,
            tags_suspended: false,
            ticket: 0,
            recovery: Recovery::None,
            recovery_corner: 0,
            half_width,
            reels: [ReelSet::default(); SCALE_COUNT],
            cur_reel: 0,
        }
    }

    fn scale_slot(&self) -> usize {
        (self.scale.clamp(1, SCALE_COUNT as i32) - 1) as usize
    }

    pub fn set_walk_reels(&mut self, scale: i32, reels: [ReelHandle; 4]) {
        let slot = (scale.clamp(1, SCALE_COUNT as i32) - 1) as usize;
        self.reels[slot].walk = reels;
    }

    pub fn set_stand_reels(&mut self, scale: i32, reels: [ReelHandle; 4]) {
        let slot = (scale.clamp(1, SCALE_COUNT as i32) - 1) as usize;
        self.reels[slot].stand = reels;
    }

    pub fn set_talk_reels(&mut self, scale: i32, reels: [ReelHandle; 4]) {
        let slot = (scale.clamp(1, SCALE_COUNT as i32) - 1) as usize;
        self.reels[slot].talk = reels;
    }

    pub fn walk_reel(&self) -> ReelHandle {
        self.reels[self.scale_slot()].walk[self.direction.index()]
    }

    pub fn stand_reel(&self) -> ReelHandle {
        self.reels[self.scale_slot()].stand[self.direction.index()]
    }

    pub fn talk_reel(&self) -> ReelHandle {
        self.reels[self.scale_slot()].talk[self.direction.index()]
    }

    /// Drop every target and stop in place. The ticket is left alone: the
    /// waiter should observe a stopped walk, not a superseded one.
    pub fn clear_targets(&mut self) {
        self.ultimate = None;
        self.ult_path = None;
        self.inter = None;
        self.inter_path = None;
        self.immediate = None;
        self.over_run = false;
        self.walking = false;
        self.recovery = Recovery::None;
        self.recovery_corner = 0;
    }

    /// Both axes within the arrival tolerance. This is the loop-termination
    /// condition of the step simulator, so the constants are load-bearing.
    pub fn close_enough(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < HORIZ_STEP_MAX && (a.y - b.y).abs() < VERT_STEP_MAX
    }
}

/// Pick a facing for a displacement. The vertical delta is doubled to
/// compensate for the non-square world grid, and the previous direction is
/// kept for small (<= 4 px per axis) motions so tiny corrections do not
/// flicker the reel.
pub fn choose_direction(current: Direction, delta: Point) -> Direction {
    let horiz = delta.x.abs();
    let vert = 2 * delta.y.abs();
    if horiz == 0 && vert == 0 {
        return current;
    }

    let candidate = if horiz > vert {
        if delta.x < 0 {
            Direction::Left
        } else {
            Direction::Right
        }
    } else if vert > horiz {
        if delta.y < 0 {
            Direction::Away
        } else {
            Direction::Forward
        }
    } else {
        return current;
    };

    if candidate == current {
        return current;
    }
    if delta.x.abs() <= HORIZ_STEP_MAX && delta.y.abs() <= HORIZ_STEP_MAX {
        return current;
    }
    candidate
}
