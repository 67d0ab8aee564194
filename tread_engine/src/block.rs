use crate::geometry::{Point, Rect};
use crate::mover::{ActorId, Mover};

/// Vertical half-extent of a synthesized actor block. Actors occupy a
/// shallow band around their feet, so the silhouette only needs to block a
/// few rows either side of the other actor's y.
pub const BLOCK_HALF_HEIGHT: i32 = 6;

/// The slice of mover state a dynamic block is derived from. The tick loop
/// snapshots these before stepping so a mover can be mutated while the
/// others' silhouettes are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Silhouette {
    pub id: ActorId,
    pub pos: Point,
    pub half_width: i32,
}

impl From<&Mover> for Silhouette {
    fn from(mover: &Mover) -> Self {
        Silhouette {
            id: mover.id,
            pos: mover.pos,
            half_width: mover.half_width,
        }
    }
}

/// Transient blocking rectangle standing in for another moving actor. It
/// is recomputed for every query and passed around by value; nothing is
/// interned into the polygon store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorBlock {
    pub owner: ActorId,
    pub bound: Rect,
}

impl ActorBlock {
    pub fn contains(&self, p: Point) -> bool {
        self.bound.contains(p)
    }
}

/// Silhouette of `other` as seen by a caller of half-width
/// `caller_half_width`: the other actor's horizontal extent widened on both
/// sides by the caller's own half-width, so the caller's body and not just
/// its centre point is kept clear.
pub fn silhouette_block(caller_half_width: i32, other: &Silhouette) -> ActorBlock {
    let half = other.half_width + caller_half_width;
    ActorBlock {
        owner: other.id,
        bound: Rect {
            left: other.pos.x - half,
            right: other.pos.x + half,
            top: other.pos.y - BLOCK_HALF_HEIGHT,
            bottom: other.pos.y + BLOCK_HALF_HEIGHT,
        },
    }
}

pub fn actor_block(caller: &Mover, other: &Mover) -> ActorBlock {
    silhouette_block(caller.half_width, &Silhouette::from(other))
}

/// First other mover whose synthesized block contains the point, in mover
/// declaration order.
pub fn in_mover_block(movers: &[Mover], caller: ActorId, point: Point) -> Option<ActorId> {
    let caller_mover = movers.iter().find(|mover| mover.id == caller)?;
    in_silhouette_block(
        movers.iter().map(Silhouette::from),
        caller,
        caller_mover.half_width,
        point,
    )
}

pub fn in_silhouette_block<I>(
    others: I,
    caller: ActorId,
    caller_half_width: i32,
    point: Point,
) -> Option<ActorId>
where
    I: IntoIterator<Item = Silhouette>,
{
    others
        .into_iter()
        .filter(|other| other.id != caller)
        .find(|other| silhouette_block(caller_half_width, other).contains(point))
        .map(|other| other.id)
}
