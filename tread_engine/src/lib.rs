pub mod block;
pub mod cli;
pub mod error;
pub mod geometry;
pub mod mover;
pub mod navigate;
pub mod polygon;
pub mod route;
pub mod scheduler;
pub mod snapshot;
pub mod step;

pub use error::NavError;
pub use geometry::{Point, Rect};
pub use mover::{ActorId, Direction, Mover, ReelHandle};
pub use polygon::{PolyId, PolyKind, PolygonStore};
pub use scheduler::{WalkHandle, WalkScheduler, WalkStatus};
pub use snapshot::SaveState;
