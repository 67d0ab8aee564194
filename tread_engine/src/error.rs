use thiserror::Error;

use crate::polygon::MAX_ADJACENT;

/// Configuration faults surfaced at scene load or request time. Runtime
/// navigation failures (stuck steps, actor contention) are absorbed into
/// mover state instead and reported through the walk status.
#[derive(Debug, Error)]
pub enum NavError {
    #[error("polygon '{0}' exceeds the adjacency capacity of {MAX_ADJACENT}")]
    AdjacencyOverflow(String),

    #[error("no route between path polygons '{from}' and '{to}'")]
    DisconnectedPaths { from: String, to: String },

    #[error("destination ({x},{y}) is outside every path polygon")]
    DestinationOutsidePaths { x: i32, y: i32 },

    #[error("node polygon '{0}' has fewer than 2 nodes")]
    MalformedNodePath(String),

    #[error("no moving actor with id {0}")]
    UnknownActor(u32),

    #[error("polygon handle does not name a live polygon")]
    UnknownPolygon,
}
