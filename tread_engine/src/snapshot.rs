use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::mover::{ReelHandle, ReelSet, SCALE_COUNT};

/// Reduced save-game subset for one mover. Everything else (goal
/// hierarchy, node traversal state, recovery ladder) is recomputed from
/// `pending_target` after restore; walks are never resumed mid-step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoverSnapshot {
    pub id: u32,
    pub position: Point,
    pub half_width: i32,
    pub reel: ReelHandle,
    pub reels: [ReelSet; SCALE_COUNT],
    #[serde(default)]
    pub pending_target: Option<Point>,
}

/// What the save system captures from this subsystem: the movers' reduced
/// state and the dead block/tag/exit polygon uids, restored verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveState {
    pub movers: Vec<MoverSnapshot>,
    pub dead_polygons: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_state_round_trips_through_json() {
        let state = SaveState {
            movers: vec![MoverSnapshot {
                id: 3,
                position: Point::new(42, 17),
                half_width: 12,
                reel: 9,
                reels: [ReelSet::default(); SCALE_COUNT],
                pending_target: Some(Point::new(100, 20)),
            }],
            dead_polygons: vec![2, 5],
        };
        let json = serde_json::to_string(&state).expect("serialize");
        let back: SaveState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.movers.len(), 1);
        assert_eq!(back.movers[0].position, Point::new(42, 17));
        assert_eq!(back.movers[0].pending_target, Some(Point::new(100, 20)));
        assert_eq!(back.dead_polygons, vec![2, 5]);
    }

    #[test]
    fn missing_fields_default_cleanly() {
        let back: SaveState = serde_json::from_str("{}").expect("deserialize");
        assert!(back.movers.is_empty());
        assert!(back.dead_polygons.is_empty());
    }
}
