pub mod scene;

pub use scene::{PolygonDef, PolygonKind, SceneFile};
