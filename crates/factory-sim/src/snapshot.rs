//! Per-tick render snapshots: the data handed across the rendering
//! boundary. The engine never touches pixels; an external renderer
//! consumes these shapes.

use factory_core::model::color::Color;
use factory_core::trajectory::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentView {
    pub id: String,
    pub kind: String,
    pub position: Point,
    pub state: String,
    /// Resolved asset path; loading is the host's problem.
    pub asset: String,
    pub plex: bool,
    pub opacity: f32,
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallView {
    pub id: usize,
    pub sack_name: String,
    pub color: Color,
    /// False while the ball sits at a plex-flagged component.
    pub color_visible: bool,
    pub position: Point,
    pub opacity: f32,
    pub scale: f32,
    pub rotation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub time: f32,
    pub components: Vec<ComponentView>,
    pub balls: Vec<BallView>,
}

#[cfg(test)]
mod tests {
    use super::{BallView, ComponentView, RenderSnapshot};
    use factory_core::model::color::Color;
    use factory_core::trajectory::Point;

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = RenderSnapshot {
            time: 1.5,
            components: vec![ComponentView {
                id: "left".to_string(),
                kind: "sack".to_string(),
                position: Point::new(60.0, 40.0),
                state: "idle".to_string(),
                asset: "assets/sack/idle.png".to_string(),
                plex: false,
                opacity: 1.0,
                scale: 1.0,
            }],
            balls: vec![BallView {
                id: 0,
                sack_name: "left".to_string(),
                color: Color::Red,
                color_visible: true,
                position: Point::new(60.0, 64.0),
                opacity: 1.0,
                scale: 1.0,
                rotation: 0.0,
            }],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: RenderSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn colors_serialize_lowercase() {
        let json = serde_json::to_string(&Color::Blue).unwrap();
        assert_eq!(json, r#""blue""#);
    }
}
