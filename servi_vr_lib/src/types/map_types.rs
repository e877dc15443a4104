use serde::{Deserialize, Serialize};
use uuid;

/// Occupancy map of the robot's workspace, plus named waypoints and
/// known obstacles. Mirrors the structure the frontend map editor edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapData {
    pub id: String,
    pub name: String,
    /// Row-major occupancy values, 0 = free, 100 = occupied
    pub occupancy_grid: Vec<Vec<u8>>,
    /// Meters per grid cell
    pub resolution: f64,
    pub origin: MapOrigin,
    pub waypoints: Vec<Waypoint>,
    pub obstacles: Vec<Obstacle>,
}

/// World coordinates of the grid's (0, 0) cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MapOrigin {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl MapData {
    /// The demo floor plan loaded when a scene starts with no saved map.
    pub fn facility_floor() -> Self {
        Self {
            id: "map-1".to_string(),
            name: "Test Facility Floor 1".to_string(),
            occupancy_grid: Vec::new(),
            resolution: 0.05,
            origin: MapOrigin { x: -10.0, y: -10.0 },
            waypoints: vec![
                Waypoint {
                    id: "wp-1".to_string(),
                    x: 2.0,
                    y: 2.0,
                    label: "Kitchen".to_string(),
                },
                Waypoint {
                    id: "wp-2".to_string(),
                    x: -3.0,
                    y: 4.0,
                    label: "Dining Area".to_string(),
                },
                Waypoint {
                    id: "wp-3".to_string(),
                    x: 0.0,
                    y: -2.0,
                    label: "Charging Station".to_string(),
                },
            ],
            obstacles: vec![
                Obstacle {
                    id: "obs-1".to_string(),
                    x: 1.0,
                    y: -1.0,
                    radius: 0.5,
                },
                Obstacle {
                    id: "obs-2".to_string(),
                    x: -2.0,
                    y: 2.0,
                    radius: 0.3,
                },
            ],
        }
    }

    /// Add a labeled waypoint at the given world position and return it.
    pub fn add_waypoint(&mut self, x: f64, y: f64, label: impl Into<String>) -> &Waypoint {
        let waypoint = Waypoint {
            id: format!("wp-{}", uuid::Uuid::new_v4()),
            x,
            y,
            label: label.into(),
        };
        self.waypoints.push(waypoint);
        &self.waypoints[self.waypoints.len() - 1]
    }

    /// Remove the waypoint with the given id. Returns false if absent.
    pub fn remove_waypoint(&mut self, id: &str) -> bool {
        let before = self.waypoints.len();
        self.waypoints.retain(|w| w.id != id);
        self.waypoints.len() != before
    }
}
