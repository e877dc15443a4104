use serde::{Deserialize, Serialize};

/// Display palette cycled through as robots are added to the fleet.
pub const ROBOT_COLORS: [&str; 5] = ["#2563eb", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6"];

/// One robot known to the visualization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Robot {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub color: String,
}

/// The fleet roster and which robot the scene is focused on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotRoster {
    pub robots: Vec<Robot>,
    pub active_robot_id: String,
}

impl Default for RobotRoster {
    /// Roster with the single demo robot the scene boots with.
    fn default() -> Self {
        Self {
            robots: vec![Robot {
                id: "SERVI-001".to_string(),
                name: "Servi 1".to_string(),
                active: true,
                color: ROBOT_COLORS[0].to_string(),
            }],
            active_robot_id: "SERVI-001".to_string(),
        }
    }
}

impl RobotRoster {
    /// Register a new robot, assigning the next sequential id and the
    /// next palette color.
    pub fn add_robot(&mut self, name: impl Into<String>) -> &Robot {
        let index = self.robots.len();
        let robot = Robot {
            id: format!("SERVI-{:03}", index + 1),
            name: name.into(),
            active: true,
            color: ROBOT_COLORS[index % ROBOT_COLORS.len()].to_string(),
        };
        self.robots.push(robot);
        &self.robots[index]
    }

    pub fn remove_robot(&mut self, id: &str) {
        self.robots.retain(|r| r.id != id);
    }

    /// Focus the scene on `id`. Returns false if no such robot exists,
    /// leaving the current selection unchanged.
    pub fn set_active(&mut self, id: &str) -> bool {
        if self.robots.iter().any(|r| r.id == id) {
            self.active_robot_id = id.to_string();
            true
        } else {
            false
        }
    }

    pub fn active_robot(&self) -> Option<&Robot> {
        self.robots.iter().find(|r| r.id == self.active_robot_id)
    }
}
