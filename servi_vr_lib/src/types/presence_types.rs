use serde::{Deserialize, Serialize};
use uuid;

/// A connected WebXR participant as shared between clients.
///
/// The relay treats these as opaque: clients author them and other
/// clients consume them, so the wire field names follow the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: UserRole,
    pub position: [f64; 3],
    pub rotation: [f64; 4],
    pub color: String,
}

impl User {
    pub fn new(username: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            role,
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            color: "#2563eb".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Viewer,
    Controller,
}

/// A 3D note pinned in the shared scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub position: [f64; 3],
    pub text: String,
    /// Milliseconds since Unix epoch
    pub timestamp: u64,
    pub color: String,
}

impl Annotation {
    /// Build an annotation authored by `user`, inheriting their color.
    pub fn new(user: &User, position: [f64; 3], text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            username: user.username.clone(),
            position,
            text: text.into(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_millis() as u64,
            color: user.color.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_inherits_author_identity() {
        let user = User::new("dana", UserRole::Controller);
        let annotation = Annotation::new(&user, [1.0, 2.0, 3.0], "check this shelf");

        assert_eq!(annotation.user_id, user.id);
        assert_eq!(annotation.username, "dana");
        assert_eq!(annotation.color, user.color);
        assert_eq!(annotation.position, [1.0, 2.0, 3.0]);
        assert!(annotation.timestamp > 0);
        assert_ne!(annotation.id, user.id);
    }

    #[test]
    fn test_annotation_wire_field_names() {
        let user = User::new("sam", UserRole::Viewer);
        let annotation = Annotation::new(&user, [0.0, 1.0, 0.0], "note");
        let json = serde_json::to_value(&annotation).unwrap();

        assert!(json.get("userId").is_some());
        assert!(json.get("user_id").is_none());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let user = User::new("sam", UserRole::Viewer);
        let json = serde_json::to_value(&user).unwrap();

        assert_eq!(json["role"], "viewer");
        assert_eq!(json["rotation"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_unique_user_ids() {
        let a = User::new("a", UserRole::Viewer);
        let b = User::new("b", UserRole::Viewer);
        assert_ne!(a.id, b.id);
    }
}
