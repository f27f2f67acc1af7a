//! To-do items owned by exactly one identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row of the `tasks` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub is_done: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload. `id`, `is_done` and `created_at` are server defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub user_id: Uuid,
    pub title: String,
}

impl NewTask {
    /// Builds an insert for `owner`, or `None` when the title trims to nothing.
    pub fn from_input(owner: Uuid, input: &str) -> Option<Self> {
        let title = input.trim();
        if title.is_empty() {
            return None;
        }
        Some(Self {
            user_id: owner,
            title: title.to_string(),
        })
    }
}

/// Partial update applied by the toggle action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    pub is_done: bool,
}

impl TaskPatch {
    pub fn toggled(task: &Task) -> Self {
        Self {
            is_done: !task.is_done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_trims_title() {
        let owner = Uuid::new_v4();
        let task = NewTask::from_input(owner, "  Buy milk \n").unwrap();
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.user_id, owner);
    }

    #[test]
    fn test_new_task_rejects_blank_input() {
        assert!(NewTask::from_input(Uuid::new_v4(), "").is_none());
        assert!(NewTask::from_input(Uuid::new_v4(), " \t\n ").is_none());
    }

    #[test]
    fn test_new_task_omits_server_defaults() {
        let task = NewTask::from_input(Uuid::new_v4(), "Buy milk").unwrap();
        let json = serde_json::to_value(&task).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj.contains_key("user_id"));
        assert!(!obj.contains_key("is_done"));
    }

    #[test]
    fn test_task_deserializes_postgrest_row() {
        let json = r#"{
            "id": "0b5b3c1e-8d0e-4f0f-9a47-6a3f1a8c2d11",
            "user_id": "6f1c2a7e-0d4b-4a57-9d7a-3f4ad5d0b2c1",
            "title": "Buy milk",
            "is_done": false,
            "created_at": "2024-05-01T12:30:00.123456+00:00"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.title, "Buy milk");
        assert!(!task.is_done);
    }

    #[test]
    fn test_toggle_patch_negates() {
        let mut task = Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "x".to_string(),
            is_done: false,
            created_at: Utc::now(),
        };
        assert!(TaskPatch::toggled(&task).is_done);
        task.is_done = true;
        assert!(!TaskPatch::toggled(&task).is_done);
    }
}
