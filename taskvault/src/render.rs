//! Plain-text rendering of dashboard state.

use taskvault_common::{Identity, Profile, Task};

pub fn task_line(position: usize, task: &Task) -> String {
    let mark = if task.is_done { "x" } else { " " };
    format!("{:>3}. [{}] {}", position, mark, task.title)
}

/// Numbered list, 1-based, in the order given.
pub fn task_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks yet.".to_string();
    }
    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| task_line(i + 1, task))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Same as [`task_list`] with task ids, for one-shot commands that take an id.
pub fn task_table(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks yet.".to_string();
    }
    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| format!("{}  {}", task_line(i + 1, task), task.id))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn welcome(identity: &Identity, profile: Option<&Profile>) -> String {
    let username = profile
        .and_then(|p| p.username.as_deref())
        .unwrap_or_default();
    let email = identity.email.as_deref().unwrap_or_default();
    format!("Welcome {} ({})", username, email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn task(title: &str, is_done: bool) -> Task {
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: title.to_string(),
            is_done,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_task_list_marks_done_tasks() {
        let rendered = task_list(&[task("Buy milk", true), task("Walk dog", false)]);
        assert_eq!(rendered, "  1. [x] Buy milk\n  2. [ ] Walk dog");
    }

    #[test]
    fn test_empty_task_list() {
        assert_eq!(task_list(&[]), "No tasks yet.");
        assert_eq!(task_table(&[]), "No tasks yet.");
    }

    #[test]
    fn test_task_table_includes_ids() {
        let t = task("Buy milk", false);
        assert!(task_table(std::slice::from_ref(&t)).ends_with(&t.id.to_string()));
    }

    #[test]
    fn test_welcome_line() {
        let identity = Identity::new(Uuid::new_v4(), Some("a@x.com".to_string()));
        let profile = Profile {
            id: identity.id,
            username: Some("a".to_string()),
            full_name: Some(String::new()),
        };
        assert_eq!(welcome(&identity, Some(&profile)), "Welcome a (a@x.com)");
        assert_eq!(welcome(&identity, None), "Welcome  (a@x.com)");
    }
}
