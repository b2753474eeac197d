use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    /// What needs doing. At least 5 characters after trimming.
    pub description: String,
    /// Whether the task is done.
    pub completed: bool,
    /// Identifier of the user who owns the task. Always set from the
    /// authenticated identity, never from the request body.
    pub owner: Uuid,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the task.
    pub updated_at: DateTime<Utc>,
}

/// Input structure for creating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    #[validate(length(min = 5, message = "Description must be at least 5 characters"))]
    pub description: String,

    #[serde(default)]
    pub completed: bool,
}

impl TaskInput {
    pub fn normalize(&mut self) {
        self.description = self.description.trim().to_string();
    }
}

impl Task {
    /// Creates a new `Task` from `TaskInput` and the owner's id, stamping
    /// both timestamps with the current time.
    pub fn new(input: TaskInput, owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description: input.description,
            completed: input.completed,
            owner,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Task update payload. Any key outside {description, completed} is rejected
/// at the deserialization boundary by `deny_unknown_fields`.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TaskUpdate {
    #[validate(length(min = 5, message = "Description must be at least 5 characters"))]
    pub description: Option<String>,

    pub completed: Option<bool>,
}

impl TaskUpdate {
    pub fn normalize(&mut self) {
        if let Some(description) = &self.description {
            self.description = Some(description.trim().to_string());
        }
    }
}

/// Query parameters for listing tasks:
/// `GET /tasks?completed=true&limit=10&skip=10&sortBy=createdAt:desc`.
///
/// `limit` and `skip` arrive as raw strings; values that do not parse as
/// integers behave as if they were absent.
#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub completed: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

/// Columns the list endpoint may sort by. Both camelCase (as the JSON
/// responses once used) and snake_case spellings are accepted.
fn sort_column(field: &str) -> Option<&'static str> {
    match field {
        "description" => Some("description"),
        "completed" => Some("completed"),
        "createdAt" | "created_at" => Some("created_at"),
        "updatedAt" | "updated_at" => Some("updated_at"),
        _ => None,
    }
}

impl TaskQuery {
    /// `completed=true` filters for finished tasks; any other present value
    /// filters for unfinished ones. Absent means no filter.
    pub fn completed_filter(&self) -> Option<bool> {
        self.completed.as_deref().map(|value| value == "true")
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit.as_deref().and_then(|value| value.parse().ok())
    }

    pub fn skip(&self) -> Option<i64> {
        self.skip.as_deref().and_then(|value| value.parse().ok())
    }

    /// Parses `sortBy=<field>:<direction>` into a whitelisted column and a
    /// descending flag. The direction is descending only for the exact
    /// segment "desc". Unknown columns are ignored entirely.
    pub fn sort(&self) -> Option<(&'static str, bool)> {
        let raw = self.sort_by.as_deref()?;
        let mut parts = raw.splitn(2, ':');
        let column = sort_column(parts.next()?)?;
        let descending = parts.next() == Some("desc");
        Some((column, descending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_task_creation() {
        let input = TaskInput {
            description: "Walk the dog".to_string(),
            completed: false,
        };

        let owner = Uuid::new_v4();
        let task = Task::new(input, owner);
        assert_eq!(task.description, "Walk the dog");
        assert_eq!(task.owner, owner);
        assert!(!task.completed);
    }

    #[test]
    fn test_task_input_validation() {
        let valid = TaskInput {
            description: "Water the plants".to_string(),
            completed: false,
        };
        assert!(valid.validate().is_ok());

        // Below the 5-character minimum
        let invalid = TaskInput {
            description: "hi".to_string(),
            completed: false,
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_task_input_defaults_completed() {
        let input: TaskInput = serde_json::from_str(r#"{"description": "Buy groceries"}"#).unwrap();
        assert!(!input.completed);
    }

    #[test]
    fn test_task_update_rejects_unknown_fields() {
        let result: Result<TaskUpdate, _> =
            serde_json::from_str(r#"{"description": "Buy groceries", "owner": "someone-else"}"#);
        assert!(result.is_err());

        let result: Result<TaskUpdate, _> = serde_json::from_str(r#"{"completed": true}"#);
        assert!(result.is_ok());
    }

    #[test]
    fn test_query_completed_filter() {
        let query = TaskQuery {
            completed: Some("true".to_string()),
            limit: None,
            skip: None,
            sort_by: None,
        };
        assert_eq!(query.completed_filter(), Some(true));

        let query = TaskQuery {
            completed: Some("yes".to_string()),
            limit: None,
            skip: None,
            sort_by: None,
        };
        assert_eq!(query.completed_filter(), Some(false));

        let query = TaskQuery {
            completed: None,
            limit: None,
            skip: None,
            sort_by: None,
        };
        assert_eq!(query.completed_filter(), None);
    }

    #[test]
    fn test_query_pagination_parsing() {
        let query = TaskQuery {
            completed: None,
            limit: Some("10".to_string()),
            skip: Some("banana".to_string()),
            sort_by: None,
        };
        assert_eq!(query.limit(), Some(10));
        // Unparseable values behave as if absent
        assert_eq!(query.skip(), None);
    }

    #[test]
    fn test_query_sort_parsing() {
        let query = |raw: &str| TaskQuery {
            completed: None,
            limit: None,
            skip: None,
            sort_by: Some(raw.to_string()),
        };

        assert_eq!(query("createdAt:desc").sort(), Some(("created_at", true)));
        assert_eq!(query("createdAt:asc").sort(), Some(("created_at", false)));
        // Missing or unrecognized direction segment means ascending
        assert_eq!(query("completed").sort(), Some(("completed", false)));
        assert_eq!(query("completed:backwards").sort(), Some(("completed", false)));
        // Unknown columns are ignored
        assert_eq!(query("owner:desc").sort(), None);
    }
}
