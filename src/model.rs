use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use time::OffsetDateTime;
use uuid::Uuid;

/// Opaque task identifier. Generated once at creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for TaskId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single to-do item. The serde shape is the on-disk record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub due_date: Option<String>,
    /// Creation instant in unix milliseconds.
    pub created_at: i64,
}

impl Task {
    pub(crate) fn new(text: String, due_date: Option<String>, created_at: OffsetDateTime) -> Self {
        Self {
            id: TaskId::generate(),
            text,
            completed: false,
            due_date,
            created_at: unix_millis(created_at),
        }
    }
}

/// Shallow partial update; `None` fields keep their prior value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    /// `Some(None)` clears the due date.
    pub due_date: Option<Option<String>>,
}

impl TaskPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none() && self.due_date.is_none()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Active,
    Completed,
}

impl FilterMode {
    /// Parses a stored or user-supplied mode; anything unrecognised is `All`.
    pub fn parse_or_default(raw: &str) -> Self {
        raw.trim().parse().unwrap_or_default()
    }

    pub fn next(self) -> Self {
        let all = Self::iter().collect::<Vec<_>>();
        let idx = all.iter().position(|mode| *mode == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }

    pub fn index(self) -> usize {
        Self::iter().position(|mode| mode == self).unwrap_or(0)
    }

    pub fn title(self) -> &'static str {
        match self {
            FilterMode::All => "All",
            FilterMode::Active => "Active",
            FilterMode::Completed => "Completed",
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    AsRefStr,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    #[default]
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

pub(crate) fn unix_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_mode_parses_known_values_only() {
        assert_eq!(FilterMode::parse_or_default("active"), FilterMode::Active);
        assert_eq!(FilterMode::parse_or_default("completed"), FilterMode::Completed);
        assert_eq!(FilterMode::parse_or_default("all"), FilterMode::All);
        assert_eq!(FilterMode::parse_or_default("Active"), FilterMode::All);
        assert_eq!(FilterMode::parse_or_default("done"), FilterMode::All);
        assert_eq!(FilterMode::parse_or_default(""), FilterMode::All);
    }

    #[test]
    fn filter_mode_cycles_through_every_mode() {
        assert_eq!(FilterMode::All.next(), FilterMode::Active);
        assert_eq!(FilterMode::Active.next(), FilterMode::Completed);
        assert_eq!(FilterMode::Completed.next(), FilterMode::All);
        assert_eq!(FilterMode::Completed.to_string(), "completed");
    }

    #[test]
    fn task_serialises_with_stored_field_names() {
        let task = Task {
            id: TaskId::from("abc"),
            text: "Buy milk".into(),
            completed: false,
            due_date: None,
            created_at: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&task).expect("serialise");
        assert_eq!(
            json,
            serde_json::json!({
                "id": "abc",
                "text": "Buy milk",
                "completed": false,
                "dueDate": null,
                "createdAt": 1_700_000_000_000i64,
            })
        );
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = TaskId::generate();
        let b = TaskId::generate();
        assert_ne!(a, b);
    }
}
