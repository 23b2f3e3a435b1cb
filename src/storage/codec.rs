//! Encoding of the task collection and preferences into key-value entries.
//!
//! Decoding never fails: absent or unreadable entries come back as
//! [`Decoded::Missing`] / [`Decoded::Corrupt`] and callers fall back to defaults.

use std::collections::HashSet;

use crate::model::{FilterMode, Task, ThemeMode};
use crate::storage::{KeyValueStore, StorageError};

pub const ITEMS_KEY: &str = "items";
pub const FILTER_KEY: &str = "filter";
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<T> {
    Value(T),
    Missing,
    Corrupt,
}

impl<T> Decoded<T> {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Decoded::Corrupt)
    }

    pub fn unwrap_or(self, fallback: T) -> T {
        match self {
            Decoded::Value(value) => value,
            Decoded::Missing | Decoded::Corrupt => fallback,
        }
    }
}

impl<T: Default> Decoded<T> {
    pub fn into_value(self) -> T {
        self.unwrap_or(T::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedState {
    pub tasks: Vec<Task>,
    pub filter: FilterMode,
}

pub fn decode_items(raw: Option<&str>) -> Decoded<Vec<Task>> {
    let Some(raw) = raw else {
        return Decoded::Missing;
    };
    let tasks: Vec<Task> = match serde_json::from_str(raw) {
        Ok(tasks) => tasks,
        Err(err) => {
            tracing::warn!(%err, "stored task list is unreadable, starting empty");
            return Decoded::Corrupt;
        }
    };

    let mut seen = HashSet::with_capacity(tasks.len());
    let before = tasks.len();
    let tasks = tasks
        .into_iter()
        .filter(|task| !task.text.trim().is_empty())
        .filter(|task| seen.insert(task.id.clone()))
        .collect::<Vec<_>>();
    if tasks.len() != before {
        tracing::warn!(
            dropped = before - tasks.len(),
            "discarded stored tasks with blank text or duplicate ids"
        );
    }
    Decoded::Value(tasks)
}

pub fn decode_filter(raw: Option<&str>) -> Decoded<FilterMode> {
    match raw {
        None => Decoded::Missing,
        Some(raw) => match raw.parse::<FilterMode>() {
            Ok(mode) => Decoded::Value(mode),
            Err(_) => {
                tracing::warn!(stored = raw, "unknown stored filter, using all");
                Decoded::Corrupt
            }
        },
    }
}

pub fn decode_theme(raw: Option<&str>) -> Decoded<ThemeMode> {
    match raw {
        None => Decoded::Missing,
        Some(raw) => raw
            .parse::<ThemeMode>()
            .map(Decoded::Value)
            .unwrap_or(Decoded::Corrupt),
    }
}

pub fn encode_items(tasks: &[Task]) -> Result<String, StorageError> {
    serde_json::to_string(tasks).map_err(|source| StorageError::Encode {
        key: ITEMS_KEY,
        source,
    })
}

pub fn load<K: KeyValueStore + ?Sized>(kv: &K) -> Result<LoadedState, StorageError> {
    let tasks = decode_items(kv.get(ITEMS_KEY)?.as_deref()).into_value();
    let filter = decode_filter(kv.get(FILTER_KEY)?.as_deref()).into_value();
    tracing::debug!(tasks = tasks.len(), %filter, "loaded task state");
    Ok(LoadedState { tasks, filter })
}

pub fn save<K: KeyValueStore + ?Sized>(kv: &K, tasks: &[Task]) -> Result<(), StorageError> {
    let encoded = encode_items(tasks)?;
    kv.put(ITEMS_KEY, &encoded)
}

pub fn save_filter<K: KeyValueStore + ?Sized>(kv: &K, mode: FilterMode) -> Result<(), StorageError> {
    kv.put(FILTER_KEY, mode.as_ref())
}

pub fn load_theme<K: KeyValueStore + ?Sized>(
    kv: &K,
    fallback: ThemeMode,
) -> Result<ThemeMode, StorageError> {
    Ok(decode_theme(kv.get(THEME_KEY)?.as_deref()).unwrap_or(fallback))
}

pub fn save_theme<K: KeyValueStore + ?Sized>(kv: &K, mode: ThemeMode) -> Result<(), StorageError> {
    kv.put(THEME_KEY, mode.as_ref())
}
