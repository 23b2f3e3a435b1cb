use time::OffsetDateTime;

use crate::filter;
use crate::model::{FilterMode, Task, TaskId, TaskPatch};
use crate::storage::{codec, KeyValueStore, StorageError};

/// Read-only view of the store handed to the reconciler and the tick path.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub tasks: &'a [Task],
    pub filter: FilterMode,
}

impl<'a> Snapshot<'a> {
    pub fn get(&self, id: &TaskId) -> Option<&'a Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn visible(&self) -> impl Iterator<Item = &'a Task> + 'a {
        let filter = self.filter;
        self.tasks
            .iter()
            .filter(move |task| filter::matches(task, filter))
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.completed).count()
    }
}

/// Owner of the task collection and the active filter.
///
/// Every mutator writes the full collection through the backend before it
/// returns. Changes are staged on a copy and only committed to memory once the
/// write succeeded, so a failed write leaves memory and disk in agreement.
pub struct Store<K> {
    backend: K,
    tasks: Vec<Task>,
    filter: FilterMode,
}

impl<K: KeyValueStore> Store<K> {
    pub fn open(backend: K) -> Result<Self, StorageError> {
        let loaded = codec::load(&backend)?;
        Ok(Self {
            backend,
            tasks: loaded.tasks,
            filter: loaded.filter,
        })
    }

    pub fn backend(&self) -> &K {
        &self.backend
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.snapshot().completed_count()
    }

    pub fn visible_count(&self, mode: FilterMode) -> usize {
        filter::visible_count(&self.tasks, mode)
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            tasks: &self.tasks,
            filter: self.filter,
        }
    }

    pub fn add(&mut self, text: &str, due_date: Option<&str>) -> Result<Option<Task>, StorageError> {
        self.add_at(text, due_date, OffsetDateTime::now_utc())
    }

    pub fn add_at(
        &mut self,
        text: &str,
        due_date: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<Option<Task>, StorageError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let task = Task::new(text.to_string(), normalize_due(due_date), now);
        let mut next = Vec::with_capacity(self.tasks.len() + 1);
        next.push(task.clone());
        next.extend(self.tasks.iter().cloned());
        self.commit(next)?;
        tracing::info!(id = %task.id, due = ?task.due_date, "task added");
        Ok(Some(task))
    }

    pub fn update(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Option<Task>, StorageError> {
        let Some(idx) = self.position(id) else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(self.tasks[idx].clone()));
        }
        let mut next = self.tasks.clone();
        let task = &mut next[idx];
        if let Some(text) = patch.text {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                tracing::debug!(%id, "ignoring blank text in task update");
            } else {
                task.text = trimmed.to_string();
            }
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        if let Some(due) = patch.due_date {
            task.due_date = normalize_due(due.as_deref());
        }
        let updated = task.clone();
        self.commit(next)?;
        tracing::debug!(%id, "task updated");
        Ok(Some(updated))
    }

    pub fn toggle_complete(&mut self, id: &TaskId) -> Result<Option<Task>, StorageError> {
        let Some(idx) = self.position(id) else {
            return Ok(None);
        };
        let mut next = self.tasks.clone();
        next[idx].completed = !next[idx].completed;
        let toggled = next[idx].clone();
        self.commit(next)?;
        tracing::debug!(%id, completed = toggled.completed, "task toggled");
        Ok(Some(toggled))
    }

    pub fn delete(&mut self, id: &TaskId) -> Result<Option<TaskId>, StorageError> {
        let Some(idx) = self.position(id) else {
            return Ok(None);
        };
        let mut next = self.tasks.clone();
        let removed = next.remove(idx);
        self.commit(next)?;
        tracing::info!(%id, "task deleted");
        Ok(Some(removed.id))
    }

    pub fn clear_completed(&mut self) -> Result<usize, StorageError> {
        let next = self
            .tasks
            .iter()
            .filter(|task| !task.completed)
            .cloned()
            .collect::<Vec<_>>();
        let removed = self.tasks.len() - next.len();
        if removed == 0 {
            return Ok(0);
        }
        self.commit(next)?;
        tracing::info!(removed, "cleared completed tasks");
        Ok(removed)
    }

    pub fn set_filter(&mut self, mode: FilterMode) -> Result<(), StorageError> {
        codec::save_filter(&self.backend, mode)?;
        self.filter = mode;
        tracing::debug!(filter = %mode, "filter changed");
        Ok(())
    }

    /// Accepts raw user or stored input; unknown values select `All`.
    pub fn set_filter_str(&mut self, raw: &str) -> Result<FilterMode, StorageError> {
        let mode = FilterMode::parse_or_default(raw);
        self.set_filter(mode)?;
        Ok(mode)
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| &task.id == id)
    }

    fn commit(&mut self, next: Vec<Task>) -> Result<(), StorageError> {
        if let Err(err) = codec::save(&self.backend, &next) {
            tracing::error!(%err, "failed to persist tasks; change discarded");
            return Err(err);
        }
        self.tasks = next;
        Ok(())
    }
}

fn normalize_due(due_date: Option<&str>) -> Option<String> {
    due_date
        .map(str::trim)
        .filter(|due| !due.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, ITEMS_KEY};
    use assert_matches::assert_matches;
    use std::sync::Arc;

    type TestResult<T = ()> = Result<T, StorageError>;

    fn store() -> Store<Arc<MemoryStore>> {
        Store::open(Arc::new(MemoryStore::new())).expect("memory store opens")
    }

    fn reopen(store: &Store<Arc<MemoryStore>>) -> Store<Arc<MemoryStore>> {
        Store::open(Arc::clone(store.backend())).expect("memory store reopens")
    }

    #[test]
    fn add_prepends_trimmed_task() -> TestResult {
        let mut store = store();
        let first = store.add("  first  ", None)?.expect("created");
        let second = store.add("second", Some(" 2099-01-01 "))?.expect("created");
        assert_eq!(first.text, "first");
        assert_eq!(second.due_date.as_deref(), Some("2099-01-01"));
        let ids: Vec<_> = store.tasks().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        Ok(())
    }

    #[test]
    fn whitespace_only_add_is_ignored() -> TestResult {
        let mut store = store();
        assert_eq!(store.add("", None)?, None);
        assert_eq!(store.add("   \t", Some("2099-01-01"))?, None);
        assert!(store.is_empty());
        assert_eq!(store.backend().raw(ITEMS_KEY), None);
        Ok(())
    }

    #[test]
    fn blank_due_date_is_absent() -> TestResult {
        let mut store = store();
        let task = store.add("x", Some("   "))?.expect("created");
        assert_eq!(task.due_date, None);
        Ok(())
    }

    #[test]
    fn every_mutation_is_visible_after_reload() -> TestResult {
        let mut store = store();
        let a = store.add("a", None)?.expect("created");
        let b = store.add("b", Some("2030-01-01"))?.expect("created");
        store.toggle_complete(&a.id)?;
        store.update(&b.id, TaskPatch::text("b2"))?;
        store.set_filter(FilterMode::Completed)?;

        let reloaded = reopen(&store);
        assert_eq!(reloaded.tasks(), store.tasks());
        assert_eq!(reloaded.filter(), FilterMode::Completed);
        Ok(())
    }

    #[test]
    fn update_merges_only_given_fields() -> TestResult {
        let mut store = store();
        let task = store.add("draft", Some("2030-01-01"))?.expect("created");
        let updated = store
            .update(
                &task.id,
                TaskPatch {
                    completed: Some(true),
                    ..TaskPatch::default()
                },
            )?
            .expect("found");
        assert_eq!(updated.text, "draft");
        assert_eq!(updated.due_date.as_deref(), Some("2030-01-01"));
        assert!(updated.completed);
        assert_eq!(updated.created_at, task.created_at);
        assert_eq!(updated.id, task.id);

        let cleared = store
            .update(
                &task.id,
                TaskPatch {
                    due_date: Some(None),
                    ..TaskPatch::default()
                },
            )?
            .expect("found");
        assert_eq!(cleared.due_date, None);
        Ok(())
    }

    #[test]
    fn update_never_blanks_text() -> TestResult {
        let mut store = store();
        let task = store.add("keep me", None)?.expect("created");
        let updated = store.update(&task.id, TaskPatch::text("   "))?.expect("found");
        assert_eq!(updated.text, "keep me");
        Ok(())
    }

    #[test]
    fn empty_patch_returns_task_without_writing() -> TestResult {
        let mut store = store();
        let task = store.add("steady", Some("2030-01-01"))?.expect("created");
        store.backend().set_reject_writes(true);
        let unchanged = store.update(&task.id, TaskPatch::default())?;
        assert_eq!(unchanged, Some(task));
        Ok(())
    }

    #[test]
    fn unknown_ids_are_noops() -> TestResult {
        let mut store = store();
        store.add("only", None)?;
        let before = store.tasks().to_vec();
        let ghost = TaskId::from("missing");
        assert_eq!(store.update(&ghost, TaskPatch::text("x"))?, None);
        assert_eq!(store.toggle_complete(&ghost)?, None);
        assert_eq!(store.delete(&ghost)?, None);
        assert_eq!(store.tasks(), before.as_slice());
        Ok(())
    }

    #[test]
    fn toggling_twice_restores_completion() -> TestResult {
        let mut store = store();
        let task = store.add("flip", None)?.expect("created");
        assert!(store.toggle_complete(&task.id)?.expect("found").completed);
        assert!(!store.toggle_complete(&task.id)?.expect("found").completed);
        assert_eq!(store.get(&task.id), Some(&task));
        Ok(())
    }

    #[test]
    fn toggle_keeps_order() -> TestResult {
        let mut store = store();
        let a = store.add("a", None)?.expect("created");
        store.add("b", None)?;
        store.add("c", None)?;
        store.toggle_complete(&a.id)?;
        let texts: Vec<_> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "b", "a"]);
        Ok(())
    }

    #[test]
    fn delete_returns_removed_id() -> TestResult {
        let mut store = store();
        let task = store.add("gone", None)?.expect("created");
        assert_eq!(store.delete(&task.id)?, Some(task.id.clone()));
        assert!(store.get(&task.id).is_none());
        Ok(())
    }

    #[test]
    fn clear_completed_removes_only_completed() -> TestResult {
        let mut store = store();
        let a = store.add("done one", None)?.expect("created");
        let active = store.add("still open", None)?.expect("created");
        let b = store.add("done two", None)?.expect("created");
        store.toggle_complete(&a.id)?;
        store.toggle_complete(&b.id)?;

        assert_eq!(store.clear_completed()?, 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].id, active.id);
        assert_eq!(store.clear_completed()?, 0);
        Ok(())
    }

    #[test]
    fn clear_completed_skips_write_when_nothing_to_remove() -> TestResult {
        let mut store = store();
        store.add("open", None)?;
        store.backend().set_reject_writes(true);
        assert_eq!(store.clear_completed()?, 0);
        Ok(())
    }

    #[test]
    fn visible_counts_match_filter() -> TestResult {
        let mut store = store();
        for i in 0..5 {
            let task = store.add(&format!("task {i}"), None)?.expect("created");
            if i % 2 == 0 {
                store.toggle_complete(&task.id)?;
            }
        }
        assert_eq!(store.visible_count(FilterMode::All), store.len());
        assert_eq!(store.visible_count(FilterMode::Completed), 3);
        assert_eq!(store.visible_count(FilterMode::Active), 2);
        for mode in [FilterMode::All, FilterMode::Active, FilterMode::Completed] {
            store.set_filter(mode)?;
            assert_eq!(store.snapshot().visible().count(), store.visible_count(mode));
        }
        Ok(())
    }

    #[test]
    fn set_filter_str_defaults_unknown_input() -> TestResult {
        let mut store = store();
        assert_eq!(store.set_filter_str("active")?, FilterMode::Active);
        assert_eq!(store.set_filter_str("bogus")?, FilterMode::All);
        assert_eq!(reopen(&store).filter(), FilterMode::All);
        Ok(())
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() -> TestResult {
        let mut store = store();
        let task = store.add("stable", None)?.expect("created");
        store.backend().set_reject_writes(true);

        assert_matches!(store.add("new", None), Err(StorageError::Rejected(_)));
        assert_matches!(store.toggle_complete(&task.id), Err(StorageError::Rejected(_)));
        assert_matches!(store.delete(&task.id), Err(StorageError::Rejected(_)));
        assert_matches!(store.set_filter(FilterMode::Active), Err(StorageError::Rejected(_)));

        assert_eq!(store.tasks(), &[task][..]);
        assert_eq!(store.filter(), FilterMode::All);
        store.backend().set_reject_writes(false);
        assert_eq!(reopen(&store).tasks(), store.tasks());
        Ok(())
    }

    #[test]
    fn buy_milk_scenario() -> TestResult {
        let mut store = store();
        let task = store.add("Buy milk", Some("2099-01-01"))?.expect("created");
        assert_eq!(store.len(), 1);
        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
        assert_eq!(task.due_date.as_deref(), Some("2099-01-01"));

        store.set_filter(FilterMode::Active)?;
        assert_eq!(store.snapshot().visible().count(), 1);

        store.toggle_complete(&task.id)?;
        store.set_filter(FilterMode::Active)?;
        assert_eq!(store.snapshot().visible().count(), 0);

        store.set_filter(FilterMode::Completed)?;
        let visible: Vec<_> = store.snapshot().visible().map(|t| t.id.clone()).collect();
        assert_eq!(visible, vec![task.id]);
        Ok(())
    }

    #[test]
    fn store_persists_through_sqlite() -> anyhow::Result<()> {
        let (_temp, storage) = crate::storage::tests::init_storage()?;
        let mut store = Store::open(storage.clone())?;
        let task = store.add("on disk", Some("2031-02-03"))?.expect("created");
        store.set_filter(FilterMode::Active)?;

        let reopened = Store::open(storage)?;
        assert_eq!(reopened.tasks(), &[task][..]);
        assert_eq!(reopened.filter(), FilterMode::Active);
        Ok(())
    }
}
