use time::OffsetDateTime;

use crate::app::edit::{BeginEdit, EditOutcome};
use crate::app::reconcile::ViewChange;
use crate::app::state::AppState;
use crate::model::{FilterMode, TaskId, TaskPatch};
use crate::storage::{codec, KeyValueStore, StorageError};

/// User intents, independent of the key or widget that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add { text: String, due: Option<String> },
    ToggleComplete(TaskId),
    Delete(TaskId),
    BeginEdit(TaskId),
    CommitEdit(TaskId),
    CancelEdit(TaskId),
    SetFilter(FilterMode),
    ClearCompleted,
    ToggleTheme,
}

impl Command {
    fn is_edit(&self) -> bool {
        matches!(
            self,
            Command::BeginEdit(_) | Command::CommitEdit(_) | Command::CancelEdit(_)
        )
    }
}

impl<K: KeyValueStore> AppState<K> {
    /// Applies one command: store mutation (persisted) first, then the view update.
    ///
    /// Any command other than the edit commands first commits an open edit, the
    /// same way moving focus away from the field would.
    pub fn dispatch(&mut self, command: Command, now: OffsetDateTime) -> Result<ViewChange, StorageError> {
        if !command.is_edit() {
            self.blur_edit(now)?;
        }
        let change = match command {
            Command::Add { text, due } => match self.store.add_at(&text, due.as_deref(), now)? {
                Some(task) => {
                    let change = self.reconciler.on_add(self.store.snapshot(), &task, now);
                    if change != ViewChange::None {
                        self.selected = 0;
                    }
                    change
                }
                None => ViewChange::None,
            },
            Command::ToggleComplete(id) => match self.store.toggle_complete(&id)? {
                Some(task) => self.reconciler.on_update(self.store.snapshot(), &task, now),
                None => ViewChange::None,
            },
            Command::Delete(id) => self.delete_task(&id)?,
            Command::BeginEdit(id) => self.begin_edit(id, now)?,
            Command::CommitEdit(id) => {
                if self.edit.editing_id() == Some(&id) {
                    self.blur_edit(now)?
                } else {
                    ViewChange::None
                }
            }
            Command::CancelEdit(id) => {
                self.edit.cancel_for(&id);
                ViewChange::None
            }
            Command::SetFilter(mode) => {
                self.store.set_filter(mode)?;
                self.reconciler.on_filter_change(self.store.snapshot(), now)
            }
            Command::ClearCompleted => {
                if self.store.clear_completed()? == 0 {
                    ViewChange::None
                } else {
                    self.cancel_stale_edit();
                    self.reconciler.rebuild(self.store.snapshot(), now)
                }
            }
            Command::ToggleTheme => {
                let next = self.theme.toggled();
                codec::save_theme(self.store.backend(), next)?;
                self.theme = next;
                tracing::debug!(theme = %next, "theme toggled");
                ViewChange::None
            }
        };
        self.normalize_selection();
        Ok(change)
    }

    /// Focus left the editor: commit whatever it holds.
    ///
    /// The session closes only once the outcome is saved; on a failed write the
    /// editor stays open with the typed text.
    pub fn blur_edit(&mut self, now: OffsetDateTime) -> Result<ViewChange, StorageError> {
        let Some(outcome) = self.edit.pending_commit() else {
            return Ok(ViewChange::None);
        };
        let change = self.apply_edit_outcome(outcome, now)?;
        self.edit.commit();
        Ok(change)
    }

    fn begin_edit(&mut self, id: TaskId, now: OffsetDateTime) -> Result<ViewChange, StorageError> {
        if self.reconciler.node(&id).is_none() {
            return Ok(ViewChange::None);
        }
        let Some(text) = self.store.get(&id).map(|task| task.text.clone()) else {
            return Ok(ViewChange::None);
        };
        if self.edit.editing_id() == Some(&id) {
            return Ok(ViewChange::None);
        }
        let change = self.blur_edit(now)?;
        match self.edit.begin(id, &text) {
            BeginEdit::Started {
                committed: Some(previous),
            } => self.apply_edit_outcome(previous, now),
            BeginEdit::Started { committed: None } | BeginEdit::Ignored => Ok(change),
        }
    }

    fn apply_edit_outcome(&mut self, outcome: EditOutcome, now: OffsetDateTime) -> Result<ViewChange, StorageError> {
        match outcome {
            EditOutcome::Update { id, text } => {
                match self.store.update(&id, TaskPatch::text(text))? {
                    Some(task) => Ok(self.reconciler.on_update(self.store.snapshot(), &task, now)),
                    None => Ok(ViewChange::None),
                }
            }
            EditOutcome::Delete { id } => self.delete_task(&id),
            EditOutcome::Unchanged { .. } | EditOutcome::Cancelled { .. } => Ok(ViewChange::None),
        }
    }

    fn delete_task(&mut self, id: &TaskId) -> Result<ViewChange, StorageError> {
        match self.store.delete(id)? {
            Some(removed) => {
                self.cancel_stale_edit();
                Ok(self.reconciler.on_delete(self.store.snapshot(), &removed))
            }
            None => Ok(ViewChange::None),
        }
    }

    fn cancel_stale_edit(&mut self) {
        let stale = self
            .edit
            .editing_id()
            .is_some_and(|id| self.store.get(id).is_none());
        if stale {
            self.edit.cancel();
        }
    }
}
