use time::OffsetDateTime;

use crate::app::edit::EditSession;
use crate::app::reconcile::Reconciler;
use crate::model::{TaskId, ThemeMode};
use crate::storage::KeyValueStore;
use crate::store::Store;

const MAX_INPUT_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddField {
    #[default]
    Text,
    Due,
}

/// Draft of a new task: text plus an optional `YYYY-MM-DD` date.
#[derive(Debug, Clone, Default)]
pub struct AddTaskOverlay {
    pub text: String,
    pub due: String,
    pub field: AddField,
}

impl AddTaskOverlay {
    pub fn active_input(&mut self) -> &mut String {
        match self.field {
            AddField::Text => &mut self.text,
            AddField::Due => &mut self.due,
        }
    }

    pub fn push_char(&mut self, ch: char) {
        let input = self.active_input();
        if input.chars().count() < MAX_INPUT_LEN {
            input.push(ch);
        }
    }

    pub fn pop_char(&mut self) {
        self.active_input().pop();
    }

    pub fn switch_field(&mut self) {
        self.field = match self.field {
            AddField::Text => AddField::Due,
            AddField::Due => AddField::Text,
        };
    }
}

#[derive(Debug, Clone)]
pub enum OverlayState {
    AddTask(AddTaskOverlay),
}

pub struct AppState<K: KeyValueStore> {
    pub(crate) store: Store<K>,
    pub(crate) reconciler: Reconciler,
    pub(crate) edit: EditSession,
    pub(crate) theme: ThemeMode,
    pub(crate) selected: usize,
    status_message: Option<String>,
    overlay: Option<OverlayState>,
}

impl<K: KeyValueStore> AppState<K> {
    pub fn new(store: Store<K>, theme: ThemeMode, now: OffsetDateTime) -> Self {
        let reconciler = Reconciler::new(store.snapshot(), now);
        Self {
            store,
            reconciler,
            edit: EditSession::default(),
            theme,
            selected: 0,
            status_message: None,
            overlay: None,
        }
    }

    pub fn store(&self) -> &Store<K> {
        &self.store
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn edit(&self) -> &EditSession {
        &self.edit
    }

    pub fn edit_mut(&mut self) -> &mut EditSession {
        &mut self.edit
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_editing()
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_id(&self) -> Option<&TaskId> {
        self.reconciler.node_at(self.selected).map(|node| &node.id)
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.reconciler.len();
        if len == 0 {
            return;
        }
        let next = (self.selected as isize + delta).clamp(0, len as isize - 1);
        self.selected = next as usize;
    }

    pub(crate) fn normalize_selection(&mut self) {
        let len = self.reconciler.len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    /// Countdown tick: repaints countdown fragments only.
    pub fn on_countdown_tick(&mut self, now: OffsetDateTime) -> usize {
        self.reconciler.repaint_countdowns(self.store.snapshot(), now)
    }

    pub fn on_animation_tick(&mut self) -> bool {
        self.reconciler.settle_transitions()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn open_add_task(&mut self) {
        self.overlay = Some(OverlayState::AddTask(AddTaskOverlay::default()));
    }

    pub fn add_task_overlay_mut(&mut self) -> Option<&mut AddTaskOverlay> {
        match self.overlay.as_mut() {
            Some(OverlayState::AddTask(draft)) => Some(draft),
            None => None,
        }
    }

    pub fn close_overlay(&mut self) -> Option<OverlayState> {
        self.overlay.take()
    }
}
