use unicode_segmentation::UnicodeSegmentation;

use crate::model::TaskId;

/// What closing an edit asks the store to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Update { id: TaskId, text: String },
    /// The field was cleared; an emptied edit deletes the task.
    Delete { id: TaskId },
    Unchanged { id: TaskId },
    Cancelled { id: TaskId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginEdit {
    /// Editing started; an edit open on another task was committed first.
    Started { committed: Option<EditOutcome> },
    /// The task is already being edited.
    Ignored,
}

/// Single-line text field pre-filled with the task's text.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    id: TaskId,
    original: String,
    text: String,
    cursor: usize,
}

impl EditBuffer {
    fn new(id: TaskId, original: &str) -> Self {
        Self {
            id,
            original: original.to_string(),
            text: original.to_string(),
            cursor: original.len(),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn replace_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.len();
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        if ch == '\n' || ch == '\r' {
            return false;
        }
        self.text.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.text, self.cursor);
        self.text.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.text.len() {
            return false;
        }
        let next = next_grapheme_boundary(&self.text, self.cursor);
        self.text.drain(self.cursor..next);
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = prev_grapheme_boundary(&self.text, self.cursor);
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor >= self.text.len() {
            return false;
        }
        self.cursor = next_grapheme_boundary(&self.text, self.cursor);
        true
    }

    pub fn move_home(&mut self) -> bool {
        let moved = self.cursor != 0;
        self.cursor = 0;
        moved
    }

    pub fn move_end(&mut self) -> bool {
        let moved = self.cursor != self.text.len();
        self.cursor = self.text.len();
        moved
    }

    fn into_commit(self) -> EditOutcome {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            EditOutcome::Delete { id: self.id }
        } else if trimmed == self.original {
            EditOutcome::Unchanged { id: self.id }
        } else {
            EditOutcome::Update {
                id: self.id,
                text: trimmed.to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
enum EditState {
    #[default]
    Idle,
    Editing(EditBuffer),
}

/// Inline edit of one task's text: Idle -> Editing -> Idle via commit or cancel.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: EditState,
}

impl EditSession {
    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing(_))
    }

    pub fn editing_id(&self) -> Option<&TaskId> {
        self.buffer().map(EditBuffer::id)
    }

    pub fn buffer(&self) -> Option<&EditBuffer> {
        match &self.state {
            EditState::Editing(buffer) => Some(buffer),
            EditState::Idle => None,
        }
    }

    pub fn buffer_mut(&mut self) -> Option<&mut EditBuffer> {
        match &mut self.state {
            EditState::Editing(buffer) => Some(buffer),
            EditState::Idle => None,
        }
    }

    pub fn begin(&mut self, id: TaskId, text: &str) -> BeginEdit {
        if self.editing_id() == Some(&id) {
            return BeginEdit::Ignored;
        }
        let committed = self.commit();
        self.state = EditState::Editing(EditBuffer::new(id, text));
        BeginEdit::Started { committed }
    }

    /// What committing now would produce, leaving the session open until the
    /// outcome has been saved.
    pub fn pending_commit(&self) -> Option<EditOutcome> {
        self.buffer().map(|buffer| buffer.clone().into_commit())
    }

    /// Submit or focus loss. `None` when nothing is being edited.
    pub fn commit(&mut self) -> Option<EditOutcome> {
        match std::mem::take(&mut self.state) {
            EditState::Editing(buffer) => Some(buffer.into_commit()),
            EditState::Idle => None,
        }
    }

    pub fn cancel(&mut self) -> Option<EditOutcome> {
        match std::mem::take(&mut self.state) {
            EditState::Editing(buffer) => Some(EditOutcome::Cancelled { id: buffer.id }),
            EditState::Idle => None,
        }
    }

    pub fn cancel_for(&mut self, id: &TaskId) -> Option<EditOutcome> {
        if self.editing_id() != Some(id) {
            return None;
        }
        self.cancel()
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut last = 0;
    for (idx, _) in text[..cursor].grapheme_indices(true) {
        last = idx;
    }
    last
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor >= text.len() {
        return text.len();
    }
    text[cursor..]
        .graphemes(true)
        .next()
        .map(|grapheme| cursor + grapheme.len())
        .unwrap_or(text.len())
}
