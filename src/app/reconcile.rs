//! Keeps the rendered task list in step with the store.
//!
//! The view is a registry of [`ViewNode`]s keyed by task id, in display order.
//! Single-task mutations patch, insert or remove one node; only filter changes
//! (and the rare case of a hidden task becoming visible) rebuild the list.

use std::collections::HashMap;

use bitflags::bitflags;
use indexmap::IndexMap;
use time::OffsetDateTime;

use crate::countdown::{due_label, format_countdown, Countdown};
use crate::filter;
use crate::model::{Task, TaskId};
use crate::store::Snapshot;

bitflags! {
    /// Fragments of a node that changed during a patch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PatchFields: u8 {
        const TEXT = 1 << 0;
        const COMPLETED = 1 << 1;
        const DUE = 1 << 2;
        const COUNTDOWN = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Entering,
    Steady,
    Exiting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewNode {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub due_label: String,
    pub countdown: Countdown,
    pub phase: Phase,
}

impl ViewNode {
    fn render(task: &Task, now: OffsetDateTime, phase: Phase) -> Self {
        Self {
            id: task.id.clone(),
            text: task.text.clone(),
            completed: task.completed,
            due_label: due_label(task.due_date.as_deref()),
            countdown: format_countdown(task.due_date.as_deref(), now),
            phase,
        }
    }

    fn patch(&mut self, task: &Task, now: OffsetDateTime) -> PatchFields {
        let mut fields = PatchFields::empty();
        if self.text != task.text {
            self.text.clone_from(&task.text);
            fields |= PatchFields::TEXT;
        }
        if self.completed != task.completed {
            self.completed = task.completed;
            fields |= PatchFields::COMPLETED;
        }
        let due = due_label(task.due_date.as_deref());
        if self.due_label != due {
            self.due_label = due;
            fields |= PatchFields::DUE;
        }
        if self.paint_countdown(task, now) {
            fields |= PatchFields::COUNTDOWN;
        }
        fields
    }

    /// Repaints only the countdown; returns whether its visible text changed.
    fn paint_countdown(&mut self, task: &Task, now: OffsetDateTime) -> bool {
        let next = format_countdown(task.due_date.as_deref(), now);
        let changed = next.label != self.countdown.label || next.is_overdue != self.countdown.is_overdue;
        self.countdown = next;
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewChange {
    None,
    Inserted(TaskId),
    Patched { id: TaskId, fields: PatchFields },
    Removed(TaskId),
    Rebuilt { visible: usize },
}

/// Aggregate figures shown around the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
    pub percent: u16,
    pub clear_enabled: bool,
}

impl Summary {
    pub fn compute(snapshot: Snapshot<'_>) -> Self {
        let total = snapshot.tasks.len();
        let completed = snapshot.completed_count();
        let percent = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u16
        };
        Self {
            total,
            completed,
            remaining: total - completed,
            percent,
            clear_enabled: completed > 0,
        }
    }

    pub fn progress_label(&self) -> String {
        format!(
            "{}/{} tasks completed ({}%)",
            self.completed, self.total, self.percent
        )
    }

    pub fn remaining_label(&self) -> String {
        match self.remaining {
            1 => "1 task left".to_string(),
            n => format!("{n} tasks left"),
        }
    }
}

#[derive(Debug, Clone)]
struct ExitingNode {
    slot: usize,
    node: ViewNode,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    nodes: IndexMap<TaskId, ViewNode>,
    exiting: Vec<ExitingNode>,
    summary: Summary,
    rebuilds: u64,
}

impl Reconciler {
    pub fn new(snapshot: Snapshot<'_>, now: OffsetDateTime) -> Self {
        let mut reconciler = Self::default();
        reconciler.rebuild(snapshot, now);
        reconciler
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &TaskId) -> Option<&ViewNode> {
        self.nodes.get(id)
    }

    pub fn node_at(&self, index: usize) -> Option<&ViewNode> {
        self.nodes.get_index(index).map(|(_, node)| node)
    }

    pub fn position(&self, id: &TaskId) -> Option<usize> {
        self.nodes.get_index_of(id)
    }

    pub fn visible_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.nodes.keys()
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn has_transitions(&self) -> bool {
        !self.exiting.is_empty() || self.nodes.values().any(|node| node.phase == Phase::Entering)
    }

    /// Live nodes in display order with exiting nodes interleaved at their former slot.
    pub fn rows(&self) -> Vec<&ViewNode> {
        let mut rows = Vec::with_capacity(self.nodes.len() + self.exiting.len());
        for (idx, node) in self.nodes.values().enumerate() {
            rows.extend(
                self.exiting
                    .iter()
                    .filter(|ghost| ghost.slot == idx)
                    .map(|ghost| &ghost.node),
            );
            rows.push(node);
        }
        rows.extend(
            self.exiting
                .iter()
                .filter(|ghost| ghost.slot >= self.nodes.len())
                .map(|ghost| &ghost.node),
        );
        rows
    }

    pub fn rebuild(&mut self, snapshot: Snapshot<'_>, now: OffsetDateTime) -> ViewChange {
        self.nodes.clear();
        self.exiting.clear();
        for task in snapshot.visible() {
            self.nodes
                .insert(task.id.clone(), ViewNode::render(task, now, Phase::Steady));
        }
        self.rebuilds += 1;
        self.refresh_summary(snapshot);
        tracing::debug!(visible = self.nodes.len(), filter = %snapshot.filter, "view rebuilt");
        ViewChange::Rebuilt {
            visible: self.nodes.len(),
        }
    }

    pub fn on_filter_change(&mut self, snapshot: Snapshot<'_>, now: OffsetDateTime) -> ViewChange {
        self.rebuild(snapshot, now)
    }

    pub fn on_add(&mut self, snapshot: Snapshot<'_>, task: &Task, now: OffsetDateTime) -> ViewChange {
        let change = if filter::matches(task, snapshot.filter) {
            let node = ViewNode::render(task, now, Phase::Entering);
            self.nodes.shift_insert(0, task.id.clone(), node);
            for ghost in &mut self.exiting {
                ghost.slot += 1;
            }
            ViewChange::Inserted(task.id.clone())
        } else {
            ViewChange::None
        };
        self.refresh_summary(snapshot);
        change
    }

    /// Handles both text edits and completion toggles.
    pub fn on_update(&mut self, snapshot: Snapshot<'_>, task: &Task, now: OffsetDateTime) -> ViewChange {
        let visible = filter::matches(task, snapshot.filter);
        let present = self.nodes.contains_key(&task.id);
        let change = match (present, visible) {
            (true, true) => {
                let fields = self
                    .nodes
                    .get_mut(&task.id)
                    .map(|node| node.patch(task, now))
                    .unwrap_or_default();
                ViewChange::Patched {
                    id: task.id.clone(),
                    fields,
                }
            }
            (true, false) => {
                self.remove_with_exit(&task.id);
                ViewChange::Removed(task.id.clone())
            }
            (false, true) => return self.rebuild(snapshot, now),
            (false, false) => ViewChange::None,
        };
        self.refresh_summary(snapshot);
        change
    }

    pub fn on_delete(&mut self, snapshot: Snapshot<'_>, id: &TaskId) -> ViewChange {
        let change = if self.remove_with_exit(id) {
            ViewChange::Removed(id.clone())
        } else {
            ViewChange::None
        };
        self.refresh_summary(snapshot);
        change
    }

    /// Tick path: repaints the countdown of every live node. Never touches the store.
    pub fn repaint_countdowns(&mut self, snapshot: Snapshot<'_>, now: OffsetDateTime) -> usize {
        let by_id = snapshot
            .tasks
            .iter()
            .map(|task| (&task.id, task))
            .collect::<HashMap<_, _>>();
        let mut repainted = 0;
        for node in self.nodes.values_mut() {
            let Some(task) = by_id.get(&node.id) else {
                continue;
            };
            if node.paint_countdown(task, now) {
                repainted += 1;
            }
        }
        repainted
    }

    /// Finishes running transitions; returns whether anything changed on screen.
    pub fn settle_transitions(&mut self) -> bool {
        let mut changed = !self.exiting.is_empty();
        self.exiting.clear();
        for node in self.nodes.values_mut() {
            if node.phase == Phase::Entering {
                node.phase = Phase::Steady;
                changed = true;
            }
        }
        changed
    }

    fn remove_with_exit(&mut self, id: &TaskId) -> bool {
        let Some((slot, _, mut node)) = self.nodes.shift_remove_full(id) else {
            return false;
        };
        node.phase = Phase::Exiting;
        for ghost in &mut self.exiting {
            if ghost.slot > slot {
                ghost.slot -= 1;
            }
        }
        self.exiting.push(ExitingNode { slot, node });
        true
    }

    fn refresh_summary(&mut self, snapshot: Snapshot<'_>) {
        self.summary = Summary::compute(snapshot);
    }
}
