use crate::model::{FilterMode, Task};

/// Whether `task` belongs in the list shown under `mode`.
pub fn matches(task: &Task, mode: FilterMode) -> bool {
    match mode {
        FilterMode::Active => !task.completed,
        FilterMode::Completed => task.completed,
        FilterMode::All => true,
    }
}

pub fn visible_count(tasks: &[Task], mode: FilterMode) -> usize {
    tasks.iter().filter(|task| matches(task, mode)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskId;

    fn task(completed: bool) -> Task {
        Task {
            id: TaskId::generate(),
            text: "t".into(),
            completed,
            due_date: None,
            created_at: 0,
        }
    }

    #[test]
    fn predicate_follows_completion_state() {
        let open = task(false);
        let done = task(true);
        assert!(matches(&open, FilterMode::All));
        assert!(matches(&done, FilterMode::All));
        assert!(matches(&open, FilterMode::Active));
        assert!(!matches(&done, FilterMode::Active));
        assert!(!matches(&open, FilterMode::Completed));
        assert!(matches(&done, FilterMode::Completed));
    }

    #[test]
    fn visible_counts_partition_the_collection() {
        let tasks = vec![task(false), task(true), task(true), task(false), task(false)];
        let active = visible_count(&tasks, FilterMode::Active);
        let completed = visible_count(&tasks, FilterMode::Completed);
        assert_eq!(active, 3);
        assert_eq!(completed, 2);
        assert_eq!(visible_count(&tasks, FilterMode::All), tasks.len());
        assert_eq!(active + completed, tasks.len());
    }
}
