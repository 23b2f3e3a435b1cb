use std::fmt::Write as _;
use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use time::OffsetDateTime;

use crate::app::reconcile::Summary;
use crate::app::App;
use crate::config::AppConfig;
use crate::countdown::{due_label, format_countdown, local_now, parse_due_end_of_day};
use crate::model::FilterMode;
use crate::storage::{KeyValueStore, StorageHandle};
use crate::store::Store;

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task text (prompted if omitted)
    #[arg()]
    pub text: Vec<String>,
    /// Due date as YYYY-MM-DD
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Filter to apply (all, active, completed); defaults to the saved filter
    #[arg(long, value_parser = parse_filter)]
    pub filter: Option<FilterMode>,
}

fn parse_filter(raw: &str) -> Result<FilterMode, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("unknown filter `{raw}` (expected all, active or completed)"))
}

pub fn run_tui(config: Arc<AppConfig>, storage: StorageHandle) -> Result<()> {
    if !atty::is(atty::Stream::Stdout) {
        bail!("the task list UI needs an interactive terminal; use `add` or `list` instead");
    }
    let mut app = App::new(config, storage)?;
    app.run()
}

pub fn add_task(storage: StorageHandle, args: AddArgs) -> Result<()> {
    let mut store = Store::open(storage).context("loading tasks")?;
    let text = if args.text.is_empty() {
        prompt("Task")?
    } else {
        args.text.join(" ")
    };
    let output = run_add(&mut store, &text, args.due.as_deref(), local_now())?;
    println!("{output}");
    Ok(())
}

pub fn list_tasks(storage: StorageHandle, args: ListArgs) -> Result<()> {
    let store = Store::open(storage).context("loading tasks")?;
    let filter = args.filter.unwrap_or_else(|| store.filter());
    print!("{}", run_list(&store, filter, local_now())?);
    Ok(())
}

pub(crate) fn run_add<K: KeyValueStore>(
    store: &mut Store<K>,
    text: &str,
    due: Option<&str>,
    now: OffsetDateTime,
) -> Result<String> {
    if text.trim().is_empty() {
        bail!("task text cannot be empty");
    }
    let due = due.map(str::trim).filter(|due| !due.is_empty());
    if let Some(raw) = due {
        if parse_due_end_of_day(raw, now).is_none() {
            tracing::warn!(due = raw, "due date is not YYYY-MM-DD; it will show without a countdown");
        }
    }
    let Some(task) = store.add_at(text, due, now).context("saving task")? else {
        bail!("task text cannot be empty");
    };
    Ok(format!("Added {}: {}", task.id, task.text))
}

pub(crate) fn run_list<K: KeyValueStore>(
    store: &Store<K>,
    filter: FilterMode,
    now: OffsetDateTime,
) -> Result<String> {
    let mut output = String::new();
    let mut shown = 0usize;
    for task in store.tasks().iter().filter(|task| crate::filter::matches(task, filter)) {
        let mark = if task.completed { "[x]" } else { "[ ]" };
        let countdown = format_countdown(task.due_date.as_deref(), now);
        writeln!(
            output,
            "{mark} {}  ({}; {})",
            task.text,
            due_label(task.due_date.as_deref()),
            countdown.label
        )?;
        shown += 1;
    }
    if shown == 0 {
        match filter {
            FilterMode::All => writeln!(output, "No tasks yet.")?,
            mode => writeln!(output, "No {} tasks.", mode.as_ref())?,
        }
    }
    let summary = Summary::compute(store.snapshot());
    writeln!(output, "{} • {}", summary.progress_label(), summary.remaining_label())?;
    Ok(output)
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::init_storage;
    use time::macros::datetime;

    type TestResult<T = ()> = Result<T>;

    const NOW: OffsetDateTime = datetime!(2024-05-01 12:00 UTC);

    #[test]
    fn cli_add_persists_task_with_due_date() -> TestResult {
        let (_temp_dir, storage) = init_storage()?;
        let mut store = Store::open(storage.clone())?;
        let output = run_add(&mut store, "  Buy milk ", Some("2024-05-03"), NOW)?;
        assert!(output.contains("Buy milk"));

        let reopened = Store::open(storage)?;
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.tasks()[0].due_date.as_deref(), Some("2024-05-03"));
        Ok(())
    }

    #[test]
    fn cli_add_rejects_blank_text() -> TestResult {
        let (_temp_dir, storage) = init_storage()?;
        let mut store = Store::open(storage)?;
        assert!(run_add(&mut store, "   ", None, NOW).is_err());
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn cli_add_keeps_unparseable_due_as_given() -> TestResult {
        let (_temp_dir, storage) = init_storage()?;
        let mut store = Store::open(storage)?;
        run_add(&mut store, "task", Some("next week"), NOW)?;
        let listed = run_list(&store, FilterMode::All, NOW)?;
        assert!(listed.contains("(Due: next week; Time left: —)"));
        Ok(())
    }

    #[test]
    fn cli_list_respects_filter() -> TestResult {
        let (_temp_dir, storage) = init_storage()?;
        let mut store = Store::open(storage)?;
        run_add(&mut store, "Water plants", None, NOW)?;
        run_add(&mut store, "File taxes", Some("2001-01-01"), NOW)?;
        let taxes = store.tasks()[0].id.clone();
        store.toggle_complete(&taxes)?;

        let all = run_list(&store, FilterMode::All, NOW)?;
        assert!(all.contains("[ ] Water plants  (No deadline; Time left: —)"));
        assert!(all.contains("[x] File taxes  (Due: 2001-01-01; Deadline passed!)"));
        assert!(all.contains("1/2 tasks completed (50%) • 1 task left"));

        let active = run_list(&store, FilterMode::Active, NOW)?;
        assert!(active.contains("Water plants"));
        assert!(!active.contains("File taxes"));
        Ok(())
    }

    #[test]
    fn cli_list_reports_empty_filter() -> TestResult {
        let (_temp_dir, storage) = init_storage()?;
        let store = Store::open(storage)?;
        let output = run_list(&store, FilterMode::Completed, NOW)?;
        assert!(output.contains("No completed tasks."));
        assert!(output.contains("0/0 tasks completed (0%)"));

        let output = run_list(&store, FilterMode::All, NOW)?;
        assert!(output.contains("No tasks yet."));
        assert!(!output.contains("No all tasks"));
        Ok(())
    }

    #[test]
    fn filter_argument_parses_known_modes() {
        assert_eq!(parse_filter("active"), Ok(FilterMode::Active));
        assert!(parse_filter("someday").is_err());
    }
}
