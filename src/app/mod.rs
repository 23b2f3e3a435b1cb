use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::config::{AppConfig, Palette};
use crate::countdown::local_now;
use crate::model::FilterMode;
use crate::storage::{codec, StorageHandle};
use crate::store::Store;
use crate::ui;

mod actions;
pub mod edit;
pub mod reconcile;
pub mod state;
pub mod ticker;

pub use actions::Command;
pub use edit::{EditBuffer, EditOutcome, EditSession};
pub use reconcile::{Phase, Reconciler, Summary, ViewChange, ViewNode};
pub use state::{AddField, AddTaskOverlay, AppState, OverlayState};
pub use ticker::TickScheduler;

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    NewTask,
    ToggleSelected,
    DeleteSelected,
    EditSelected,
    Filter(FilterMode),
    NextFilter,
    ClearCompleted,
    ToggleTheme,
}

pub struct App {
    pub config: Arc<AppConfig>,
    state: AppState<StorageHandle>,
    list_state: ListState,
    should_quit: bool,
    animation_rate: Duration,
    countdown: TickScheduler,
}

impl App {
    pub fn new(config: Arc<AppConfig>, storage: StorageHandle) -> Result<Self> {
        let theme = codec::load_theme(&storage, config.theme).context("loading theme preference")?;
        let store = Store::open(storage).context("loading tasks from storage")?;
        let state = AppState::new(store, theme, local_now());
        Ok(Self {
            animation_rate: config.ticks.animation_period(),
            countdown: TickScheduler::new(config.ticks.countdown_period()),
            config,
            state,
            list_state: ListState::default(),
            should_quit: false,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        self.countdown.start(Instant::now());
        let result = self.event_loop(&mut terminal);
        self.countdown.stop();
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_animation = Instant::now();
        loop {
            let palette = Palette::for_mode(self.state.theme());
            terminal
                .draw(|frame| ui::draw_app(frame, &self.state, &mut self.list_state, &palette))
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let now = Instant::now();
            let mut timeout = self
                .animation_rate
                .checked_sub(last_animation.elapsed())
                .unwrap_or(Duration::ZERO);
            if let Some(until_countdown) = self.countdown.time_until_due(now) {
                timeout = timeout.min(until_countdown);
            }

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::FocusLost => self.blur_edit(),
                    _ => {}
                }
            }

            if self.countdown.poll(Instant::now()) {
                let repainted = self.state.on_countdown_tick(local_now());
                tracing::trace!(repainted, "countdown tick");
            }
            if last_animation.elapsed() >= self.animation_rate {
                self.state.on_animation_tick();
                last_animation = Instant::now();
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.handle_action(Action::Quit);
            return;
        }
        if self.handle_overlay_key(key) {
            return;
        }
        if self.state.is_editing() {
            self.handle_editor_key(key);
            return;
        }

        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        let action = match key.code {
            KeyCode::Char('q') if plain => Some(Action::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Char('a') if plain => Some(Action::NewTask),
            KeyCode::Char(' ') | KeyCode::Char('x') if plain => Some(Action::ToggleSelected),
            KeyCode::Char('d') if plain => Some(Action::DeleteSelected),
            KeyCode::Char('e') | KeyCode::Enter if plain => Some(Action::EditSelected),
            KeyCode::Char('1') => Some(Action::Filter(FilterMode::All)),
            KeyCode::Char('2') => Some(Action::Filter(FilterMode::Active)),
            KeyCode::Char('3') => Some(Action::Filter(FilterMode::Completed)),
            KeyCode::Char('f') if plain => Some(Action::NextFilter),
            KeyCode::Char('C') => Some(Action::ClearCompleted),
            KeyCode::Char('t') if plain => Some(Action::ToggleTheme),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => {
                self.blur_edit();
                self.should_quit = true;
            }
            Action::SelectNext => self.state.move_selection(1),
            Action::SelectPrevious => self.state.move_selection(-1),
            Action::NewTask => {
                self.blur_edit();
                self.state.open_add_task();
                self.state.set_status_message(Some(
                    "Type the task, Tab to set a due date (YYYY-MM-DD), Enter to add",
                ));
            }
            Action::ToggleSelected => {
                if let Some(id) = self.state.selected_id().cloned() {
                    self.apply(Command::ToggleComplete(id));
                }
            }
            Action::DeleteSelected => {
                if let Some(id) = self.state.selected_id().cloned() {
                    self.apply(Command::Delete(id));
                }
            }
            Action::EditSelected => {
                if let Some(id) = self.state.selected_id().cloned() {
                    self.apply(Command::BeginEdit(id));
                }
            }
            Action::Filter(mode) => self.apply(Command::SetFilter(mode)),
            Action::NextFilter => {
                let next = self.state.store().filter().next();
                self.apply(Command::SetFilter(next));
            }
            Action::ClearCompleted => {
                if self.state.reconciler().summary().clear_enabled {
                    self.apply(Command::ClearCompleted);
                } else {
                    self.state.set_status_message(Some("No completed tasks to clear"));
                }
            }
            Action::ToggleTheme => self.apply(Command::ToggleTheme),
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        let Some(draft) = self.state.add_task_overlay_mut() else {
            return false;
        };
        match key.code {
            KeyCode::Esc => {
                self.state.close_overlay();
                self.state.set_status_message(Some("Canceled new task"));
            }
            KeyCode::Enter => self.submit_new_task(),
            KeyCode::Tab | KeyCode::BackTab => draft.switch_field(),
            KeyCode::Backspace => draft.pop_char(),
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                draft.push_char(ch)
            }
            _ => {}
        }
        true
    }

    fn submit_new_task(&mut self) {
        let Some(OverlayState::AddTask(draft)) = self.state.close_overlay() else {
            return;
        };
        if draft.text.trim().is_empty() {
            self.state.set_status_message(Some("Task text cannot be empty"));
            return;
        }
        let due = Some(draft.due).filter(|due| !due.trim().is_empty());
        self.apply(Command::Add {
            text: draft.text,
            due,
        });
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let Some(id) = self.state.edit().editing_id().cloned() else {
            return;
        };
        match key.code {
            KeyCode::Enter => self.apply(Command::CommitEdit(id)),
            KeyCode::Esc => {
                self.apply(Command::CancelEdit(id));
                self.state.set_status_message(Some("Edit canceled"));
            }
            KeyCode::Up | KeyCode::Down | KeyCode::Tab => {
                self.blur_edit();
                match key.code {
                    KeyCode::Up => self.state.move_selection(-1),
                    KeyCode::Down => self.state.move_selection(1),
                    _ => {}
                }
            }
            code => {
                let Some(buffer) = self.state.edit_mut().buffer_mut() else {
                    return;
                };
                match code {
                    KeyCode::Backspace => {
                        buffer.backspace();
                    }
                    KeyCode::Delete => {
                        buffer.delete();
                    }
                    KeyCode::Left => {
                        buffer.move_left();
                    }
                    KeyCode::Right => {
                        buffer.move_right();
                    }
                    KeyCode::Home => {
                        buffer.move_home();
                    }
                    KeyCode::End => {
                        buffer.move_end();
                    }
                    KeyCode::Char(ch)
                        if !key.modifiers.intersects(
                            KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                        ) =>
                    {
                        buffer.insert_char(ch);
                    }
                    _ => {}
                }
            }
        }
    }

    fn blur_edit(&mut self) {
        if let Err(err) = self.state.blur_edit(local_now()) {
            tracing::error!(?err, "failed to save edited task");
            self.state.set_status_message(Some(format!("Save failed: {err}")));
        }
    }

    fn apply(&mut self, command: Command) {
        tracing::debug!(?command, "dispatching");
        match self.state.dispatch(command, local_now()) {
            Ok(change) => {
                tracing::trace!(?change, "view updated");
                self.state.set_status_message(None::<String>);
            }
            Err(err) => {
                tracing::error!(?err, "command failed");
                self.state.set_status_message(Some(format!("Save failed: {err}")));
            }
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableFocusChange
    )
    .context("restoring screen state")?;
    Ok(())
}
