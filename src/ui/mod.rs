use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Tabs, Wrap,
};
use ratatui::Frame;
use strum::IntoEnumIterator;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::edit::EditBuffer;
use crate::app::reconcile::{Phase, ViewNode};
use crate::app::state::{AddField, AppState, OverlayState};
use crate::config::Palette;
use crate::model::FilterMode;
use crate::storage::KeyValueStore;

pub fn draw_app<K: KeyValueStore>(
    frame: &mut Frame,
    state: &AppState<K>,
    list_state: &mut ListState,
    palette: &Palette,
) {
    let area = frame.size();
    frame.render_widget(Block::default().style(palette.base()), area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_progress(frame, state, palette, vertical[0]);
    render_filters(frame, state, palette, vertical[1]);
    render_list(frame, state, list_state, palette, vertical[2]);
    render_footer(frame, state, palette, vertical[3]);
    render_status(frame, state, palette, vertical[4]);
    render_overlay(frame, state, palette);
}

fn render_progress<K: KeyValueStore>(frame: &mut Frame, state: &AppState<K>, palette: &Palette, area: Rect) {
    let summary = state.reconciler().summary();
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title("Progress")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent)),
        )
        .gauge_style(Style::default().fg(palette.completed).bg(palette.background))
        .percent(summary.percent.min(100))
        .label(summary.progress_label());
    frame.render_widget(gauge, area);
}

fn render_filters<K: KeyValueStore>(frame: &mut Frame, state: &AppState<K>, palette: &Palette, area: Rect) {
    let titles = FilterMode::iter()
        .enumerate()
        .map(|(idx, mode)| format!("{} {}", idx + 1, mode.title()))
        .collect::<Vec<_>>();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("Filter").borders(Borders::ALL))
        .select(state.store().filter().index())
        .style(Style::default().fg(palette.dim))
        .highlight_style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );
    frame.render_widget(tabs, area);
}

fn render_list<K: KeyValueStore>(
    frame: &mut Frame,
    state: &AppState<K>,
    list_state: &mut ListState,
    palette: &Palette,
    area: Rect,
) {
    let block = Block::default()
        .title("Tasks")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent));
    let inner_width = block.inner(area).width as usize;

    let rows = state.reconciler().rows();
    if rows.is_empty() {
        let hint = match state.store().filter() {
            FilterMode::All => "No tasks yet. Press 'a' to add one.",
            FilterMode::Active => "No active tasks.",
            FilterMode::Completed => "No completed tasks.",
        };
        let paragraph = Paragraph::new(Span::styled(hint, Style::default().fg(palette.dim)))
            .block(block)
            .wrap(Wrap { trim: true });
        list_state.select(None);
        frame.render_widget(paragraph, area);
        return;
    }

    let selected_id = state.selected_id();
    let editing = state.edit().buffer();
    let mut selected_row = None;
    let mut items = Vec::with_capacity(rows.len());
    for (idx, node) in rows.iter().enumerate() {
        let live = node.phase != Phase::Exiting;
        if live && Some(&node.id) == selected_id {
            selected_row = Some(idx);
        }
        let buffer = editing.filter(|buffer| live && buffer.id() == &node.id);
        items.push(ListItem::new(task_line(node, buffer, palette, inner_width)));
    }
    list_state.select(selected_row);

    let list = List::new(items)
        .block(block)
        .highlight_style(palette.highlight())
        .highlight_symbol("▶ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn task_line(
    node: &ViewNode,
    buffer: Option<&EditBuffer>,
    palette: &Palette,
    width: usize,
) -> Line<'static> {
    let checkbox = if node.completed { "[x] " } else { "[ ] " };
    let text_style = match node.phase {
        Phase::Exiting => Style::default()
            .fg(palette.dim)
            .add_modifier(Modifier::ITALIC),
        Phase::Entering => Style::default().fg(palette.entering),
        Phase::Steady if node.completed => Style::default()
            .fg(palette.completed)
            .add_modifier(Modifier::CROSSED_OUT),
        Phase::Steady => Style::default().fg(palette.text),
    };

    let mut spans = vec![Span::styled(checkbox, text_style)];
    match buffer {
        Some(buffer) => spans.extend(edit_spans(buffer, palette)),
        None => spans.push(Span::styled(node.text.clone(), text_style)),
    }

    let countdown_style = if node.countdown.is_overdue {
        Style::default()
            .fg(palette.overdue)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.dim)
    };
    let meta = [
        Span::styled(node.due_label.clone(), Style::default().fg(palette.dim)),
        Span::styled(" · ", Style::default().fg(palette.dim)),
        Span::styled(node.countdown.label.clone(), countdown_style),
    ];

    // List reserves two columns for the highlight symbol.
    let used = spans.iter().map(|span| span.content.width()).sum::<usize>()
        + meta.iter().map(|span| span.content.width()).sum::<usize>()
        + 2;
    let pad = width.saturating_sub(used).max(1);
    spans.push(Span::raw(" ".repeat(pad)));
    spans.extend(meta);
    Line::from(spans)
}

fn edit_spans(buffer: &EditBuffer, palette: &Palette) -> Vec<Span<'static>> {
    let text = buffer.text();
    let (before, rest) = text.split_at(buffer.cursor().min(text.len()));
    let mut graphemes = rest.graphemes(true);
    let at_cursor = graphemes.next().unwrap_or(" ").to_string();
    let after = graphemes.collect::<String>();
    let field = Style::default()
        .fg(palette.text)
        .add_modifier(Modifier::UNDERLINED);
    vec![
        Span::styled(before.to_string(), field),
        Span::styled(at_cursor, field.add_modifier(Modifier::REVERSED)),
        Span::styled(after, field),
    ]
}

fn render_footer<K: KeyValueStore>(frame: &mut Frame, state: &AppState<K>, palette: &Palette, area: Rect) {
    let summary = state.reconciler().summary();
    let clear_style = if summary.clear_enabled {
        Style::default().fg(palette.accent)
    } else {
        Style::default()
            .fg(palette.dim)
            .add_modifier(Modifier::DIM)
    };
    let line = Line::from(vec![
        Span::styled(summary.remaining_label(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" • "),
        Span::styled("C: clear completed", clear_style),
        Span::raw(" • "),
        Span::styled(format!("Theme: {}", state.theme()), Style::default().fg(palette.dim)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_status<K: KeyValueStore>(frame: &mut Frame, state: &AppState<K>, palette: &Palette, area: Rect) {
    let text = match state.status_message() {
        Some(message) => message.to_string(),
        None if state.is_editing() => "Enter save • Esc cancel • ↑/↓ leave field".to_string(),
        None => "a add • space toggle • e edit • d delete • 1-3/f filter • t theme • q quit".to_string(),
    };
    frame.render_widget(
        Paragraph::new(Span::styled(text, Style::default().fg(palette.dim))),
        area,
    );
}

fn render_overlay<K: KeyValueStore>(frame: &mut Frame, state: &AppState<K>, palette: &Palette) {
    let Some(OverlayState::AddTask(draft)) = state.overlay() else {
        return;
    };
    let area = centered_rect(60, 40, frame.size());
    frame.render_widget(Clear, area);

    let field_line = |label: &str, value: &str, active: bool| {
        let mut display = value.to_string();
        if active {
            display.push('▌');
        }
        let label_style = if active {
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.dim)
        };
        Line::from(vec![
            Span::styled(format!("{label:<6}"), label_style),
            Span::raw(display),
        ])
    };

    let paragraph = Paragraph::new(vec![
        field_line("Task", &draft.text, draft.field == AddField::Text),
        Line::from(""),
        field_line("Due", &draft.due, draft.field == AddField::Due),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to add • Tab switch field • Esc to cancel",
            Style::default().fg(palette.dim),
        )),
    ])
    .style(palette.base())
    .block(
        Block::default()
            .title("New Task")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent)),
    )
    .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
