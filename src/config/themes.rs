use ratatui::style::{Color, Modifier, Style};

use crate::model::ThemeMode;

/// Colours the UI draws with for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub dim: Color,
    pub accent: Color,
    pub completed: Color,
    pub overdue: Color,
    pub entering: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
}

impl Palette {
    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self {
                background: Color::Reset,
                text: Color::White,
                dim: Color::DarkGray,
                accent: Color::Cyan,
                completed: Color::Green,
                overdue: Color::Red,
                entering: Color::Yellow,
                selection_bg: Color::Blue,
                selection_fg: Color::Black,
            },
            ThemeMode::Light => Self {
                background: Color::White,
                text: Color::Black,
                dim: Color::Gray,
                accent: Color::Blue,
                completed: Color::Green,
                overdue: Color::Red,
                entering: Color::Magenta,
                selection_bg: Color::LightBlue,
                selection_fg: Color::Black,
            },
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    pub fn highlight(&self) -> Style {
        Style::default()
            .bg(self.selection_bg)
            .fg(self.selection_fg)
            .add_modifier(Modifier::BOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn themes_have_distinct_palettes() {
        let dark = Palette::for_mode(ThemeMode::Dark);
        let light = Palette::for_mode(ThemeMode::Light);
        assert_ne!(dark, light);
        assert_ne!(light.text, light.background);
    }
}
