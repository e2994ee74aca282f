//! Single-line text input wrapping tui-textarea.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use tui_textarea::{CursorMove, Input, TextArea};

/// Event emitted by the input in response to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInputEvent {
    None,
    Submit,
    Cancel,
}

pub struct TextInput {
    textarea: TextArea<'static>,
    focused: bool,
}

impl TextInput {
    pub fn new() -> Self {
        let mut textarea = TextArea::default();
        textarea.set_cursor_line_style(Style::default());
        Self {
            textarea,
            focused: false,
        }
    }

    pub fn value(&self) -> String {
        self.textarea.lines().first().cloned().unwrap_or_default()
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        let single_line: String = value.into().replace(['\n', '\r'], " ");
        self.textarea = TextArea::new(vec![single_line]);
        self.textarea.set_cursor_line_style(Style::default());
        self.textarea.move_cursor(CursorMove::End);
        self.apply_cursor_style();
    }

    pub fn clear(&mut self) {
        self.set_value("");
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        self.apply_cursor_style();
    }

    fn apply_cursor_style(&mut self) {
        if self.focused {
            self.textarea
                .set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
        } else {
            self.textarea.set_cursor_style(Style::default());
        }
    }

    /// Feed a key event. Enter submits, Esc cancels, everything else edits.
    pub fn input(&mut self, key: KeyEvent) -> TextInputEvent {
        match key.code {
            KeyCode::Enter => TextInputEvent::Submit,
            KeyCode::Esc => TextInputEvent::Cancel,
            _ => {
                self.textarea.input(Input::from(key));
                TextInputEvent::None
            }
        }
    }
}

impl Default for TextInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &TextInput {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.textarea.render(area, buf);
        if !self.focused {
            // Dim unfocused inputs slightly.
            buf.set_style(area, Style::default().fg(Color::Gray));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typing_builds_value() {
        let mut input = TextInput::new();
        assert_eq!(input.input(key(KeyCode::Char('2'))), TextInputEvent::None);
        input.input(key(KeyCode::Char('0')));
        input.input(key(KeyCode::Char('2')));
        input.input(key(KeyCode::Char('4')));
        assert_eq!(input.value(), "2024");
    }

    #[test]
    fn enter_submits_esc_cancels() {
        let mut input = TextInput::new();
        assert_eq!(input.input(key(KeyCode::Enter)), TextInputEvent::Submit);
        assert_eq!(input.input(key(KeyCode::Esc)), TextInputEvent::Cancel);
    }

    #[test]
    fn set_value_strips_newlines() {
        let mut input = TextInput::new();
        input.set_value("a\nb");
        assert_eq!(input.value(), "a b");
    }
}
