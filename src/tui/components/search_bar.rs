//! # SearchBar Component
//!
//! Single-line query entry with a match position indicator. Shown below
//! the message list while search mode is active; the query itself is
//! owned here, match bookkeeping lives in the app state.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

/// Events emitted by the search bar
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    /// Query text changed
    QueryChanged(String),
    /// Jump to the next match
    Next,
    /// Jump to the previous match
    Previous,
    /// Leave search mode
    Close,
}

#[derive(Default)]
pub struct SearchBar {
    pub query: String,
    /// Index into the match list of the highlighted match, if any
    pub current_match: Option<usize>,
    pub total_matches: usize,
}

impl SearchBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.current_match = None;
        self.total_matches = 0;
    }

    fn indicator(&self) -> Option<Span<'static>> {
        if self.query.is_empty() {
            return None;
        }
        let span = match self.current_match {
            Some(idx) => Span::styled(
                format!(" {}/{} ", idx + 1, self.total_matches),
                Style::default().fg(Color::Cyan),
            ),
            None => Span::styled(" no matches ", Style::default().fg(Color::Red)),
        };
        Some(span)
    }
}

impl Component for SearchBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let mut block = Block::bordered()
            .border_type(ratatui::widgets::BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan))
            .title("Search (Enter: next, Ctrl+P: prev, Esc: close)");
        if let Some(indicator) = self.indicator() {
            block = block.title_bottom(Line::from(indicator).right_aligned());
        }

        let paragraph = Paragraph::new(self.query.as_str()).block(block);
        frame.render_widget(paragraph, area);

        let cursor_x = area.x + 1 + self.query.as_str().width() as u16;
        frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

impl EventHandler for SearchBar {
    type Event = SearchEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::InputChar(c) if *c != '\n' => {
                self.query.push(*c);
                Some(SearchEvent::QueryChanged(self.query.clone()))
            }
            TuiEvent::Paste(text) => {
                self.query.push_str(text);
                Some(SearchEvent::QueryChanged(self.query.clone()))
            }
            TuiEvent::Backspace => {
                self.query.pop()?;
                Some(SearchEvent::QueryChanged(self.query.clone()))
            }
            TuiEvent::Submit | TuiEvent::NextMatch => Some(SearchEvent::Next),
            TuiEvent::PreviousMatch => Some(SearchEvent::Previous),
            TuiEvent::Escape => Some(SearchEvent::Close),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_typing_builds_query() {
        let mut bar = SearchBar::new();
        assert_eq!(
            bar.handle_event(&TuiEvent::InputChar('h')),
            Some(SearchEvent::QueryChanged("h".to_string()))
        );
        assert_eq!(
            bar.handle_event(&TuiEvent::InputChar('i')),
            Some(SearchEvent::QueryChanged("hi".to_string()))
        );
        bar.handle_event(&TuiEvent::Backspace);
        assert_eq!(bar.query, "h");
    }

    #[test]
    fn test_backspace_on_empty_is_noop() {
        let mut bar = SearchBar::new();
        assert_eq!(bar.handle_event(&TuiEvent::Backspace), None);
    }

    #[test]
    fn test_navigation_events() {
        let mut bar = SearchBar::new();
        assert_eq!(bar.handle_event(&TuiEvent::Submit), Some(SearchEvent::Next));
        assert_eq!(
            bar.handle_event(&TuiEvent::NextMatch),
            Some(SearchEvent::Next)
        );
        assert_eq!(
            bar.handle_event(&TuiEvent::PreviousMatch),
            Some(SearchEvent::Previous)
        );
        assert_eq!(
            bar.handle_event(&TuiEvent::Escape),
            Some(SearchEvent::Close)
        );
    }

    #[test]
    fn test_render_shows_match_indicator() {
        let backend = TestBackend::new(50, 3);
        let mut terminal = Terminal::new(backend).unwrap();

        let mut bar = SearchBar::new();
        bar.query = "hello".to_string();
        bar.current_match = Some(1);
        bar.total_matches = 4;

        terminal.draw(|f| bar.render(f, f.area())).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("hello"));
        assert!(text.contains("2/4"));
    }

    #[test]
    fn test_render_no_matches() {
        let backend = TestBackend::new(50, 3);
        let mut terminal = Terminal::new(backend).unwrap();

        let mut bar = SearchBar::new();
        bar.query = "zzz".to_string();

        terminal.draw(|f| bar.render(f, f.area())).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("no matches"));
    }
}
