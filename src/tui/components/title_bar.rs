//! # TitleBar Component
//!
//! Single-line header: app name, active model, connection state, and a
//! transient status message.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::component::Component;

pub struct TitleBar<'a> {
    pub model_name: &'a str,
    pub status_message: &'a str,
    pub server_online: bool,
    /// Spinner frame index, advanced by the event loop while streaming
    pub spinner: Option<usize>,
}

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

impl Component for TitleBar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled("parrot", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!(" (model: {})", self.model_name),
                Style::default().fg(Color::DarkGray),
            ),
        ];

        if !self.server_online {
            spans.push(Span::styled(
                "  ⚠ offline",
                Style::default().fg(Color::Red),
            ));
        }

        if let Some(frame_idx) = self.spinner {
            let glyph = SPINNER_FRAMES[frame_idx % SPINNER_FRAMES.len()];
            spans.push(Span::styled(
                format!("  {glyph}"),
                Style::default().fg(Color::Blue),
            ));
        }

        if !self.status_message.is_empty() {
            spans.push(Span::styled(
                format!("  | {}", self.status_message),
                Style::default().fg(Color::Yellow),
            ));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);

        // Right-edge keybinding hint, overlaid after the main line
        let hint = "F1: help";
        let hint_width = hint.len() as u16;
        if area.width > hint_width {
            let hint_area = Rect {
                x: area.x + area.width - hint_width,
                y: area.y,
                width: hint_width,
                height: 1,
            };
            frame.render_widget(
                Paragraph::new(Span::styled(hint, Style::default().fg(Color::DarkGray))),
                hint_area,
            );
        }
    }
}
