use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Text;
use ratatui::widgets::{Block, Padding, Paragraph, Widget, Wrap};

use crate::chat::types::{ContentType, Message, Role, Status};
use crate::tui::markdown::render_markdown;

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders (1 left + 1 right) and padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
const VERTICAL_OVERHEAD: u16 = 2;

/// Pulse intensity threshold above which the border transitions from normal to BOLD.
const PULSE_BOLD_THRESHOLD: f32 = 0.6;
/// Pulse intensity threshold above which the border transitions from DIM to normal.
const PULSE_NORMAL_THRESHOLD: f32 = 0.2;

/// Renders one chat message as a bordered card with role-based styling.
///
/// Transient: created fresh each frame with the data it needs. The body is
/// formatted by content type — markdown through the markdown renderer, JSON
/// pretty-printed, everything else as plain wrapped text. While a reply is
/// still streaming the raw text is shown; formatting only applies once the
/// message is finalized and classified.
#[derive(Clone, Copy)]
pub struct MessageCard<'a> {
    pub message: &'a Message,
    /// Cyan border highlight for the current search match.
    pub is_current_match: bool,
    /// Pulse intensity (0.0 to 1.0) while this message is being generated.
    pub pulse_intensity: f32,
}

impl<'a> MessageCard<'a> {
    pub fn new(message: &'a Message, is_current_match: bool, pulse_intensity: f32) -> Self {
        Self {
            message,
            is_current_match,
            pulse_intensity,
        }
    }

    /// Predict the rendered height for this message at the given width.
    ///
    /// Builds the same body `Text` the widget renders and asks `Paragraph`
    /// for its wrapped line count, so the prediction is exact. This lets the
    /// message list compute scroll positions without rendering.
    pub fn calculate_height(message: &Message, width: u16) -> u16 {
        let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if content_width == 0 {
            // Terminal too narrow for borders + padding. Keep 1 row so the
            // message still occupies space in the layout.
            return 1;
        }

        let body = body_text(message, role_style(message).fg.unwrap_or(Color::Reset));
        let lines = Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .line_count(content_width);
        (lines as u16).max(1) + VERTICAL_OVERHEAD
    }
}

impl<'a> Widget for MessageCard<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let style = role_style(self.message);
        let title = role_title(self.message);

        let mut border_style = if self.is_current_match {
            Style::default().fg(Color::Cyan)
        } else {
            style.add_modifier(Modifier::DIM)
        };

        // Breathing border while generating: DIM → normal → BOLD
        if self.pulse_intensity > PULSE_BOLD_THRESHOLD {
            border_style = border_style
                .remove_modifier(Modifier::DIM)
                .add_modifier(Modifier::BOLD);
        } else if self.pulse_intensity > PULSE_NORMAL_THRESHOLD {
            border_style = border_style.remove_modifier(Modifier::DIM);
        }

        let block = Block::bordered()
            .title(title)
            .border_type(ratatui::widgets::BorderType::Rounded)
            .border_style(border_style)
            .title_style(border_style)
            .padding(Padding::horizontal(CONTENT_PAD_H));

        let inner_area = block.inner(area);
        block.render(area, buf);

        let body = body_text(self.message, style.fg.unwrap_or(Color::Reset));
        Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .render(inner_area, buf);
    }
}

fn role_title(message: &Message) -> &'static str {
    if message.status == Status::Error {
        return "error";
    }
    if message.status == Status::Editing {
        return "editing";
    }
    match message.role {
        Role::User => "you",
        Role::Assistant => "parrot",
        Role::System => "system",
    }
}

fn role_style(message: &Message) -> Style {
    if message.status == Status::Error {
        return Style::default().fg(Color::Red);
    }
    if message.status == Status::Editing {
        return Style::default().fg(Color::Yellow);
    }
    match message.role {
        Role::User => Style::default().fg(Color::Green),
        Role::Assistant => Style::default().fg(Color::Blue),
        Role::System => Style::default().fg(Color::Yellow),
    }
}

/// Build the styled body for a message according to its content type.
fn body_text(message: &Message, base_fg: Color) -> Text<'static> {
    let content = message.content.as_str();

    if message.status == Status::Sending && content.is_empty() {
        return Text::styled(
            "…",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );
    }

    // Streamed-in-progress text is unclassified — show it raw
    if message.status == Status::Sending {
        return Text::styled(content.to_owned(), Style::default().fg(base_fg));
    }

    match message.content_type {
        ContentType::Markdown => render_markdown(content, base_fg),
        ContentType::Json => {
            let pretty = serde_json::from_str::<serde_json::Value>(content)
                .and_then(|v| serde_json::to_string_pretty(&v))
                .unwrap_or_else(|_| content.to_owned());
            Text::styled(pretty, Style::default().fg(Color::White))
        }
        ContentType::Html | ContentType::Text => {
            Text::styled(content.to_owned(), Style::default().fg(base_fg))
        }
    }
}
