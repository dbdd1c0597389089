//! Frame composition. Splits the terminal into title bar, optional error
//! banner, message list, optional search bar, and input box, then hands
//! each region to its component.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;

use crate::core::App;
use crate::tui::component::Component;
use crate::tui::components::{MessageList, SearchBar, TitleBar};
use crate::tui::{InputMode, TuiState};

pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState) {
    let area = frame.area();

    let error_height = if app.error.is_some() { 1 } else { 0 };
    let search_height = if tui.input_mode == InputMode::Search {
        3
    } else {
        0
    };
    let input_height = tui.input_box.calculate_height(area.width);

    let [title_area, error_area, messages_area, search_area, input_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(error_height),
        Constraint::Min(0),
        Constraint::Length(search_height),
        Constraint::Length(input_height),
    ])
    .areas(area);

    let mut title_bar = TitleBar {
        model_name: &app.model_name,
        status_message: &app.status_message,
        server_online: app.server_online,
        spinner: app.is_streaming.then_some(tui.spinner_frame),
    };
    title_bar.render(frame, title_area);

    if let Some(error) = &app.error {
        let banner = Paragraph::new(format!("✗ {error} (Esc to dismiss)"))
            .style(Style::default().fg(Color::Red));
        frame.render_widget(banner, error_area);
    }

    sync_search_bar(&mut tui.search_bar, app);

    let mut message_list = MessageList::new(
        &mut tui.message_list,
        &app.messages,
        app.is_streaming,
        tui.pulse_value,
        app.search.current_message(),
    );
    message_list.render(frame, messages_area);

    // Components that set the cursor render last so theirs wins
    if tui.input_mode == InputMode::Search {
        tui.input_box.dimmed = true;
        tui.input_box.render(frame, input_area);
        tui.search_bar.render(frame, search_area);
    } else {
        tui.input_box.dimmed = false;
        tui.input_box.render(frame, input_area);
    }

    if tui.help_visible {
        draw_help_overlay(frame, area);
    }
}

const KEY_BINDINGS: &[(&str, &str)] = &[
    ("Enter", "send message"),
    ("Ctrl+J", "insert newline"),
    ("Ctrl+U", "edit your last message"),
    ("Ctrl+R", "regenerate last reply"),
    ("Ctrl+F", "search conversation"),
    ("Ctrl+N / Ctrl+P", "next / previous match"),
    ("Ctrl+E", "export chat to JSON"),
    ("Ctrl+L", "clear conversation"),
    ("PgUp / PgDn", "scroll messages"),
    ("Ctrl+Home / Ctrl+End", "jump to top / bottom"),
    ("Esc", "cancel, dismiss, or close"),
    ("Ctrl+C", "quit"),
];

/// Centered keybinding reference, toggled with F1.
fn draw_help_overlay(frame: &mut Frame, area: ratatui::layout::Rect) {
    use ratatui::layout::Rect;
    use ratatui::text::{Line, Span};
    use ratatui::widgets::{Block, BorderType, Clear};

    let width = 52.min(area.width);
    let height = (KEY_BINDINGS.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    let lines: Vec<Line> = KEY_BINDINGS
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!("{key:>21}"), Style::default().fg(Color::Cyan)),
                Span::raw("  "),
                Span::raw(*what),
            ])
        })
        .collect();

    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .title("Keys (F1 or Esc to close)");

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

/// Mirror match bookkeeping from app state into the bar's indicator props.
fn sync_search_bar(bar: &mut SearchBar, app: &App) {
    bar.current_match = app.search.current;
    bar.total_matches = app.search.matches.len();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::Message;
    use crate::test_support::test_app;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_draw_ui_renders_conversation() {
        let mut app = test_app();
        app.messages.push(Message::user("hello there".to_string()));

        let mut tui = TuiState::new();
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| draw_ui(f, &app, &mut tui))
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("parrot"));
        assert!(text.contains("hello there"));
        assert!(text.contains("Input"));
        assert!(!text.contains("Search"));
    }

    #[test]
    fn test_draw_ui_error_banner() {
        let mut app = test_app();
        app.error = Some("connection refused".to_string());

        let mut tui = TuiState::new();
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| draw_ui(f, &app, &mut tui))
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn test_draw_ui_help_overlay() {
        let app = test_app();
        let mut tui = TuiState::new();
        tui.help_visible = true;

        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| draw_ui(f, &app, &mut tui))
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Keys"));
        assert!(text.contains("regenerate last reply"));
        assert!(text.contains("edit your last message"));
    }

    #[test]
    fn test_draw_ui_search_mode() {
        let mut app = test_app();
        app.messages.push(Message::user("find me".to_string()));
        app.search.set_query("find", &app.messages);

        let mut tui = TuiState::new();
        tui.input_mode = InputMode::Search;
        tui.search_bar.query = "find".to_string();

        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| draw_ui(f, &app, &mut tui))
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Search"));
        assert!(text.contains("1/1"));
    }
}
