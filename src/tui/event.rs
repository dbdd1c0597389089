use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind};

/// TUI-specific input events, decoded from crossterm.
#[derive(Debug, Clone, PartialEq)]
pub enum TuiEvent {
    /// Ctrl+C — quit regardless of mode
    ForceQuit,
    Escape,
    /// Enter
    Submit,

    InputChar(char),
    /// Bracketed paste — preserves newlines
    Paste(String),
    Backspace,
    Delete,
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
    CursorHome,
    CursorEnd,

    ScrollUp,
    ScrollDown,
    ScrollPageUp,
    ScrollPageDown,
    /// Ctrl+Home
    ScrollToTop,
    /// Ctrl+End — also re-engages auto-scroll
    ScrollToBottom,

    /// Ctrl+F
    OpenSearch,
    /// Ctrl+N
    NextMatch,
    /// Ctrl+P
    PreviousMatch,
    /// Ctrl+R
    Regenerate,
    /// Ctrl+U
    EditLastMessage,
    /// F1
    ToggleHelp,
    /// Ctrl+L
    ClearConversation,
    /// Ctrl+E
    ExportChat,

    Resize,
}

/// Poll for an event, blocking up to `timeout`.
pub fn poll_event_timeout(timeout: std::time::Duration) -> std::io::Result<Option<TuiEvent>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    Ok(decode(event::read()?))
}

/// Poll for an event without blocking (returns immediately).
pub fn poll_event_immediate() -> Option<TuiEvent> {
    poll_event_timeout(std::time::Duration::ZERO)
        .ok()
        .flatten()
}

fn decode(raw: Event) -> Option<TuiEvent> {
    match raw {
        Event::Key(key) => {
            // Kitty protocol reports releases too — only act on press/repeat
            if key.kind == KeyEventKind::Release {
                return None;
            }
            log::debug!("Key event: {:?} with modifiers {:?}", key.code, key.modifiers);
            match (key.modifiers, key.code) {
                (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(TuiEvent::ForceQuit),
                (KeyModifiers::CONTROL, KeyCode::Char('f')) => Some(TuiEvent::OpenSearch),
                (KeyModifiers::CONTROL, KeyCode::Char('n')) => Some(TuiEvent::NextMatch),
                (KeyModifiers::CONTROL, KeyCode::Char('p')) => Some(TuiEvent::PreviousMatch),
                (KeyModifiers::CONTROL, KeyCode::Char('r')) => Some(TuiEvent::Regenerate),
                (KeyModifiers::CONTROL, KeyCode::Char('u')) => Some(TuiEvent::EditLastMessage),
                (_, KeyCode::F(1)) => Some(TuiEvent::ToggleHelp),
                (KeyModifiers::CONTROL, KeyCode::Char('l')) => Some(TuiEvent::ClearConversation),
                (KeyModifiers::CONTROL, KeyCode::Char('e')) => Some(TuiEvent::ExportChat),
                // Ctrl+J inserts newline (ASCII LF; Ctrl+Enter sends this in most terminals)
                (KeyModifiers::CONTROL, KeyCode::Char('j')) => Some(TuiEvent::InputChar('\n')),
                (KeyModifiers::CONTROL, KeyCode::Home) => Some(TuiEvent::ScrollToTop),
                (KeyModifiers::CONTROL, KeyCode::End) => Some(TuiEvent::ScrollToBottom),
                (_, KeyCode::Char(c)) => Some(TuiEvent::InputChar(c)),
                (_, KeyCode::Backspace) => Some(TuiEvent::Backspace),
                (_, KeyCode::Delete) => Some(TuiEvent::Delete),
                (_, KeyCode::Enter) => Some(TuiEvent::Submit),
                (_, KeyCode::Esc) => Some(TuiEvent::Escape),
                (_, KeyCode::Left) => Some(TuiEvent::CursorLeft),
                (_, KeyCode::Right) => Some(TuiEvent::CursorRight),
                (_, KeyCode::Up) => Some(TuiEvent::CursorUp),
                (_, KeyCode::Down) => Some(TuiEvent::CursorDown),
                (_, KeyCode::Home) => Some(TuiEvent::CursorHome),
                (_, KeyCode::End) => Some(TuiEvent::CursorEnd),
                (_, KeyCode::PageUp) => Some(TuiEvent::ScrollPageUp),
                (_, KeyCode::PageDown) => Some(TuiEvent::ScrollPageDown),
                _ => None,
            }
        }
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => Some(TuiEvent::ScrollUp),
            MouseEventKind::ScrollDown => Some(TuiEvent::ScrollDown),
            _ => None,
        },
        Event::Paste(data) => Some(TuiEvent::Paste(data)),
        Event::Resize(_, _) => Some(TuiEvent::Resize),
        _ => None,
    }
}
