//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! and translates keyboard events into core::Action values.
//!
//! This is the only module that knows about ratatui and crossterm; the
//! reducer and chat client never touch the terminal.
//!
//! ## Redraw Strategy
//!
//! The event loop uses conditional redraw to avoid unnecessary work:
//!
//! - **Animating** (streaming reply): draws every ~80ms for a smooth pulse
//!   and spinner.
//! - **Idle**: sleeps up to 500ms, only redraws on events or resize.
//!
//! A `SteadyBlock` cursor style is used instead of a blinking cursor because
//! ratatui's `set_cursor_position` resets the terminal's blink timer on every
//! `draw()` call, making blinking cursors appear erratic during continuous
//! redraws.

mod component;
pub mod components;
mod event;
pub mod markdown;
mod ui;

use log::{debug, info, warn};
use std::io::stdout;
use std::sync::{Arc, mpsc};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;

use crate::chat::client::ChatRequest;
use crate::chat::types::StreamEvent;
use crate::core::action::{Action, Effect, update};
use crate::core::config::ResolvedConfig;
use crate::core::export::export_chat;
use crate::core::history::JsonFileHistory;
use crate::core::state::App;
use crate::tui::component::EventHandler;
use crate::tui::components::{InputBox, InputEvent, MessageListState, SearchBar, SearchEvent};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

pub use component::Component;

/// Modal input mode: determines how keyboard events are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Text editing in the input box.
    Input,
    /// Typing edits the search query; Enter cycles matches, Esc closes.
    Search,
}

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    // Persistent component states
    pub message_list: MessageListState,
    pub input_box: InputBox,
    pub search_bar: SearchBar,
    // Modal input mode
    pub input_mode: InputMode,
    // Keybinding overlay (F1)
    pub help_visible: bool,
    // Animation state
    pub pulse_value: f32,
    pub spinner_frame: usize,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            message_list: MessageListState::new(),
            input_box: InputBox::new(),
            search_bar: SearchBar::new(),
            input_mode: InputMode::Input, // User expects to type immediately
            help_visible: false,
            pulse_value: 0.0,
            spinner_frame: 0,
        }
    }
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        // Enable the Kitty keyboard protocol unconditionally; terminals
        // that don't support it ignore the sequence.
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,                        // Show cursor for input editing
            SetCursorStyle::SteadyBlock, // Non-blinking: avoids blink timer reset from continuous redraws
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste,
            Hide // Hide cursor on exit
        );
    }
}

/// Run the chat UI until the user quits. Must be called from within a
/// tokio runtime; background request tasks are spawned onto it.
pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let client = Arc::new(crate::chat::openai::OpenAiClient::new(Some(
        config.server_url.clone(),
    )));
    let history: Box<dyn crate::core::history::HistoryStore> = match JsonFileHistory::default_path()
    {
        Some(path) => Box::new(JsonFileHistory::new(path)),
        None => {
            warn!("Could not determine home directory; history will not persist");
            Box::new(crate::core::history::MemoryHistory::new())
        }
    };
    let mut app = App::from_config(client, history, &config);
    let mut tui = TuiState::new();

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    // Channel for actions from background tasks
    let (tx, rx) = mpsc::channel();

    // Abort handles for the in-flight turn (Escape-to-cancel)
    let mut active_abort_handles: Vec<tokio::task::AbortHandle> = Vec::new();

    spawn_health_probe(&app, tx.clone());

    // Animation timer
    let start_time = std::time::Instant::now();
    let mut needs_redraw = true; // Force first frame

    loop {
        let animating = app.is_streaming;
        if animating {
            needs_redraw = true;
        }

        // Only draw when something changed
        if needs_redraw {
            let elapsed = start_time.elapsed().as_secs_f32();
            tui.pulse_value = (elapsed * 5.0).sin() * 0.5 + 0.5;
            tui.spinner_frame = (elapsed * 12.0) as usize;
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui))?;
            needs_redraw = false;
        }

        // Dynamic poll timeout: short when animating (~12fps), long when idle
        let timeout = if animating {
            std::time::Duration::from_millis(80)
        } else {
            std::time::Duration::from_millis(500)
        };
        let first_event = poll_event_timeout(timeout)?;

        // Process first event + drain ALL pending events before next draw
        let mut should_quit = false;
        if first_event.is_some() {
            needs_redraw = true;
        }
        for tui_event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            // Resize just needs a redraw (already flagged above)
            if matches!(tui_event, TuiEvent::Resize) {
                continue;
            }

            // Ctrl+C always quits regardless of mode
            if matches!(tui_event, TuiEvent::ForceQuit) {
                if update(&mut app, Action::Quit) == Effect::Quit {
                    should_quit = true;
                }
                continue;
            }

            // The help overlay swallows its own dismissal keys
            if tui.help_visible && matches!(tui_event, TuiEvent::ToggleHelp | TuiEvent::Escape) {
                tui.help_visible = false;
                continue;
            }
            if matches!(tui_event, TuiEvent::ToggleHelp) {
                tui.help_visible = true;
                continue;
            }

            // Scroll events always go to the message list
            if matches!(
                tui_event,
                TuiEvent::ScrollUp
                    | TuiEvent::ScrollDown
                    | TuiEvent::ScrollPageUp
                    | TuiEvent::ScrollPageDown
                    | TuiEvent::ScrollToTop
                    | TuiEvent::ScrollToBottom
            ) {
                tui.message_list.handle_event(&tui_event);
                continue;
            }

            // Global shortcuts
            match tui_event {
                TuiEvent::Regenerate => {
                    if update(&mut app, Action::Regenerate) == Effect::SpawnRequest {
                        active_abort_handles = spawn_request(&app, tx.clone());
                    }
                    continue;
                }
                TuiEvent::ClearConversation => {
                    update(&mut app, Action::ClearConversation);
                    tui.message_list = MessageListState::new();
                    continue;
                }
                TuiEvent::EditLastMessage => {
                    let was_editing = app.editing;
                    update(&mut app, Action::BeginEdit);
                    // Load the target only when the edit actually started,
                    // so a repeated Ctrl+U can't clobber typed changes.
                    if app.editing != was_editing
                        && let Some(content) = app.editing_content()
                    {
                        tui.input_box.set_text(content);
                        tui.input_mode = InputMode::Input;
                    }
                    continue;
                }
                TuiEvent::ExportChat => {
                    export_to_file(&mut app);
                    continue;
                }
                TuiEvent::OpenSearch => {
                    tui.input_mode = InputMode::Search;
                    tui.search_bar.query = app.search.query.clone();
                    continue;
                }
                _ => {}
            }

            // Modal event dispatch
            match tui.input_mode {
                InputMode::Search => {
                    if let Some(search_event) = tui.search_bar.handle_event(&tui_event) {
                        match search_event {
                            SearchEvent::QueryChanged(query) => {
                                update(&mut app, Action::SetSearchQuery(query));
                            }
                            SearchEvent::Next => {
                                update(&mut app, Action::NextMatch);
                            }
                            SearchEvent::Previous => {
                                update(&mut app, Action::PreviousMatch);
                            }
                            SearchEvent::Close => {
                                update(&mut app, Action::ClearSearch);
                                tui.search_bar.clear();
                                tui.input_mode = InputMode::Input;
                            }
                        }
                        scroll_to_current_match(&app, &mut tui);
                    }
                }
                InputMode::Input => {
                    match tui_event {
                        // Esc while streaming → cancel the turn
                        TuiEvent::Escape if app.is_streaming => {
                            for handle in active_abort_handles.drain(..) {
                                handle.abort();
                            }
                            update(&mut app, Action::CancelStream);
                            continue;
                        }
                        TuiEvent::Escape if app.editing.is_some() => {
                            update(&mut app, Action::CancelEdit);
                            tui.input_box.set_text("");
                            continue;
                        }
                        TuiEvent::Escape if app.error.is_some() => {
                            update(&mut app, Action::DismissError);
                            continue;
                        }
                        TuiEvent::Escape if app.search.is_active() => {
                            update(&mut app, Action::ClearSearch);
                            tui.search_bar.clear();
                            continue;
                        }
                        TuiEvent::Escape => continue,
                        // Match cycling works outside the bar too
                        TuiEvent::NextMatch if app.search.is_active() => {
                            update(&mut app, Action::NextMatch);
                            scroll_to_current_match(&app, &mut tui);
                            continue;
                        }
                        TuiEvent::PreviousMatch if app.search.is_active() => {
                            update(&mut app, Action::PreviousMatch);
                            scroll_to_current_match(&app, &mut tui);
                            continue;
                        }
                        _ => {}
                    }

                    // InputBox handles everything else
                    if let Some(input_event) = tui.input_box.handle_event(&tui_event)
                        && let InputEvent::Submit(text) = input_event
                        && update(&mut app, Action::Submit(text)) == Effect::SpawnRequest
                    {
                        active_abort_handles = spawn_request(&app, tx.clone());
                    }
                }
            }
        }

        if should_quit {
            break;
        }

        // Handle background task actions (streaming responses)
        while let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {:?}", action);
            match update(&mut app, action) {
                Effect::Quit => break,
                Effect::SpawnRequest => {
                    active_abort_handles = spawn_request(&app, tx.clone());
                }
                Effect::None => {}
            }
        }
    }

    app.persist();

    ratatui::restore();
    Ok(())
}

/// Export the conversation to a timestamped JSON file in the working
/// directory. Outcome goes to the title bar or the error banner.
fn export_to_file(app: &mut App) {
    let path = format!("parrot-export-{}.json", crate::chat::types::now_ms());
    match export_chat(&app.messages).map(|json| std::fs::write(&path, json)) {
        Ok(Ok(())) => {
            info!("Exported {} messages to {path}", app.messages.len());
            app.status_message = format!("Exported to {path}");
        }
        Ok(Err(e)) => {
            app.error = Some(format!("Export failed: {e}"));
        }
        Err(e) => {
            app.error = Some(format!("Export failed: {e}"));
        }
    }
}

fn scroll_to_current_match(app: &App, tui: &mut TuiState) {
    if let Some(index) = app.search.current_message() {
        tui.message_list.scroll_to_index(index);
    }
}

/// One-shot reachability check for the title-bar indicator.
fn spawn_health_probe(app: &App, tx: mpsc::Sender<Action>) {
    let client = Arc::clone(&app.client);
    tokio::spawn(async move {
        let online = client.healthy().await;
        let _ = tx.send(Action::HealthChecked(online));
    });
}

fn spawn_request(app: &App, tx: mpsc::Sender<Action>) -> Vec<tokio::task::AbortHandle> {
    info!("Spawning completion request (turn {})", app.turn);

    // Clone what we need for the async task
    let client = Arc::clone(&app.client);
    let history = app.request_context();
    let model = app.model_name.clone();
    let max_tokens = app.max_tokens;
    let temperature = app.temperature;
    let turn = app.turn;

    // Async channel for streaming deltas
    let (delta_tx, mut delta_rx) = tokio::sync::mpsc::channel::<StreamEvent>(100);

    let tx_stream = tx.clone();
    let stream_handle = tokio::spawn(async move {
        let request = ChatRequest {
            history: &history,
            model: &model,
            max_tokens,
            temperature,
        };
        if let Err(e) = client.stream_chat(request, delta_tx).await {
            info!("Stream error: {e}");
            if tx_stream
                .send(Action::StreamFailed {
                    turn,
                    error: e.to_string(),
                })
                .is_err()
            {
                warn!("Failed to send stream error action: receiver dropped");
            }
        }
    });

    // Forward deltas to the action channel, accumulating the full reply so
    // the reducer can replace the placeholder wholesale on completion.
    let forward_handle = tokio::spawn(async move {
        let mut content = String::new();
        while let Some(stream_event) = delta_rx.recv().await {
            match stream_event {
                StreamEvent::Delta(text) => {
                    content.push_str(&text);
                    if tx
                        .send(Action::StreamDelta {
                            turn,
                            text,
                        })
                        .is_err()
                    {
                        warn!("Failed to forward delta: receiver dropped");
                        return;
                    }
                }
                StreamEvent::Done => {
                    debug!("Stream done ({} bytes)", content.len());
                    if tx.send(Action::StreamDone { turn, content }).is_err() {
                        warn!("Failed to send StreamDone: receiver dropped");
                    }
                    return;
                }
            }
        }

        // Channel closed without Done: the request task hit an error and
        // owns the turn's terminal action. Sending StreamDone here too
        // would race it and could finalize a failed turn as a clean reply.
        debug!("Delta channel closed without Done ({} bytes buffered)", content.len());
    });

    vec![stream_handle.abort_handle(), forward_handle.abort_handle()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::mpsc::Sender;

    use crate::chat::client::{ChatClient, ClientError};
    use crate::core::history::MemoryHistory;

    /// Sends one delta, then fails the way a dropped connection does.
    struct MidStreamFailureClient;

    #[async_trait]
    impl ChatClient for MidStreamFailureClient {
        fn name(&self) -> &str {
            "mid-stream-failure"
        }

        async fn stream_chat(
            &self,
            _request: ChatRequest<'_>,
            sender: Sender<StreamEvent>,
        ) -> Result<(), ClientError> {
            let _ = sender.send(StreamEvent::Delta("partial ".to_string())).await;
            Err(ClientError::Network("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_mid_stream_failure_sends_exactly_one_terminal_action() {
        let mut app = App::new(
            Arc::new(MidStreamFailureClient),
            Box::new(MemoryHistory::new()),
            "test-model".to_string(),
        );
        update(&mut app, Action::Submit("hello".to_string()));

        let (tx, rx) = mpsc::channel();
        let _handles = spawn_request(&app, tx);
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let actions: Vec<Action> = rx.try_iter().collect();
        let dones = actions
            .iter()
            .filter(|a| matches!(a, Action::StreamDone { .. }))
            .count();
        let fails = actions
            .iter()
            .filter(|a| matches!(a, Action::StreamFailed { .. }))
            .count();
        // A failed turn gets StreamFailed and nothing else; a racing
        // StreamDone could finalize the partial reply as clean.
        assert_eq!(dones, 0, "got a StreamDone for a failed turn: {actions:?}");
        assert_eq!(fails, 1);
    }

    #[tokio::test]
    async fn test_failed_turn_ends_with_error_status() {
        let mut app = App::new(
            Arc::new(MidStreamFailureClient),
            Box::new(MemoryHistory::new()),
            "test-model".to_string(),
        );
        update(&mut app, Action::Submit("hello".to_string()));

        let (tx, rx) = mpsc::channel();
        let _handles = spawn_request(&app, tx);
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        for action in rx.try_iter() {
            update(&mut app, action);
        }
        assert!(!app.is_streaming);
        assert_eq!(app.messages[1].status, crate::chat::types::Status::Error);
        assert!(app.error.is_some());
    }
}
