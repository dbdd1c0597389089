//! # Actions
//!
//! Everything that can happen becomes an `Action`. The TUI layer and
//! background tasks send Actions; `update()` applies them to the `App` and
//! returns an `Effect` telling the event loop what side work to start.
//!
//! ```text
//! App + Action  →  update()  →  mutated App + Effect
//! ```
//!
//! Stream callbacks carry the turn number they were spawned for. `update()`
//! drops any that don't match `app.turn` — that is the guard that keeps a
//! cancelled or superseded stream from writing into newer conversation
//! state.

use log::{debug, info};

use crate::chat::types::{ContentType, Message, Role, Status, now_ms};
use crate::core::content::classify;
use crate::core::state::App;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// User submitted input text.
    Submit(String),
    /// A content fragment arrived for the given turn.
    StreamDelta { turn: u64, text: String },
    /// The stream for the given turn finished; `content` is the fully
    /// assembled reply.
    StreamDone { turn: u64, content: String },
    /// The request for the given turn failed.
    StreamFailed { turn: u64, error: String },
    /// Drop the last assistant reply and re-run the turn.
    Regenerate,
    /// Start editing the most recent user message in place.
    BeginEdit,
    /// Discard the in-progress edit, keeping the saved content.
    CancelEdit,
    /// Stop accepting output from the in-flight turn.
    CancelStream,
    /// Delete the whole conversation.
    ClearConversation,
    /// Dismiss the error banner.
    DismissError,
    SetSearchQuery(String),
    NextMatch,
    PreviousMatch,
    ClearSearch,
    /// Result of a server health probe.
    HealthChecked(bool),
    Quit,
}

/// Side work the event loop must start after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Spawn a completion request for the current turn.
    SpawnRequest,
    Quit,
}

/// Apply an action to the state. The single mutation entry point for the
/// conversation.
pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::Submit(text) => {
            let text = text.trim().to_string();
            if text.is_empty() {
                return Effect::None;
            }
            // An in-progress edit turns Submit into in-place replacement.
            if let Some(index) = app.editing {
                if let Some(message) = app.messages.get_mut(index) {
                    message.content = text;
                    message.status = Status::Sent;
                    message.timestamp = now_ms();
                }
                app.editing = None;
                app.status_message = "Message updated".to_string();
                app.search.recompute(&app.messages);
                app.persist();
                return Effect::None;
            }
            if app.is_streaming {
                app.status_message = "Still replying — Esc to cancel".to_string();
                return Effect::None;
            }
            app.error = None;
            app.messages.push(Message::user(text));
            app.messages.push(Message::pending_assistant());
            app.is_streaming = true;
            app.turn += 1;
            app.status_message = "Waiting for reply...".to_string();
            app.search.recompute(&app.messages);
            app.persist();
            Effect::SpawnRequest
        }

        Action::StreamDelta { turn, text } => {
            if turn != app.turn || !app.is_streaming {
                debug!("Dropping stale delta for turn {} (current {})", turn, app.turn);
                return Effect::None;
            }
            if let Some(pending) = app.pending_message_mut() {
                pending.content.push_str(&text);
                app.status_message = "Streaming...".to_string();
                app.search.recompute(&app.messages);
            }
            Effect::None
        }

        Action::StreamDone { turn, content } => {
            if turn != app.turn || !app.is_streaming {
                debug!("Dropping stale completion for turn {}", turn);
                return Effect::None;
            }
            let content_type = classify(&content);
            if let Some(pending) = app.pending_message_mut() {
                // Replace wholesale: the assembled content is authoritative,
                // healing any delta the channel dropped.
                pending.content = content;
                pending.content_type = content_type;
                pending.status = Status::Sent;
                pending.timestamp = now_ms();
            }
            app.is_streaming = false;
            app.status_message = String::new();
            app.search.recompute(&app.messages);
            app.persist();
            Effect::None
        }

        Action::StreamFailed { turn, error } => {
            if turn != app.turn || !app.is_streaming {
                debug!("Dropping stale failure for turn {}", turn);
                return Effect::None;
            }
            info!("Turn {} failed: {}", turn, error);
            if let Some(pending) = app.pending_message_mut() {
                pending.content = error.clone();
                pending.content_type = ContentType::Text;
                pending.status = Status::Error;
                pending.error = Some(error.clone());
                pending.timestamp = now_ms();
            }
            app.error = Some(error);
            app.is_streaming = false;
            app.status_message = String::new();
            app.search.recompute(&app.messages);
            app.persist();
            Effect::None
        }

        Action::Regenerate => {
            if app.is_streaming || app.editing.is_some() {
                return Effect::None;
            }
            let Some(last_assistant) = app
                .messages
                .iter()
                .rposition(|m| m.role == Role::Assistant)
            else {
                return Effect::None;
            };
            app.messages.truncate(last_assistant);
            app.messages.push(Message::pending_assistant());
            app.error = None;
            app.is_streaming = true;
            app.turn += 1;
            app.status_message = "Regenerating...".to_string();
            app.search.recompute(&app.messages);
            Effect::SpawnRequest
        }

        Action::BeginEdit => {
            if app.is_streaming || app.editing.is_some() {
                return Effect::None;
            }
            let Some(index) = app.messages.iter().rposition(|m| m.role == Role::User) else {
                return Effect::None;
            };
            app.messages[index].status = Status::Editing;
            app.editing = Some(index);
            app.status_message = "Editing — Enter saves, Esc discards".to_string();
            Effect::None
        }

        Action::CancelEdit => {
            if let Some(index) = app.editing.take()
                && let Some(message) = app.messages.get_mut(index)
            {
                message.status = Status::Sent;
            }
            app.status_message = String::new();
            Effect::None
        }

        Action::CancelStream => {
            if !app.is_streaming {
                return Effect::None;
            }
            app.is_streaming = false;
            // Bump the turn so anything the dying stream still sends is stale
            app.turn += 1;
            let empty_placeholder = app
                .messages
                .last()
                .is_some_and(|m| m.status == Status::Sending && m.content.is_empty());
            if empty_placeholder {
                app.messages.pop();
            } else if let Some(pending) = app.pending_message_mut() {
                pending.content_type = classify(&pending.content);
                pending.status = Status::Sent;
            }
            app.status_message = "Cancelled".to_string();
            app.search.recompute(&app.messages);
            app.persist();
            Effect::None
        }

        Action::ClearConversation => {
            app.messages.clear();
            app.is_streaming = false;
            app.turn += 1;
            app.error = None;
            app.editing = None;
            app.status_message = "Conversation cleared".to_string();
            app.search.recompute(&app.messages);
            app.persist();
            Effect::None
        }

        Action::DismissError => {
            app.error = None;
            Effect::None
        }

        Action::SetSearchQuery(query) => {
            app.search.set_query(&query, &app.messages);
            Effect::None
        }

        Action::NextMatch => {
            app.search.next();
            Effect::None
        }

        Action::PreviousMatch => {
            app.search.previous();
            Effect::None
        }

        Action::ClearSearch => {
            app.search.clear();
            Effect::None
        }

        Action::HealthChecked(online) => {
            app.server_online = online;
            if !online {
                app.status_message = "server offline — run `parrot --serve`".to_string();
            }
            Effect::None
        }

        Action::Quit => Effect::Quit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_app;

    fn streaming_app() -> App {
        let mut app = test_app();
        let effect = update(&mut app, Action::Submit("hello".to_string()));
        assert_eq!(effect, Effect::SpawnRequest);
        app
    }

    #[test]
    fn test_submit_appends_user_and_placeholder() {
        let app = streaming_app();
        assert_eq!(app.messages.len(), 2);
        assert_eq!(app.messages[0].role, Role::User);
        assert_eq!(app.messages[0].status, Status::Sent);
        assert_eq!(app.messages[1].role, Role::Assistant);
        assert_eq!(app.messages[1].status, Status::Sending);
        assert!(app.is_streaming);
        assert_eq!(app.turn, 1);
    }

    #[test]
    fn test_submit_while_streaming_is_rejected() {
        let mut app = streaming_app();
        let effect = update(&mut app, Action::Submit("again".to_string()));
        assert_eq!(effect, Effect::None);
        assert_eq!(app.messages.len(), 2);
        assert_eq!(app.turn, 1);
    }

    #[test]
    fn test_submit_blank_is_noop() {
        let mut app = test_app();
        assert_eq!(update(&mut app, Action::Submit("   ".to_string())), Effect::None);
        assert!(app.messages.is_empty());
    }

    #[test]
    fn test_deltas_accumulate_in_placeholder() {
        let mut app = streaming_app();
        update(&mut app, Action::StreamDelta { turn: 1, text: "Hello ".to_string() });
        update(&mut app, Action::StreamDelta { turn: 1, text: "world".to_string() });
        assert_eq!(app.messages[1].content, "Hello world");
        assert!(app.is_streaming);
    }

    #[test]
    fn test_done_finalizes_with_classified_content() {
        let mut app = streaming_app();
        update(&mut app, Action::StreamDelta { turn: 1, text: "# Ti".to_string() });
        update(&mut app, Action::StreamDone { turn: 1, content: "# Title\n\nbody".to_string() });
        let reply = &app.messages[1];
        assert_eq!(reply.status, Status::Sent);
        assert_eq!(reply.content, "# Title\n\nbody");
        assert_eq!(reply.content_type, ContentType::Markdown);
        assert!(!app.is_streaming);
    }

    #[test]
    fn test_done_replaces_partial_content_wholesale() {
        let mut app = streaming_app();
        update(&mut app, Action::StreamDelta { turn: 1, text: "partial gar".to_string() });
        update(&mut app, Action::StreamDone { turn: 1, content: "clean full reply".to_string() });
        assert_eq!(app.messages[1].content, "clean full reply");
    }

    #[test]
    fn test_stale_turn_callbacks_are_dropped() {
        let mut app = streaming_app();
        update(&mut app, Action::CancelStream);
        let before = app.messages.clone();

        update(&mut app, Action::StreamDelta { turn: 1, text: "late".to_string() });
        update(&mut app, Action::StreamDone { turn: 1, content: "late".to_string() });
        update(&mut app, Action::StreamFailed { turn: 1, error: "late".to_string() });

        assert_eq!(app.messages, before);
        assert!(!app.is_streaming);
        assert!(app.error.is_none());
    }

    #[test]
    fn test_failure_becomes_error_message_and_banner() {
        let mut app = streaming_app();
        update(&mut app, Action::StreamFailed { turn: 1, error: "connection refused".to_string() });
        let reply = &app.messages[1];
        assert_eq!(reply.status, Status::Error);
        assert_eq!(reply.content, "connection refused");
        assert_eq!(reply.error.as_deref(), Some("connection refused"));
        assert_eq!(app.error.as_deref(), Some("connection refused"));
        assert!(!app.is_streaming);

        update(&mut app, Action::DismissError);
        assert!(app.error.is_none());
    }

    #[test]
    fn test_cancel_with_empty_placeholder_removes_it() {
        let mut app = streaming_app();
        update(&mut app, Action::CancelStream);
        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.messages[0].role, Role::User);
        assert_eq!(app.turn, 2);
    }

    #[test]
    fn test_cancel_keeps_partial_content() {
        let mut app = streaming_app();
        update(&mut app, Action::StreamDelta { turn: 1, text: "partial".to_string() });
        update(&mut app, Action::CancelStream);
        assert_eq!(app.messages[1].content, "partial");
        assert_eq!(app.messages[1].status, Status::Sent);
    }

    #[test]
    fn test_regenerate_truncates_to_last_assistant() {
        let mut app = streaming_app();
        update(&mut app, Action::StreamDone { turn: 1, content: "first reply".to_string() });
        update(&mut app, Action::Submit("follow-up".to_string()));
        update(&mut app, Action::StreamDone { turn: 2, content: "second reply".to_string() });
        assert_eq!(app.messages.len(), 4);

        let effect = update(&mut app, Action::Regenerate);
        assert_eq!(effect, Effect::SpawnRequest);
        // Second reply dropped, fresh placeholder in its place
        assert_eq!(app.messages.len(), 4);
        assert_eq!(app.messages[2].content, "follow-up");
        assert_eq!(app.messages[3].status, Status::Sending);
        assert!(app.messages[3].content.is_empty());
        assert_eq!(app.turn, 3);

        // Context excludes the placeholder
        let context = app.request_context();
        assert_eq!(context.len(), 3);
        assert_eq!(context[2].content, "follow-up");
    }

    #[test]
    fn test_regenerate_without_assistant_is_noop() {
        let mut app = test_app();
        assert_eq!(update(&mut app, Action::Regenerate), Effect::None);
    }

    #[test]
    fn test_regenerate_while_streaming_is_noop() {
        let mut app = streaming_app();
        assert_eq!(update(&mut app, Action::Regenerate), Effect::None);
    }

    #[test]
    fn test_at_most_one_sending_message() {
        let mut app = streaming_app();
        update(&mut app, Action::StreamDone { turn: 1, content: "reply".to_string() });
        update(&mut app, Action::Submit("next".to_string()));
        let sending = app
            .messages
            .iter()
            .filter(|m| m.status == Status::Sending)
            .count();
        assert_eq!(sending, 1);
    }

    #[test]
    fn test_clear_conversation() {
        let mut app = streaming_app();
        update(&mut app, Action::ClearConversation);
        assert!(app.messages.is_empty());
        assert!(!app.is_streaming);
    }

    #[test]
    fn test_search_actions_cycle_matches() {
        let mut app = test_app();
        update(&mut app, Action::Submit("apple one".to_string()));
        update(&mut app, Action::StreamDone { turn: 1, content: "apple two".to_string() });
        update(&mut app, Action::SetSearchQuery("apple".to_string()));
        assert_eq!(app.search.matches, vec![0, 1]);
        assert_eq!(app.search.current_message(), Some(0));

        update(&mut app, Action::NextMatch);
        assert_eq!(app.search.current_message(), Some(1));
        update(&mut app, Action::NextMatch);
        assert_eq!(app.search.current_message(), Some(0));
        update(&mut app, Action::PreviousMatch);
        assert_eq!(app.search.current_message(), Some(1));

        update(&mut app, Action::ClearSearch);
        assert!(app.search.matches.is_empty());
    }

    #[test]
    fn test_begin_edit_targets_last_user_message() {
        let mut app = streaming_app();
        update(&mut app, Action::StreamDone { turn: 1, content: "reply".to_string() });
        update(&mut app, Action::Submit("second question".to_string()));
        update(&mut app, Action::StreamDone { turn: 2, content: "another".to_string() });

        assert_eq!(update(&mut app, Action::BeginEdit), Effect::None);
        assert_eq!(app.editing, Some(2));
        assert_eq!(app.messages[2].status, Status::Editing);
        assert_eq!(app.editing_content(), Some("second question"));
        // First user message untouched
        assert_eq!(app.messages[0].status, Status::Sent);
    }

    #[test]
    fn test_edit_submit_replaces_content_in_place() {
        let mut app = streaming_app();
        update(&mut app, Action::StreamDone { turn: 1, content: "reply".to_string() });
        update(&mut app, Action::BeginEdit);

        let effect = update(&mut app, Action::Submit("reworded question".to_string()));
        // In-place replacement, no new turn
        assert_eq!(effect, Effect::None);
        assert_eq!(app.messages.len(), 2);
        assert_eq!(app.messages[0].content, "reworded question");
        assert_eq!(app.messages[0].status, Status::Sent);
        assert_eq!(app.editing, None);
        assert_eq!(app.turn, 1);
    }

    #[test]
    fn test_cancel_edit_restores_saved_content() {
        let mut app = streaming_app();
        update(&mut app, Action::StreamDone { turn: 1, content: "reply".to_string() });
        update(&mut app, Action::BeginEdit);
        update(&mut app, Action::CancelEdit);
        assert_eq!(app.editing, None);
        assert_eq!(app.messages[0].content, "hello");
        assert_eq!(app.messages[0].status, Status::Sent);
    }

    #[test]
    fn test_begin_edit_while_streaming_is_noop() {
        let mut app = streaming_app();
        update(&mut app, Action::BeginEdit);
        assert_eq!(app.editing, None);
        assert_eq!(app.messages[0].status, Status::Sent);
    }

    #[test]
    fn test_begin_edit_with_no_user_message_is_noop() {
        let mut app = test_app();
        update(&mut app, Action::BeginEdit);
        assert_eq!(app.editing, None);
    }

    #[test]
    fn test_blank_edit_submit_leaves_edit_open() {
        let mut app = streaming_app();
        update(&mut app, Action::StreamDone { turn: 1, content: "reply".to_string() });
        update(&mut app, Action::BeginEdit);
        update(&mut app, Action::Submit("   ".to_string()));
        assert_eq!(app.editing, Some(0));
        assert_eq!(app.messages[0].content, "hello");
    }

    #[test]
    fn test_health_check_updates_indicator() {
        let mut app = test_app();
        update(&mut app, Action::HealthChecked(false));
        assert!(!app.server_online);
        update(&mut app, Action::HealthChecked(true));
        assert!(app.server_online);
    }
}
