//! # TUI Components
//!
//! Components follow two patterns:
//!
//! - Stateless, props-based rendering: `TitleBar`, `MessageCard`. All data
//!   arrives as struct fields, nothing is retained between frames.
//! - Stateful, event-driven: `InputBox`, `SearchBar`, `MessageList`. These
//!   hold local state (buffers, scroll position, layout cache) and emit
//!   events the main loop translates into actions.
//!
//! Each component file is self-contained: state types, event types,
//! rendering, event handling, and tests live together.

mod title_bar;
pub use title_bar::TitleBar;

pub mod input_box;
pub mod message;
pub use input_box::{InputBox, InputEvent};
pub use message::MessageCard;
pub mod message_list;
pub use message_list::{MessageList, MessageListState};
pub mod search_bar;
pub use search_bar::{SearchBar, SearchEvent};
