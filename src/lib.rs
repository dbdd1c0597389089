//! Parrot library exports
//!
//! The binary wires these together; integration tests exercise the chat
//! client and mock server through this crate root.

pub mod chat;
pub mod core;
pub mod mock;
pub mod tui;

#[cfg(test)]
pub mod test_support;
