//! Per-chat conversational state.
//!
//! Command handling is stateless except for multi-step flows such as
//! "remove by number", which need to remember what the chat was asked last.
//! That memory lives here, in process, and is lost on restart.

pub mod error;
pub mod lock;
pub mod state;
pub mod state_store;

pub use {
    error::{Error, Result},
    lock::SessionLocks,
    state::SessionState,
    state_store::{InMemorySessionStateStore, SessionStateStore},
};
