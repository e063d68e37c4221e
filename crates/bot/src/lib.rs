//! Command processing for pagekeeper.
//!
//! [`Processor`] turns one inbound message into storage calls and replies,
//! keeping track of multi-step flows per chat through a
//! [`SessionStateStore`](pagekeeper_sessions::SessionStateStore).

pub mod commands;
pub mod error;
pub mod messages;
pub mod processor;

pub use {
    commands::Command,
    error::{Error, Result},
    processor::Processor,
};
