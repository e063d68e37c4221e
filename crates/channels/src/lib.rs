//! Inbound event model and the transport capabilities the bot is built on.
//!
//! A transport (Telegram today) implements [`EventFetcher`] and
//! [`MessageSender`]; the command processor implements [`EventProcessor`].
//! The consumer loop only ever talks to these traits.

pub mod error;
pub mod event;
pub mod plugin;

pub use {
    error::{Error, Result},
    event::{Event, EventKind, SessionMeta},
    plugin::{EventFetcher, EventProcessor, MessageSender},
};
