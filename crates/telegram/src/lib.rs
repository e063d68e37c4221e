//! Telegram transport for pagekeeper.
//!
//! Implements the `EventFetcher` and `MessageSender` capabilities with
//! teloxide: `getUpdates` long polling in, `sendMessage` out.

pub mod bot;
pub mod error;
pub mod outbound;
pub mod updates;

pub use {bot::TelegramTransport, error::Error};
