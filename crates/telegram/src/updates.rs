//! Mapping of raw Telegram updates onto pagekeeper events.

use {
    pagekeeper_channels::Event,
    teloxide::types::{Message, Update, UpdateKind},
};

/// Convert one update into an [`Event`].
///
/// New messages become message events addressed to their chat, with the
/// sender's username as owner (empty when the sender has none). Everything
/// else is an unknown event: it carries no session and is only needed so the
/// cursor moves past it.
pub fn event_from_update(update: Update) -> Event {
    let id = i64::from(update.id.0);
    match update.kind {
        UpdateKind::Message(msg) => message_event(id, &msg),
        _ => Event::unknown(id),
    }
}

fn message_event(id: i64, msg: &Message) -> Event {
    let owner = msg
        .from
        .as_ref()
        .and_then(|u| u.username.clone())
        .unwrap_or_default();
    let text = msg.text().unwrap_or_default();
    Event::message(id, msg.chat.id.0, owner, text)
}
