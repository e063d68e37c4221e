use {
    crate::{Error, Result},
    serde::Serialize,
};

/// What an inbound event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A text message from an addressable chat.
    Message,
    /// Anything else the provider delivers (edits, callbacks, ...).
    Unknown,
}

/// Where a message came from and who sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionMeta {
    /// Chat identifier; replies and conversational state are keyed by it.
    pub session_id: i64,
    /// Username the saved pages belong to.
    pub owner: String,
}

/// One inbound unit of work, consumed exactly once by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Provider-assigned, monotonically increasing id. The consumer's cursor
    /// moves to `id + 1` of the last event in a batch.
    pub id: i64,
    pub kind: EventKind,
    pub text: String,
    pub meta: Option<SessionMeta>,
}

impl Event {
    /// Build a message event addressed to `session_id` on behalf of `owner`.
    pub fn message(
        id: i64,
        session_id: i64,
        owner: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind: EventKind::Message,
            text: text.into(),
            meta: Some(SessionMeta {
                session_id,
                owner: owner.into(),
            }),
        }
    }

    /// An event the processor does not handle. It still advances the cursor.
    #[must_use]
    pub fn unknown(id: i64) -> Self {
        Self {
            id,
            kind: EventKind::Unknown,
            text: String::new(),
            meta: None,
        }
    }

    /// Resolve the session metadata, failing with [`Error::UnknownMetaKind`]
    /// when the event is not addressable.
    pub fn session_meta(&self) -> Result<&SessionMeta> {
        match &self.meta {
            Some(meta) => Ok(meta),
            None => Err(Error::UnknownMetaKind),
        }
    }

    /// Session id for log fields, if the event has one.
    #[must_use]
    pub fn session_id(&self) -> Option<i64> {
        self.meta.as_ref().map(|m| m.session_id)
    }
}
