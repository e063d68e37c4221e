use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Only message events can be processed.
    #[error("can't process event: unknown event kind")]
    UnknownEventKind,

    /// The event has no chat to answer to.
    #[error("can't process message: unknown meta kind")]
    UnknownMetaKind,

    #[error("can't do command: {command}: {source}")]
    Send {
        command: &'static str,
        #[source]
        source: pagekeeper_channels::Error,
    },

    #[error("can't do command: {command}: {source}")]
    Storage {
        command: &'static str,
        #[source]
        source: pagekeeper_storage::Error,
    },

    #[error(transparent)]
    Sessions(#[from] pagekeeper_sessions::Error),
}

impl Error {
    /// `map_err` adapter for a failed reply.
    pub fn send(command: &'static str) -> impl FnOnce(pagekeeper_channels::Error) -> Self {
        move |source| Self::Send { command, source }
    }

    /// `map_err` adapter for a failed storage call.
    pub fn storage(command: &'static str) -> impl FnOnce(pagekeeper_storage::Error) -> Self {
        move |source| Self::Storage { command, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
