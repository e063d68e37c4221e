use std::error::Error as StdError;

/// Crate-wide result type for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors shared across the transport traits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The event is not of a kind the processor knows how to handle.
    #[error("unknown event kind")]
    UnknownEventKind,

    /// The event carries no addressable session metadata.
    #[error("unknown meta kind")]
    UnknownMetaKind,

    /// Input payload or parameter is invalid.
    #[error("invalid transport input: {message}")]
    InvalidInput { message: String },

    /// Wrapped source error from the underlying transport.
    #[error("transport operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
