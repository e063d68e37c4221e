use pagekeeper_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The owner has nothing saved. Callers turn this into a user message.
    #[error("no saved pages")]
    NoSavedPages,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// True for the "owner has nothing saved" outcome.
    #[must_use]
    pub fn is_no_saved_pages(&self) -> bool {
        matches!(self, Self::NoSavedPages)
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pagekeeper_common::impl_context!();
