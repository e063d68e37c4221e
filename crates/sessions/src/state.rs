/// Where a chat is in a multi-step command flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No pending flow; the next message is dispatched as a fresh command.
    #[default]
    None,
    /// The chat was shown a numbered list and must answer with a number.
    AwaitingRemoveIndex,
}

impl SessionState {
    #[must_use]
    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::AwaitingRemoveIndex => f.write_str("awaiting_remove_index"),
        }
    }
}
