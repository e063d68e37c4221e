use url::Url;

pub const LIST_CMD: &str = "/list";
pub const RND_CMD: &str = "/rnd";
pub const REMOVE_CMD: &str = "/remove";
pub const HELP_CMD: &str = "/help";
pub const START_CMD: &str = "/start";

/// A message, read as a command when no multi-step flow is pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Save the link.
    Save(String),
    /// Show all saved pages, numbered.
    List,
    /// Draw a random page: send it and forget it.
    Random,
    /// Show the numbered list and wait for the number to remove.
    Remove,
    Help,
    Start,
    Unknown,
}

impl Command {
    /// Classify a message. Surrounding whitespace is ignored; command names
    /// are matched exactly and case-sensitively.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if is_url(text) {
            return Self::Save(text.to_string());
        }
        match text {
            LIST_CMD => Self::List,
            RND_CMD => Self::Random,
            REMOVE_CMD => Self::Remove,
            HELP_CMD => Self::Help,
            START_CMD => Self::Start,
            _ => Self::Unknown,
        }
    }

    /// Short name for logs and metric labels.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Save(_) => "save",
            Self::List => "list",
            Self::Random => "rnd",
            Self::Remove => "remove",
            Self::Help => "help",
            Self::Start => "start",
            Self::Unknown => "unknown",
        }
    }
}

/// An absolute URL with a non-empty host.
///
/// `Url::parse` drops tabs and newlines before parsing, so text with any
/// whitespace or control character inside is rejected up front.
fn is_url(text: &str) -> bool {
    if text.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    Url::parse(text).is_ok_and(|u| u.host_str().is_some_and(|h| !h.is_empty()))
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("https://example.com/a")]
    #[case("http://example.com")]
    #[case("  https://example.com/path?q=1#frag  ")]
    #[case("ftp://files.example.org/pub")]
    #[case("http://127.0.0.1:8080/")]
    fn urls_are_saved(#[case] text: &str) {
        assert_eq!(Command::parse(text), Command::Save(text.trim().to_string()));
    }

    #[rstest]
    #[case::no_scheme("example.com/a")]
    #[case::no_host("mailto:someone@example.com")]
    #[case::relative("/a/b")]
    #[case::file_url("file:///etc/hosts")]
    #[case::words("read this later")]
    #[case::empty("")]
    #[case::embedded_newline("https://example.com/a\nread this tonight")]
    #[case::embedded_tab("https://example.com/\ta")]
    #[case::inner_space("https://example.com/a b")]
    #[case::control_char("https://example.com/\u{7}a")]
    fn non_urls_are_not_saved(#[case] text: &str) {
        assert!(!matches!(Command::parse(text), Command::Save(_)));
    }

    #[rstest]
    #[case("/list", Command::List)]
    #[case("/rnd", Command::Random)]
    #[case("/remove", Command::Remove)]
    #[case("/help", Command::Help)]
    #[case("/start", Command::Start)]
    #[case("  /list\n", Command::List)]
    #[case("/LIST", Command::Unknown)]
    #[case("/list please", Command::Unknown)]
    #[case("/unknown", Command::Unknown)]
    #[case("2", Command::Unknown)]
    fn commands(#[case] text: &str, #[case] expected: Command) {
        assert_eq!(Command::parse(text), expected);
    }
}
