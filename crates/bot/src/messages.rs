//! Every reply text the bot sends. One constant per situation.

macro_rules! help_text {
    () => {
        "I can keep pages for you and offer them back when you have time to read.

To save a page, just send me a link to it.

/list shows everything you have saved.
/rnd sends you a random page. Careful: that page is removed from your list!
/remove shows your list and removes the page whose number you reply with."
    };
}

pub const MSG_HELP: &str = help_text!();
pub const MSG_HELLO: &str = concat!("Hi there! 👾\n\n", help_text!());
pub const MSG_UNKNOWN_COMMAND: &str = "Unknown command 🤔";
pub const MSG_NO_SAVED_PAGES: &str = "You have no saved pages 🙊";
pub const MSG_SAVED: &str = "Saved! 👌";
pub const MSG_ALREADY_EXISTS: &str = "You already have this page in your list 🤗";
pub const MSG_WRONG_INPUT: &str = "Wrong input. Send the number of a page from the list 🔢";
pub const MSG_REMOVED: &str = "Removed! 🗑";
pub const MSG_INSERT_NUMBER: &str = "Send the number of the page to remove.";
