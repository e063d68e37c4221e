//! Small helpers shared by pagekeeper crates: `.context()` support for
//! crate-local error types and wall-clock timestamps.

pub mod error;
pub mod time;

pub use error::FromMessage;
