//! Metrics for pagekeeper.
//!
//! Call sites use the `metrics` crate facade through the re-exported macros
//! and the name constants in this crate. Nothing is recorded until
//! [`init_metrics`] installs a recorder; with the `prometheus` feature that
//! recorder serves the text exposition format over HTTP.
//!
//! ```rust,ignore
//! use pagekeeper_metrics::{consumer, counter};
//!
//! counter!(consumer::EVENTS_FETCHED_TOTAL).increment(batch.len() as u64);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge, histogram};
