//! The ingestion loop.
//!
//! [`Consumer`] pulls batches from an [`EventFetcher`](pagekeeper_channels::EventFetcher),
//! hands every event of a batch to the
//! [`EventProcessor`](pagekeeper_channels::EventProcessor) concurrently, waits
//! for all of them and only then moves its cursor past the batch.

pub mod config;
pub mod consumer;

pub use {
    config::{Backoff, ConsumerConfig},
    consumer::Consumer,
};
