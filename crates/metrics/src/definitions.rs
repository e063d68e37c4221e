//! Metric name and label definitions.
//!
//! Every metric pagekeeper records is named here so the set stays documented
//! in one place.

/// Ingestion loop metrics
pub mod consumer {
    /// Events returned by the transport
    pub const EVENTS_FETCHED_TOTAL: &str = "pagekeeper_consumer_events_fetched_total";
    /// Failed fetch attempts
    pub const FETCH_ERRORS_TOTAL: &str = "pagekeeper_consumer_fetch_errors_total";
    /// Events processed without error
    pub const EVENTS_PROCESSED_TOTAL: &str = "pagekeeper_consumer_events_processed_total";
    /// Events whose processing failed and were dropped
    pub const EVENTS_FAILED_TOTAL: &str = "pagekeeper_consumer_events_failed_total";
    /// Wall time from fan-out to join of one batch
    pub const BATCH_DURATION_SECONDS: &str = "pagekeeper_consumer_batch_duration_seconds";
    /// Next offset the consumer will fetch from
    pub const CURSOR: &str = "pagekeeper_consumer_cursor";
}

/// Command processing metrics
pub mod commands {
    /// Commands dispatched, labelled by `command`
    pub const DISPATCHED_TOTAL: &str = "pagekeeper_commands_dispatched_total";
}

/// Telegram transport metrics
pub mod telegram {
    /// Messages sent to Telegram
    pub const MESSAGES_SENT_TOTAL: &str = "pagekeeper_telegram_messages_sent_total";
    /// Message send errors
    pub const MESSAGE_SEND_ERRORS_TOTAL: &str = "pagekeeper_telegram_message_send_errors_total";
    /// getUpdates round-trip duration in seconds
    pub const POLLING_DURATION_SECONDS: &str = "pagekeeper_telegram_polling_duration_seconds";
}

/// Page storage metrics
pub mod storage {
    pub const PAGES_SAVED_TOTAL: &str = "pagekeeper_storage_pages_saved_total";
    pub const PAGES_REMOVED_TOTAL: &str = "pagekeeper_storage_pages_removed_total";
}

/// Common label keys
pub mod labels {
    pub const COMMAND: &str = "command";
}

/// Histogram bucket boundaries
pub mod buckets {
    /// Batch and polling durations, 1ms to 60s (long polls sit near the top).
    pub const DURATION: &[f64] = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
    ];
}
