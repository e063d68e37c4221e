use async_trait::async_trait;

use crate::{Event, Result};

/// Pull a bounded batch of events from the upstream provider.
#[async_trait]
pub trait EventFetcher: Send + Sync {
    /// Return up to `limit` events whose id is at or after `offset`, oldest
    /// first. An empty vector means nothing new arrived.
    async fn fetch(&self, offset: i64, limit: usize) -> Result<Vec<Event>>;

    /// Largest batch the provider accepts. The consumer clamps its configured
    /// batch size to this.
    fn max_batch_size(&self) -> usize {
        100
    }
}

/// Send plain text back to a chat.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Best-effort delivery; failures are reported, not retried by callers.
    async fn send_text(&self, session_id: i64, text: &str) -> Result<()>;
}

/// Handle one inbound event.
///
/// Errors are logged and dropped by the consumer; returning one never causes
/// redelivery.
#[async_trait]
pub trait EventProcessor: Send + Sync {
    async fn process(&self, event: Event) -> anyhow::Result<()>;
}
