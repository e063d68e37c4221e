use std::{future::Future, time::Duration};

use {
    async_trait::async_trait,
    pagekeeper_channels::{Error as ChannelError, MessageSender, Result as ChannelResult},
    teloxide::{RequestError, prelude::*, types::ChatId},
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use pagekeeper_metrics::{counter, telegram as tg_metrics};

use crate::bot::TelegramTransport;

/// Telegram rejects messages longer than this many bytes of UTF-8.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

#[async_trait]
impl MessageSender for TelegramTransport {
    async fn send_text(&self, session_id: i64, text: &str) -> ChannelResult<()> {
        let chat_id = ChatId(session_id);
        let chunks = chunk_text(text, TELEGRAM_MAX_MESSAGE_LEN);
        debug!(
            chat_id = session_id,
            text_len = text.len(),
            chunk_count = chunks.len(),
            "telegram outbound text send start"
        );

        for chunk in chunks {
            let result = run_with_retry(session_id, || {
                let req = self.bot().send_message(chat_id, chunk.clone());
                async move { req.await }
            })
            .await;

            if let Err(e) = result {
                #[cfg(feature = "metrics")]
                counter!(tg_metrics::MESSAGE_SEND_ERRORS_TOTAL).increment(1);
                return Err(ChannelError::external("telegram sendMessage", e));
            }

            #[cfg(feature = "metrics")]
            counter!(tg_metrics::MESSAGES_SENT_TOTAL).increment(1);
        }
        Ok(())
    }
}

/// Run a Bot API request, waiting out Telegram's flood control.
///
/// Only `RetryAfter` answers are retried, at most
/// `TELEGRAM_RETRY_AFTER_MAX_RETRIES` times; every other error is returned
/// immediately.
async fn run_with_retry<T, F, Fut>(
    chat_id: i64,
    mut request: F,
) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    let mut retries = 0usize;

    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(wait) = retry_after_duration(&err) else {
                    return Err(err);
                };

                if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                    warn!(
                        chat_id,
                        retries,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limit persisted after retries"
                    );
                    return Err(err);
                }

                retries += 1;
                warn!(
                    chat_id,
                    retries,
                    max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                    retry_after_secs = wait.as_secs(),
                    "telegram rate limited, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            },
        }
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

/// Split `text` into pieces of at most `max_len` bytes.
///
/// Splits after the last newline in the window, else after the last space,
/// else at the last char boundary. Pieces that are only newlines are dropped.
/// An empty text yields one empty chunk so a send is still attempted (and
/// rejected by Telegram, visibly).
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len || max_len == 0 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > max_len {
        let window_end = remaining
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|end| *end <= max_len)
            .last()
            .unwrap_or_else(|| remaining.chars().next().map_or(remaining.len(), char::len_utf8));
        let window = &remaining[..window_end];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map_or(window_end, |i| i + 1);

        let (head, tail) = remaining.split_at(split_at);
        let head = head.trim_end_matches('\n');
        if !head.is_empty() {
            chunks.push(head.to_string());
        }
        remaining = tail;
    }

    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}
