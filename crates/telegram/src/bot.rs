use std::time::Duration;

use {
    async_trait::async_trait,
    pagekeeper_channels::{Error as ChannelError, Event, EventFetcher, Result as ChannelResult},
    pagekeeper_config::TelegramConfig,
    secrecy::ExposeSecret,
    teloxide::{prelude::*, types::BotCommand},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use pagekeeper_metrics::{histogram, telegram as tg_metrics};

use crate::{error::Result, updates::event_from_update};

/// Largest `limit` accepted by `getUpdates`.
pub const TELEGRAM_MAX_BATCH: usize = 100;

/// Extra slack on top of the long-poll timeout for the HTTP client, so the
/// client never aborts a request Telegram is still legitimately holding.
const CLIENT_TIMEOUT_SLACK: Duration = Duration::from_secs(15);

/// A Telegram bot account, usable as both event source and message sink.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    poll_timeout_secs: u32,
}

impl TelegramTransport {
    /// Wrap an already configured bot without talking to Telegram.
    pub fn new(bot: Bot, poll_timeout_secs: u32) -> Self {
        Self {
            bot,
            poll_timeout_secs,
        }
    }

    /// Build the bot from config and prepare the account for long polling.
    ///
    /// Verifies the token with `getMe`, deletes any webhook (Telegram refuses
    /// `getUpdates` while one is set) and registers the command menu.
    pub async fn connect(config: &TelegramConfig) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(Duration::from_secs(u64::from(config.poll_timeout_secs)) + CLIENT_TIMEOUT_SLACK)
            .build()?;
        let mut bot = Bot::with_client(config.token.expose_secret(), client);
        if let Some(api_url) = &config.api_url {
            bot = bot.set_api_url(reqwest::Url::parse(api_url)?);
        }

        let me = bot.get_me().await?;
        bot.delete_webhook().send().await?;

        if let Err(e) = bot.set_my_commands(bot_commands()).await {
            warn!("failed to register bot commands: {e}");
        }

        info!(
            username = ?me.username,
            poll_timeout_secs = config.poll_timeout_secs,
            "telegram bot connected (webhook cleared)"
        );

        Ok(Self::new(bot, config.poll_timeout_secs))
    }

    pub(crate) fn bot(&self) -> &Bot {
        &self.bot
    }
}

/// Commands shown in the Telegram client's menu.
fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("list", "List saved pages"),
        BotCommand::new("rnd", "Send a random page and forget it"),
        BotCommand::new("remove", "Remove a page by its number"),
        BotCommand::new("help", "Show available commands"),
    ]
}

#[async_trait]
impl EventFetcher for TelegramTransport {
    async fn fetch(&self, offset: i64, limit: usize) -> ChannelResult<Vec<Event>> {
        let offset = i32::try_from(offset)
            .map_err(|_| ChannelError::invalid_input(format!("offset {offset} out of range")))?;
        // Clamped to 1..=100, so the cast cannot truncate.
        let limit = limit.clamp(1, TELEGRAM_MAX_BATCH) as u8;

        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        let updates = self
            .bot
            .get_updates()
            .offset(offset)
            .limit(limit)
            .timeout(self.poll_timeout_secs)
            .await
            .map_err(|e| ChannelError::external("telegram getUpdates", e))?;

        #[cfg(feature = "metrics")]
        histogram!(tg_metrics::POLLING_DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        debug!(offset, count = updates.len(), "got telegram updates");
        Ok(updates.into_iter().map(event_from_update).collect())
    }

    fn max_batch_size(&self) -> usize {
        TELEGRAM_MAX_BATCH
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        axum::{Json, Router, body::Bytes, extract::State, http::Uri, routing::post},
        pagekeeper_channels::{EventKind, MessageSender},
        serde::Deserialize,
        serde_json::{Value, json},
        std::sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        tokio::sync::oneshot,
    };

    #[derive(Debug, Clone, Deserialize)]
    struct GetUpdatesRequest {
        offset: Option<i32>,
        limit: Option<u8>,
        timeout: Option<u32>,
    }

    #[derive(Debug, Clone, Deserialize)]
    struct SendMessageRequest {
        chat_id: i64,
        text: String,
    }

    #[derive(Clone, Default)]
    struct MockTelegramApi {
        get_updates: Arc<Mutex<Vec<GetUpdatesRequest>>>,
        sent: Arc<Mutex<Vec<SendMessageRequest>>>,
        /// Number of `sendMessage` calls to answer with a 429 first.
        rate_limited_sends: Arc<AtomicUsize>,
    }

    fn message_update(update_id: u32, chat_id: i64, username: &str, text: &str) -> Value {
        json!({
            "update_id": update_id,
            "message": {
                "message_id": update_id,
                "date": 1,
                "chat": { "id": chat_id, "type": "private", "first_name": "User" },
                "from": {
                    "id": 1001,
                    "is_bot": false,
                    "first_name": "User",
                    "username": username
                },
                "text": text
            }
        })
    }

    async fn telegram_api_handler(
        State(state): State<MockTelegramApi>,
        uri: Uri,
        body: Bytes,
    ) -> Json<Value> {
        let method = uri.path().rsplit('/').next().unwrap_or_default().to_string();
        match method.as_str() {
            "GetUpdates" => {
                let req: GetUpdatesRequest =
                    serde_json::from_slice(&body).expect("getUpdates body");
                state.get_updates.lock().expect("lock").push(req);
                Json(json!({
                    "ok": true,
                    "result": [
                        message_update(10, 42, "carol", "/list"),
                        {
                            "update_id": 11,
                            "edited_message": {
                                "message_id": 3,
                                "date": 1,
                                "edit_date": 2,
                                "chat": { "id": 42, "type": "private", "first_name": "User" },
                                "text": "edited"
                            }
                        },
                        message_update(12, 7, "bob", "https://example.com/a"),
                    ]
                }))
            },
            "SendMessage" => {
                if state
                    .rate_limited_sends
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
                {
                    return Json(json!({
                        "ok": false,
                        "error_code": 429,
                        "description": "Too Many Requests: retry after 0",
                        "parameters": { "retry_after": 0 }
                    }));
                }
                let req: SendMessageRequest =
                    serde_json::from_slice(&body).expect("sendMessage body");
                let chat_id = req.chat_id;
                state.sent.lock().expect("lock").push(req);
                Json(json!({
                    "ok": true,
                    "result": {
                        "message_id": 1,
                        "date": 0,
                        "chat": { "id": chat_id, "type": "private" },
                        "text": "ok"
                    }
                }))
            },
            _ => Json(json!({ "ok": true, "result": true })),
        }
    }

    async fn spawn_mock(api: MockTelegramApi) -> (TelegramTransport, oneshot::Sender<()>) {
        let app = Router::new()
            .route("/{*path}", post(telegram_api_handler))
            .with_state(api);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("serve mock telegram api");
        });

        let api_url = reqwest::Url::parse(&format!("http://{addr}/")).expect("parse api url");
        let bot = Bot::new("test-token").set_api_url(api_url);
        (TelegramTransport::new(bot, 0), shutdown_tx)
    }

    #[tokio::test]
    async fn fetch_maps_updates_and_passes_cursor() {
        let api = MockTelegramApi::default();
        let (transport, shutdown) = spawn_mock(api.clone()).await;

        let events = transport.fetch(10, 500).await.expect("fetch");
        assert_eq!(events.len(), 3);
        assert_eq!(events.iter().map(|e| e.id).collect::<Vec<_>>(), vec![
            10, 11, 12
        ]);
        assert_eq!(events[0].kind, EventKind::Message);
        assert_eq!(events[0].session_meta().expect("meta").owner, "carol");
        assert_eq!(events[1].kind, EventKind::Unknown);
        assert_eq!(events[2].text, "https://example.com/a");

        let requests = api.get_updates.lock().expect("lock").clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].offset, Some(10));
        // Oversized batches are clamped to the Bot API maximum.
        assert_eq!(requests[0].limit, Some(100));
        assert_eq!(requests[0].timeout, Some(0));

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn fetch_rejects_offset_beyond_i32() {
        let transport = TelegramTransport::new(Bot::new("test-token"), 0);
        let err = transport
            .fetch(i64::from(i32::MAX) + 1, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn send_text_posts_to_chat() {
        let api = MockTelegramApi::default();
        let (transport, shutdown) = spawn_mock(api.clone()).await;

        transport.send_text(42, "saved").await.expect("send");

        let sent = api.sent.lock().expect("lock").clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, 42);
        assert_eq!(sent[0].text, "saved");

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn send_text_waits_out_rate_limit() {
        let api = MockTelegramApi::default();
        api.rate_limited_sends.store(2, Ordering::SeqCst);
        let (transport, shutdown) = spawn_mock(api.clone()).await;

        transport.send_text(42, "removed").await.expect("send");

        let sent = api.sent.lock().expect("lock").clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(api.rate_limited_sends.load(Ordering::SeqCst), 0);

        let _ = shutdown.send(());
    }
}
