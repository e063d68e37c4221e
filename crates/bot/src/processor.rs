//! The command processor.
//!
//! One [`Processor`] is shared by every task the consumer spawns. Messages
//! from different chats run fully in parallel; messages from the same chat
//! take turns so the remove-by-number flow never sees a half-applied state
//! change.

use std::sync::Arc;

use {
    async_trait::async_trait,
    pagekeeper_channels::{Event, EventKind, EventProcessor, MessageSender, SessionMeta},
    pagekeeper_sessions::{SessionLocks, SessionState, SessionStateStore},
    pagekeeper_storage::{Error as StorageError, Page, PageStore},
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use pagekeeper_metrics::{commands as cmd_metrics, counter, labels};

use crate::{
    Error, Result,
    commands::Command,
    messages::{
        MSG_ALREADY_EXISTS, MSG_HELLO, MSG_HELP, MSG_INSERT_NUMBER, MSG_NO_SAVED_PAGES,
        MSG_REMOVED, MSG_SAVED, MSG_UNKNOWN_COMMAND, MSG_WRONG_INPUT,
    },
};

pub struct Processor {
    sender: Arc<dyn MessageSender>,
    pages: Arc<dyn PageStore>,
    sessions: Arc<dyn SessionStateStore>,
    turns: SessionLocks,
}

impl Processor {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        pages: Arc<dyn PageStore>,
        sessions: Arc<dyn SessionStateStore>,
    ) -> Self {
        Self {
            sender,
            pages,
            sessions,
            turns: SessionLocks::new(),
        }
    }

    /// Handle one event.
    ///
    /// Only message events with session metadata are accepted. User mistakes
    /// (bad numbers, nothing saved) are answered and count as success;
    /// failing sends and storage calls are returned.
    pub async fn handle(&self, event: Event) -> Result<()> {
        if event.kind != EventKind::Message {
            return Err(Error::UnknownEventKind);
        }
        let meta = event
            .session_meta()
            .map_err(|_| Error::UnknownMetaKind)?
            .clone();

        let _turn = self.turns.acquire(meta.session_id).await;

        match self.sessions.get(meta.session_id).await? {
            SessionState::AwaitingRemoveIndex => self.remove_by_index(&meta, &event.text).await,
            SessionState::None => self.do_command(&meta, &event.text).await,
        }
    }

    async fn do_command(&self, meta: &SessionMeta, text: &str) -> Result<()> {
        let command = Command::parse(text);
        info!(
            session_id = meta.session_id,
            owner = %meta.owner,
            command = command.name(),
            "got new command"
        );

        #[cfg(feature = "metrics")]
        counter!(cmd_metrics::DISPATCHED_TOTAL, labels::COMMAND => command.name()).increment(1);

        match command {
            Command::Save(url) => self.save_page(meta, url).await,
            Command::List => self.send_list(meta).await,
            Command::Random => self.send_random(meta).await,
            Command::Remove => self.begin_remove(meta).await,
            Command::Help => self.reply("help", meta, MSG_HELP).await,
            Command::Start => self.reply("hello", meta, MSG_HELLO).await,
            Command::Unknown => self.reply("unknown command", meta, MSG_UNKNOWN_COMMAND).await,
        }
    }

    async fn save_page(&self, meta: &SessionMeta, url: String) -> Result<()> {
        const CMD: &str = "save page";
        let page = Page::new(url, meta.owner.clone());

        if self.pages.exists(&page).await.map_err(Error::storage(CMD))? {
            return self.reply(CMD, meta, MSG_ALREADY_EXISTS).await;
        }

        self.pages.save(&page).await.map_err(Error::storage(CMD))?;
        self.reply(CMD, meta, MSG_SAVED).await
    }

    async fn send_list(&self, meta: &SessionMeta) -> Result<()> {
        const CMD: &str = "list pages";
        match self.owned_pages(CMD, meta).await? {
            Some(pages) => self.reply(CMD, meta, &format_pages(&pages)).await,
            None => self.reply(CMD, meta, MSG_NO_SAVED_PAGES).await,
        }
    }

    /// Send a random page and forget it. The page is only removed once the
    /// send succeeded.
    async fn send_random(&self, meta: &SessionMeta) -> Result<()> {
        const CMD: &str = "send random";
        let page = match self.pages.pick_random(&meta.owner).await {
            Ok(page) => page,
            Err(StorageError::NoSavedPages) => {
                return self.reply(CMD, meta, MSG_NO_SAVED_PAGES).await;
            },
            Err(e) => return Err(Error::storage(CMD)(e)),
        };

        self.reply(CMD, meta, &page.url).await?;
        self.pages.remove(&page).await.map_err(Error::storage(CMD))
    }

    /// First step of the remove flow: show the numbered list and wait for a
    /// number. With nothing saved there is nothing to pick, so the flow is
    /// not entered.
    async fn begin_remove(&self, meta: &SessionMeta) -> Result<()> {
        const CMD: &str = "begin remove";
        let Some(pages) = self.owned_pages(CMD, meta).await? else {
            return self.reply(CMD, meta, MSG_NO_SAVED_PAGES).await;
        };

        let message = format!("{}\n\n{MSG_INSERT_NUMBER}", format_pages(&pages));
        self.reply(CMD, meta, &message).await?;

        self.sessions
            .set(meta.session_id, SessionState::AwaitingRemoveIndex)
            .await?;
        debug!(session_id = meta.session_id, "awaiting remove index");
        Ok(())
    }

    /// Second step of the remove flow: `text` should be a 1-based position
    /// in the owner's current list.
    ///
    /// The list is read again here rather than remembered from the first
    /// step, so the number refers to whatever the list is now.
    async fn remove_by_index(&self, meta: &SessionMeta, text: &str) -> Result<()> {
        const CMD: &str = "remove page";

        let Ok(index) = text.trim().parse::<usize>() else {
            debug!(session_id = meta.session_id, "remove index is not a number");
            return self.reply(CMD, meta, MSG_WRONG_INPUT).await;
        };

        let Some(pages) = self.owned_pages(CMD, meta).await? else {
            self.sessions.clear(meta.session_id).await?;
            return self.reply(CMD, meta, MSG_NO_SAVED_PAGES).await;
        };

        let Some(page) = index.checked_sub(1).and_then(|i| pages.get(i)) else {
            debug!(
                session_id = meta.session_id,
                index,
                count = pages.len(),
                "remove index out of range"
            );
            return self.reply(CMD, meta, MSG_WRONG_INPUT).await;
        };

        self.pages.remove(page).await.map_err(Error::storage(CMD))?;
        self.sessions.clear(meta.session_id).await?;
        info!(
            session_id = meta.session_id,
            owner = %meta.owner,
            index,
            "page removed"
        );
        self.reply(CMD, meta, MSG_REMOVED).await
    }

    /// The owner's pages, `None` when nothing is saved.
    async fn owned_pages(&self, command: &'static str, meta: &SessionMeta) -> Result<Option<Vec<Page>>> {
        match self.pages.list(&meta.owner).await {
            Ok(pages) => Ok(Some(pages)),
            Err(StorageError::NoSavedPages) => Ok(None),
            Err(e) => Err(Error::storage(command)(e)),
        }
    }

    async fn reply(&self, command: &'static str, meta: &SessionMeta, text: &str) -> Result<()> {
        self.sender
            .send_text(meta.session_id, text)
            .await
            .map_err(Error::send(command))
    }
}

#[async_trait]
impl EventProcessor for Processor {
    async fn process(&self, event: Event) -> anyhow::Result<()> {
        Ok(self.handle(event).await?)
    }
}

/// Numbered listing, one `"{n}) {url}"` line per page, starting at 1.
pub fn format_pages(pages: &[Page]) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(i, page)| format!("{}) {}", i + 1, page.url))
        .collect::<Vec<_>>()
        .join("\n")
}
