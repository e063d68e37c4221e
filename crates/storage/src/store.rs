use std::sync::Mutex;

use {
    async_trait::async_trait,
    rand::seq::IndexedRandom,
    tracing::debug,
};

#[cfg(feature = "metrics")]
use pagekeeper_metrics::{counter, storage as storage_metrics};

use crate::{Error, Result, error::Context, page::Page};

/// Durable page CRUD keyed by `(url, owner)`.
///
/// Implementations must be safe for concurrent independent use: the consumer
/// runs one task per inbound event and each may call into the store.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Persist `page`. Saving a page that already exists is a no-op.
    async fn save(&self, page: &Page) -> Result<()>;

    async fn exists(&self, page: &Page) -> Result<bool>;

    /// All pages of `owner` in the order they were saved.
    ///
    /// Fails with [`Error::NoSavedPages`] when there are none.
    async fn list(&self, owner: &str) -> Result<Vec<Page>>;

    /// One page of `owner`, chosen uniformly at random. The page stays stored;
    /// drawing it for good is up to the caller.
    ///
    /// Fails with [`Error::NoSavedPages`] when there are none.
    async fn pick_random(&self, owner: &str) -> Result<Page>;

    /// Delete `page`. Removing a page that does not exist is a no-op.
    async fn remove(&self, page: &Page) -> Result<()>;
}

// ── SQLite-backed implementation ────────────────────────────────────

/// Stores pages in a SQLite database.
pub struct SqlitePageStore {
    pool: sqlx::SqlitePool,
}

impl SqlitePageStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `url` and migrate it.
    ///
    /// `url` is anything sqlx accepts, e.g. `sqlite:pages.db` or
    /// `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self> {
        use {sqlx::sqlite::SqliteConnectOptions, std::str::FromStr};

        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url `{url}`"))?
            .create_if_missing(true);
        // Every connection to `:memory:` is its own database, so keep exactly one alive.
        let in_memory = url.contains(":memory:");
        let mut pool_options = sqlx::sqlite::SqlitePoolOptions::new();
        if in_memory {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;
        crate::run_migrations(&pool).await?;
        debug!(url, "page store ready");
        Ok(Self::new(pool))
    }

    /// Insert `page` unless it is already stored. Returns whether a row was
    /// written.
    async fn insert(&self, page: &Page) -> Result<bool> {
        let result = sqlx::query(
            r#"INSERT INTO pages (hash, url, owner, created_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(hash) DO NOTHING"#,
        )
        .bind(page.hash())
        .bind(&page.url)
        .bind(&page.owner)
        .bind(pagekeeper_common::time::now_ms())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PageStore for SqlitePageStore {
    async fn save(&self, page: &Page) -> Result<()> {
        if self.insert(page).await? {
            debug!(owner = %page.owner, "page saved");
            #[cfg(feature = "metrics")]
            counter!(storage_metrics::PAGES_SAVED_TOTAL).increment(1);
        }
        Ok(())
    }

    async fn exists(&self, page: &Page) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pages WHERE hash = ?")
            .bind(page.hash())
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn list(&self, owner: &str) -> Result<Vec<Page>> {
        let rows = sqlx::query_as::<_, PageRow>(
            "SELECT url, owner FROM pages WHERE owner = ? ORDER BY created_at, rowid",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        if rows.is_empty() {
            return Err(Error::NoSavedPages);
        }
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn pick_random(&self, owner: &str) -> Result<Page> {
        let row = sqlx::query_as::<_, PageRow>(
            "SELECT url, owner FROM pages WHERE owner = ? ORDER BY RANDOM() LIMIT 1",
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Into::into).ok_or(Error::NoSavedPages)
    }

    async fn remove(&self, page: &Page) -> Result<()> {
        let removed = sqlx::query("DELETE FROM pages WHERE hash = ?")
            .bind(page.hash())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if removed > 0 {
            debug!(owner = %page.owner, "page removed");
            #[cfg(feature = "metrics")]
            counter!(storage_metrics::PAGES_REMOVED_TOTAL).increment(removed);
        }
        Ok(())
    }
}

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct PageRow {
    url: String,
    owner: String,
}

impl From<PageRow> for Page {
    fn from(r: PageRow) -> Self {
        Self {
            url: r.url,
            owner: r.owner,
        }
    }
}

// ── In-memory implementation ────────────────────────────────────────

/// Keeps pages in a vector in save order. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryPageStore {
    pages: Mutex<Vec<Page>>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, skipping duplicates.
    pub fn with_pages(pages: impl IntoIterator<Item = Page>) -> Self {
        let store = Self::new();
        {
            let mut stored = store.lock();
            for page in pages {
                if !stored.contains(&page) {
                    stored.push(page);
                }
            }
        }
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Page>> {
        self.pages.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of stored pages across all owners.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn save(&self, page: &Page) -> Result<()> {
        let mut pages = self.lock();
        if !pages.contains(page) {
            pages.push(page.clone());
        }
        Ok(())
    }

    async fn exists(&self, page: &Page) -> Result<bool> {
        Ok(self.lock().contains(page))
    }

    async fn list(&self, owner: &str) -> Result<Vec<Page>> {
        let pages: Vec<Page> = self
            .lock()
            .iter()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect();
        if pages.is_empty() {
            return Err(Error::NoSavedPages);
        }
        Ok(pages)
    }

    async fn pick_random(&self, owner: &str) -> Result<Page> {
        let pages = self.lock();
        let owned: Vec<&Page> = pages.iter().filter(|p| p.owner == owner).collect();
        owned
            .choose(&mut rand::rng())
            .map(|p| (*p).clone())
            .ok_or(Error::NoSavedPages)
    }

    async fn remove(&self, page: &Page) -> Result<()> {
        self.lock().retain(|p| p != page);
        Ok(())
    }
}
