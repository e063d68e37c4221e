//! Saved pages, keyed by `(url, owner)`.
//!
//! [`PageStore`] is the capability the command processor uses; SQLite is the
//! durable backend, the in-memory one serves tests and throwaway runs.

pub mod error;
pub mod page;
pub mod store;

pub use {
    error::{Error, Result},
    page::Page,
    store::{MemoryPageStore, PageStore, SqlitePageStore},
};

/// Run database migrations for the pages table.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
