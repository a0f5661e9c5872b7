use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::DatabaseError;

/// Static pages created on first start. Their content is edited later through
/// the regular post update operation.
const SEED_PAGES: &[(&str, &str)] = &[
    ("about", "Who's Writing This?"),
    ("contact", "Can I Email Her?"),
    ("reading", "What Else Is She Reading?"),
];

const SEED_PAGE_CONTENT: &str = "Content coming soon...";

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// `":memory:"` opens a private in-memory database, used by tests.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Locked` if another process holds the database
    /// lock, `DatabaseError::Migration` if the schema could not be brought up
    /// to date, and `DatabaseError::Other` for other database errors.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let in_memory = path == ":memory:";
        let url = format!("sqlite:{}?mode=rwc", path);

        // SEC-010: Pre-create the DB file with user-only permissions
        #[cfg(unix)]
        if !in_memory && !std::path::Path::new(path).exists() {
            use std::os::unix::fs::OpenOptionsExt;
            // If creation fails, SQLite will report the error at connect_with
            let _ = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(0o600)
                .open(path);
        }

        // busy_timeout=5000: wait up to 5 seconds for locks held by another
        // process (e.g. an admin command running during a homepage build)
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000")
            .foreign_keys(true);

        // Every connection to ":memory:" is a separate database, so tests get
        // exactly one connection that is never recycled
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            let error_string = e.to_string().to_lowercase();
            if error_string.contains("database is locked") || error_string.contains("sqlite_busy")
            {
                DatabaseError::Locked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        Ok(db)
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// Creates the `book_posts` table, adds the `type` column to databases
    /// created before pages existed, and seeds the static pages. Every step is
    /// idempotent, so re-running on an up-to-date database is a no-op.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS book_posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                subtitle TEXT,
                slug TEXT UNIQUE NOT NULL,
                content TEXT,
                image_url TEXT,
                published_date TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        let (has_type,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pragma_table_info('book_posts') WHERE name = 'type'",
        )
        .fetch_one(&mut *tx)
        .await?;

        if has_type == 0 {
            sqlx::query("ALTER TABLE book_posts ADD COLUMN type TEXT NOT NULL DEFAULT 'book'")
                .execute(&mut *tx)
                .await?;
            tracing::info!("Added type column to book_posts table");
        }

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_book_posts_published ON book_posts(published_date DESC)",
        )
        .execute(&mut *tx)
        .await?;

        for (slug, title) in SEED_PAGES {
            let result = sqlx::query(
                r#"
                INSERT INTO book_posts (title, slug, type, published_date, content)
                VALUES (?, ?, 'page', date('now'), ?)
                ON CONFLICT(slug) DO NOTHING
            "#,
            )
            .bind(title)
            .bind(slug)
            .bind(SEED_PAGE_CONTENT)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                tracing::info!(slug = %slug, title = %title, "Seeded page");
            } else {
                tracing::debug!(slug = %slug, "Page already exists");
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
