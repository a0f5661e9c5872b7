use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a lock on the database file
    #[error("Database is locked by another process. Please close it and try again.")]
    Locked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A post with this slug already exists
    #[error("A post with slug '{0}' already exists")]
    DuplicateSlug(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify a sqlx error, mapping lock conditions to [`DatabaseError::Locked`]
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
        {
            return DatabaseError::Locked;
        }

        DatabaseError::Other(err)
    }

    /// Classify a write error, turning UNIQUE(slug) violations into
    /// [`DatabaseError::DuplicateSlug`]
    pub(crate) fn from_write(err: sqlx::Error, slug: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return DatabaseError::DuplicateSlug(slug.to_string());
            }
        }
        Self::from_sqlx(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// Distinguishes homepage posts from static pages sharing the same table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostKind {
    #[default]
    Book,
    Page,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Book => "book",
            PostKind::Page => "page",
        }
    }

    /// Anything other than `page` is treated as a regular post.
    pub(crate) fn from_column(value: &str) -> Self {
        if value == "page" {
            PostKind::Page
        } else {
            PostKind::Book
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the `book_posts` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookPost {
    pub id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub slug: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    /// `YYYY-MM-DD` for posts created through the admin operations
    pub published_date: String,
    pub kind: PostKind,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Column values for inserting or updating a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFields {
    pub title: String,
    pub subtitle: Option<String>,
    pub slug: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub published_date: String,
}

/// Internal row type for post queries (used by sqlx FromRow)
/// Converts to BookPost via into_post()
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostDbRow {
    pub id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub slug: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub published_date: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl PostDbRow {
    pub(crate) fn into_post(self) -> BookPost {
        BookPost {
            id: self.id,
            title: self.title,
            subtitle: self.subtitle,
            slug: self.slug,
            content: self.content,
            image_url: self.image_url,
            published_date: self.published_date,
            kind: PostKind::from_column(&self.kind),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
