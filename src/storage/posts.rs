use super::schema::Database;
use super::types::{BookPost, DatabaseError, PostDbRow, PostFields, PostKind};

const POST_COLUMNS: &str = "id, title, subtitle, slug, content, image_url, published_date, \
                            type, created_at, updated_at";

impl Database {
    // ========================================================================
    // Post Writes
    // ========================================================================

    /// Insert a new post of the given kind and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::DuplicateSlug`] if the slug is already taken.
    pub async fn create_post(
        &self,
        fields: &PostFields,
        kind: PostKind,
    ) -> Result<BookPost, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO book_posts (title, subtitle, slug, content, image_url, published_date, type)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&fields.title)
        .bind(&fields.subtitle)
        .bind(&fields.slug)
        .bind(&fields.content)
        .bind(&fields.image_url)
        .bind(&fields.published_date)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, &fields.slug))?;

        let id = result.last_insert_rowid();
        tracing::debug!(id = id, slug = %fields.slug, kind = %kind, "Created post");

        self.find_post_by_id(id)
            .await?
            .ok_or(DatabaseError::Other(sqlx::Error::RowNotFound))
    }

    /// Overwrite a post's editable columns and bump `updated_at`.
    ///
    /// Returns `None` when no post has this ID. The post's kind is unchanged.
    pub async fn update_post(
        &self,
        id: i64,
        fields: &PostFields,
    ) -> Result<Option<BookPost>, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE book_posts
            SET title = ?, subtitle = ?, slug = ?, content = ?, image_url = ?,
                published_date = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
        "#,
        )
        .bind(&fields.title)
        .bind(&fields.subtitle)
        .bind(&fields.slug)
        .bind(&fields.content)
        .bind(&fields.image_url)
        .bind(&fields.published_date)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, &fields.slug))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_post_by_id(id).await
    }

    /// Delete a post. Returns `true` if a row was removed.
    pub async fn delete_post(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM book_posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Post Queries
    // ========================================================================

    /// All posts and pages, newest first.
    pub async fn find_all_posts(&self) -> Result<Vec<BookPost>, DatabaseError> {
        self.fetch_posts(&format!(
            "SELECT {POST_COLUMNS} FROM book_posts ORDER BY published_date DESC, id DESC"
        ))
        .await
    }

    /// Posts shown on the homepage (everything except static pages), newest first.
    pub async fn list_articles(&self) -> Result<Vec<BookPost>, DatabaseError> {
        self.fetch_posts(&format!(
            "SELECT {POST_COLUMNS} FROM book_posts WHERE type != 'page' \
             ORDER BY published_date DESC, id DESC"
        ))
        .await
    }

    /// Static pages, ordered by slug.
    pub async fn list_pages(&self) -> Result<Vec<BookPost>, DatabaseError> {
        self.fetch_posts(&format!(
            "SELECT {POST_COLUMNS} FROM book_posts WHERE type = 'page' ORDER BY slug"
        ))
        .await
    }

    pub async fn find_post_by_id(&self, id: i64) -> Result<Option<BookPost>, DatabaseError> {
        let row = sqlx::query_as::<_, PostDbRow>(&format!(
            "SELECT {POST_COLUMNS} FROM book_posts WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(row.map(PostDbRow::into_post))
    }

    pub async fn find_post_by_slug(&self, slug: &str) -> Result<Option<BookPost>, DatabaseError> {
        let row = sqlx::query_as::<_, PostDbRow>(&format!(
            "SELECT {POST_COLUMNS} FROM book_posts WHERE slug = ?"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(row.map(PostDbRow::into_post))
    }

    /// Number of posts whose cover is `image_url`.
    pub async fn count_posts_with_image(&self, image_url: &str) -> Result<i64, DatabaseError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM book_posts WHERE image_url = ?")
                .bind(image_url)
                .fetch_one(&self.pool)
                .await
                .map_err(DatabaseError::from_sqlx)?;
        Ok(count)
    }

    async fn fetch_posts(&self, sql: &str) -> Result<Vec<BookPost>, DatabaseError> {
        let rows = sqlx::query_as::<_, PostDbRow>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        Ok(rows.into_iter().map(PostDbRow::into_post).collect())
    }
}
