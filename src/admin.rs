//! Post and page management behind the `folio posts` commands.
//!
//! These operations sit between raw form input and the store: they validate
//! the form, derive slugs, and keep cover images in the [`ImageStore`] in step
//! with the rows that reference them.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use crate::images::{ImageStore, ImageStoreError};
use crate::storage::{BookPost, Database, DatabaseError, PostFields, PostKind};
use crate::util::slugify;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("No post with id {0}")]
    NotFound(i64),

    #[error("No page with slug '{0}'")]
    PageNotFound(String),

    #[error("Invalid post: {0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Image(#[from] ImageStoreError),
}

/// Raw input for creating or editing a post.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub title: String,
    pub subtitle: Option<String>,
    /// `YYYY-MM-DD`
    pub published_date: String,
    pub content: Option<String>,
    /// Local file to upload as the cover image
    pub image: Option<PathBuf>,
}

impl PostForm {
    /// Validates the form and converts it to column values.
    ///
    /// `image_url` is left empty; callers fill it in after any upload.
    fn to_fields(&self, slug: Option<&str>) -> Result<PostFields, AdminError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AdminError::Validation("title is required".to_string()));
        }

        let date = self.published_date.trim();
        if !is_iso_date(date) {
            return Err(AdminError::Validation(format!(
                "published date '{date}' is not in YYYY-MM-DD format"
            )));
        }

        let slug = match slug {
            Some(existing) => existing.to_string(),
            None => slugify(title),
        };
        if slug.is_empty() {
            return Err(AdminError::Validation(format!(
                "title '{title}' does not produce a usable slug"
            )));
        }

        Ok(PostFields {
            title: title.to_string(),
            subtitle: non_empty(self.subtitle.as_deref()),
            slug,
            content: non_empty(self.content.as_deref()),
            image_url: None,
            published_date: date.to_string(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_iso_date(value: &str) -> bool {
    // chrono accepts unpadded months and days, so pin the length as well
    value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Creates a book post, uploading its cover image first if one is given.
pub async fn create_post(
    db: &Database,
    images: &ImageStore,
    form: &PostForm,
) -> Result<BookPost, AdminError> {
    let mut fields = form.to_fields(None)?;

    if let Some(path) = &form.image {
        fields.image_url = Some(images.upload(path).await?);
    }

    let post = match db.create_post(&fields, PostKind::Book).await {
        Ok(post) => post,
        Err(e) => {
            if let Some(url) = fields.image_url.as_deref() {
                release_image(db, images, url).await;
            }
            return Err(e.into());
        }
    };
    tracing::info!(id = post.id, slug = %post.slug, "Created book post");
    Ok(post)
}

/// Updates a post or page.
///
/// Book posts get a fresh slug from the new title; pages keep theirs so their
/// addresses stay stable. A new image replaces the old one; the old file is
/// deleted only when no other post shares it, and failures there are logged
/// rather than returned.
pub async fn update_post(
    db: &Database,
    images: &ImageStore,
    id: i64,
    form: &PostForm,
) -> Result<BookPost, AdminError> {
    let existing = db
        .find_post_by_id(id)
        .await?
        .ok_or(AdminError::NotFound(id))?;

    let keep_slug = (existing.kind == PostKind::Page).then_some(existing.slug.as_str());
    let mut fields = form.to_fields(keep_slug)?;
    fields.image_url = existing.image_url.clone();

    let uploaded = match &form.image {
        Some(path) => Some(images.upload(path).await?),
        None => None,
    };
    if let Some(url) = &uploaded {
        fields.image_url = Some(url.clone());
    }

    let post = match db.update_post(id, &fields).await {
        Ok(Some(post)) => post,
        outcome => {
            if let Some(url) = uploaded.as_deref() {
                release_image(db, images, url).await;
            }
            return Err(match outcome {
                Err(e) => e.into(),
                Ok(None) => AdminError::NotFound(id),
                Ok(Some(_)) => unreachable!("handled by the outer match"),
            });
        }
    };
    tracing::info!(id = post.id, slug = %post.slug, "Updated post");

    if let Some(old_url) = existing.image_url.as_deref() {
        if post.image_url.as_deref() != Some(old_url) {
            release_image(db, images, old_url).await;
        }
    }
    Ok(post)
}

/// Deletes a post and its stored cover image.
pub async fn delete_post(
    db: &Database,
    images: &ImageStore,
    id: i64,
) -> Result<(), AdminError> {
    let existing = db
        .find_post_by_id(id)
        .await?
        .ok_or(AdminError::NotFound(id))?;

    if !db.delete_post(id).await? {
        return Err(AdminError::NotFound(id));
    }
    tracing::info!(id = id, slug = %existing.slug, "Deleted post");

    if let Some(url) = existing.image_url.as_deref() {
        release_image(db, images, url).await;
    }
    Ok(())
}

/// Looks up a static page (about, contact, reading) by slug.
pub async fn page(db: &Database, slug: &str) -> Result<BookPost, AdminError> {
    db.find_post_by_slug(slug)
        .await?
        .filter(|post| post.kind == PostKind::Page)
        .ok_or_else(|| AdminError::PageNotFound(slug.to_string()))
}

/// Deletes a stored cover once no post references it.
///
/// Identical uploads share one content-addressed file, so a cover is only
/// garbage once its last reference is gone. Failures are logged, never
/// returned.
async fn release_image(db: &Database, images: &ImageStore, url: &str) {
    if !images.owns(url) {
        return;
    }

    match db.count_posts_with_image(url).await {
        Ok(0) => {
            if let Err(e) = images.remove(url).await {
                tracing::warn!(image = %url, error = %e, "Failed to remove image");
            }
        }
        Ok(refs) => {
            tracing::debug!(image = %url, refs = refs, "Image still in use, keeping it");
        }
        Err(e) => {
            tracing::warn!(
                image = %url,
                error = %e,
                "Failed to check image references, keeping it"
            );
        }
    }
}
