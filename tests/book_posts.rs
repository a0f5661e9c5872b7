//! Integration tests for the posts table: seeding, CRUD and listing.
//!
//! Each test creates its own in-memory SQLite database for isolation.

use folio::storage::{Database, DatabaseError, PostFields, PostKind};
use pretty_assertions::assert_eq;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn fields(title: &str, slug: &str, date: &str) -> PostFields {
    PostFields {
        title: title.to_string(),
        slug: slug.to_string(),
        published_date: date.to_string(),
        ..PostFields::default()
    }
}

fn slugs(posts: &[folio::storage::BookPost]) -> Vec<&str> {
    posts.iter().map(|p| p.slug.as_str()).collect()
}

// ============================================================================
// Migration / Seeding Tests
// ============================================================================

#[tokio::test]
async fn test_fresh_database_has_seeded_pages() {
    let db = test_db().await;

    let pages = db.list_pages().await.unwrap();
    assert_eq!(slugs(&pages), vec!["about", "contact", "reading"]);
    assert!(pages.iter().all(|p| p.kind == PostKind::Page));
    assert!(pages
        .iter()
        .all(|p| p.content.as_deref() == Some("Content coming soon...")));

    let about = db.find_post_by_slug("about").await.unwrap().unwrap();
    assert_eq!(about.title, "Who's Writing This?");
}

#[tokio::test]
async fn test_reopening_file_database_does_not_duplicate_pages() {
    let dir = std::env::temp_dir().join("folio_test_reopen");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("posts.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::open(path).await.unwrap();
        let about = db.find_post_by_slug("about").await.unwrap().unwrap();
        let edited = PostFields {
            content: Some("Edited".to_string()),
            ..fields(&about.title, "about", &about.published_date)
        };
        db.update_post(about.id, &edited).await.unwrap();
    }

    let db = Database::open(path).await.unwrap();
    let pages = db.list_pages().await.unwrap();
    assert_eq!(pages.len(), 3);
    // Seeding must not overwrite edited pages
    let about = db.find_post_by_slug("about").await.unwrap().unwrap();
    assert_eq!(about.content.as_deref(), Some("Edited"));

    std::fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// CRUD Tests
// ============================================================================

#[tokio::test]
async fn test_create_and_find() {
    let db = test_db().await;

    let input = PostFields {
        subtitle: Some("A novel".to_string()),
        content: Some("Review text".to_string()),
        image_url: Some("/uploads/book-covers/abc.jpg".to_string()),
        ..fields("Piranesi", "piranesi", "2024-03-02")
    };
    let created = db.create_post(&input, PostKind::Book).await.unwrap();

    assert_eq!(created.title, "Piranesi");
    assert_eq!(created.subtitle.as_deref(), Some("A novel"));
    assert_eq!(created.kind, PostKind::Book);
    assert!(created.created_at.is_some());

    let by_id = db.find_post_by_id(created.id).await.unwrap().unwrap();
    let by_slug = db.find_post_by_slug("piranesi").await.unwrap().unwrap();
    assert_eq!(by_id, created);
    assert_eq!(by_slug, created);
}

#[tokio::test]
async fn test_duplicate_slug_rejected() {
    let db = test_db().await;

    db.create_post(&fields("Dune", "dune", "2024-01-01"), PostKind::Book)
        .await
        .unwrap();
    let err = db
        .create_post(&fields("Dune again", "dune", "2024-02-01"), PostKind::Book)
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::DuplicateSlug(ref s) if s == "dune"));

    // Pages share the slug namespace
    let err = db
        .create_post(&fields("About", "about", "2024-02-01"), PostKind::Book)
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::DuplicateSlug(_)));
}

#[tokio::test]
async fn test_update_overwrites_fields() {
    let db = test_db().await;

    let created = db
        .create_post(
            &PostFields {
                subtitle: Some("old".to_string()),
                ..fields("Old", "old", "2024-01-01")
            },
            PostKind::Book,
        )
        .await
        .unwrap();

    let updated = db
        .update_post(created.id, &fields("New", "new", "2024-02-02"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, "New");
    assert_eq!(updated.slug, "new");
    assert_eq!(updated.published_date, "2024-02-02");
    assert!(updated.subtitle.is_none());
    assert_eq!(updated.kind, PostKind::Book);
    assert!(db.find_post_by_slug("old").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_missing_returns_none() {
    let db = test_db().await;
    let result = db
        .update_post(4242, &fields("X", "x", "2024-01-01"))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_update_into_taken_slug_rejected() {
    let db = test_db().await;
    db.create_post(&fields("A", "a", "2024-01-01"), PostKind::Book)
        .await
        .unwrap();
    let b = db
        .create_post(&fields("B", "b", "2024-01-01"), PostKind::Book)
        .await
        .unwrap();

    let err = db
        .update_post(b.id, &fields("A", "a", "2024-01-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::DuplicateSlug(_)));
}

#[tokio::test]
async fn test_delete() {
    let db = test_db().await;
    let created = db
        .create_post(&fields("Temp", "temp", "2024-01-01"), PostKind::Book)
        .await
        .unwrap();

    assert!(db.delete_post(created.id).await.unwrap());
    assert!(!db.delete_post(created.id).await.unwrap());
    assert!(db.find_post_by_id(created.id).await.unwrap().is_none());
}

// ============================================================================
// Listing Tests
// ============================================================================

#[tokio::test]
async fn test_list_articles_excludes_pages_newest_first() {
    let db = test_db().await;
    for (title, slug, date) in [
        ("Middle", "middle", "2024-02-01"),
        ("Oldest", "oldest", "2023-12-31"),
        ("Newest", "newest", "2024-03-15"),
    ] {
        db.create_post(&fields(title, slug, date), PostKind::Book)
            .await
            .unwrap();
    }

    let articles = db.list_articles().await.unwrap();
    assert_eq!(slugs(&articles), vec!["newest", "middle", "oldest"]);

    let all = db.find_all_posts().await.unwrap();
    assert_eq!(all.len(), 6);
}

#[tokio::test]
async fn test_count_posts_with_image() {
    let db = test_db().await;
    let cover = "/uploads/book-covers/abc.png";
    for slug in ["one", "two"] {
        let input = PostFields {
            image_url: Some(cover.to_string()),
            ..fields(slug, slug, "2024-01-01")
        };
        db.create_post(&input, PostKind::Book).await.unwrap();
    }

    assert_eq!(db.count_posts_with_image(cover).await.unwrap(), 2);
    assert_eq!(
        db.count_posts_with_image("/uploads/book-covers/other.png")
            .await
            .unwrap(),
        0
    );

    let one = db.find_post_by_slug("one").await.unwrap().unwrap();
    db.delete_post(one.id).await.unwrap();
    assert_eq!(db.count_posts_with_image(cover).await.unwrap(), 1);
}
