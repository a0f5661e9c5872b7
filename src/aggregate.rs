//! Homepage aggregation: every configured feed plus the local book posts,
//! merged into one newest-first list.
//!
//! Sources are independent. A feed that fails to fetch or parse is logged
//! and contributes nothing; it never hides the other feeds or the posts.

use futures::stream::{self, StreamExt};

use crate::article::{sort_newest_first, NormalizedArticle};
use crate::config::Config;
use crate::feed::{publication_name, FeedClient, FetchError};
use crate::storage::{Database, DatabaseError};

/// One feed URL to aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource(String);

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }
}

/// Fetches and normalizes a fixed list of feed sources.
#[derive(Debug, Clone)]
pub struct Aggregator {
    client: FeedClient,
    sources: Vec<FeedSource>,
    concurrency: usize,
}

impl Aggregator {
    /// `concurrency` is clamped to at least 1.
    pub fn new(client: FeedClient, sources: Vec<FeedSource>, concurrency: usize) -> Self {
        Self {
            client,
            sources,
            concurrency: concurrency.max(1),
        }
    }

    /// Builds an aggregator from the validated feed list and fetch limits.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let client = FeedClient::new(config.fetch_timeout(), config.max_feed_bytes)?;
        Ok(Self::new(
            client,
            config.feed_sources(),
            config.max_concurrent_fetches,
        ))
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    /// Fetches every source, appends `db_articles`, and sorts newest first.
    ///
    /// Fetches run up to `concurrency` at a time but results are kept in
    /// source order, so the final sort sees the same input regardless of
    /// which server answers first.
    pub async fn aggregate(&self, db_articles: Vec<NormalizedArticle>) -> Vec<NormalizedArticle> {
        let per_source: Vec<Vec<NormalizedArticle>> = stream::iter(&self.sources)
            .map(|source| self.fetch_source(source))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut articles: Vec<NormalizedArticle> =
            per_source.into_iter().flatten().chain(db_articles).collect();

        sort_newest_first(&mut articles);
        tracing::debug!(
            sources = self.sources.len(),
            articles = articles.len(),
            "Aggregated homepage feed"
        );
        articles
    }

    async fn fetch_source(&self, source: &FeedSource) -> Vec<NormalizedArticle> {
        match self.client.fetch(source.url()).await {
            Ok(doc) => {
                let name = publication_name(&doc);
                doc.items
                    .iter()
                    .map(|item| NormalizedArticle::from_feed_item(item, &name))
                    .collect()
            }
            Err(e) => {
                tracing::warn!(feed = %source.url(), error = %e, "Failed to fetch RSS feed");
                Vec::new()
            }
        }
    }
}

/// Builds the homepage list: stored book posts (pages excluded) merged with
/// every feed.
///
/// # Errors
///
/// A store read failure is returned as-is; feed failures never are.
pub async fn home_feed(
    db: &Database,
    aggregator: &Aggregator,
    site_label: &str,
) -> Result<Vec<NormalizedArticle>, DatabaseError> {
    let posts = db.list_articles().await?;
    let db_articles = posts
        .iter()
        .map(|post| NormalizedArticle::from_post(post, site_label))
        .collect();

    Ok(aggregator.aggregate(db_articles).await)
}
