//! The unified article shape rendered on the homepage.
//!
//! Feed items and book posts both end up as [`NormalizedArticle`]. Fields are
//! copied as-is: nothing is validated, so any of them may be missing and the
//! presentation layer has to cope.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::cmp::Reverse;

use crate::feed::{extract_image, FieldValue, RawFeedItem};
use crate::storage::BookPost;

/// Publication label used for book posts unless configured otherwise.
pub const DEFAULT_SITE_LABEL: &str = "My Book Blog";

/// Item fields consulted for the author, in priority order.
const AUTHOR_FIELDS: &[&str] = &["dc:creator", "creator", "author"];

/// Item fields consulted for the publication date, in priority order.
const DATE_FIELDS: &[&str] = &["pubDate", "dc:date", "published", "updated"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedArticle {
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub publication_name: String,
    pub published_date: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
}

impl NormalizedArticle {
    /// Maps one raw feed item, tagging it with its feed's publication name.
    pub fn from_feed_item(item: &RawFeedItem, publication_name: &str) -> Self {
        Self {
            title: item.first_text(&["title"]).map(clean),
            subtitle: None,
            author: feed_author(item),
            publication_name: publication_name.to_string(),
            published_date: item.first_text(DATE_FIELDS).map(clean),
            url: feed_link(item),
            image_url: extract_image(item),
        }
    }

    /// Maps a stored book post; its URL points at the local post page.
    pub fn from_post(post: &BookPost, site_label: &str) -> Self {
        Self {
            title: Some(post.title.clone()),
            subtitle: post.subtitle.clone(),
            author: None,
            publication_name: site_label.to_string(),
            published_date: Some(post.published_date.clone()),
            url: Some(format!("/books/{}", post.slug)),
            image_url: post.image_url.clone(),
        }
    }

    /// Publication time as a Unix timestamp, if the date string parses.
    pub fn timestamp(&self) -> Option<i64> {
        self.published_date
            .as_deref()
            .and_then(parse_timestamp)
            .map(|dt| dt.timestamp())
    }
}

fn clean(text: &str) -> String {
    text.trim().to_string()
}

/// `dc:creator`, then a plain `author`, then an Atom `<author><name>`.
fn feed_author(item: &RawFeedItem) -> Option<String> {
    item.first_text(AUTHOR_FIELDS).map(clean).or_else(|| {
        item.get("author")?
            .iter()
            .find_map(|a| a.child("name").and_then(FieldValue::text))
            .filter(|name| !name.trim().is_empty())
            .map(clean)
    })
}

/// RSS `<link>` text, or the `href` of an Atom `<link>` (alternate first).
fn feed_link(item: &RawFeedItem) -> Option<String> {
    if let Some(text) = item.first_text(&["link"]) {
        return Some(clean(text));
    }

    let links = item.get("link")?;
    let alternate = links
        .iter()
        .find(|l| l.attr("rel").map_or(true, |rel| rel == "alternate"));
    alternate
        .or_else(|| links.iter().next())
        .and_then(|l| l.attr("href"))
        .filter(|href| !href.trim().is_empty())
        .map(clean)
}

/// Parses the date formats seen in feeds and in the posts table.
///
/// Accepts RFC 2822 (`Tue, 05 Mar 2024 10:00:00 GMT`), RFC 3339
/// (`2024-03-05T10:00:00Z`), `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD`. The last
/// two carry no zone and are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Sorts newest first. Undated or unparseable articles go last; ties keep
/// their incoming order.
pub fn sort_newest_first(articles: &mut [NormalizedArticle]) {
    // Option orders None below Some, so Reverse puts undated entries at the end
    articles.sort_by_cached_key(|a| Reverse(a.timestamp()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::parse_document;
    use pretty_assertions::assert_eq;

    fn article(title: &str, date: Option<&str>) -> NormalizedArticle {
        NormalizedArticle {
            title: Some(title.to_string()),
            published_date: date.map(str::to_string),
            publication_name: "Test".to_string(),
            ..NormalizedArticle::default()
        }
    }

    fn titles(articles: &[NormalizedArticle]) -> Vec<&str> {
        articles
            .iter()
            .map(|a| a.title.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_from_rss_item() {
        let rss = r#"<rss xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:media="http://search.yahoo.com/mrss/"><channel>
            <item>
              <title> Spacing kept out </title>
              <link>https://example.com/story</link>
              <pubDate>Tue, 05 Mar 2024 10:00:00 GMT</pubDate>
              <dc:creator>Jane Doe</dc:creator>
              <author>editor@example.com</author>
              <media:thumbnail url="https://img.example.com/t.jpg"/>
            </item>
        </channel></rss>"#;
        let doc = parse_document(rss.as_bytes()).unwrap();

        let got = NormalizedArticle::from_feed_item(&doc.items[0], "Example");
        assert_eq!(
            got,
            NormalizedArticle {
                title: Some("Spacing kept out".to_string()),
                subtitle: None,
                author: Some("Jane Doe".to_string()),
                publication_name: "Example".to_string(),
                published_date: Some("Tue, 05 Mar 2024 10:00:00 GMT".to_string()),
                url: Some("https://example.com/story".to_string()),
                image_url: Some("https://img.example.com/t.jpg".to_string()),
            }
        );
    }

    #[test]
    fn test_author_falls_back_to_author_field() {
        let rss = r#"<rss><channel><item><author>bob@example.com (Bob)</author></item></channel></rss>"#;
        let doc = parse_document(rss.as_bytes()).unwrap();
        let got = NormalizedArticle::from_feed_item(&doc.items[0], "X");
        assert_eq!(got.author.as_deref(), Some("bob@example.com (Bob)"));
    }

    #[test]
    fn test_from_atom_entry() {
        let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom">
          <title>Atom Source</title>
          <entry>
            <title>Entry</title>
            <link rel="enclosure" href="https://example.com/audio.mp3"/>
            <link rel="alternate" href="https://example.com/entry"/>
            <updated>2024-03-05T10:00:00Z</updated>
            <author><name>Sam</name></author>
          </entry>
        </feed>"#;
        let doc = parse_document(atom.as_bytes()).unwrap();
        let got = NormalizedArticle::from_feed_item(&doc.items[0], "Atom Source");
        assert_eq!(got.url.as_deref(), Some("https://example.com/entry"));
        assert_eq!(got.author.as_deref(), Some("Sam"));
        assert_eq!(got.published_date.as_deref(), Some("2024-03-05T10:00:00Z"));
    }

    #[test]
    fn test_missing_fields_stay_none() {
        let doc = parse_document(b"<rss><channel><item><guid>1</guid></item></channel></rss>").unwrap();
        let got = NormalizedArticle::from_feed_item(&doc.items[0], "Bare");
        assert_eq!(
            got,
            NormalizedArticle {
                publication_name: "Bare".to_string(),
                ..NormalizedArticle::default()
            }
        );
    }

    #[test]
    fn test_from_post() {
        let post = BookPost {
            id: 7,
            title: "Piranesi".to_string(),
            subtitle: Some("A house of endless halls".to_string()),
            slug: "piranesi".to_string(),
            content: Some("Review body".to_string()),
            image_url: Some("/uploads/book-covers/abc.jpg".to_string()),
            published_date: "2024-03-02".to_string(),
            kind: crate::storage::PostKind::Book,
            created_at: None,
            updated_at: None,
        };
        let got = NormalizedArticle::from_post(&post, DEFAULT_SITE_LABEL);
        assert_eq!(got.publication_name, "My Book Blog");
        assert_eq!(got.url.as_deref(), Some("/books/piranesi"));
        assert_eq!(got.subtitle.as_deref(), Some("A house of endless halls"));
        assert_eq!(got.image_url.as_deref(), Some("/uploads/book-covers/abc.jpg"));
        assert_eq!(got.timestamp(), Some(1709337600));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = 1709632800; // 2024-03-05T10:00:00Z
        assert_eq!(
            parse_timestamp("Tue, 05 Mar 2024 10:00:00 GMT").map(|d| d.timestamp()),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp("Tue, 05 Mar 2024 11:00:00 +0100").map(|d| d.timestamp()),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp("2024-03-05T10:00:00Z").map(|d| d.timestamp()),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp("2024-03-05 10:00:00").map(|d| d.timestamp()),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(" 2024-03-05 ").map(|d| d.timestamp()),
            Some(expected - 10 * 3600)
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut articles = vec![
            article("old", Some("Mon, 01 Jan 2024 00:00:00 GMT")),
            article("new", Some("2024-06-01T00:00:00Z")),
            article("middle", Some("2024-03-01")),
        ];
        sort_newest_first(&mut articles);
        assert_eq!(titles(&articles), vec!["new", "middle", "old"]);
    }

    #[test]
    fn test_sort_puts_undated_last_in_stable_order() {
        let mut articles = vec![
            article("no-date-a", None),
            article("dated", Some("2020-01-01")),
            article("garbage-date", Some("not a date")),
            article("no-date-b", None),
        ];
        sort_newest_first(&mut articles);
        assert_eq!(
            titles(&articles),
            vec!["dated", "no-date-a", "garbage-date", "no-date-b"]
        );
    }

    #[test]
    fn test_sort_ties_keep_input_order() {
        let same = Some("2024-03-01");
        let mut articles = vec![article("first", same), article("second", same)];
        sort_newest_first(&mut articles);
        assert_eq!(titles(&articles), vec!["first", "second"]);
    }
}
