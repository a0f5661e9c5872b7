//! Representative-image lookup for a single feed item.
//!
//! Feeds advertise images in at least six incompatible places. Strategies run
//! in a fixed priority order and the first non-empty URL wins:
//!
//! 1. `enclosure`
//! 2. `media:content`
//! 3. `media:group` > `media:content`
//! 4. `media:thumbnail`
//! 5. `<img src>` inside `content:encoded`
//! 6. `<img src>` inside `content`, then `description`

use regex::Regex;
use std::sync::LazyLock;

use super::document::{FieldValue, RawFeedItem};

static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]+src=["']([^"'>]+)["']"#).expect("static img regex is valid")
});

/// Returns the item's representative image URL, or `None` when the item has
/// no usable image anywhere.
pub fn extract_image(item: &RawFeedItem) -> Option<String> {
    from_enclosure(item)
        .or_else(|| from_media_content(item.get("media:content")))
        .or_else(|| from_media_group(item))
        .or_else(|| from_media_content(item.get("media:thumbnail")))
        .or_else(|| from_html_field(item, "content:encoded"))
        .or_else(|| from_html_field(item, "content"))
        .or_else(|| from_html_field(item, "description"))
}

fn from_enclosure(item: &RawFeedItem) -> Option<String> {
    item.get("enclosure")?
        .iter()
        .find_map(|enclosure| non_empty(enclosure.attr("url")))
}

/// `media:content` and `media:thumbnail` share a shape: a `url` attribute, or
/// a nested `url` element in feeds that spell it out.
fn from_media_content(field: Option<&FieldValue>) -> Option<String> {
    field?.iter().find_map(media_url)
}

fn media_url(entry: &FieldValue) -> Option<String> {
    non_empty(entry.attr("url")).or_else(|| non_empty(entry.child("url").and_then(FieldValue::text)))
}

fn from_media_group(item: &RawFeedItem) -> Option<String> {
    item.get("media:group")?
        .iter()
        .find_map(|group| from_media_content(group.child("media:content")))
}

fn from_html_field(item: &RawFeedItem, name: &str) -> Option<String> {
    let html = item.get(name)?.text()?;
    first_img_src(html)
}

/// `src` of the first `<img>` tag in an HTML fragment.
pub fn first_img_src(html: &str) -> Option<String> {
    IMG_SRC
        .captures(html)
        .and_then(|caps| caps.get(1))
        .and_then(|m| non_empty(Some(m.as_str())))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
