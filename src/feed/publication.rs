use super::document::FeedDocument;

const UNKNOWN_PUBLICATION: &str = "Unknown";

/// Derives a short publication name from a feed's channel metadata.
///
/// Uses the feed title, then the feed link, then `"Unknown"`. Boilerplate
/// after the first `>` is dropped (`"NYT > Top Stories"` becomes `"NYT"`);
/// only when there is no `>` is the text after the first `-` dropped
/// (`"Ars Technica - Tech"` becomes `"Ars Technica"`).
pub fn publication_name(doc: &FeedDocument) -> String {
    let candidate = [doc.title.as_deref(), doc.link.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .unwrap_or(UNKNOWN_PUBLICATION);

    let name = if let Some((head, _)) = candidate.split_once('>') {
        head
    } else if let Some((head, _)) = candidate.split_once('-') {
        head
    } else {
        candidate
    };

    name.trim().to_string()
}
