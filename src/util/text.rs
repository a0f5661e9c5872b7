use std::borrow::Cow;

/// Builds a URL-safe slug from a post title.
///
/// Lowercases the title, drops everything except ASCII word characters,
/// whitespace and hyphens, then joins the remaining words with single
/// hyphens. Leading and trailing hyphens are removed.
///
/// # Examples
///
/// ```
/// use folio::util::slugify;
///
/// assert_eq!(slugify("The Left Hand of Darkness"), "the-left-hand-of-darkness");
/// assert_eq!(slugify("Who's Writing This?"), "whos-writing-this");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
        // Everything else is dropped without breaking the current word
    }

    slug
}

/// Removes control characters from feed-supplied text before it is printed
/// to a terminal. Newlines and tabs are kept.
///
/// Returns `Cow::Borrowed` when nothing needs removing.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|c| !is_stripped(*c)).collect())
}

fn is_stripped(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\t'
}
