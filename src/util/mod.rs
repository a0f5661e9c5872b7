//! Small helpers shared by the admin and feed layers.
//!
//! - **Slugs**: URL-safe identifiers derived from post titles
//! - **Terminal text**: control-character stripping for feed-supplied strings
//! - **URL validation**: feed source checks applied at configuration load

mod text;
mod url_validator;

pub use text::{slugify, strip_control_chars};
pub use url_validator::{validate_url, UrlValidationError};
