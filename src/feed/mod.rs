//! Feed ingestion: fetching, dialect-agnostic parsing and per-item extraction.
//!
//! This module provides the leaf stages of the homepage pipeline:
//!
//! - **Fetching**: one bounded HTTP request per feed source, no retries
//! - **Parsing**: RSS 2.0, RSS 1.0 (RDF) and Atom into a single raw shape that
//!   keeps every extension field
//! - **Publication names**: short source labels from channel metadata
//! - **Images**: prioritized lookup across six media/HTML locations
//!
//! # Architecture
//!
//! - [`document`] - XML reader producing [`FeedDocument`] / [`RawFeedItem`]
//! - [`fetcher`] - HTTP client with timeout and size limits
//! - [`publication`] - publication-name normalization
//! - [`image`] - representative-image extraction
//!
//! # Example
//!
//! ```ignore
//! use folio::feed::{extract_image, publication_name, FeedClient};
//!
//! let doc = client.fetch("https://hnrss.org/frontpage").await?;
//! let source = publication_name(&doc);
//! let images: Vec<_> = doc.items.iter().map(extract_image).collect();
//! ```

pub mod document;
mod fetcher;
mod image;
mod publication;

pub use document::{parse_document, Element, FeedDocument, FieldValue, ParseError, RawFeedItem};
pub use fetcher::{FeedClient, FetchError, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_FEED_BYTES};
pub use image::{extract_image, first_img_src};
pub use publication::publication_name;
