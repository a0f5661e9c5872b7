//! folio: a personal book blog whose homepage merges news feeds with locally
//! stored book posts.
//!
//! - [`feed`] - fetching and parsing RSS/RDF/Atom, image and name extraction
//! - [`article`] - the normalized homepage article and its ordering
//! - [`aggregate`] - the bounded-concurrency homepage pipeline
//! - [`storage`] - SQLite persistence for posts and pages
//! - [`images`] - local cover image store
//! - [`admin`] - validated post/page management
//! - [`config`] - TOML configuration

pub mod admin;
pub mod aggregate;
pub mod article;
pub mod config;
pub mod feed;
pub mod images;
pub mod storage;
pub mod util;
