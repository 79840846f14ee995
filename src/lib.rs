//! inkwell: a file-backed blog server
//!
//! Markdown posts on disk are parsed, sanitized and cached in memory behind
//! mtime-checked caches, then served as HTML pages alongside an RSS feed,
//! a sitemap and robots.txt.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod render;
pub mod routes;
pub mod seo;
pub mod server;

pub use config::{ContentSettings, SiteConfig};
pub use content::{ContentStore, Post, PostSummary};
pub use error::ContentError;
