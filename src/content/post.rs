//! Post models

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Everything a list page needs to know about a post
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    /// URL-safe identifier, the file stem
    pub slug: String,

    /// Post title, falls back to the slug
    pub title: String,

    /// Publication date
    pub date: DateTime<Utc>,

    /// Last content change
    pub last_updated: DateTime<Utc>,

    /// Plain-text teaser
    pub summary: Option<String>,

    /// One of the configured categories, or the uncategorized label
    pub category: String,

    /// Post tags
    pub tags: Vec<String>,

    /// Estimated reading time in minutes
    pub reading_minutes: u32,

    /// Pinned to the top of the home page
    pub featured: bool,

    /// Cover image, root-relative or absolute
    pub image: Option<String>,
}

/// A fully rendered post
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(flatten)]
    pub meta: PostSummary,

    /// Sanitized HTML body
    pub content_html: String,
}

impl std::ops::Deref for Post {
    type Target = PostSummary;

    fn deref(&self) -> &Self::Target {
        &self.meta
    }
}

/// A Markdown file found under the posts root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFile {
    /// Path relative to the posts root, `/`-separated
    pub relative_path: String,

    /// Absolute (or base-joined) path on disk
    pub full_path: PathBuf,

    /// Containing folder relative to the root; `None` at the root itself
    pub folder: Option<String>,
}

impl ContentFile {
    /// File name without the `.md` extension
    pub fn stem(&self) -> &str {
        self.full_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }
}
