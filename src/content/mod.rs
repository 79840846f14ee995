//! Content module - turns Markdown files on disk into sanitized posts

mod discovery;
pub mod frontmatter;
mod markdown;
mod post;
pub mod sanitize;
mod store;

pub use discovery::FileDiscovery;
pub use frontmatter::{FrontMatter, UNCATEGORIZED};
pub use markdown::MarkdownRenderer;
pub use post::{ContentFile, Post, PostSummary};
pub use sanitize::{sanitize_markdown_html, sanitize_plain_text, sanitize_slug, SanitizeOptions};
pub use store::{CacheStats, ContentStore};
