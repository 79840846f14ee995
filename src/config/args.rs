//! Command line / environment options for the content pipeline

use clap::Args;
use std::path::PathBuf;

use super::settings::{
    parse_cache_size, parse_flag, ContentSettings, DEFAULT_HTML_CACHE_SIZE,
    DEFAULT_SUMMARY_CACHE_SIZE, MAX_HTML_CACHE_SIZE, MAX_SUMMARY_CACHE_SIZE,
};

/// Content options shared by every subcommand.
///
/// Numeric values are taken as raw strings so that a malformed override
/// falls back to its default instead of aborting startup.
#[derive(Debug, Clone, Args)]
pub struct ContentArgs {
    /// Content base directory (posts are read from `<base>/posts`)
    #[arg(long, env = "CONTENT_BASE", global = true)]
    pub content_base: Option<PathBuf>,

    /// Disable all caching (`true` to enable)
    #[arg(long, env = "LOW_MEMORY_MODE", global = true)]
    pub low_memory_mode: Option<String>,

    /// Summary cache capacity (default 5, max 1000)
    #[arg(long, env = "MAX_SUMMARY_CACHE_SIZE", global = true)]
    pub summary_cache_size: Option<String>,

    /// Rendered HTML cache capacity (default 0, max 50)
    #[arg(long, env = "MAX_HTML_CACHE_SIZE", global = true)]
    pub html_cache_size: Option<String>,

    /// Comma-separated list of recognised categories
    #[arg(long, env = "CONTENT_CATEGORIES", global = true)]
    pub categories: Option<String>,

    /// Deployment environment; `production` trims error detail from logs
    #[arg(long, env = "INKWELL_ENV", global = true, default_value = "development")]
    pub environment: String,
}

impl ContentArgs {
    /// Resolve into settings, using `fallback_base` when no base was given
    pub fn into_settings(self, fallback_base: PathBuf) -> ContentSettings {
        let mut settings = ContentSettings::new(self.content_base.unwrap_or(fallback_base))
            .with_low_memory(parse_flag(self.low_memory_mode.as_deref()))
            .with_summary_cache_size(parse_cache_size(
                self.summary_cache_size.as_deref(),
                DEFAULT_SUMMARY_CACHE_SIZE,
                MAX_SUMMARY_CACHE_SIZE,
            ))
            .with_html_cache_size(parse_cache_size(
                self.html_cache_size.as_deref(),
                DEFAULT_HTML_CACHE_SIZE,
                MAX_HTML_CACHE_SIZE,
            ))
            .with_detailed_errors(!self.environment.eq_ignore_ascii_case("production"));

        if let Some(categories) = self.categories {
            settings = settings.with_categories(categories.split(','));
        }

        settings
    }
}
