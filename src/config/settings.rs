//! Process-wide content settings (environment / command line)

use std::path::{Path, PathBuf};

/// Summary cache entries kept when nothing is configured
pub const DEFAULT_SUMMARY_CACHE_SIZE: usize = 5;
/// Hard ceiling on summary cache entries regardless of configuration
pub const MAX_SUMMARY_CACHE_SIZE: usize = 1000;
/// HTML caching is opt-in: rendered bodies are the largest objects we hold
pub const DEFAULT_HTML_CACHE_SIZE: usize = 0;
/// Hard ceiling on HTML cache entries regardless of configuration
pub const MAX_HTML_CACHE_SIZE: usize = 50;

/// Categories recognised when none are configured
pub const DEFAULT_CATEGORIES: &[&str] = &["Blog", "Tech", "Note", "Project", "Tutorial", "Lab"];

/// Directory under the content base that holds posts
const POSTS_DIR: &str = "posts";
/// Optional site config file under the content base
const CONFIG_FILE: &str = "_config.md";

/// Settings for the content pipeline and the caches in front of it
#[derive(Debug, Clone)]
pub struct ContentSettings {
    /// Base directory; posts live in `<base>/posts`
    pub content_base: PathBuf,
    /// Disables both caches and processes one file at a time
    pub low_memory: bool,
    /// Closed set of category names a post may be filed under
    pub categories: Vec<String>,
    /// Include error detail in content warnings (off in production)
    pub detailed_errors: bool,
    summary_cache_size: usize,
    html_cache_size: usize,
}

impl ContentSettings {
    /// Settings with defaults for the given content base
    pub fn new<P: AsRef<Path>>(content_base: P) -> Self {
        Self {
            content_base: content_base.as_ref().to_path_buf(),
            low_memory: false,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            detailed_errors: true,
            summary_cache_size: DEFAULT_SUMMARY_CACHE_SIZE,
            html_cache_size: DEFAULT_HTML_CACHE_SIZE,
        }
    }

    pub fn with_low_memory(mut self, low_memory: bool) -> Self {
        self.low_memory = low_memory;
        self
    }

    /// Requested summary cache capacity, clamped to the hard ceiling
    pub fn with_summary_cache_size(mut self, size: usize) -> Self {
        self.summary_cache_size = size.min(MAX_SUMMARY_CACHE_SIZE);
        self
    }

    /// Requested HTML cache capacity, clamped to the hard ceiling
    pub fn with_html_cache_size(mut self, size: usize) -> Self {
        self.html_cache_size = size.min(MAX_HTML_CACHE_SIZE);
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let categories: Vec<String> = categories
            .into_iter()
            .map(Into::into)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if !categories.is_empty() {
            self.categories = categories;
        }
        self
    }

    pub fn with_detailed_errors(mut self, detailed: bool) -> Self {
        self.detailed_errors = detailed;
        self
    }

    /// Effective summary cache capacity (zero in low-memory mode)
    pub fn summary_cache_size(&self) -> usize {
        if self.low_memory {
            0
        } else {
            self.summary_cache_size
        }
    }

    /// Effective HTML cache capacity (zero in low-memory mode)
    pub fn html_cache_size(&self) -> usize {
        if self.low_memory {
            0
        } else {
            self.html_cache_size
        }
    }

    /// How many files are parsed concurrently while listing
    pub fn batch_size(&self) -> usize {
        if self.low_memory {
            1
        } else {
            3
        }
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.content_base.join(POSTS_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.content_base.join(CONFIG_FILE)
    }

    /// Flat public image directory that rewritten `<img>` paths point into
    pub fn images_dir(&self) -> PathBuf {
        self.content_base.join("public").join("images")
    }
}

/// Parse a cache size override.
///
/// Missing, non-numeric and negative values fall back to `default`; anything
/// larger than `ceiling` is clamped.
pub fn parse_cache_size(raw: Option<&str>, default: usize, ceiling: usize) -> usize {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return default;
    };
    match raw.parse::<i64>() {
        Ok(n) if n >= 0 => (n as u64).min(ceiling as u64) as usize,
        _ => default,
    }
}

/// Only the literal `true` (any case) switches a flag on
pub fn parse_flag(raw: Option<&str>) -> bool {
    raw.map(|s| s.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
