//! Configuration module

mod args;
mod settings;
mod site;

pub use args::ContentArgs;
pub use settings::{
    parse_cache_size, parse_flag, ContentSettings, DEFAULT_CATEGORIES, DEFAULT_HTML_CACHE_SIZE,
    DEFAULT_SUMMARY_CACHE_SIZE, MAX_HTML_CACHE_SIZE, MAX_SUMMARY_CACHE_SIZE,
};
pub use site::SiteConfig;
