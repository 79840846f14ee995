//! Site configuration (_config.md)

use anyhow::Result;
use serde::Serialize;
use serde_yaml::Value;
use std::fs;
use std::path::Path;

use crate::content::frontmatter::split_front_matter;
use crate::content::sanitize::sanitize_plain_text;

/// Site-wide settings read from the front-matter of `_config.md`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    /// Show the category/tag filter bar on the home page
    pub show_filters: bool,

    // Feed and meta
    pub title: String,
    pub description: String,
    pub language: String,
    pub author: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            show_filters: false,
            title: "Inkwell".to_string(),
            description: "Notes on code and the ideas behind it".to_string(),
            language: "en".to_string(),
            author: "Anonymous".to_string(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a `_config.md` file.
    ///
    /// A missing file yields the defaults. Keys with the wrong type are
    /// ignored one by one instead of discarding the whole file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from the raw text of `_config.md`
    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();
        let Some(yaml) = split_front_matter(content).0 else {
            return Ok(config);
        };
        let data: Value = serde_yaml::from_str(yaml)?;

        if let Some(show) = data.get("showFilters").and_then(Value::as_bool) {
            config.show_filters = show;
        }
        if let Some(title) = text_field(&data, "title", 120) {
            config.title = title;
        }
        if let Some(description) = text_field(&data, "description", 300) {
            config.description = description;
        }
        if let Some(language) = text_field(&data, "language", 20) {
            config.language = language;
        }
        if let Some(author) = text_field(&data, "author", 80) {
            config.author = author;
        }

        Ok(config)
    }
}

fn text_field(data: &Value, key: &str, max_len: usize) -> Option<String> {
    let value = sanitize_plain_text(data.get(key)?.as_str()?, max_len);
    (!value.is_empty()).then_some(value)
}
