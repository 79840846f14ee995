//! Front-matter parsing and metadata normalization

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_yaml::Value;

use super::sanitize::sanitize_plain_text;

/// Category assigned when neither front-matter nor folder names a known one
pub const UNCATEGORIZED: &str = "未分類";

pub const TITLE_MAX_LEN: usize = 80;
pub const SUMMARY_MAX_LEN: usize = 200;
pub const CATEGORY_MAX_LEN: usize = 40;
pub const TAG_MAX_LEN: usize = 30;
pub const MAX_TAGS: usize = 8;

/// Characters of body text considered when deriving a summary
const SUMMARY_PREVIEW_CHARS: usize = 500;
const IMAGE_MAX_LEN: usize = 500;
const WORDS_PER_MINUTE: f64 = 150.0;

/// Raw YAML keys we recognise; everything else is dropped
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFrontMatter {
    title: Option<Value>,
    date: Option<Value>,
    summary: Option<Value>,
    category: Option<Value>,
    tags: Option<Value>,
    updated: Option<Value>,
    #[serde(rename = "lastUpdated")]
    last_updated: Option<Value>,
    image: Option<Value>,
    cover: Option<Value>,
    #[serde(rename = "heroImage")]
    hero_image: Option<Value>,
    featured: Option<Value>,
    promoted: Option<Value>,
    promote: Option<Value>,
}

/// Validated front-matter of a post.
///
/// Every field is already sanitized; a value of the wrong shape is dropped
/// rather than carried along untyped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub featured: bool,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str), serde_yaml::Error> {
        let (yaml, body) = split_front_matter(content);
        let Some(yaml) = yaml else {
            return Ok((FrontMatter::default(), body));
        };
        let raw: RawFrontMatter = serde_yaml::from_str(yaml)?;
        Ok((Self::from_raw(raw), body))
    }

    fn from_raw(raw: RawFrontMatter) -> Self {
        let title = raw
            .title
            .as_ref()
            .and_then(scalar_text)
            .map(|t| sanitize_plain_text(&t, TITLE_MAX_LEN))
            .filter(|t| !t.is_empty());

        let summary = raw
            .summary
            .as_ref()
            .and_then(Value::as_str)
            .map(|s| sanitize_plain_text(s, SUMMARY_MAX_LEN))
            .filter(|s| !s.is_empty());

        let category = raw
            .category
            .as_ref()
            .and_then(Value::as_str)
            .map(|c| sanitize_plain_text(c, CATEGORY_MAX_LEN))
            .filter(|c| !c.is_empty());

        let image = [&raw.image, &raw.cover, &raw.hero_image]
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(|i| sanitize_plain_text(i, IMAGE_MAX_LEN))
            .find(|i| !i.is_empty())
            .map(|i| normalize_image_path(&i));

        Self {
            title,
            date: raw.date.as_ref().and_then(date_value),
            updated: raw
                .updated
                .as_ref()
                .or(raw.last_updated.as_ref())
                .and_then(date_value),
            summary,
            category,
            tags: normalize_tags(raw.tags.as_ref()),
            image,
            featured: [&raw.featured, &raw.promoted, &raw.promote]
                .into_iter()
                .flatten()
                .any(is_truthy),
        }
    }
}

/// Split the `---` delimited YAML header from the body.
///
/// Returns `(None, content)` when there is no header, including files that
/// only use `---` as a Markdown thematic break.
pub fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let content = content.trim_start_matches('\u{feff}').trim_start();

    let Some(rest) = content.strip_prefix("---") else {
        return (None, content);
    };
    let rest = rest.trim_start_matches(['\n', '\r']);

    // No closing ---, treat as no front-matter
    let Some(end_pos) = rest.find("\n---") else {
        return (None, content);
    };

    let yaml_content = &rest[..end_pos];
    let remaining = &rest[end_pos + 4..];
    let remaining = remaining.trim_start_matches(['-', '\r']);
    let remaining = remaining.trim_start_matches(['\n', '\r']);

    if yaml_content.trim().is_empty() {
        return (None, remaining);
    }

    // Valid YAML front-matter should have at least one line with 'key: value' pattern
    let has_yaml_structure = yaml_content.lines().any(|line| {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return false;
        }
        // "- item" alone is also valid markdown list syntax, so only keys count
        let Some(colon_pos) = trimmed.find(':') else {
            return false;
        };
        let before_colon = &trimmed[..colon_pos];
        let is_valid_key = !before_colon.is_empty()
            && before_colon
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            && !matches!(before_colon, "http" | "https" | "ftp" | "mailto");
        if !is_valid_key {
            return false;
        }
        let after_colon = &trimmed[colon_pos + 1..];
        after_colon.is_empty() || after_colon.starts_with(' ')
    });

    if !has_yaml_structure {
        return (None, content);
    }

    (Some(yaml_content), remaining)
}

/// Derive a plain-text summary from the start of the body.
///
/// Markdown punctuation (`#>*_` backtick `-`) is dropped and whitespace is
/// collapsed so that line breaks do not glue words together.
pub fn derive_summary(body: &str) -> Option<String> {
    let preview: String = body
        .chars()
        .take(SUMMARY_PREVIEW_CHARS)
        .filter(|c| !matches!(c, '#' | '>' | '*' | '_' | '`' | '-'))
        .collect();
    let collapsed = preview.split_whitespace().collect::<Vec<_>>().join(" ");
    let summary = sanitize_plain_text(&collapsed, SUMMARY_MAX_LEN);
    (!summary.is_empty()).then_some(summary)
}

/// Count whitespace-delimited tokens in the body
pub fn count_words(body: &str) -> usize {
    body.split_whitespace().count()
}

/// Reading time at 150 words a minute, never less than one minute
pub fn reading_minutes(words: usize) -> u32 {
    ((words as f64 / WORDS_PER_MINUTE).round() as u32).max(1)
}

/// Pick the category for a post.
///
/// The explicit front-matter value wins when it names a known category, then
/// the containing folder (whole relative path, then its top-level segment),
/// then [`UNCATEGORIZED`]. Matching ignores case and yields the configured
/// spelling.
pub fn resolve_category(
    explicit: Option<&str>,
    folder: Option<&str>,
    categories: &[String],
) -> String {
    let known = |candidate: &str| {
        categories
            .iter()
            .find(|c| c.eq_ignore_ascii_case(candidate.trim()))
            .cloned()
    };

    let folder_candidates = folder.into_iter().flat_map(|f| {
        let top = f.split(['/', '\\']).next().filter(|top| *top != f);
        std::iter::once(f).chain(top)
    });

    explicit
        .into_iter()
        .chain(folder_candidates)
        .find_map(known)
        .unwrap_or_else(|| UNCATEGORIZED.to_string())
}

/// Cover images given relative to the site root get a leading slash
pub fn normalize_image_path(image: &str) -> String {
    if image.starts_with("http://") || image.starts_with("https://") || image.starts_with('/') {
        image.to_string()
    } else {
        format!("/{}", image)
    }
}

fn normalize_tags(raw: Option<&Value>) -> Vec<String> {
    let candidates: Vec<String> = match raw {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };

    candidates
        .iter()
        .map(|tag| sanitize_plain_text(tag, TAG_MAX_LEN))
        .filter(|tag| !tag.is_empty())
        .take(MAX_TAGS)
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && !s.eq_ignore_ascii_case("false") && s != "0"
        }
        Value::Null => false,
        _ => true,
    }
}

fn date_value(value: &Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(parse_date_string)
}

/// Parse a date string in various formats.
///
/// Values without an offset are taken as UTC.
pub fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}
