//! SEO artifacts: RSS feed, sitemap, robots.txt and page meta

mod feed;
mod meta;
mod sitemap;

pub use feed::build_feed_xml;
pub use meta::{build_article_json_ld, resolve_meta, MetaInfo};
pub use sitemap::{build_robots_txt, build_sitemap_xml};

use chrono::{DateTime, SecondsFormat, Utc};

/// Escape XML special characters
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// RFC 822 date as used by RSS, always in GMT
pub fn format_rss_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// ISO 8601 with milliseconds and a `Z` suffix
pub fn format_iso_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Resolve an image reference against the site; empty values fall back to
/// the favicon.
pub fn to_absolute_url(base_url: &str, value: Option<&str>) -> String {
    let base_url = base_url.trim_end_matches('/');
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => format!("{}/favicon.svg", base_url),
        Some(v) if v.starts_with("http://") || v.starts_with("https://") => v.to_string(),
        Some(v) if v.starts_with('/') => format!("{}{}", base_url, v),
        Some(v) => format!("{}/{}", base_url, v),
    }
}

/// Strip invalid XML control characters (except tab, newline, carriage return)
/// XML 1.0 only allows: #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
fn strip_invalid_xml_chars(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            c == '\t'
                || c == '\n'
                || c == '\r'
                || ('\u{0020}'..='\u{D7FF}').contains(&c)
                || ('\u{E000}'..='\u{FFFD}').contains(&c)
                || ('\u{10000}'..='\u{10FFFF}').contains(&c)
        })
        .collect()
}

/// Escape for an XML text node
fn xml_text(s: &str) -> String {
    escape_xml(&strip_invalid_xml_chars(s))
}
