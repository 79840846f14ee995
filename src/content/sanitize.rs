//! Sanitizers for untrusted strings: slugs, plain text and rendered HTML
//!
//! Authors fully control their own Markdown, but rendered HTML is reused in
//! feeds and structured data with different escaping assumptions, so every
//! string leaving the content pipeline passes through one of these.

use ammonia::Builder;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

const SAFE_HTML_TAGS: &[&str] = &[
    "a",
    "p",
    "ul",
    "ol",
    "li",
    "strong",
    "em",
    "code",
    "pre",
    "blockquote",
    "img",
    "h1",
    "h2",
    "h3",
    "h4",
    "hr",
    "br",
    "span",
    "del",
    "ins",
    "sup",
    "sub",
    "table",
    "thead",
    "tbody",
    "tr",
    "th",
    "td",
];

const SAFE_URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

const LINK_REL: &str = "noopener noreferrer";

lazy_static! {
    static ref SLUG_PATTERN: Regex =
        Regex::new(r"(?i)^[a-z0-9]+(?:[a-z0-9_-]*[a-z0-9])?$").expect("valid slug pattern");
    static ref CONTROL_CHARS: Regex = Regex::new(r"[\x00-\x1f\x7f]").expect("valid pattern");
    static ref TAG_LIKE: Regex = Regex::new(r"<[^>]*>").expect("valid pattern");
    static ref VOID_TAG: Regex = Regex::new(r"(?i)<(img|br|hr)([^>]*)>").expect("valid pattern");
    static ref ENTITY: Regex =
        Regex::new(r"(?i)&(#\d+|#x[0-9a-f]+|[a-z]+);").expect("valid pattern");
    static ref LANGUAGE_CLASS: Regex =
        Regex::new(r"^language-[A-Za-z0-9_+#.-]+$").expect("valid pattern");

    /// Strips everything outside the allow-list
    static ref STRIP_PASS: Builder<'static> = build_sanitizer(false);
    /// Same allow-list, and stamps `rel` onto every link
    static ref LINK_PASS: Builder<'static> = build_sanitizer(true);
}

/// Validate a slug; `None` when empty or outside the slug alphabet
pub fn sanitize_slug(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if SLUG_PATTERN.is_match(trimmed) {
        Some(trimmed.to_string())
    } else {
        None
    }
}

/// Strip control characters and tag-like substrings, trim, and truncate to
/// `max_len` characters.
pub fn sanitize_plain_text(raw: &str, max_len: usize) -> String {
    let without_controls = CONTROL_CHARS.replace_all(raw, "");
    let without_tags = TAG_LIKE.replace_all(&without_controls, "");
    without_tags.trim().chars().take(max_len).collect()
}

/// Options for [`sanitize_markdown_html`]
#[derive(Default)]
pub struct SanitizeOptions<'a> {
    /// Post the HTML belongs to, handed back to `on_sanitized`
    pub slug: Option<&'a str>,
    /// Called once when sanitization removed meaningful content
    pub on_sanitized: Option<&'a dyn Fn(Option<&str>)>,
}

/// Run rendered HTML through the allow-list.
///
/// The first pass strips disallowed tags, attributes and URLs; the second
/// adds `rel="noopener noreferrer"` to every link. Differences that are only
/// entity encoding or void-tag syntax do not count as a change.
pub fn sanitize_markdown_html(html: &str, options: &SanitizeOptions<'_>) -> String {
    let cleaned = STRIP_PASS.clean(html).to_string();

    if let Some(on_sanitized) = options.on_sanitized {
        if !html_equivalent(&cleaned, html) {
            on_sanitized(options.slug);
        }
    }

    LINK_PASS.clean(&cleaned).to_string()
}

fn build_sanitizer(stamp_rel: bool) -> Builder<'static> {
    let mut link_attributes: HashSet<&'static str> =
        HashSet::from(["href", "name", "target", "title"]);
    if !stamp_rel {
        link_attributes.insert("rel");
    }

    let tag_attributes: HashMap<&'static str, HashSet<&'static str>> = HashMap::from([
        ("a", link_attributes),
        (
            "img",
            HashSet::from(["src", "alt", "title", "loading", "width", "height"]),
        ),
        ("code", HashSet::from(["class"])),
        ("pre", HashSet::from(["class"])),
        ("table", HashSet::from(["class"])),
        ("th", HashSet::from(["scope"])),
    ]);

    let mut builder = Builder::default();
    builder
        .tags(SAFE_HTML_TAGS.iter().copied().collect())
        .generic_attributes(HashSet::new())
        .tag_attributes(tag_attributes)
        .url_schemes(SAFE_URL_SCHEMES.iter().copied().collect())
        .link_rel(if stamp_rel { Some(LINK_REL) } else { None })
        .attribute_filter(filter_attribute);
    builder
}

fn filter_attribute<'u>(element: &str, attribute: &str, value: &'u str) -> Option<Cow<'u, str>> {
    match (element, attribute) {
        ("code" | "pre", "class") => {
            let classes: Vec<&str> = value
                .split_whitespace()
                .filter(|class| LANGUAGE_CLASS.is_match(class))
                .collect();
            if classes.is_empty() {
                None
            } else {
                Some(Cow::Owned(classes.join(" ")))
            }
        }
        (_, "href" | "src") => {
            let trimmed = value.trim_start();
            // Protocol-relative URLs inherit whatever scheme the page was served over
            if trimmed.starts_with("//") || trimmed.starts_with("\\\\") {
                return None;
            }
            if element == "img" && has_scheme(trimmed, "mailto") {
                return None;
            }
            Some(Cow::Borrowed(value))
        }
        _ => Some(Cow::Borrowed(value)),
    }
}

fn has_scheme(url: &str, scheme: &str) -> bool {
    match (url.get(..scheme.len()), url.get(scheme.len()..)) {
        (Some(head), Some(rest)) => head.eq_ignore_ascii_case(scheme) && rest.starts_with(':'),
        _ => false,
    }
}

fn html_equivalent(a: &str, b: &str) -> bool {
    a == b || normalize_for_comparison(a) == normalize_for_comparison(b)
}

fn normalize_for_comparison(html: &str) -> String {
    let decoded = decode_basic_entities(html);
    VOID_TAG
        .replace_all(&decoded, |caps: &Captures| {
            let attrs = caps[2].trim_end();
            let attrs = attrs.strip_suffix('/').unwrap_or(attrs).trim_end();
            format!("<{}{}>", &caps[1], attrs)
        })
        .into_owned()
}

fn decode_basic_entities(html: &str) -> Cow<'_, str> {
    ENTITY.replace_all(html, |caps: &Captures| {
        let entity = &caps[1];
        if let Some(numeric) = entity.strip_prefix('#') {
            let code_point = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => numeric.parse::<u32>().ok(),
            };
            return match code_point.and_then(char::from_u32) {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            };
        }
        match entity.to_ascii_lowercase().as_str() {
            "amp" => "&".to_string(),
            "lt" => "<".to_string(),
            "gt" => ">".to_string(),
            "quot" => "\"".to_string(),
            "apos" | "rsquo" => "'".to_string(),
            "nbsp" => "\u{a0}".to_string(),
            _ => caps[0].to_string(),
        }
    })
}
