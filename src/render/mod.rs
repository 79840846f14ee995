//! Page rendering
//!
//! The server hands route data to a [`PageRenderer`]. The built-in
//! [`ShellRenderer`] fills an HTML shell with head meta, a plain server-side
//! body and the page props as JSON for a client bundle to hydrate.

use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::Path;

use crate::routes::{PageProps, RouteMatch, StaticPage};
use crate::seo::{build_article_json_ld, resolve_meta};

/// Turns route data into a complete HTML document
pub trait PageRenderer: Send + Sync {
    fn render(&self, props: &PageProps, base_url: &str) -> Result<String>;
}

const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="%APP_LANG%">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>%APP_TITLE%</title>
  <meta name="description" content="%APP_DESCRIPTION%" />
  <meta name="keywords" content="%APP_KEYWORDS%" />
  <link rel="alternate" type="application/rss+xml" title="RSS" href="/feed.xml" />
</head>
<body>
  <div id="root"><!--app-html--></div>
  <script id="app-data" type="application/json"><!--app-data--></script>
</body>
</html>
"#;

/// Fills placeholders in an HTML shell
///
/// Recognised placeholders: `%APP_TITLE%`, `%APP_DESCRIPTION%`,
/// `%APP_KEYWORDS%`, `%APP_LANG%`, `<!--app-html-->` and `<!--app-data-->`.
/// Article JSON-LD is inserted before `</head>` on post pages.
pub struct ShellRenderer {
    template: String,
}

impl ShellRenderer {
    pub fn new() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Load the shell from an HTML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let template = fs::read_to_string(path)
            .with_context(|| format!("Failed to read page template {:?}", path))?;
        Ok(Self::with_template(template))
    }
}

impl Default for ShellRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRenderer for ShellRenderer {
    fn render(&self, props: &PageProps, base_url: &str) -> Result<String> {
        let meta = resolve_meta(props);
        let payload = client_payload(props)?;

        let replacements = [
            ("%APP_TITLE%", html_escape(&meta.title)),
            ("%APP_DESCRIPTION%", html_escape(&meta.description)),
            ("%APP_KEYWORDS%", html_escape(&meta.keywords)),
            ("%APP_LANG%", html_escape(&props.config.language)),
            ("<!--app-html-->", render_body(props)),
            ("<!--app-data-->", payload),
        ];
        let mut html = replacements
            .iter()
            .fold(self.template.clone(), |acc, (placeholder, value)| {
                acc.replacen(placeholder, value, 1)
            });

        if let (RouteMatch::Detail { .. }, Some(post)) = (&props.route, &props.post) {
            if html.contains("</head>") {
                let json_ld = build_article_json_ld(post, base_url, &props.config);
                html = html.replacen(
                    "</head>",
                    &format!(
                        "<script type=\"application/ld+json\">{}</script></head>",
                        json_ld
                    ),
                    1,
                );
            }
        }

        Ok(html)
    }
}

/// Props for the client; only list pages carry the post summaries
fn client_payload(props: &PageProps) -> Result<String> {
    let value = if props.route.includes_posts() {
        serde_json::to_value(props)?
    } else {
        json!({
            "route": props.route,
            "posts": [],
            "post": props.post,
        })
    };
    Ok(serde_json::to_string(&value)?.replace('<', "\\u003c"))
}

fn render_body(props: &PageProps) -> String {
    match (&props.route, &props.post) {
        (RouteMatch::Detail { .. }, Some(post)) => format!(
            "<article><h1>{}</h1>{}</article>",
            html_escape(&post.title),
            post.content_html
        ),
        (RouteMatch::List | RouteMatch::Archive, _) => {
            let items: String = props
                .posts
                .iter()
                .map(|post| {
                    format!(
                        "<li><a href=\"/posts/{}\">{}</a> <time datetime=\"{}\">{}</time></li>",
                        post.slug,
                        html_escape(&post.title),
                        post.date.to_rfc3339(),
                        post.date.format("%Y-%m-%d")
                    )
                })
                .collect();
            format!("<ul class=\"posts\">{}</ul>", items)
        }
        (RouteMatch::Static { page: StaticPage::About }, _) => "<h1>About</h1>".to_string(),
        (RouteMatch::Static { page: StaticPage::Works }, _) => "<h1>Works</h1>".to_string(),
        _ => "<h1>Not found</h1>".to_string(),
    }
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::{Post, PostSummary};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn summary(slug: &str, title: &str) -> PostSummary {
        let date = Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap();
        PostSummary {
            slug: slug.to_string(),
            title: title.to_string(),
            date,
            last_updated: date,
            summary: Some("A <short> teaser".to_string()),
            category: "Tech".to_string(),
            tags: Vec::new(),
            reading_minutes: 1,
            featured: false,
            image: None,
        }
    }

    #[test]
    fn test_list_page() {
        let props = PageProps {
            route: RouteMatch::List,
            posts: vec![Arc::new(summary("first", "First & best"))],
            post: None,
            config: SiteConfig::default(),
        };
        let html = ShellRenderer::new().render(&props, "https://blog.example.com").unwrap();

        assert!(html.contains("<html lang=\"en\">"));
        assert!(html.contains("<a href=\"/posts/first\">First &amp; best</a>"));
        assert!(html.contains("\"slug\":\"first\""));
        // Payload never contains a raw '<' that could close the script tag
        let payload = html.split("<!--").count();
        assert_eq!(payload, 1);
        assert!(html.contains("A \\u003cshort> teaser"));
        assert!(!html.contains("application/ld+json"));
    }

    #[test]
    fn test_detail_page_has_json_ld() {
        let post = Post {
            meta: summary("first", "First"),
            content_html: "<p>Body</p>".to_string(),
        };
        let props = PageProps {
            route: RouteMatch::Detail { slug: "first".to_string() },
            posts: Vec::new(),
            post: Some(post),
            config: SiteConfig::default(),
        };
        let html = ShellRenderer::new().render(&props, "https://blog.example.com").unwrap();

        assert!(html.contains("<title>First</title>"));
        assert!(html.contains("<article><h1>First</h1><p>Body</p></article>"));
        assert!(html.contains("<script type=\"application/ld+json\">"));
        assert!(html.contains("\"posts\":[]"));
        assert!(!html.contains("\"config\""));
    }

    #[test]
    fn test_custom_template() {
        let props = PageProps {
            route: RouteMatch::NotFound,
            posts: Vec::new(),
            post: None,
            config: SiteConfig::default(),
        };
        let renderer = ShellRenderer::with_template("<title>%APP_TITLE%</title><main><!--app-html--></main>");
        let html = renderer.render(&props, "http://localhost").unwrap();
        assert_eq!(html, "<title>Not found - Inkwell</title><main><h1>Not found</h1></main>");
    }

    #[test]
    fn test_missing_template_file() {
        assert!(ShellRenderer::from_file("/definitely/not/here.html").is_err());
    }
}
