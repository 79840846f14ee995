use std::sync::Arc;

use super::{escape_xml, format_iso_date};
use crate::content::PostSummary;

struct SitemapUrl {
    loc: String,
    lastmod: Option<String>,
    changefreq: &'static str,
    priority: &'static str,
}

/// Fixed pages listed ahead of the posts: (path, changefreq, priority)
const STATIC_ROUTES: &[(&str, &str, &str)] = &[
    ("", "daily", "1.0"),
    ("/posts", "weekly", "0.8"),
    ("/about", "monthly", "0.6"),
    ("/works", "monthly", "0.6"),
];

/// Build `sitemap.xml` for the static pages and every post
pub fn build_sitemap_xml(posts: &[Arc<PostSummary>], base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');

    let static_urls = STATIC_ROUTES
        .iter()
        .map(|&(path, changefreq, priority)| SitemapUrl {
            loc: format!("{}{}", base_url, path),
            lastmod: None,
            changefreq,
            priority,
        });
    let post_urls = posts.iter().map(|post| SitemapUrl {
        loc: format!("{}/posts/{}", base_url, post.slug),
        lastmod: Some(format_iso_date(&post.last_updated)),
        changefreq: "monthly",
        priority: "0.7",
    });

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    xml.push('\n');
    for url in static_urls.chain(post_urls) {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&url.loc)));
        if let Some(lastmod) = url.lastmod {
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod));
        }
        xml.push_str(&format!("    <changefreq>{}</changefreq>\n", url.changefreq));
        xml.push_str(&format!("    <priority>{}</priority>\n", url.priority));
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>");
    xml
}

/// Allow everything and point crawlers at the sitemap
pub fn build_robots_txt(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    let sitemap = format!("Sitemap: {}/sitemap.xml", base_url);
    ["User-agent: *", "Allow: /", sitemap.as_str()].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_sitemap() {
        let date = Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap();
        let post = Arc::new(PostSummary {
            slug: "hello-world".to_string(),
            title: "Hello".to_string(),
            date,
            last_updated: Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap(),
            summary: None,
            category: "Tech".to_string(),
            tags: Vec::new(),
            reading_minutes: 1,
            featured: false,
            image: None,
        });

        let xml = build_sitemap_xml(&[post], "https://blog.example.com/");
        assert!(xml.contains("<loc>https://blog.example.com</loc>\n    <changefreq>daily</changefreq>\n    <priority>1.0</priority>"));
        assert!(xml.contains("<loc>https://blog.example.com/works</loc>"));
        assert!(xml.contains(
            "<loc>https://blog.example.com/posts/hello-world</loc>\n    <lastmod>2025-03-01T08:30:00.000Z</lastmod>\n    <changefreq>monthly</changefreq>\n    <priority>0.7</priority>"
        ));
        assert_eq!(xml.matches("<url>").count(), 5);
        assert!(xml.ends_with("</urlset>"));
    }

    #[test]
    fn test_robots() {
        assert_eq!(
            build_robots_txt("https://blog.example.com"),
            "User-agent: *\nAllow: /\nSitemap: https://blog.example.com/sitemap.xml"
        );
    }
}
