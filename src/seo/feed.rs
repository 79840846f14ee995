use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{escape_xml, format_rss_date, xml_text};
use crate::config::SiteConfig;
use crate::content::PostSummary;

/// Build the RSS 2.0 feed for `posts`
pub fn build_feed_xml(posts: &[Arc<PostSummary>], base_url: &str, config: &SiteConfig) -> String {
    build_feed_xml_at(posts, base_url, config, Utc::now())
}

fn build_feed_xml_at(
    posts: &[Arc<PostSummary>],
    base_url: &str,
    config: &SiteConfig,
    build_date: DateTime<Utc>,
) -> String {
    let base_url = base_url.trim_end_matches('/');

    let mut feed = String::new();
    feed.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    feed.push('\n');
    feed.push_str(r#"<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">"#);
    feed.push('\n');
    feed.push_str("  <channel>\n");
    feed.push_str(&format!("    <title>{}</title>\n", xml_text(&config.title)));
    feed.push_str(&format!("    <link>{}</link>\n", escape_xml(base_url)));
    feed.push_str(&format!(
        "    <description>{}</description>\n",
        xml_text(&config.description)
    ));
    feed.push_str(&format!("    <language>{}</language>\n", xml_text(&config.language)));
    feed.push_str(&format!(
        "    <lastBuildDate>{}</lastBuildDate>\n",
        format_rss_date(&build_date)
    ));
    feed.push_str(&format!(
        "    <atom:link href=\"{}/feed.xml\" rel=\"self\" type=\"application/rss+xml\"/>\n",
        escape_xml(base_url)
    ));

    for post in posts {
        let url = escape_xml(&format!("{}/posts/{}", base_url, post.slug));
        feed.push_str("    <item>\n");
        feed.push_str(&format!("      <title>{}</title>\n", xml_text(&post.title)));
        feed.push_str(&format!("      <link>{}</link>\n", url));
        feed.push_str(&format!("      <guid isPermaLink=\"true\">{}</guid>\n", url));
        feed.push_str(&format!(
            "      <pubDate>{}</pubDate>\n",
            format_rss_date(&post.date)
        ));
        feed.push_str(&format!(
            "      <description>{}</description>\n",
            post.summary.as_deref().map(xml_text).unwrap_or_default()
        ));
        feed.push_str("    </item>\n");
    }

    feed.push_str("  </channel>\n");
    feed.push_str("</rss>\n");
    feed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(slug: &str, title: &str, summary: Option<&str>) -> Arc<PostSummary> {
        let date = Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap();
        Arc::new(PostSummary {
            slug: slug.to_string(),
            title: title.to_string(),
            date,
            last_updated: date,
            summary: summary.map(str::to_string),
            category: "Tech".to_string(),
            tags: Vec::new(),
            reading_minutes: 1,
            featured: false,
            image: None,
        })
    }

    #[test]
    fn test_feed_contains_items() {
        let posts = vec![
            summary("first", "Fish & Chips", Some("a <b>bold</b> claim")),
            summary("second", "Second", None),
        ];
        let build_date = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let xml = build_feed_xml_at(&posts, "https://blog.example.com/", &SiteConfig::default(), build_date);

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(
            r#"<atom:link href="https://blog.example.com/feed.xml" rel="self" type="application/rss+xml"/>"#
        ));
        assert!(xml.contains("<lastBuildDate>Sat, 01 Feb 2025 00:00:00 GMT</lastBuildDate>"));
        assert!(xml.contains("<title>Fish &amp; Chips</title>"));
        assert!(xml.contains("<link>https://blog.example.com/posts/first</link>"));
        assert!(xml.contains(r#"<guid isPermaLink="true">https://blog.example.com/posts/first</guid>"#));
        assert!(xml.contains("<pubDate>Sun, 05 Jan 2025 10:00:00 GMT</pubDate>"));
        assert!(xml.contains("<description>a &lt;b&gt;bold&lt;/b&gt; claim</description>"));
        assert!(xml.contains("<description></description>"));
        assert_eq!(xml.matches("<item>").count(), 2);
    }

    #[test]
    fn test_feed_uses_site_config() {
        let config = SiteConfig {
            title: "Lab \"Notes\"".to_string(),
            language: "zh-TW".to_string(),
            ..SiteConfig::default()
        };
        let xml = build_feed_xml(&[], "https://blog.example.com", &config);
        assert!(xml.contains("<title>Lab &quot;Notes&quot;</title>"));
        assert!(xml.contains("<language>zh-TW</language>"));
        assert!(!xml.contains("<item>"));
    }
}
