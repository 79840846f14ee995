use serde_json::json;
use std::collections::HashSet;

use super::{format_iso_date, to_absolute_url};
use crate::config::SiteConfig;
use crate::content::Post;
use crate::routes::{PageProps, RouteMatch, StaticPage};

/// Title, description and keywords for the document head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaInfo {
    pub title: String,
    pub description: String,
    pub keywords: String,
}

/// Pick page meta for the route in `props`
pub fn resolve_meta(props: &PageProps) -> MetaInfo {
    let config = &props.config;
    let site = config.title.as_str();
    let meta = |title: String, description: String, extra: &[&str]| MetaInfo {
        title,
        description,
        keywords: build_keywords(config, extra),
    };

    match (&props.route, &props.post) {
        (RouteMatch::Detail { .. }, Some(post)) => {
            let mut extra = vec![post.title.as_str(), post.category.as_str()];
            extra.extend(post.tags.iter().map(String::as_str));
            meta(post.title.clone(), post_description(post, config), &extra)
        }
        (RouteMatch::Static { page: StaticPage::About }, _) => meta(
            format!("About - {}", site),
            format!("About {} - {}", config.author, config.description),
            &["About", config.author.as_str()],
        ),
        (RouteMatch::Static { page: StaticPage::Works }, _) => meta(
            format!("Works - {}", site),
            "Shipped projects and lab prototypes, tracked side by side".to_string(),
            &["Works", "Project", "Lab", "Side Project"],
        ),
        (RouteMatch::Archive, _) => meta(
            format!("All posts - {}", site),
            "Browse every post and tag".to_string(),
            &["Archive", "Posts"],
        ),
        (RouteMatch::NotFound, _) => meta(
            format!("Not found - {}", site),
            config.description.clone(),
            &[],
        ),
        _ => meta(
            format!("{} - {}", site, config.description),
            config.description.clone(),
            &[],
        ),
    }
}

/// schema.org `BlogPosting` for a post, safe to embed in a `<script>` tag
pub fn build_article_json_ld(post: &Post, base_url: &str, config: &SiteConfig) -> String {
    let base_url = base_url.trim_end_matches('/');
    let url = format!("{}/posts/{}", base_url, post.slug);

    let data = json!({
        "@context": "https://schema.org",
        "@type": "BlogPosting",
        "headline": post.title,
        "description": post_description(post, config),
        "datePublished": format_iso_date(&post.date),
        "dateModified": format_iso_date(&post.last_updated),
        "url": url,
        "mainEntityOfPage": {
            "@type": "WebPage",
            "@id": url,
        },
        "image": [to_absolute_url(base_url, post.image.as_deref())],
        "author": {
            "@type": "Person",
            "name": config.author,
            "url": format!("{}/about", base_url),
        },
        "publisher": {
            "@type": "Organization",
            "name": config.title,
            "url": base_url,
            "logo": {
                "@type": "ImageObject",
                "url": format!("{}/favicon.svg", base_url),
            },
        },
    });

    data.to_string().replace('<', "\\u003c")
}

fn post_description(post: &Post, config: &SiteConfig) -> String {
    post.summary
        .clone()
        .unwrap_or_else(|| format!("{} - {}", post.title, config.title))
}

/// Site keywords plus `extra`, trimmed and deduplicated ignoring case
fn build_keywords(config: &SiteConfig, extra: &[&str]) -> String {
    let mut seen = HashSet::new();
    [config.title.as_str(), config.author.as_str()]
        .into_iter()
        .chain(extra.iter().copied())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.to_lowercase()))
        .collect::<Vec<_>>()
        .join(", ")
}
