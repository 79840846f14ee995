//! Route matching and per-route page data

use axum::http::StatusCode;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::sync::Arc;

use crate::config::SiteConfig;
use crate::content::{ContentStore, Post, PostSummary};

/// Static pages that need no content lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticPage {
    About,
    Works,
}

/// What a request path resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RouteMatch {
    /// Home page
    List,
    /// All posts
    Archive,
    /// A single post; the slug is percent-decoded but not yet validated
    Detail { slug: String },
    Static {
        #[serde(rename = "staticPage")]
        page: StaticPage,
    },
    NotFound,
}

impl RouteMatch {
    /// Lists carry every summary to the client; other pages do not
    pub fn includes_posts(&self) -> bool {
        matches!(self, RouteMatch::List | RouteMatch::Archive)
    }
}

/// Everything the page renderer receives
#[derive(Debug, Clone, Serialize)]
pub struct PageProps {
    pub route: RouteMatch,
    pub posts: Vec<Arc<PostSummary>>,
    pub post: Option<Post>,
    pub config: SiteConfig,
}

/// Page props plus the HTTP status to answer with
#[derive(Debug, Clone)]
pub struct RouteData {
    pub props: PageProps,
    pub status: StatusCode,
}

/// Normalize a request path: drop query and fragment, resolve `.` and `..`
/// segments, collapse repeated slashes and strip the trailing slash.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    format!("/{}", segments.join("/"))
}

/// Match a request path to a route
pub fn match_route(path: &str) -> RouteMatch {
    let normalized = normalize_path(path);

    match normalized.as_str() {
        "/" => return RouteMatch::List,
        "/posts" => return RouteMatch::Archive,
        "/about" => return RouteMatch::Static { page: StaticPage::About },
        "/works" => return RouteMatch::Static { page: StaticPage::Works },
        _ => {}
    }

    match extract_post_slug(&normalized) {
        Some(slug) => RouteMatch::Detail { slug },
        None => RouteMatch::NotFound,
    }
}

/// Slug of a `/posts/<slug>` path; further segments do not match
fn extract_post_slug(normalized: &str) -> Option<String> {
    let raw = normalized.strip_prefix("/posts/")?;
    if raw.is_empty() || raw.contains('/') {
        return None;
    }
    let slug = percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    Some(slug)
}

/// Load the data a matched route needs.
///
/// A detail route whose post cannot be loaded turns into not-found.
pub async fn build_route_data(store: &ContentStore, route: RouteMatch) -> RouteData {
    let config = store.load_config().await;

    let page = |route, status, posts, post| RouteData {
        props: PageProps {
            route,
            posts,
            post,
            config: config.clone(),
        },
        status,
    };

    match route {
        RouteMatch::List | RouteMatch::Archive => {
            let posts = store.load_post_summaries().await;
            page(route, StatusCode::OK, posts, None)
        }
        RouteMatch::Detail { ref slug } => {
            let slug = slug.clone();
            match store.load_post(&slug).await {
                Some(post) => page(route, StatusCode::OK, Vec::new(), Some(post)),
                None => page(RouteMatch::NotFound, StatusCode::NOT_FOUND, Vec::new(), None),
            }
        }
        RouteMatch::Static { .. } => page(route, StatusCode::OK, Vec::new(), None),
        RouteMatch::NotFound => page(route, StatusCode::NOT_FOUND, Vec::new(), None),
    }
}
