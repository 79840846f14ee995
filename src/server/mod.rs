//! HTTP server: page rendering, SEO artifacts and public images

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::content::ContentStore;
use crate::render::PageRenderer;
use crate::routes::{build_route_data, match_route};
use crate::seo::{build_feed_xml, build_robots_txt, build_sitemap_xml};

/// Host used when a request carries no `Host` header
const FALLBACK_HOST: &str = "localhost:3000";

/// Server state
pub struct AppState {
    pub store: ContentStore,
    pub renderer: Box<dyn PageRenderer>,
    /// Public origin, e.g. `https://blog.example.com`; taken from the request
    /// `Host` header when unset
    pub base_url: Option<String>,
}

impl AppState {
    pub fn new(store: ContentStore, renderer: Box<dyn PageRenderer>) -> Self {
        Self {
            store,
            renderer,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url.map(|url| url.trim_end_matches('/').to_string());
        self
    }

    fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(base_url) = &self.base_url {
            return base_url.clone();
        }
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or(FALLBACK_HOST);
        format!("http://{}", host)
    }

    /// Low-memory mode keeps nothing between requests
    fn finish_request(&self) {
        if self.store.settings().low_memory {
            self.store.clear_caches();
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let images = ServeDir::new(state.store.settings().images_dir());

    Router::new()
        .route("/feed.xml", get(feed_handler))
        .route("/sitemap.xml", get(sitemap_handler))
        .route("/robots.txt", get(robots_handler))
        .nest_service("/images", images)
        .fallback(page_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the server
pub async fn start(state: AppState, ip: &str, port: u16) -> Result<()> {
    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let content_dir = state.store.settings().posts_dir();
    let low_memory = state.store.settings().low_memory;
    let app = router(state);

    tracing::info!("Serving posts from {:?}", content_dir);
    if low_memory {
        tracing::info!("Low memory mode: caches are cleared after every request");
    }
    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn page_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let route = match_route(uri.path());
    let data = build_route_data(&state.store, route).await;
    let base_url = state.base_url(&headers);

    let response = match state.renderer.render(&data.props, &base_url) {
        Ok(html) => (data.status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Render failed for {}: {:#}", uri.path(), e);
            internal_error()
        }
    };

    state.finish_request();
    response
}

async fn feed_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let posts = state.store.load_post_summaries().await;
    let config = state.store.load_config().await;
    let xml = build_feed_xml(&posts, &state.base_url(&headers), &config);
    state.finish_request();
    (
        [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
        xml,
    )
        .into_response()
}

async fn sitemap_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let posts = state.store.load_post_summaries().await;
    let xml = build_sitemap_xml(&posts, &state.base_url(&headers));
    state.finish_request();
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        xml,
    )
        .into_response()
}

async fn robots_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        build_robots_txt(&state.base_url(&headers)),
    )
        .into_response()
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentSettings;
    use crate::render::ShellRenderer;
    use crate::routes::PageProps;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::fs;
    use tower::util::ServiceExt;

    struct FailingRenderer;

    impl PageRenderer for FailingRenderer {
        fn render(&self, _props: &PageProps, _base_url: &str) -> Result<String> {
            anyhow::bail!("template exploded")
        }
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("posts/tech")).unwrap();
        fs::create_dir_all(dir.path().join("public/images")).unwrap();
        fs::write(
            dir.path().join("posts/tech/hello-world.md"),
            "---\ntitle: Hello World\ndate: 2025-01-05T10:00:00Z\n---\nHi there",
        )
        .unwrap();
        fs::write(dir.path().join("public/images/cat.png"), b"png").unwrap();
        dir
    }

    fn app(dir: &tempfile::TempDir, renderer: Box<dyn PageRenderer>) -> (Router, ContentStore) {
        let store = ContentStore::new(ContentSettings::new(dir.path()));
        let state = AppState::new(store.clone(), renderer);
        (router(state), store)
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, HeaderMap, String) {
        let req = Request::get(path)
            .header("Host", "blog.test")
            .body(Body::empty())
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_pages() {
        let dir = site();
        let (router, _) = app(&dir, Box::new(ShellRenderer::new()));

        let (status, _, body) = get(&router, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/posts/hello-world"));

        let (status, _, body) = get(&router, "/posts/hello-world/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<p>Hi there</p>"));
        assert!(body.contains("\"url\":\"http://blog.test/posts/hello-world\""));

        let (status, _, _) = get(&router, "/posts/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = get(&router, "/posts/..%2F..%2Fetc%2Fpasswd").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_artifacts() {
        let dir = site();
        let (router, _) = app(&dir, Box::new(ShellRenderer::new()));

        let (status, headers, body) = get(&router, "/feed.xml").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/rss+xml; charset=utf-8");
        assert!(body.contains("<link>http://blog.test/posts/hello-world</link>"));

        let (_, headers, body) = get(&router, "/sitemap.xml").await;
        assert_eq!(headers[header::CONTENT_TYPE], "application/xml; charset=utf-8");
        assert!(body.contains("<loc>http://blog.test/posts/hello-world</loc>"));

        let (_, _, body) = get(&router, "/robots.txt").await;
        assert!(body.ends_with("Sitemap: http://blog.test/sitemap.xml"));

        let (status, _, body) = get(&router, "/images/cat.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "png");
    }

    #[tokio::test]
    async fn test_configured_base_url_wins() {
        let dir = site();
        let store = ContentStore::new(ContentSettings::new(dir.path()));
        let state = AppState::new(store, Box::new(ShellRenderer::new()))
            .with_base_url(Some("https://blog.example.com/".to_string()));
        let router = router(state);

        let (_, _, body) = get(&router, "/robots.txt").await;
        assert_eq!(
            body,
            "User-agent: *\nAllow: /\nSitemap: https://blog.example.com/sitemap.xml"
        );
    }

    #[tokio::test]
    async fn test_render_failure_is_500() {
        let dir = site();
        let (router, _) = app(&dir, Box::new(FailingRenderer));
        let (status, _, body) = get(&router, "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_low_memory_clears_after_request() {
        let dir = site();
        let store = ContentStore::new(
            ContentSettings::new(dir.path())
                .with_low_memory(true)
                .with_html_cache_size(10),
        );
        let router = router(AppState::new(store.clone(), Box::new(ShellRenderer::new())));

        get(&router, "/posts/hello-world").await;
        get(&router, "/posts/hello-world").await;
        let stats = store.stats();
        assert_eq!(stats.disk_reads, 2);
        assert_eq!(stats.summary_entries, 0);
        assert_eq!(stats.html_entries, 0);
    }
}
