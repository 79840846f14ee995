//! Content store: cached access to posts on disk

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt::Display;
use std::fs::{self, Metadata};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tokio::task::JoinSet;

use super::discovery::FileDiscovery;
use super::frontmatter::{
    count_words, derive_summary, reading_minutes, resolve_category, FrontMatter,
};
use super::markdown::MarkdownRenderer;
use super::post::{ContentFile, Post, PostSummary};
use super::sanitize::sanitize_slug;
use crate::cache::{mutex_lock, HtmlCache, SummaryCache};
use crate::config::{ContentSettings, SiteConfig};
use crate::error::{ContentError, ContentResult};

const SOURCE: &str = "content::store";

/// Cache occupancy and disk activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub summary_entries: usize,
    pub html_entries: usize,
    /// Full reads of content files since the store was created
    pub disk_reads: u64,
}

struct StoreInner {
    settings: ContentSettings,
    discovery: FileDiscovery,
    summaries: Mutex<SummaryCache<Arc<PostSummary>>>,
    html: Mutex<HtmlCache<Arc<str>>>,
    disk_reads: AtomicU64,
}

/// Handle to the content pipeline.
///
/// Cloning is cheap; all clones share the same caches. Locks are only held
/// around cache lookups and inserts, never across file reads or rendering.
#[derive(Clone)]
pub struct ContentStore {
    inner: Arc<StoreInner>,
}

/// A content file read and parsed, with the body still in Markdown
struct SourceFile {
    summary: PostSummary,
    body: String,
}

impl ContentStore {
    pub fn new(settings: ContentSettings) -> Self {
        let discovery = FileDiscovery::new(settings.posts_dir());
        let summaries = SummaryCache::new(settings.summary_cache_size());
        let html = HtmlCache::new(settings.html_cache_size());
        tracing::debug!(
            "Content store at {:?} (summaries: {}, html: {}, low memory: {})",
            settings.posts_dir(),
            settings.summary_cache_size(),
            settings.html_cache_size(),
            settings.low_memory
        );
        Self {
            inner: Arc::new(StoreInner {
                settings,
                discovery,
                summaries: Mutex::new(summaries),
                html: Mutex::new(html),
                disk_reads: AtomicU64::new(0),
            }),
        }
    }

    pub fn settings(&self) -> &ContentSettings {
        &self.inner.settings
    }

    /// Summaries of every valid post, newest first.
    ///
    /// Files are processed in small batches on blocking threads. Files that
    /// cannot be read or parsed are logged and left out.
    pub async fn load_post_summaries(&self) -> Vec<Arc<PostSummary>> {
        let store = self.clone();
        let files = match tokio::task::spawn_blocking(move || store.postable_files()).await {
            Ok(files) => files,
            Err(e) => {
                self.report("Failed to list content files", &e, None);
                return Vec::new();
            }
        };

        let mut summaries = Vec::with_capacity(files.len());
        for batch in files.chunks(self.inner.settings.batch_size()) {
            let mut tasks = JoinSet::new();
            for (slug, file) in batch.iter().cloned() {
                let store = self.clone();
                tasks.spawn_blocking(move || {
                    let result = store.summary_for(&slug, &file);
                    (file, result)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined.map_err(ContentError::from) {
                    Ok((_, Ok(summary))) => summaries.push(summary),
                    Ok((file, Err(e))) => {
                        self.report("Skipping unreadable post", &e, Some(&file.full_path))
                    }
                    Err(e) => self.report("Content task failed", &e, None),
                }
            }
        }

        summaries.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
        summaries
    }

    /// Full post for `slug`, or `None` when the slug is invalid, the file is
    /// missing or outside the posts root, or it fails to parse.
    pub async fn load_post(&self, slug: &str) -> Option<Post> {
        let slug = sanitize_slug(slug)?;
        let store = self.clone();
        match tokio::task::spawn_blocking(move || store.load_post_blocking(&slug)).await {
            Ok(post) => post,
            Err(e) => {
                self.report("Content task failed", &e, None);
                None
            }
        }
    }

    /// Site configuration, read fresh from `_config.md` on every call
    pub async fn load_config(&self) -> SiteConfig {
        let path = self.inner.settings.config_path();
        let result = tokio::task::spawn_blocking({
            let path = path.clone();
            move || SiteConfig::load(path)
        })
        .await;

        match result {
            Ok(Ok(config)) => config,
            Ok(Err(e)) => {
                self.report("Invalid site config, using defaults", &e, Some(&path));
                SiteConfig::default()
            }
            Err(e) => {
                self.report("Content task failed", &e, None);
                SiteConfig::default()
            }
        }
    }

    /// Drop every cached summary, rendered body and directory listing
    pub fn clear_caches(&self) {
        mutex_lock(&self.inner.summaries, SOURCE, "clear_summaries").clear();
        mutex_lock(&self.inner.html, SOURCE, "clear_html").clear();
        self.inner.discovery.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            summary_entries: mutex_lock(&self.inner.summaries, SOURCE, "stats").len(),
            html_entries: mutex_lock(&self.inner.html, SOURCE, "stats").len(),
            disk_reads: self.inner.disk_reads.load(Ordering::Relaxed),
        }
    }

    /// Listing entries with a usable slug, one file per slug.
    ///
    /// A file at the root wins over same-named files in folders, otherwise
    /// the first in listing order wins.
    fn postable_files(&self) -> Vec<(String, ContentFile)> {
        let files = self.inner.discovery.list();
        let root_stems: HashSet<&str> = files
            .iter()
            .filter(|f| f.folder.is_none())
            .map(ContentFile::stem)
            .collect();

        let mut seen = HashSet::new();
        let mut postable = Vec::with_capacity(files.len());
        for file in files.iter() {
            let Some(slug) = sanitize_slug(file.stem()) else {
                tracing::warn!("Skipping {}: invalid slug", file.relative_path);
                continue;
            };
            if file.folder.is_some() && root_stems.contains(file.stem()) {
                tracing::warn!("Skipping {}: slug already used at the root", file.relative_path);
                continue;
            }
            if !seen.insert(slug.clone()) {
                tracing::warn!("Skipping {}: duplicate slug '{}'", file.relative_path, slug);
                continue;
            }
            postable.push((slug, file.clone()));
        }
        postable
    }

    fn summary_for(&self, slug: &str, file: &ContentFile) -> ContentResult<Arc<PostSummary>> {
        let metadata =
            fs::metadata(&file.full_path).map_err(|e| ContentError::io(&file.full_path, e))?;
        let mtime = modified(&metadata, &file.full_path)?;

        if let Some(summary) =
            mutex_lock(&self.inner.summaries, SOURCE, "get_summary").get(slug, mtime)
        {
            return Ok(summary);
        }

        let source = self.read_source(slug, file, &metadata)?;
        let summary = Arc::new(source.summary);
        mutex_lock(&self.inner.summaries, SOURCE, "put_summary").insert(
            slug.to_string(),
            mtime,
            Arc::clone(&summary),
        );
        Ok(summary)
    }

    fn load_post_blocking(&self, slug: &str) -> Option<Post> {
        let file = self.locate(slug)?;

        let metadata = match fs::metadata(&file.full_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.report("Post not found", &e, Some(&file.full_path));
                return None;
            }
        };
        let mtime = match modified(&metadata, &file.full_path) {
            Ok(mtime) => mtime,
            Err(e) => {
                self.report("Post not readable", &e, Some(&file.full_path));
                return None;
            }
        };

        let cached_summary =
            mutex_lock(&self.inner.summaries, SOURCE, "get_summary").get(slug, mtime);
        let cached_html = mutex_lock(&self.inner.html, SOURCE, "get_html").get(slug, mtime);

        if let (Some(summary), Some(html)) = (&cached_summary, &cached_html) {
            return Some(Post {
                meta: summary.as_ref().clone(),
                content_html: html.to_string(),
            });
        }

        let source = match self.read_source(slug, &file, &metadata) {
            Ok(source) => source,
            Err(e) => {
                self.report("Failed to load post", &e, Some(&file.full_path));
                return None;
            }
        };

        let summary = match cached_summary {
            Some(summary) => summary,
            None => {
                let summary = Arc::new(source.summary);
                mutex_lock(&self.inner.summaries, SOURCE, "put_summary").insert(
                    slug.to_string(),
                    mtime,
                    Arc::clone(&summary),
                );
                summary
            }
        };

        let html = match cached_html {
            Some(html) => html,
            None => {
                let html: Arc<str> = Arc::from(self.render_body(slug, &source.body));
                mutex_lock(&self.inner.html, SOURCE, "put_html").insert(
                    slug.to_string(),
                    mtime,
                    Arc::clone(&html),
                );
                html
            }
        };

        Some(Post {
            meta: summary.as_ref().clone(),
            content_html: html.to_string(),
        })
    }

    /// Resolve a sanitized slug to a file inside the posts root
    fn locate(&self, slug: &str) -> Option<ContentFile> {
        let root = self.inner.discovery.root();
        let direct = root.join(format!("{}.md", slug));

        let file = if direct.is_file() {
            ContentFile {
                relative_path: format!("{}.md", slug),
                full_path: direct,
                folder: None,
            }
        } else {
            match self.inner.discovery.find_by_stem(slug) {
                Some(file) => file,
                None => {
                    if self.inner.settings.detailed_errors {
                        tracing::warn!("Post not found: {}", slug);
                    }
                    return None;
                }
            }
        };

        let inside_root = match (root.canonicalize(), file.full_path.canonicalize()) {
            (Ok(root), Ok(path)) => path.starts_with(root),
            _ => false,
        };
        if !inside_root {
            tracing::warn!("Refusing to load post outside the content root: {}", slug);
            return None;
        }

        Some(file)
    }

    fn read_source(
        &self,
        slug: &str,
        file: &ContentFile,
        metadata: &Metadata,
    ) -> ContentResult<SourceFile> {
        let content = fs::read_to_string(&file.full_path)
            .map_err(|e| ContentError::io(&file.full_path, e))?;
        self.inner.disk_reads.fetch_add(1, Ordering::Relaxed);

        let (fm, body) = FrontMatter::parse(&content)?;
        let modified_at = metadata.modified().ok().map(DateTime::<Utc>::from);
        let created_at = metadata.created().ok().map(DateTime::<Utc>::from);
        let fallback = modified_at.unwrap_or_else(Utc::now);

        let summary = PostSummary {
            slug: slug.to_string(),
            title: fm.title.unwrap_or_else(|| slug.to_string()),
            date: fm.date.or(created_at).unwrap_or(fallback),
            last_updated: fm.updated.unwrap_or(fallback),
            summary: fm.summary.or_else(|| derive_summary(body)),
            category: resolve_category(
                fm.category.as_deref(),
                file.folder.as_deref(),
                &self.inner.settings.categories,
            ),
            tags: fm.tags,
            reading_minutes: reading_minutes(count_words(body)),
            featured: fm.featured,
            image: fm.image,
        };

        Ok(SourceFile {
            summary,
            body: body.to_string(),
        })
    }

    fn render_body(&self, slug: &str, body: &str) -> String {
        let on_sanitized = |slug: Option<&str>| {
            tracing::warn!(
                "Removed unsafe HTML from post {}",
                slug.unwrap_or("<unknown>")
            );
        };
        let on_sanitized: &dyn Fn(Option<&str>) = &on_sanitized;
        // Production keeps sanitizer removals out of the logs
        let callback = self.inner.settings.detailed_errors.then_some(on_sanitized);
        MarkdownRenderer::global().render(body, Some(slug), callback)
    }

    fn report(&self, message: &str, error: &dyn Display, path: Option<&Path>) {
        match (self.inner.settings.detailed_errors, path) {
            (true, Some(path)) => tracing::warn!("{} {:?}: {}", message, path, error),
            (true, None) => tracing::warn!("{}: {}", message, error),
            (false, _) => tracing::warn!("{}", message),
        }
    }
}

fn modified(metadata: &Metadata, path: &Path) -> ContentResult<SystemTime> {
    metadata.modified().map_err(|e| ContentError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn store_with(settings: impl FnOnce(ContentSettings) -> ContentSettings) -> (tempfile::TempDir, ContentStore) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("posts")).unwrap();
        let store = ContentStore::new(settings(ContentSettings::new(dir.path())));
        (dir, store)
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Log output written on this thread while `f` runs
    fn captured_logs(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn write_post(dir: &Path, relative: &str, content: &str) {
        let path = dir.join("posts").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_summaries_sorted_newest_first() {
        let (dir, store) = store_with(|s| s);
        write_post(dir.path(), "old.md", "---\ntitle: Old\ndate: 2023-01-01\n---\nold");
        write_post(dir.path(), "new.md", "---\ntitle: New\ndate: 2024-06-01\n---\nnew");
        write_post(dir.path(), "also-new.md", "---\ndate: 2024-06-01\n---\nnew");

        let summaries = store.load_post_summaries().await;
        let slugs: Vec<&str> = summaries.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(slugs, ["also-new", "new", "old"]);
        assert_eq!(summaries[0].title, "also-new");
    }

    #[tokio::test]
    async fn test_bad_files_are_skipped() {
        let (dir, store) = store_with(|s| s);
        write_post(dir.path(), "good.md", "---\ntitle: Good\n---\nbody");
        write_post(dir.path(), "broken.md", "---\ntitle: [oops\n---\nbody");
        write_post(dir.path(), "Bad Name!.md", "---\ntitle: Bad\n---\nbody");

        let summaries = store.load_post_summaries().await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].slug, "good");
        assert!(store.load_post("broken").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(ContentSettings::new(dir.path().join("nowhere")));
        assert!(store.load_post_summaries().await.is_empty());
        assert!(store.load_post("anything").await.is_none());
    }

    #[tokio::test]
    async fn test_summary_cache_hit_skips_read() {
        let (dir, store) = store_with(|s| s);
        write_post(dir.path(), "a.md", "---\ntitle: A\n---\nbody");

        store.load_post_summaries().await;
        store.load_post_summaries().await;
        let stats = store.stats();
        assert_eq!(stats.disk_reads, 1);
        assert_eq!(stats.summary_entries, 1);
    }

    #[tokio::test]
    async fn test_load_post_reads_once_and_caches_html() {
        let (dir, store) = store_with(|s| s.with_html_cache_size(5));
        write_post(dir.path(), "a.md", "---\ntitle: A\n---\n# Hi\n\n<script>x()</script>");

        let first = store.load_post("a").await.unwrap();
        let second = store.load_post("a").await.unwrap();
        assert_eq!(first, second);
        assert!(!first.content_html.contains("<script"));
        assert!(first.content_html.contains("<h1>Hi</h1>"));

        let stats = store.stats();
        assert_eq!(stats.disk_reads, 1);
        assert_eq!(stats.html_entries, 1);
    }

    #[tokio::test]
    async fn test_mtime_change_forces_reload() {
        let (dir, store) = store_with(|s| s.with_html_cache_size(5));
        write_post(dir.path(), "a.md", "---\ntitle: First\n---\nbody");
        assert_eq!(store.load_post("a").await.unwrap().title, "First");

        let path = dir.path().join("posts/a.md");
        fs::write(&path, "---\ntitle: Second\n---\nbody").unwrap();
        let later = SystemTime::now() + Duration::from_secs(10);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        assert_eq!(store.load_post("a").await.unwrap().title, "Second");
        assert_eq!(store.stats().disk_reads, 2);
    }

    #[tokio::test]
    async fn test_nested_posts_found_by_stem() {
        let (dir, store) = store_with(|s| s);
        write_post(dir.path(), "note/deep-dive.md", "---\ntitle: Deep\n---\nbody");

        let post = store.load_post("deep-dive").await.unwrap();
        assert_eq!(post.category, "Note");
    }

    #[tokio::test]
    async fn test_traversal_slugs_rejected() {
        let (dir, store) = store_with(|s| s);
        fs::write(dir.path().join("secret.md"), "---\ntitle: Secret\n---\n").unwrap();

        for slug in ["../secret", "..", "/etc/passwd", "a/../../secret", ""] {
            assert!(store.load_post(slug).await.is_none(), "{slug}");
        }
        assert_eq!(store.stats().disk_reads, 0);
    }

    #[tokio::test]
    async fn test_clear_caches() {
        let (dir, store) = store_with(|s| s.with_html_cache_size(5));
        write_post(dir.path(), "a.md", "body");
        store.load_post("a").await.unwrap();
        store.clear_caches();
        let stats = store.stats();
        assert_eq!(stats.summary_entries, 0);
        assert_eq!(stats.html_entries, 0);
    }

    #[tokio::test]
    async fn test_load_config() {
        let (dir, store) = store_with(|s| s);
        assert_eq!(store.load_config().await, SiteConfig::default());

        fs::write(dir.path().join("_config.md"), "---\nshowFilters: true\n---\n").unwrap();
        assert!(store.load_config().await.show_filters);
    }

    #[test]
    fn test_missing_post_warns_only_with_detailed_errors() {
        let (_quiet_dir, quiet) = store_with(|s| s.with_detailed_errors(false));
        let logs = captured_logs(|| assert!(quiet.load_post_blocking("missing").is_none()));
        assert!(logs.is_empty(), "unexpected log output: {logs}");

        let (_dir, verbose) = store_with(|s| s.with_detailed_errors(true));
        let logs = captured_logs(|| assert!(verbose.load_post_blocking("missing").is_none()));
        assert!(logs.contains("Post not found: missing"), "{logs}");
    }

    #[test]
    fn test_sanitize_warning_only_with_detailed_errors() {
        let body = "hi\n\n<script>alert(1)</script>\n";

        let (_quiet_dir, quiet) = store_with(|s| s.with_detailed_errors(false));
        let logs = captured_logs(|| {
            assert!(!quiet.render_body("unsafe", body).contains("<script"));
        });
        assert!(logs.is_empty(), "unexpected log output: {logs}");

        let (_dir, verbose) = store_with(|s| s.with_detailed_errors(true));
        let logs = captured_logs(|| {
            verbose.render_body("unsafe", body);
        });
        assert!(logs.contains("Removed unsafe HTML from post unsafe"), "{logs}");
    }
}
