//! Markdown file discovery under the posts root

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use walkdir::WalkDir;

use super::post::ContentFile;
use crate::cache::{get_mtime, mutex_lock};

const SOURCE: &str = "content::discovery";

struct Listing {
    root_mtime: SystemTime,
    files: Arc<Vec<ContentFile>>,
}

/// Recursive listing of `*.md` files, cached until the root directory's
/// mtime changes.
///
/// Only the root's own mtime is checked, so a file added inside an existing
/// sub-folder shows up after the next change at the top level or an explicit
/// [`FileDiscovery::clear`].
pub struct FileDiscovery {
    root: PathBuf,
    listing: Mutex<Option<Listing>>,
}

impl FileDiscovery {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            listing: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All Markdown files, sorted by relative path.
    ///
    /// A missing root yields an empty listing that is not remembered.
    pub fn list(&self) -> Arc<Vec<ContentFile>> {
        let root_mtime = match get_mtime(&self.root) {
            Ok(mtime) => mtime,
            Err(_) => {
                self.clear();
                return Arc::new(Vec::new());
            }
        };

        if let Some(listing) = mutex_lock(&self.listing, SOURCE, "list").as_ref() {
            if listing.root_mtime == root_mtime {
                return Arc::clone(&listing.files);
            }
        }

        let files = Arc::new(scan(&self.root));
        tracing::debug!("Discovered {} content files under {:?}", files.len(), self.root);

        *mutex_lock(&self.listing, SOURCE, "store_listing") = Some(Listing {
            root_mtime,
            files: Arc::clone(&files),
        });
        files
    }

    /// First file (in listing order) whose stem is `stem`
    pub fn find_by_stem(&self, stem: &str) -> Option<ContentFile> {
        self.list().iter().find(|f| f.stem() == stem).cloned()
    }

    pub fn clear(&self) {
        *mutex_lock(&self.listing, SOURCE, "clear") = None;
    }
}

fn scan(root: &Path) -> Vec<ContentFile> {
    let mut files: Vec<ContentFile> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_markdown_file(e.path()))
        .filter_map(|e| {
            let relative = e.path().strip_prefix(root).ok()?;
            let relative_path = to_slash_path(relative);
            let folder = relative
                .parent()
                .map(to_slash_path)
                .filter(|f| !f.is_empty());
            Some(ContentFile {
                relative_path,
                full_path: e.path().to_path_buf(),
                folder,
            })
        })
        .collect();

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    files
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}
