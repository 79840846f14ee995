//! List site content

use anyhow::Result;
use std::collections::HashMap;
use std::fmt::Write;

use crate::content::ContentStore;

/// List site content by type
pub async fn run(store: &ContentStore, content_type: &str) -> Result<()> {
    print!("{}", listing(store, content_type).await?);
    Ok(())
}

async fn listing(store: &ContentStore, content_type: &str) -> Result<String> {
    let mut out = String::new();

    match content_type {
        "post" | "posts" => {
            let posts = store.load_post_summaries().await;
            writeln!(out, "Posts ({}):", posts.len())?;
            for post in posts {
                writeln!(
                    out,
                    "  {} - {} [{}]{}",
                    post.date.format("%Y-%m-%d"),
                    post.title,
                    post.slug,
                    if post.featured { " *" } else { "" }
                )?;
            }
        }
        "tag" | "tags" => {
            let posts = store.load_post_summaries().await;
            let counts = count_by(posts.iter().flat_map(|p| p.tags.iter()));
            writeln!(out, "Tags ({}):", counts.len())?;
            for (tag, count) in counts {
                writeln!(out, "  {} ({})", tag, count)?;
            }
        }
        "category" | "categories" => {
            let posts = store.load_post_summaries().await;
            let counts = count_by(posts.iter().map(|p| &p.category));
            writeln!(out, "Categories ({}):", counts.len())?;
            for (category, count) in counts {
                writeln!(out, "  {} ({})", category, count)?;
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: post, tag, category",
                content_type
            );
        }
    }

    Ok(out)
}

/// Occurrence counts, most frequent first, ties alphabetical
fn count_by<'a>(items: impl Iterator<Item = &'a String>) -> Vec<(&'a str, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in items {
        *counts.entry(item.as_str()).or_insert(0) += 1;
    }
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentSettings;
    use std::fs;

    fn store() -> (tempfile::TempDir, ContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let posts = dir.path().join("posts");
        fs::create_dir_all(posts.join("tech")).unwrap();
        fs::write(
            posts.join("tech/one.md"),
            "---\ntitle: One\ndate: 2024-01-02\ntags: [rust, web]\nfeatured: true\n---\n",
        )
        .unwrap();
        fs::write(
            posts.join("two.md"),
            "---\ntitle: Two\ndate: 2024-01-01\ntags: [rust]\n---\n",
        )
        .unwrap();
        let store = ContentStore::new(ContentSettings::new(dir.path()));
        (dir, store)
    }

    #[tokio::test]
    async fn test_list_posts() {
        let (_dir, store) = store();
        let out = listing(&store, "post").await.unwrap();
        assert_eq!(
            out,
            "Posts (2):\n  2024-01-02 - One [one] *\n  2024-01-01 - Two [two]\n"
        );
    }

    #[tokio::test]
    async fn test_list_tags_and_categories() {
        let (_dir, store) = store();
        let tags = listing(&store, "tags").await.unwrap();
        assert_eq!(tags, "Tags (2):\n  rust (2)\n  web (1)\n");

        let categories = listing(&store, "category").await.unwrap();
        assert!(categories.contains("  Tech (1)\n"));
        assert!(categories.contains("(1)\n"));
        assert!(categories.starts_with("Categories (2):"));
    }

    #[tokio::test]
    async fn test_unknown_type() {
        let (_dir, store) = store();
        assert!(listing(&store, "pages").await.is_err());
    }
}
