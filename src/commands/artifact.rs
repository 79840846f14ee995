//! Print or write an SEO artifact without starting the server

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fs;
use std::path::Path;

use crate::content::ContentStore;
use crate::seo::{build_feed_xml, build_robots_txt, build_sitemap_xml};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Artifact {
    /// RSS 2.0 feed (feed.xml)
    Feed,
    /// Sitemap (sitemap.xml)
    Sitemap,
    /// robots.txt
    Robots,
}

/// Build `artifact` and write it to `output`, or stdout when not given
pub async fn run(
    store: &ContentStore,
    artifact: Artifact,
    base_url: &str,
    output: Option<&Path>,
) -> Result<()> {
    let content = build(store, artifact, base_url).await;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &content).with_context(|| format!("Failed to write {:?}", path))?;
            tracing::info!("Wrote {:?}", path);
        }
        None => println!("{}", content),
    }

    Ok(())
}

async fn build(store: &ContentStore, artifact: Artifact, base_url: &str) -> String {
    match artifact {
        Artifact::Feed => {
            let posts = store.load_post_summaries().await;
            let config = store.load_config().await;
            build_feed_xml(&posts, base_url, &config)
        }
        Artifact::Sitemap => {
            let posts = store.load_post_summaries().await;
            build_sitemap_xml(&posts, base_url)
        }
        Artifact::Robots => build_robots_txt(base_url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentSettings;

    #[tokio::test]
    async fn test_write_sitemap_to_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("posts")).unwrap();
        fs::write(dir.path().join("posts/first.md"), "---\ntitle: First\n---\n").unwrap();
        let store = ContentStore::new(ContentSettings::new(dir.path()));

        let output = dir.path().join("dist/sitemap.xml");
        run(&store, Artifact::Sitemap, "https://blog.example.com", Some(&output))
            .await
            .unwrap();

        let xml = fs::read_to_string(output).unwrap();
        assert!(xml.contains("<loc>https://blog.example.com/posts/first</loc>"));
    }

    #[tokio::test]
    async fn test_build_robots() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(ContentSettings::new(dir.path()));
        let robots = build(&store, Artifact::Robots, "https://x.dev").await;
        assert!(robots.ends_with("Sitemap: https://x.dev/sitemap.xml"));
    }
}
