//! decap-feed: turns Decap CMS markdown content into JSON feeds
//!
//! The pipeline loads markdown files with YAML front-matter, resolves
//! category, tag and author references, makes image URLs absolute, renders
//! sanitized HTML and writes sorted, paginated JSON documents. The same
//! output can be served over a small read-only HTTP API.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod server;

use anyhow::Result;
use std::path::{Path, PathBuf};

use content::loader::ContentLoader;
use generator::{BuildSummary, Generator, SiteData};

/// Name of the optional configuration file at the site root
pub const CONFIG_FILE: &str = "decap.yml";

/// A content site rooted at a base directory
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content root (`categories/`, `tags/`, `authors/`, `movies/`)
    pub content_dir: PathBuf,
    /// Blog posts directory
    pub posts_dir: PathBuf,
    /// JSON output directory
    pub output_dir: PathBuf,
}

impl Site {
    /// Create a site from a directory, reading `decap.yml` when present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let config = Self::read_config(base_dir)?;
        Ok(Self::with_config(base_dir, config))
    }

    /// Read `decap.yml` under `base_dir`, or the defaults when it is absent
    pub fn read_config(base_dir: &Path) -> Result<config::SiteConfig> {
        let config_path = base_dir.join(CONFIG_FILE);
        if config_path.exists() {
            config::SiteConfig::load(&config_path)
        } else {
            Ok(config::SiteConfig::default())
        }
    }

    /// Create a site from an already built configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let content_dir = base_dir.join(&config.content_dir);
        let posts_dir = match &config.posts_dir {
            Some(dir) => base_dir.join(dir),
            None => content_dir.join("blog"),
        };
        let output_dir = base_dir.join(&config.output_dir);

        Self {
            config,
            base_dir,
            content_dir,
            posts_dir,
            output_dir,
        }
    }

    /// Run the pipeline in memory: load, normalize, filter and sort
    pub fn load(&self) -> Result<SiteData> {
        let loader = ContentLoader::new(self);
        let relations = loader.load_relations();
        let loaded = loader.load_posts(&relations);

        let mut posts = loaded.posts;
        let skipped_drafts = generator::filter_drafts(&mut posts, self.config.drafts);
        generator::sort_posts(&mut posts);

        let movies = self.config.movies.then(|| loader.load_movies());

        let summary = BuildSummary {
            processed: loaded.processed,
            emitted: posts.len(),
            skipped_drafts,
            failed: loaded.failed,
            duplicates: loaded.duplicates,
        };

        Ok(SiteData {
            posts,
            categories: relations.all_categories(),
            tags: relations.all_tags(),
            authors: relations.all_authors(),
            movies,
            summary,
        })
    }

    /// Run the pipeline and write the JSON documents
    pub fn generate(&self) -> Result<BuildSummary> {
        commands::generate::run(self).map(|data| data.summary)
    }

    /// Remove the output directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }

    /// Scaffold a new draft post, returning its path
    pub fn new_post(&self, title: &str, slug: Option<&str>) -> Result<PathBuf> {
        commands::new::create_post(self, title, slug)
    }

    /// Write `data` into the output directory
    pub fn emit(&self, data: &SiteData) -> Result<()> {
        Generator::new(self).generate(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_new_without_config_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let site = Site::new(tmp.path()).unwrap();
        assert_eq!(site.posts_dir, tmp.path().join("content/blog"));
        assert_eq!(site.output_dir, tmp.path().join("public/api"));
    }

    #[test]
    fn test_new_reads_config_file() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp.path().join(CONFIG_FILE),
            "site_url: https://blog.test\nposts_dir: posts\noutput_dir: dist\n",
        );
        let site = Site::new(tmp.path()).unwrap();
        assert_eq!(site.config.site_url, "https://blog.test");
        assert_eq!(site.posts_dir, tmp.path().join("posts"));
        assert_eq!(site.output_dir, tmp.path().join("dist"));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join(CONFIG_FILE), "per_page: [not a number\n");
        assert!(Site::new(tmp.path()).is_err());
    }

    #[test]
    fn test_load_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(&root.join("content/categories/news.md"), "---\nname: News\n---\n");
        write(
            &root.join("content/blog/hello.md"),
            "---\ntitle: Hello\npublished_at: 2024-01-01\ncategory: news\n---\nHi",
        );
        write(
            &root.join("content/blog/later.md"),
            "---\ntitle: Later\npublished_at: 2024-05-01\n---\nLater",
        );
        write(
            &root.join("content/blog/wip.md"),
            "---\ntitle: WIP\npublished_at: 2025-01-01\ndraft: true\n---\n",
        );
        write(&root.join("content/blog/broken.md"), "---\ntitle: x\n");

        let site = Site::new(root).unwrap();
        let data = site.load().unwrap();

        let slugs: Vec<_> = data.posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["later", "hello"]);
        assert_eq!(data.post("hello").unwrap().category.as_ref().unwrap().name, "News");
        assert_eq!(
            data.summary,
            BuildSummary {
                processed: 4,
                emitted: 2,
                skipped_drafts: 1,
                failed: 1,
                duplicates: 0,
            }
        );
        assert!(data.movies.is_none());
    }

    #[test]
    fn test_generate_and_clean() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp.path().join("content/blog/a.md"),
            "---\ntitle: A\n---\nBody",
        );

        let site = Site::new(tmp.path()).unwrap();
        let summary = site.generate().unwrap();
        assert_eq!(summary.emitted, 1);
        assert!(site.output_dir.join("posts/a.json").exists());

        site.clean().unwrap();
        assert!(!site.output_dir.exists());
    }
}
