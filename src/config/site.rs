//! Site configuration (decap.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Public base URL used to absolutize image paths
    pub site_url: String,

    // Directory
    pub content_dir: String,
    /// Overrides `<content_dir>/blog` when set (CONTENT_FOLDER)
    pub posts_dir: Option<String>,
    pub output_dir: String,

    // Publishing
    pub drafts: DraftVisibility,

    // Pagination
    pub per_page: usize,
    /// Writes a `latest.json` with the first N posts when set
    pub latest: Option<usize>,
    /// File stem for paginated documents (`page` -> page-1.json)
    pub page_prefix: String,

    #[serde(default)]
    pub highlight: HighlightConfig,

    // Collections
    pub movies: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:3000".to_string(),

            content_dir: "content".to_string(),
            posts_dir: None,
            output_dir: "public/api".to_string(),

            drafts: DraftVisibility::Hide,

            per_page: 10,
            latest: None,
            page_prefix: "page".to_string(),

            highlight: HighlightConfig::default(),

            movies: false,
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    /// Overlay deployment environment variables.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`; the pipeline itself
    /// never reads the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("SITE_URL").or_else(|| non_empty("URL")) {
            self.site_url = url;
        }

        if let Some(folder) = non_empty("CONTENT_FOLDER") {
            self.posts_dir = Some(folder);
        }

        let context = non_empty("CONTEXT");
        let node_env = non_empty("NODE_ENV");
        if context.as_deref() == Some("development") || node_env.as_deref() == Some("development")
        {
            self.drafts = DraftVisibility::Show;
        } else if node_env.as_deref() == Some("production") {
            self.drafts = DraftVisibility::Hide;
        }

        if non_empty("COLLECTION_MOVIE").as_deref() == Some("true") {
            self.movies = true;
        }
    }
}

/// Whether posts flagged `draft: true` are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftVisibility {
    Hide,
    Show,
}

impl DraftVisibility {
    pub fn shows_drafts(self) -> bool {
        self == DraftVisibility::Show
    }
}

/// Code block highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enable: bool,
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enable: true,
            theme: "base16-ocean.dark".to_string(),
            line_number: false,
        }
    }
}
