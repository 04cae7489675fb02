//! Content loader - turns a content directory into normalized records

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::error::ContentError;
use super::frontmatter::parse_with;
use super::{FrontMatter, MarkdownRenderer, Movie, Post, Relations};
use crate::helpers::{date_iso, parse_date, sort_key, ImageNormalizer};
use crate::Site;

/// Output keys a front-matter extra must not shadow
const RESERVED_KEYS: &[&str] = &["content", "html", "source"];

/// One markdown file split into front-matter and body
#[derive(Debug, Clone)]
pub struct SourceFile<T = FrontMatter> {
    pub path: PathBuf,
    /// File name without the `.md`/`.mdx` extension
    pub stem: String,
    pub front_matter: T,
    pub body: String,
}

/// Result of reading one directory
#[derive(Debug)]
pub struct LoadedDir<T = FrontMatter> {
    pub files: Vec<SourceFile<T>>,
    /// Files skipped because they could not be read or parsed
    pub failed: usize,
}

impl<T> Default for LoadedDir<T> {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            failed: 0,
        }
    }
}

/// Read every `.md`/`.mdx` file directly inside `dir`, in file name order.
///
/// A missing directory is empty input. A file that fails to read or parse is
/// logged and skipped.
pub fn load_dir<T>(dir: &Path) -> LoadedDir<T>
where
    T: DeserializeOwned + Default,
{
    if !dir.is_dir() {
        tracing::debug!("Content directory {:?} does not exist", dir);
        return LoadedDir::default();
    }

    let mut loaded = LoadedDir::default();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !is_markdown_file(path) {
            continue;
        }

        match load_file(path) {
            Ok(file) => loaded.files.push(file),
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                loaded.failed += 1;
            }
        }
    }

    loaded
}

/// Read and split a single markdown file
pub fn load_file<T>(path: &Path) -> Result<SourceFile<T>, ContentError>
where
    T: DeserializeOwned + Default,
{
    let content = fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (front_matter, body) = parse_with::<T>(&content).map_err(|source| ContentError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    Ok(SourceFile {
        path: path.to_path_buf(),
        stem,
        front_matter,
        body: body.to_string(),
    })
}

/// Posts read from the blog directory, before draft filtering and ordering
#[derive(Debug, Default)]
pub struct LoadedPosts {
    pub posts: Vec<Post>,
    /// Markdown files seen, including those that failed
    pub processed: usize,
    pub failed: usize,
    pub duplicates: usize,
}

/// Loads and normalizes the site's collections
pub struct ContentLoader<'a> {
    site: &'a Site,
    renderer: MarkdownRenderer,
    images: ImageNormalizer,
    /// Stands in for a missing publication date
    now: DateTime<Utc>,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Self {
        Self {
            site,
            renderer: MarkdownRenderer::with_options(&site.config.highlight),
            images: ImageNormalizer::new(&site.config.site_url),
            now: Utc::now(),
        }
    }

    /// Fix the timestamp used for posts without a date
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Load the category, tag and author lookups
    pub fn load_relations(&self) -> Relations {
        Relations::load(&self.site.content_dir, &self.images)
    }

    /// Load all posts, resolving relations against `relations`
    pub fn load_posts(&self, relations: &Relations) -> LoadedPosts {
        let dir = load_dir::<FrontMatter>(&self.site.posts_dir);

        let mut result = LoadedPosts {
            processed: dir.files.len() + dir.failed,
            failed: dir.failed,
            ..Default::default()
        };

        let mut seen = HashSet::new();
        for file in dir.files {
            let post = self.build_post(file, relations);
            if !seen.insert(post.slug.clone()) {
                tracing::warn!(
                    "Duplicate post slug {:?} in {}, keeping the first one",
                    post.slug,
                    post.source
                );
                result.duplicates += 1;
                continue;
            }
            result.posts.push(post);
        }

        result
    }

    /// Build a post record from its source file
    pub fn build_post(&self, file: SourceFile, relations: &Relations) -> Post {
        let SourceFile {
            path,
            stem,
            front_matter: fm,
            body,
        } = file;

        let slug = fm
            .slug
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(stem);

        let markdown = if body.trim().is_empty() {
            fm.html_content.clone().unwrap_or_default()
        } else {
            body
        };
        let content = self.images.rewrite_markdown(&markdown);
        let html = self.renderer.render(&content);

        let (published_at, sort_date) = match fm.published() {
            Some(written) => {
                let parsed = fm
                    .published_at
                    .as_deref()
                    .and_then(parse_date)
                    .or_else(|| fm.date.as_deref().and_then(parse_date));
                (written.to_string(), parsed.unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
            }
            None => (date_iso(&self.now), self.now),
        };

        let category = relations.category(fm.category.as_deref());
        let tags = relations.tags(&fm.tags);
        let author = relations.author(fm.author_ref());
        if fm.category.as_deref().is_some_and(|c| !c.is_empty()) && category.is_none() {
            tracing::debug!("Post {:?} references unknown category {:?}", slug, fm.category);
        }
        if tags.len() < fm.tags.len() {
            tracing::debug!("Post {:?} references unknown tags in {:?}", slug, fm.tags);
        }
        if fm.author_ref().is_some() && author.is_none() {
            tracing::debug!("Post {:?} references unknown author {:?}", slug, fm.author_ref());
        }

        let mut extra = fm.extra;
        for key in RESERVED_KEYS {
            extra.remove(*key);
        }
        self.images.normalize_extra(&mut extra);

        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Post {
            slug,
            title: fm.title.unwrap_or_else(|| "Untitled".to_string()),
            excerpt: fm.excerpt,
            published_at,
            date: fm.date,
            draft: fm.draft,
            feature_image: self.images.normalize_field(fm.feature_image),
            category,
            tags,
            author,
            content,
            html,
            source,
            sort_date,
            extra,
        }
    }

    /// Load the movie collection (`content/movies`)
    pub fn load_movies(&self) -> Vec<Movie> {
        let dir = load_dir::<Map<String, Value>>(&self.site.content_dir.join("movies"));

        let mut seen = HashSet::new();
        let mut movies = Vec::new();
        for file in dir.files {
            let mut fields = file.front_matter;

            let slug = match fields.remove("slug") {
                Some(Value::String(s)) if !s.trim().is_empty() => s,
                Some(Value::Number(n)) => n.to_string(),
                _ => file.stem,
            };
            if !seen.insert(slug.clone()) {
                tracing::warn!("Duplicate movie slug {:?}, keeping the first one", slug);
                continue;
            }

            if let Some(Value::String(poster)) = fields.get("poster_path") {
                if !poster.is_empty() {
                    let url = self.images.normalize(poster);
                    fields.insert("poster_url".to_string(), Value::String(url));
                }
            }

            let sort_date = sort_key(fields.get("release_date").and_then(Value::as_str));

            movies.push(Movie {
                slug,
                sort_date,
                fields,
            });
        }

        movies.sort_by(|a, b| b.sort_date.cmp(&a.sort_date));
        movies
    }
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "mdx")
        .unwrap_or(false)
}
