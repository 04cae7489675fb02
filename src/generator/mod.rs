//! Generator module - orders the loaded records and writes the JSON feeds

mod pagination;

pub use pagination::{Page, Pagination, Paginator};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::Path;

use crate::config::DraftVisibility;
use crate::content::{Author, Category, Movie, Post, Tag};
use crate::Site;

/// Everything one pipeline run produces, ready to emit or serve
#[derive(Debug, Clone, Default)]
pub struct SiteData {
    /// Newest first, drafts already filtered
    pub posts: Vec<Post>,
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
    pub authors: Vec<Author>,
    /// `None` when the movie collection is disabled
    pub movies: Option<Vec<Movie>>,
    pub summary: BuildSummary,
}

impl SiteData {
    pub fn post(&self, slug: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.slug == slug)
    }

    pub fn movie(&self, slug: &str) -> Option<&Movie> {
        self.movies.as_ref()?.iter().find(|m| m.slug == slug)
    }
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    /// Markdown files seen in the posts directory
    pub processed: usize,
    pub emitted: usize,
    pub skipped_drafts: usize,
    /// Files that could not be read or parsed
    pub failed: usize,
    pub duplicates: usize,
}

/// Sort newest first by publication date.
///
/// The sort is stable, so posts with equal dates keep their load order.
pub fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.sort_date.cmp(&a.sort_date));
}

/// Drop drafts unless they are visible, returning how many were dropped
pub fn filter_drafts(posts: &mut Vec<Post>, drafts: DraftVisibility) -> usize {
    if drafts.shows_drafts() {
        return 0;
    }
    let before = posts.len();
    posts.retain(|p| !p.draft);
    before - posts.len()
}

/// Writes [`SiteData`] into the output directory
pub struct Generator<'a> {
    site: &'a Site,
}

impl<'a> Generator<'a> {
    pub fn new(site: &'a Site) -> Self {
        Self { site }
    }

    /// Write every JSON document, replacing the previous run's output
    pub fn generate(&self, data: &SiteData) -> Result<()> {
        let out = &self.site.output_dir;
        fs::create_dir_all(out)
            .with_context(|| format!("Failed to create output directory {:?}", out))?;

        self.remove_stale_output()?;

        // Aggregates
        let all = json!({ "posts": &data.posts });
        write_json(&out.join("posts.json"), &all)?;
        write_json(&out.join("index.json"), &all)?;

        self.generate_pages(&data.posts)?;

        if let Some(n) = self.site.config.latest {
            let latest = &data.posts[..n.min(data.posts.len())];
            write_json(&out.join("latest.json"), &json!({ "posts": latest }))?;
        }

        self.generate_post_files(&data.posts)?;

        write_json(
            &out.join("categories.json"),
            &json!({ "categories": &data.categories }),
        )?;
        write_json(&out.join("tags.json"), &json!({ "tags": &data.tags }))?;
        write_json(&out.join("authors.json"), &json!({ "authors": &data.authors }))?;

        if let Some(movies) = &data.movies {
            write_json(&out.join("movies.json"), &json!({ "movies": movies }))?;
        }

        tracing::info!(
            "Wrote {} posts to {:?} ({} pages)",
            data.posts.len(),
            out,
            Paginator::new(&data.posts, self.site.config.per_page).page_count()
        );

        Ok(())
    }

    /// Paginated `<prefix>-N.json` documents
    fn generate_pages(&self, posts: &[Post]) -> Result<()> {
        let paginator = Paginator::new(posts, self.site.config.per_page);
        for page in paginator.pages() {
            let name = format!(
                "{}-{}.json",
                self.site.config.page_prefix, page.pagination.current_page
            );
            write_json(&self.site.output_dir.join(name), &page)?;
        }
        Ok(())
    }

    /// One `posts/<slug>.json` per post
    fn generate_post_files(&self, posts: &[Post]) -> Result<()> {
        let dir = self.site.output_dir.join("posts");
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;

        for post in posts {
            if !is_safe_file_stem(&post.slug) {
                tracing::warn!("Not writing a file for slug {:?}", post.slug);
                continue;
            }
            write_json(&dir.join(format!("{}.json", post.slug)), post)?;
        }
        Ok(())
    }

    /// Remove per-post and page files so deleted posts do not linger
    fn remove_stale_output(&self) -> Result<()> {
        let out = &self.site.output_dir;

        let posts_dir = out.join("posts");
        if posts_dir.is_dir() {
            fs::remove_dir_all(&posts_dir)
                .with_context(|| format!("Failed to remove {:?}", posts_dir))?;
        }

        let prefix = format!("{}-", self.site.config.page_prefix);
        for entry in fs::read_dir(out).with_context(|| format!("Failed to read {:?}", out))? {
            let path = entry?.path();
            let is_page = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(&prefix))
                .and_then(|n| n.strip_suffix(".json"))
                .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
            if is_page && path.is_file() {
                fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
            }
        }

        Ok(())
    }
}

/// A slug usable as a file name inside the output directory
fn is_safe_file_stem(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\', '\0'])
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    tracing::debug!("Generated {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::helpers::sort_key;
    use serde_json::{Map, Value};
    use tempfile::TempDir;

    fn post(slug: &str, date: Option<&str>, draft: bool) -> Post {
        Post {
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            excerpt: None,
            published_at: date.unwrap_or_default().to_string(),
            date: None,
            draft,
            feature_image: None,
            category: None,
            tags: Vec::new(),
            author: None,
            content: String::new(),
            html: String::new(),
            source: format!("{}.md", slug),
            sort_date: sort_key(date),
            extra: Map::new(),
        }
    }

    fn read(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_sort_descending_and_stable() {
        let mut posts = vec![
            post("old", Some("2020-01-01"), false),
            post("tie-a", Some("2023-06-01T00:00:00Z"), false),
            post("undated", None, false),
            post("new", Some("2024-02-02"), false),
            post("tie-b", Some("2023-06-01"), false),
        ];
        sort_posts(&mut posts);

        let slugs: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["new", "tie-a", "tie-b", "old", "undated"]);
        for pair in posts.windows(2) {
            assert!(pair[0].sort_date >= pair[1].sort_date);
        }
    }

    #[test]
    fn test_filter_drafts() {
        let mut posts = vec![post("a", None, false), post("b", None, true)];
        assert_eq!(filter_drafts(&mut posts, DraftVisibility::Hide), 1);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "a");

        let mut posts = vec![post("a", None, false), post("b", None, true)];
        assert_eq!(filter_drafts(&mut posts, DraftVisibility::Show), 0);
        assert_eq!(posts.len(), 2);
    }

    #[test]
    fn test_generate_writes_documents() {
        let tmp = TempDir::new().unwrap();
        let config = SiteConfig {
            per_page: 2,
            latest: Some(1),
            movies: true,
            ..Default::default()
        };
        let site = Site::with_config(tmp.path(), config);

        let data = SiteData {
            posts: vec![
                post("c", Some("2024-03-01"), false),
                post("b", Some("2024-02-01"), false),
                post("a", Some("2024-01-01"), false),
            ],
            categories: vec![Category {
                slug: "news".to_string(),
                name: "News".to_string(),
            }],
            movies: Some(Vec::new()),
            ..Default::default()
        };

        Generator::new(&site).generate(&data).unwrap();
        let out = &site.output_dir;

        let all = read(&out.join("posts.json"));
        assert_eq!(all["posts"].as_array().unwrap().len(), 3);
        assert_eq!(all, read(&out.join("index.json")));

        let page2 = read(&out.join("page-2.json"));
        assert_eq!(page2["posts"][0]["slug"], "a");
        assert_eq!(page2["pagination"]["currentPage"], 2);
        assert_eq!(page2["pagination"]["totalPages"], 2);
        assert_eq!(page2["pagination"]["hasNextPage"], false);
        assert!(!out.join("page-3.json").exists());

        let latest = read(&out.join("latest.json"));
        assert_eq!(latest["posts"].as_array().unwrap().len(), 1);
        assert_eq!(latest["posts"][0]["slug"], "c");

        assert_eq!(read(&out.join("posts/b.json"))["title"], "B");
        assert_eq!(read(&out.join("categories.json"))["categories"][0]["name"], "News");
        assert_eq!(read(&out.join("tags.json")), json!({ "tags": [] }));
        assert_eq!(read(&out.join("movies.json")), json!({ "movies": [] }));
    }

    #[test]
    fn test_generate_empty_collection() {
        let tmp = TempDir::new().unwrap();
        let site = Site::with_config(tmp.path(), SiteConfig::default());

        Generator::new(&site).generate(&SiteData::default()).unwrap();
        let out = &site.output_dir;

        assert_eq!(read(&out.join("posts.json")), json!({ "posts": [] }));
        let page = read(&out.join("page-1.json"));
        assert_eq!(page["pagination"]["totalPages"], 1);
        assert_eq!(page["pagination"]["totalPosts"], 0);
        assert!(!out.join("movies.json").exists());
        assert!(!out.join("latest.json").exists());
    }

    #[test]
    fn test_regenerate_removes_stale_files() {
        let tmp = TempDir::new().unwrap();
        let config = SiteConfig {
            per_page: 1,
            page_prefix: "index".to_string(),
            ..Default::default()
        };
        let site = Site::with_config(tmp.path(), config);
        let generator = Generator::new(&site);

        let mut data = SiteData {
            posts: vec![post("one", None, false), post("two", None, false)],
            ..Default::default()
        };
        generator.generate(&data).unwrap();
        assert!(site.output_dir.join("index-2.json").exists());
        assert!(site.output_dir.join("posts/two.json").exists());

        data.posts.pop();
        generator.generate(&data).unwrap();
        assert!(site.output_dir.join("index-1.json").exists());
        assert!(!site.output_dir.join("index-2.json").exists());
        assert!(!site.output_dir.join("posts/two.json").exists());
        assert!(site.output_dir.join("index.json").exists());
    }

    #[test]
    fn test_unsafe_slug_gets_no_file() {
        assert!(!is_safe_file_stem("../escape"));
        assert!(!is_safe_file_stem(""));
        assert!(is_safe_file_stem("hello-world"));
    }
}
