//! Category, tag and author lookups keyed by slug

use indexmap::IndexMap;
use std::path::Path;

use super::loader::{load_dir, SourceFile};
use super::{Author, Category, FrontMatter, Tag};
use crate::helpers::ImageNormalizer;

/// Read-only slug lookups built once per run.
///
/// A reference to an unknown slug resolves to nothing; it is never an error.
#[derive(Debug, Clone, Default)]
pub struct Relations {
    categories: IndexMap<String, Category>,
    tags: IndexMap<String, Tag>,
    authors: IndexMap<String, Author>,
}

impl Relations {
    /// Load `categories/`, `tags/` and `authors/` under the content directory
    pub fn load(content_dir: &Path, images: &ImageNormalizer) -> Self {
        let categories = load_dir::<FrontMatter>(&content_dir.join("categories"))
            .files
            .into_iter()
            .map(|file| {
                let (slug, name) = slug_and_name(&file);
                Category { slug, name }
            })
            .collect();

        let tags = load_dir::<FrontMatter>(&content_dir.join("tags"))
            .files
            .into_iter()
            .map(|file| {
                let (slug, name) = slug_and_name(&file);
                Tag { slug, name }
            })
            .collect();

        let authors = load_dir::<FrontMatter>(&content_dir.join("authors"))
            .files
            .into_iter()
            .map(|file| {
                let (slug, name) = slug_and_name(&file);
                let fm = file.front_matter;
                Author {
                    slug,
                    name,
                    image_url: fm
                        .image_url
                        .filter(|url| !url.is_empty())
                        .map(|url| images.normalize(&url)),
                    bio: fm.bio,
                    website: fm.website,
                    twitter: fm.twitter,
                }
            })
            .collect();

        let relations = Self::from_parts(categories, tags, authors);
        tracing::debug!(
            "Loaded {} categories, {} tags, {} authors",
            relations.categories.len(),
            relations.tags.len(),
            relations.authors.len()
        );
        relations
    }

    /// Build lookups from entity lists; the first entry wins on duplicate slugs
    pub fn from_parts(categories: Vec<Category>, tags: Vec<Tag>, authors: Vec<Author>) -> Self {
        Self {
            categories: index_by_slug("category", categories, |c| &c.slug),
            tags: index_by_slug("tag", tags, |t| &t.slug),
            authors: index_by_slug("author", authors, |a| &a.slug),
        }
    }

    /// Resolve a category reference
    pub fn category(&self, slug: Option<&str>) -> Option<Category> {
        self.categories.get(slug?).cloned()
    }

    /// Resolve tag references in order, dropping unknown slugs
    pub fn tags(&self, slugs: &[String]) -> Vec<Tag> {
        slugs
            .iter()
            .filter_map(|slug| self.tags.get(slug).cloned())
            .collect()
    }

    /// Resolve an author reference
    pub fn author(&self, slug: Option<&str>) -> Option<Author> {
        self.authors.get(slug?).cloned()
    }

    /// All categories, in file name order
    pub fn all_categories(&self) -> Vec<Category> {
        self.categories.values().cloned().collect()
    }

    /// All tags, in file name order
    pub fn all_tags(&self) -> Vec<Tag> {
        self.tags.values().cloned().collect()
    }

    /// All authors, in file name order
    pub fn all_authors(&self) -> Vec<Author> {
        self.authors.values().cloned().collect()
    }
}

/// Explicit `slug` or the file stem, and `name` falling back to `title` then slug
fn slug_and_name(file: &SourceFile) -> (String, String) {
    let fm = &file.front_matter;
    let slug = fm
        .slug
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| file.stem.clone());
    let name = fm
        .name
        .clone()
        .or_else(|| fm.title.clone())
        .unwrap_or_else(|| slug.clone());
    (slug, name)
}

fn index_by_slug<T, F>(kind: &str, items: Vec<T>, slug_of: F) -> IndexMap<String, T>
where
    F: Fn(&T) -> &String,
{
    let mut map = IndexMap::new();
    for item in items {
        let slug = slug_of(&item).clone();
        if map.contains_key(&slug) {
            tracing::warn!("Duplicate {} slug {:?}, keeping the first one", kind, slug);
            continue;
        }
        map.insert(slug, item);
    }
    map
}
