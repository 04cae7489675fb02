//! Scaffold a new blog post

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::helpers::date_iso;
use crate::Site;

/// Front-matter written for a fresh post
#[derive(Serialize)]
struct Scaffold<'a> {
    title: &'a str,
    slug: &'a str,
    published_at: String,
    draft: bool,
}

/// Create `<posts_dir>/<slug>.md` as a draft, returning its path
pub fn create_post(site: &Site, title: &str, slug: Option<&str>) -> Result<PathBuf> {
    let slug = slug::slugify(slug.unwrap_or(title));
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a slug from {:?}", title);
    }

    fs::create_dir_all(&site.posts_dir)
        .with_context(|| format!("Failed to create {:?}", site.posts_dir))?;

    let file_path = site.posts_dir.join(format!("{}.md", slug));
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let front_matter = serde_yaml::to_string(&Scaffold {
        title,
        slug: &slug,
        published_at: date_iso(&Utc::now()),
        draft: true,
    })?;
    let content = format!("---\n{}---\n\n", front_matter);

    fs::write(&file_path, content).with_context(|| format!("Failed to write {:?}", file_path))?;

    tracing::info!("Created: {:?}", file_path);

    Ok(file_path)
}
