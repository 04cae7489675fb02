//! List site content

use anyhow::Result;
use std::collections::HashMap;

use crate::content::loader::ContentLoader;
use crate::generator::SiteData;
use crate::Site;

/// List site content by type
pub fn run(site: &Site, content_type: &str) -> Result<()> {
    match content_type {
        "post" | "posts" => {
            let data = site.load()?;
            println!("Posts ({}):", data.posts.len());
            for post in &data.posts {
                let draft = if post.draft { " (draft)" } else { "" };
                println!(
                    "  {} - {}{} [{}]",
                    post.sort_date.format("%Y-%m-%d"),
                    post.title,
                    draft,
                    post.source
                );
            }
        }
        "category" | "categories" => {
            let data = site.load()?;
            let counts = usage(&data, |post| {
                post.category.iter().map(|c| c.slug.as_str()).collect()
            });
            println!("Categories ({}):", data.categories.len());
            for category in &data.categories {
                let count = counts.get(category.slug.as_str()).copied().unwrap_or(0);
                println!("  {} [{}] ({})", category.name, category.slug, count);
            }
        }
        "tag" | "tags" => {
            let data = site.load()?;
            let counts = usage(&data, |post| {
                post.tags.iter().map(|t| t.slug.as_str()).collect()
            });
            println!("Tags ({}):", data.tags.len());
            for tag in &data.tags {
                let count = counts.get(tag.slug.as_str()).copied().unwrap_or(0);
                println!("  {} [{}] ({})", tag.name, tag.slug, count);
            }
        }
        "author" | "authors" => {
            let data = site.load()?;
            let counts = usage(&data, |post| {
                post.author.iter().map(|a| a.slug.as_str()).collect()
            });
            println!("Authors ({}):", data.authors.len());
            for author in &data.authors {
                let count = counts.get(author.slug.as_str()).copied().unwrap_or(0);
                println!("  {} [{}] ({})", author.name, author.slug, count);
            }
        }
        "movie" | "movies" => {
            let movies = ContentLoader::new(site).load_movies();
            println!("Movies ({}):", movies.len());
            for movie in &movies {
                let title = movie
                    .fields
                    .get("title")
                    .and_then(|t| t.as_str())
                    .unwrap_or(&movie.slug);
                println!("  {} - {}", movie.sort_date.format("%Y-%m-%d"), title);
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: post, category, tag, author, movie",
                content_type
            );
        }
    }

    Ok(())
}

/// Count how many emitted posts reference each slug
fn usage<'a, F>(data: &'a SiteData, slugs_of: F) -> HashMap<&'a str, usize>
where
    F: Fn(&'a crate::content::Post) -> Vec<&'a str>,
{
    let mut counts = HashMap::new();
    for post in &data.posts {
        for slug in slugs_of(post) {
            *counts.entry(slug).or_insert(0) += 1;
        }
    }
    counts
}
