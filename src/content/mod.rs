//! Content module - loads markdown collections and normalizes them into records

mod error;
mod frontmatter;
pub mod loader;
mod markdown;
mod post;
mod relations;

pub use error::{ContentError, ParseError};
pub use frontmatter::{parse_with, FrontMatter, ImageField};
pub use markdown::MarkdownRenderer;
pub use post::{Author, Category, FeatureImage, Movie, Post, Tag};
pub use relations::Relations;
