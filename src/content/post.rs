//! Post, entity and movie records as they are emitted

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An object-shaped image (Decap `object` widget with an `image` url)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A blog post
#[derive(Debug, Clone, Default, Serialize)]
pub struct Post {
    /// Unique within the collection (front-matter `slug`, else file stem)
    pub slug: String,

    pub title: String,

    pub excerpt: Option<String>,

    /// Publication timestamp as written, or the run time when absent
    pub published_at: String,

    /// Legacy `date` field, echoed when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    pub draft: bool,

    pub feature_image: Option<FeatureImage>,

    pub category: Option<Category>,

    pub tags: Vec<Tag>,

    pub author: Option<Author>,

    /// Markdown with image references made absolute
    pub content: String,

    /// Sanitized HTML rendering of `content`
    pub html: String,

    /// Source file name
    pub source: String,

    /// Ordering key; unparsable timestamps sort as the epoch
    #[serde(skip)]
    pub sort_date: DateTime<Utc>,

    /// Front-matter keys without a dedicated field
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A category entry (`content/categories`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub slug: String,
    pub name: String,
}

/// A tag entry (`content/tags`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub slug: String,
    pub name: String,
}

/// An author entry (`content/authors`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Author {
    pub slug: String,
    pub name: String,
    pub image_url: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
}

/// A movie entry (`content/movies`), front-matter passed through
#[derive(Debug, Clone, Serialize)]
pub struct Movie {
    pub slug: String,

    #[serde(skip)]
    pub sort_date: DateTime<Utc>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
