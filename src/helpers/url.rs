//! URL helper functions

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::content::{FeatureImage, ImageField};

lazy_static! {
    static ref MARKDOWN_IMAGE: Regex = Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap();
}

/// Directory every relative image path is rooted under
const IMAGE_DIR: &str = "images/";

/// Front-matter keys (besides `feature_image`) that hold image paths
pub const EXTRA_IMAGE_FIELDS: &[&str] = &["image", "cover", "thumbnail", "featured_image"];

/// Whether a path already carries an http(s) scheme
pub fn is_absolute_url(path: &str) -> bool {
    let lower = path.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Join a base URL and a path with exactly one slash between them
///
/// # Examples
/// ```ignore
/// join_url("https://example.com/", "/images/a.png") // -> "https://example.com/images/a.png"
/// ```
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

/// Rewrites relative image references to absolute URLs under the site's
/// `images/` directory.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    base_url: String,
}

impl ImageNormalizer {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Normalize a single image path.
    ///
    /// Absolute URLs and empty strings are returned unchanged; anything else
    /// loses its leading slashes, gains an `images/` prefix if missing and is
    /// joined to the base URL.
    ///
    /// # Examples
    /// ```ignore
    /// normalize("pic.jpg")        // -> "https://x.test/images/pic.jpg"
    /// normalize("/images/a.png")  // -> "https://x.test/images/a.png"
    /// ```
    pub fn normalize(&self, path: &str) -> String {
        if path.trim().is_empty() || is_absolute_url(path) {
            return path.to_string();
        }

        let clean = path.trim_start_matches('/');
        if clean.starts_with(IMAGE_DIR) {
            join_url(&self.base_url, clean)
        } else {
            join_url(&self.base_url, &format!("{}{}", IMAGE_DIR, clean))
        }
    }

    /// Normalize a `feature_image` value into its object form.
    ///
    /// Only `url` is rewritten; alt, title, width, height and any other
    /// members pass through untouched.
    pub fn normalize_field(&self, field: Option<ImageField>) -> Option<FeatureImage> {
        match field? {
            ImageField::Path(path) if path.trim().is_empty() => None,
            ImageField::Path(path) => Some(FeatureImage {
                url: Some(self.normalize(&path)),
                ..Default::default()
            }),
            ImageField::Object(mut image) => {
                image.url = image.url.map(|url| self.normalize(&url));
                Some(image)
            }
        }
    }

    /// Rewrite `![alt](path)` references in a markdown body.
    ///
    /// Absolute URLs and root-relative paths (`/...`) are left as written.
    pub fn rewrite_markdown(&self, markdown: &str) -> String {
        MARKDOWN_IMAGE
            .replace_all(markdown, |caps: &Captures| {
                let alt = &caps[1];
                let path = &caps[2];
                if is_absolute_url(path) || path.starts_with('/') {
                    caps[0].to_string()
                } else {
                    format!("![{}]({})", alt, self.normalize(path))
                }
            })
            .into_owned()
    }

    /// Normalize the secondary image keys carried in free-form front-matter.
    ///
    /// A string value gains a sibling `<key>_url`; an object value with a
    /// string `url` member has that member rewritten.
    pub fn normalize_extra(&self, fields: &mut Map<String, Value>) {
        for key in EXTRA_IMAGE_FIELDS {
            let absolute = match fields.get_mut(*key) {
                Some(Value::String(path)) if !path.is_empty() => Some(self.normalize(path)),
                Some(Value::Object(object)) => {
                    if let Some(Value::String(url)) = object.get_mut("url") {
                        *url = self.normalize(url);
                    }
                    None
                }
                _ => None,
            };

            if let Some(url) = absolute {
                fields.insert(format!("{}_url", key), Value::String(url));
            }
        }
    }
}
