//! Front-matter parsing

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::error::ParseError;
use super::post::FeatureImage;

/// Accepts any YAML scalar as a string (`slug: 2024` is a valid slug)
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct ScalarString;

    impl<'de> Visitor<'de> for ScalarString {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, number or boolean")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(ScalarString)
        }
    }

    deserializer.deserialize_any(ScalarString)
}

/// A flag where a key left empty (`draft:` or `draft: ~`) means `false`
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct LenientBool;

    impl<'de> Visitor<'de> for LenientBool {
        type Value = bool;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a boolean or nothing")
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            match value.trim() {
                "true" | "True" | "TRUE" => Ok(true),
                "false" | "False" | "FALSE" | "" => Ok(false),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(false)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(false)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(LenientBool)
        }
    }

    deserializer.deserialize_any(LenientBool)
}

/// Handles both a single value and a list of values
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value])
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<Value>()? {
                match item {
                    Value::String(s) => vec.push(s),
                    Value::Number(n) => vec.push(n.to_string()),
                    // Nulls and nested structures are not slugs
                    _ => {}
                }
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// An image field as authored: a bare path or a Decap object widget
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ImageField {
    Path(String),
    Object(FeatureImage),
}

/// Front-matter shared by posts and the category/tag/author/movie entries
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    #[serde(deserialize_with = "scalar_string")]
    pub title: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub slug: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub excerpt: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub date: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub published_at: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub draft: bool,
    pub feature_image: Option<ImageField>,
    /// Decap's markdown widget stores the body here
    #[serde(deserialize_with = "scalar_string")]
    pub html_content: Option<String>,

    // Relations
    #[serde(deserialize_with = "scalar_string")]
    pub category: Option<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub author: Option<String>,
    /// Legacy list form, only the first entry is used
    #[serde(deserialize_with = "string_or_vec")]
    pub authors: Vec<String>,

    // Entity fields
    #[serde(deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub image_url: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub bio: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub website: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub twitter: Option<String>,

    /// Keys not consumed above, carried through to the output record
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Split a leading `---` block off `content` and decode it as `T`.
///
/// Returns `(front_matter, body)`. A file without a block is all body.
pub fn parse_with<T>(content: &str) -> Result<(T, &str), ParseError>
where
    T: DeserializeOwned + Default,
{
    let content = content.trim_start_matches('\u{feff}');

    let mut lines = content.split_inclusive('\n');
    let first = lines.next().unwrap_or("");
    if first.trim_end() != "---" {
        return Ok((T::default(), content));
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == "---" {
            let yaml = &content[yaml_start..offset];
            let body = content[offset + line.len()..].trim_start_matches(['\n', '\r']);

            if yaml.trim().is_empty() {
                return Ok((T::default(), body));
            }

            let fm = serde_yaml::from_str::<T>(yaml)?;
            return Ok((fm, body));
        }
        offset += line.len();
    }

    Err(ParseError::Unclosed)
}

impl FrontMatter {
    /// Parse front-matter from content string
    pub fn parse(content: &str) -> Result<(Self, &str), ParseError> {
        parse_with(content)
    }

    /// The post's publication timestamp as written (`published_at`, else `date`)
    pub fn published(&self) -> Option<&str> {
        self.published_at
            .as_deref()
            .or(self.date.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// The post's author reference; `author` wins over the legacy `authors` list
    pub fn author_ref(&self) -> Option<&str> {
        self.author
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.authors.first().map(String::as_str))
    }
}
