use crate::i18n::{LangMap, FALLBACK_LANG, ORIGINAL};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TagsFormat {
        Single(String),
        List(Vec<String>),
    }

    Ok(match Option::<TagsFormat>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(TagsFormat::Single(tag)) => vec![tag],
        Some(TagsFormat::List(tags)) => tags,
    })
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(|date| normalize_date(&date)))
}

/// Timestamps (`2024-01-15T10:00:00Z`) are cut down to their calendar day.
fn normalize_date(date: &str) -> String {
    let date = date.trim();
    match date.get(..10) {
        Some(day) if date.len() > 10 && NaiveDate::parse_from_str(day, "%Y-%m-%d").is_ok() => {
            day.to_string()
        }
        _ => date.to_string(),
    }
}

/// Front matter of a post markdown file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frontmatter {
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_date")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

/// One language rendition of a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub slug: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub versions: LangMap<Version>,
}

impl Post {
    /// Best version for `lang`: exact, `original`, `en`, then the first one.
    pub fn version_for(&self, lang: &str) -> Option<&Version> {
        self.versions.pick(lang, |_| true)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Tag test used by typed `#tag` tokens, which ignore case.
    pub fn has_tag_folded(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| same_tag(t, tag))
    }

    /// Language tag of the version `version_for` picks.
    pub fn resolved_lang(&self, lang: &str) -> Option<&str> {
        [lang, ORIGINAL, FALLBACK_LANG]
            .into_iter()
            .find_map(|candidate| self.versions.keys().find(|key| *key == candidate))
            .or_else(|| self.versions.keys().next())
    }

    pub fn display_date(&self) -> String {
        format_date(&self.date)
    }
}

/// The site manifest: every post plus the distinct tags across them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

impl Catalog {
    pub fn find(&self, slug: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.slug == slug)
    }
}

/// `2024-01-15` -> `Jan 15, 2024`. Unparseable dates are shown as written.
/// Case-insensitive tag comparison, with full Unicode case folding.
pub fn same_tag(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

pub fn format_date(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

/// `2024-01-15` -> `January 15, 2024`, as shown on post pages.
pub fn format_long_date(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}
