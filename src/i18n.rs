use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Language tag for a post written in its author's own language.
pub const ORIGINAL: &str = "original";

/// Language tried after the requested one and `original`.
pub const FALLBACK_LANG: &str = "en";

/// Language suffixes recognised in post file names (`slug.en.md`).
pub const KNOWN_LANGS: &[&str] = &["en", "zh", "ja"];

/// A language-keyed map that remembers insertion order, so "the first
/// available value" means the first one written in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> LangMap<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn get(&self, lang: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(key, _)| key == lang)
            .map(|(_, value)| value)
    }

    /// Insert or replace. A replaced entry keeps its original position.
    pub fn insert(&mut self, lang: impl Into<String>, value: T) {
        let lang = lang.into();
        match self.entries.iter_mut().find(|(key, _)| *key == lang) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((lang, value)),
        }
    }

    pub fn first(&self) -> Option<&T> {
        self.entries.first().map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fallback lookup: `lang`, then `original`, then `en`, then the first
    /// entry. Values rejected by `usable` are treated as missing.
    pub fn pick(&self, lang: &str, usable: impl Fn(&T) -> bool) -> Option<&T> {
        [lang, ORIGINAL, FALLBACK_LANG]
            .iter()
            .find_map(|candidate| self.get(candidate).filter(|value| usable(value)))
            .or_else(|| self.first().filter(|value| usable(value)))
    }
}

impl<T> Default for LangMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for LangMap<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (lang, value) in iter {
            map.insert(lang, value);
        }
        map
    }
}

impl<T: Serialize> Serialize for LangMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct LangMapVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for LangMapVisitor<T> {
    type Value = LangMap<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map keyed by language tag")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = LangMap::new();
        while let Some((key, value)) = access.next_entry::<String, T>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for LangMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(LangMapVisitor(PhantomData))
    }
}

/// Text that is either the same in every language or given per language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    ByLang(LangMap<String>),
}

impl LocalizedText {
    pub fn resolve(&self, lang: &str) -> &str {
        match self {
            Self::Plain(text) => text,
            Self::ByLang(map) => map
                .pick(lang, |text| !text.is_empty())
                .map(String::as_str)
                .unwrap_or(""),
        }
    }
}

impl From<&str> for LocalizedText {
    fn from(text: &str) -> Self {
        Self::Plain(text.to_string())
    }
}

/// Resolve possibly-absent localized text; absence yields an empty string.
pub fn resolve(text: Option<&LocalizedText>, lang: &str) -> String {
    text.map(|t| t.resolve(lang).to_string()).unwrap_or_default()
}

/// Display label for a language tag in switchers.
pub fn lang_label(lang: &str) -> String {
    if lang == ORIGINAL {
        "原".to_string()
    } else {
        lang.to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_lang(pairs: &[(&str, &str)]) -> LocalizedText {
        LocalizedText::ByLang(pairs.iter().map(|(k, v)| (*k, v.to_string())).collect())
    }

    #[test]
    fn test_resolve_exact_language() {
        let text = by_lang(&[("original", "原文"), ("en", "English"), ("zh", "中文")]);
        assert_eq!(text.resolve("zh"), "中文");
    }

    #[test]
    fn test_resolve_falls_back_to_original_then_en() {
        let text = by_lang(&[("en", "English"), ("original", "原文")]);
        assert_eq!(text.resolve("ja"), "原文");

        let text = by_lang(&[("zh", "中文"), ("en", "English")]);
        assert_eq!(text.resolve("ja"), "English");
    }

    #[test]
    fn test_resolve_falls_back_to_first_value() {
        let text = by_lang(&[("zh", "中文"), ("ja", "日本語")]);
        assert_eq!(text.resolve("en"), "中文");
    }

    #[test]
    fn test_resolve_skips_empty_values() {
        let text = by_lang(&[("en", ""), ("original", "原文")]);
        assert_eq!(text.resolve("en"), "原文");
    }

    #[test]
    fn test_resolve_absent_and_plain() {
        assert_eq!(resolve(None, "en"), "");
        assert_eq!(resolve(Some(&LocalizedText::from("Hello")), "zh"), "Hello");
        assert_eq!(resolve(Some(&by_lang(&[])), "en"), "");
    }

    #[test]
    fn test_deserialize_keeps_order() {
        let text: LocalizedText =
            serde_json::from_str(r#"{"zh": "中文", "en": "English", "ja": "日本語"}"#).unwrap();
        let LocalizedText::ByLang(map) = &text else {
            panic!("expected per-language text");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["zh", "en", "ja"]);
        assert_eq!(text.resolve("fr"), "English");

        let plain: LocalizedText = serde_yaml::from_str("\"Just text\"").unwrap();
        assert_eq!(plain, LocalizedText::from("Just text"));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut map = LangMap::new();
        map.insert("en", 1);
        map.insert("zh", 2);
        map.insert("en", 3);
        assert_eq!(map.first(), Some(&3));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_lang_label() {
        assert_eq!(lang_label("original"), "原");
        assert_eq!(lang_label("en"), "EN");
    }
}
