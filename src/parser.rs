use crate::i18n::{KNOWN_LANGS, ORIGINAL};
use crate::types::Frontmatter;
use anyhow::{Context, Result};
use pulldown_cmark::{Event, Parser as MdParser, Tag};
use std::fs;
use std::ops::Range;
use std::path::Path;

/// A post file as found on disk, before it joins the catalog.
#[derive(Debug, Clone)]
pub struct PostSource {
    pub slug: String,
    pub lang: String,
    pub file_name: String,
    pub frontmatter: Frontmatter,
    pub content: String,
}

pub struct Parser;

impl Parser {
    pub fn parse_file(path: &Path) -> Result<PostSource> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid file path: {}", path.display()))?
            .to_string();

        let (frontmatter_str, markdown) = Self::split_frontmatter(&content);
        let frontmatter_str = frontmatter_str.ok_or_else(|| {
            anyhow::anyhow!("Missing frontmatter in {}. Expected:\n---\ntitle: ...\n---", file_name)
        })?;
        let frontmatter = Self::parse_frontmatter(frontmatter_str)
            .with_context(|| format!("Invalid frontmatter in {}", file_name))?;
        let (slug, lang) = Self::parse_filename(&file_name);

        Ok(PostSource {
            slug,
            lang,
            file_name,
            frontmatter,
            content: markdown.to_string(),
        })
    }

    /// Split optional `---` delimited front matter from the body. Content
    /// without a leading block is returned whole as the body.
    pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
        let Some(rest) = content
            .strip_prefix("---\n")
            .or_else(|| content.strip_prefix("---\r\n"))
        else {
            return (None, content);
        };

        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            if line.trim_end_matches(['\r', '\n']) == "---" && line.ends_with('\n') {
                let frontmatter = rest[..offset].trim_end_matches(['\r', '\n']);
                return (Some(frontmatter), &rest[offset + line.len()..]);
            }
            offset += line.len();
        }

        (None, content)
    }

    pub fn parse_frontmatter(yaml: &str) -> Result<Frontmatter> {
        serde_yaml::from_str(yaml).context("Failed to parse frontmatter YAML")
    }

    /// `how-to-read.md` -> (`how-to-read`, `original`),
    /// `how-to-read.en.md` -> (`how-to-read`, `en`).
    pub fn parse_filename(file_name: &str) -> (String, String) {
        let stem = file_name.strip_suffix(".md").unwrap_or(file_name);

        for lang in KNOWN_LANGS {
            if let Some(slug) = stem.strip_suffix(&format!(".{}", lang)) {
                return (slug.to_string(), lang.to_string());
            }
        }

        (stem.to_string(), ORIGINAL.to_string())
    }
}

/// Apply `f` to every run of text outside code blocks, fenced or indented.
/// Code blocks are copied through unchanged.
pub fn map_prose(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for range in code_block_ranges(text) {
        if range.start < last {
            continue;
        }
        out.push_str(&f(&text[last..range.start]));
        out.push_str(&text[range.clone()]);
        last = range.end;
    }

    out.push_str(&f(&text[last..]));
    out
}

/// Byte ranges of the top-level code blocks in `text`, in order.
fn code_block_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::new();

    for (event, range) in MdParser::new(text).into_offset_iter() {
        if let Event::Start(Tag::CodeBlock(_)) = event {
            if ranges.last().map_or(true, |last| range.start >= last.end) {
                ranges.push(range);
            }
        }
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_split_frontmatter() {
        let content = "---\ntitle: Test Post\n---\nContent here";

        let (fm, body) = Parser::split_frontmatter(content);
        assert_eq!(fm, Some("title: Test Post"));
        assert_eq!(body, "Content here");
    }

    #[test]
    fn test_split_frontmatter_absent() {
        let content = "# Heading\n\n---\n\nText";
        let (fm, body) = Parser::split_frontmatter(content);
        assert!(fm.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn test_split_frontmatter_missing_closing_delimiter() {
        let content = "---\ntitle: Test Post\nContent without closing delimiter";
        let (fm, body) = Parser::split_frontmatter(content);
        assert!(fm.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn test_split_frontmatter_keeps_later_rules() {
        let content = "---\ntitle: T\n---\nIntro\n\n---\n\nMore";
        let (fm, body) = Parser::split_frontmatter(content);
        assert_eq!(fm, Some("title: T"));
        assert_eq!(body, "Intro\n\n---\n\nMore");
    }

    #[test]
    fn test_parse_filename() {
        assert_eq!(
            Parser::parse_filename("how-to-read.md"),
            ("how-to-read".to_string(), "original".to_string())
        );
        assert_eq!(
            Parser::parse_filename("how-to-read.en.md"),
            ("how-to-read".to_string(), "en".to_string())
        );
        assert_eq!(
            Parser::parse_filename("notes.v2.md"),
            ("notes.v2".to_string(), "original".to_string())
        );
    }

    #[test]
    fn test_parse_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jepa.zh.md");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            "---\ntitle: 联合嵌入\ndate: 2024-03-01\ntags: [ml, ssl]\n---\nBody $x$"
        )
        .unwrap();

        let post = Parser::parse_file(&path).unwrap();
        assert_eq!(post.slug, "jepa");
        assert_eq!(post.lang, "zh");
        assert_eq!(post.frontmatter.title, "联合嵌入");
        assert_eq!(post.frontmatter.tags, vec!["ml", "ssl"]);
        assert_eq!(post.content, "Body $x$");
    }

    #[test]
    fn test_parse_file_without_frontmatter_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.md");
        fs::write(&path, "Just text").unwrap();
        assert!(Parser::parse_file(&path).is_err());
    }

    #[test]
    fn test_map_prose_skips_fences() {
        let text = "a $x$\n```python\nprint('$y$')\n```\nb $z$";
        let out = map_prose(text, |prose| prose.to_uppercase());
        assert_eq!(out, "A $X$\n```python\nprint('$y$')\n```\nB $Z$");
    }

    #[test]
    fn test_map_prose_skips_indented_code() {
        let text = "Intro $a$\n\n    price = $b$\n    total = $c$\n\nAfter $d$.\n";
        let out = map_prose(text, |prose| prose.replace('$', "%"));
        assert_eq!(
            out,
            "Intro %a%\n\n    price = $b$\n    total = $c$\n\nAfter %d%.\n"
        );
    }

    #[test]
    fn test_map_prose_keeps_indented_paragraph_continuation() {
        let text = "para $a$\n    still para $b$\n";
        let out = map_prose(text, |prose| prose.replace('$', "%"));
        assert_eq!(out, "para %a%\n    still para %b%\n");
    }

    #[test]
    fn test_map_prose_unclosed_fence_runs_to_end() {
        let text = "x\n~~~\nkeep\n";
        let out = map_prose(text, |prose| prose.replace('x', "y"));
        assert_eq!(out, "y\n~~~\nkeep\n");
    }
}
