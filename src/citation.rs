use crate::dom::escape_html;
use crate::parser::map_prose;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// `(Author et al., "Title", Venue Year)` found in prose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub authors: String,
    pub title: String,
    /// Venue including the year, e.g. `NeurIPS 2020`
    pub venue: String,
}

impl Citation {
    /// First author's surname: the first word of the author list.
    pub fn surname(&self) -> &str {
        self.authors
            .split_whitespace()
            .next()
            .map(|word| word.trim_end_matches(','))
            .unwrap_or(&self.authors)
    }

    pub fn full_text(&self) -> String {
        format!("{}, \"{}\", {}", self.authors, self.title, self.venue)
    }

    pub fn to_html(&self) -> String {
        format!(
            "<span class=\"citation\" data-tooltip=\"{}\">[{}]</span>",
            escape_html(&self.full_text()),
            escape_html(self.surname())
        )
    }
}

fn citation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\(([^(),"\n]+?), "([^"\n]+)", ([^()"\n]+? \d{4})\)"#).unwrap()
    })
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@@CITE(\d+)@@").unwrap())
}

pub fn placeholder(index: usize) -> String {
    format!("@@CITE{}@@", index)
}

/// Replace citations outside fenced code with placeholders.
pub fn extract(text: &str) -> (String, Vec<Citation>) {
    let mut citations = Vec::new();
    let text = map_prose(text, |prose| {
        citation_regex()
            .replace_all(prose, |caps: &Captures| {
                citations.push(Citation {
                    authors: caps[1].trim().to_string(),
                    title: caps[2].to_string(),
                    venue: caps[3].trim().to_string(),
                });
                placeholder(citations.len() - 1)
            })
            .into_owned()
    });
    (text, citations)
}

pub fn restore(text: &str, citations: &[Citation]) -> String {
    placeholder_regex()
        .replace_all(text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| citations.get(i))
                .map(Citation::to_html)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_citation() {
        let (text, citations) = extract(
            "As shown (Chen et al., \"Exploring Simple Siamese Representation Learning\", CVPR 2021), it works.",
        );
        assert_eq!(text, "As shown @@CITE0@@, it works.");
        assert_eq!(citations[0].authors, "Chen et al.");
        assert_eq!(
            citations[0].title,
            "Exploring Simple Siamese Representation Learning"
        );
        assert_eq!(citations[0].venue, "CVPR 2021");
        assert_eq!(citations[0].surname(), "Chen");
    }

    #[test]
    fn test_plain_parentheses_untouched() {
        let source = "A remark (see below, or not) and (Smith, 2020).";
        let (text, citations) = extract(source);
        assert_eq!(text, source);
        assert!(citations.is_empty());
    }

    #[test]
    fn test_restore_renders_tooltip_span() {
        let (text, citations) = extract("(Grill et al., \"Bootstrap <Your> Latent\", NeurIPS 2020)");
        let html = restore(&text, &citations);
        assert_eq!(
            html,
            "<span class=\"citation\" data-tooltip=\"Grill et al., &quot;Bootstrap &lt;Your&gt; Latent&quot;, NeurIPS 2020\">[Grill]</span>"
        );
    }

    #[test]
    fn test_citation_in_code_fence_kept() {
        let source = "```\n(Chen et al., \"T\", ICML 2020)\n```\n";
        let (text, citations) = extract(source);
        assert_eq!(text, source);
        assert!(citations.is_empty());
    }
}
