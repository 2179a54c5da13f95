use crate::dom::escape_html;
use anyhow::Result;
use autumnus::formatter::Formatter;
use autumnus::languages::Language;
use autumnus::HtmlLinkedBuilder;

/// Highlights ordinary fenced code. Output uses linked CSS classes, so the
/// theme lives in the stylesheet.
#[derive(Debug, Default)]
pub struct SyntaxHighlighter;

impl SyntaxHighlighter {
    pub fn new() -> Self {
        Self
    }

    pub fn highlight(&self, code: &str, lang: &str) -> Result<String> {
        let language = Language::guess(lang, code);

        let formatter = HtmlLinkedBuilder::new()
            .source(code)
            .lang(language)
            .pre_class(Some("code-block"))
            .build()?;

        let mut output = Vec::new();
        formatter.format(&mut output)?;

        Ok(String::from_utf8(output)?)
    }

    /// Highlighted HTML, or an escaped plain block if highlighting fails.
    pub fn render_block(&self, code: &str, lang: &str) -> String {
        self.highlight(code, lang).unwrap_or_else(|e| {
            log::warn!("Highlighting {} code failed: {}", lang, e);
            plain_block(code, lang)
        })
    }
}

pub fn plain_block(code: &str, lang: &str) -> String {
    if lang.is_empty() {
        format!("<pre class=\"code-block\"><code>{}</code></pre>", escape_html(code))
    } else {
        format!(
            "<pre class=\"code-block\"><code class=\"language-{}\">{}</code></pre>",
            escape_html(lang),
            escape_html(code)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_escapes_source() {
        let html = SyntaxHighlighter::new().render_block("let x = a < b;\n", "rust");
        assert!(html.contains("code-block"));
        assert!(html.contains("&lt;"));
        assert!(!html.contains("a < b"));
    }

    #[test]
    fn test_plain_block() {
        assert_eq!(
            plain_block("<x>", "py"),
            "<pre class=\"code-block\"><code class=\"language-py\">&lt;x&gt;</code></pre>"
        );
        assert_eq!(
            plain_block("x", ""),
            "<pre class=\"code-block\"><code>x</code></pre>"
        );
    }
}
