use crate::dom::escape_html;
use crate::parser::map_prose;
use katex::{OptsBuilder, OutputType};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MathError {
    #[error("failed to build KaTeX options: {0}")]
    Options(String),
    #[error("KaTeX rendering failed: {0}")]
    Render(String),
}

/// Turns TeX into HTML.
pub trait Typesetter {
    fn typeset(&self, tex: &str, display: bool) -> Result<String, MathError>;
}

pub struct KatexTypesetter {
    display: katex::Opts,
    inline: katex::Opts,
}

impl KatexTypesetter {
    pub fn new() -> Result<Self, MathError> {
        Ok(Self {
            display: Self::opts(true)?,
            inline: Self::opts(false)?,
        })
    }

    fn opts(display_mode: bool) -> Result<katex::Opts, MathError> {
        let mut builder = OptsBuilder::default();
        builder.display_mode(display_mode);
        builder.output_type(OutputType::Html);
        builder
            .build()
            .map_err(|err| MathError::Options(err.to_string()))
    }
}

impl Typesetter for KatexTypesetter {
    fn typeset(&self, tex: &str, display: bool) -> Result<String, MathError> {
        let opts = if display { &self.display } else { &self.inline };
        katex::render_with_opts(tex, opts).map_err(|err| MathError::Render(err.to_string()))
    }
}

/// Gives the source back with its delimiters.
pub struct Passthrough;

impl Typesetter for Passthrough {
    fn typeset(&self, tex: &str, display: bool) -> Result<String, MathError> {
        Ok(delimit(tex, display))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathSpan {
    pub tex: String,
    pub display: bool,
}

impl MathSpan {
    /// The span as it was written.
    pub fn literal(&self) -> String {
        delimit(&self.tex, self.display)
    }

    /// Typeset, or the escaped literal if the typesetter rejects it.
    pub fn render(&self, typesetter: &dyn Typesetter) -> String {
        match typesetter.typeset(&self.tex, self.display) {
            Ok(html) => html,
            Err(e) => {
                log::warn!("Math left as text ({}): {}", e, self.literal());
                escape_html(&self.literal())
            }
        }
    }
}

fn delimit(tex: &str, display: bool) -> String {
    if display {
        format!("$${}$$", tex)
    } else {
        format!("${}$", tex)
    }
}

pub fn placeholder(index: usize) -> String {
    format!("@@MATH{}@@", index)
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@@MATH(\d+)@@").unwrap())
}

/// Replace math spans outside fenced code with placeholders, display math
/// (`$$...$$`) first, then inline math (`$...$`).
pub fn extract(text: &str) -> (String, Vec<MathSpan>) {
    let mut spans = Vec::new();
    let text = map_prose(text, |prose| {
        let prose = extract_display(prose, &mut spans);
        extract_inline(&prose, &mut spans)
    });
    (text, spans)
}

/// Substitute every placeholder in one pass.
pub fn restore(text: &str, spans: &[MathSpan], typesetter: &dyn Typesetter) -> String {
    placeholder_regex()
        .replace_all(text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| spans.get(i))
                .map(|span| span.render(typesetter))
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn push_span(spans: &mut Vec<MathSpan>, tex: &str, display: bool) -> String {
    spans.push(MathSpan {
        tex: tex.to_string(),
        display,
    });
    placeholder(spans.len() - 1)
}

fn extract_display(text: &str, spans: &mut Vec<MathSpan>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find("$$") {
        let Some(len) = rest[open + 2..].find("$$") else {
            break;
        };
        let close = open + 2 + len;
        out.push_str(&rest[..open]);
        out.push_str(&push_span(spans, &rest[open + 2..close], true));
        rest = &rest[close + 2..];
    }

    out.push_str(rest);
    out
}

fn extract_inline(text: &str, spans: &mut Vec<MathSpan>) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        let opens = is_single_dollar(bytes, i) && (i == 0 || bytes[i - 1] != b'\\');
        if let Some(close) = opens.then(|| find_inline_close(bytes, i + 1)).flatten() {
            out.push_str(&text[last..i]);
            out.push_str(&push_span(spans, &text[i + 1..close], false));
            i = close + 1;
            last = i;
            continue;
        }
        i += 1;
    }

    out.push_str(&text[last..]);
    out
}

/// A `$` with no `$` directly before or after it.
fn is_single_dollar(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'$'
        && (i == 0 || bytes[i - 1] != b'$')
        && bytes.get(i + 1) != Some(&b'$')
}

fn find_inline_close(bytes: &[u8], from: usize) -> Option<usize> {
    (from..bytes.len())
        .take_while(|&j| bytes[j] != b'\n')
        .find(|&j| j > from && is_single_dollar(bytes, j))
}
