use crate::blocks::BlockPass;
use crate::charts::{mount_charts, AxisScale, ChartSource};
use crate::citation::{self, Citation};
use crate::diagrams::{mount_diagrams, DiagramAssets};
use crate::math::{self, KatexTypesetter, MathSpan, Typesetter};
use crate::parser::Parser;
use crate::syntax_highlighter::SyntaxHighlighter;
use anyhow::Result;
use pulldown_cmark::{html, Options, Parser as MdParser};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Where chart data and diagram images come from when mounting.
pub struct MountContext<'a> {
    pub source: &'a dyn ChartSource,
    pub scale: AxisScale,
    pub assets: DiagramAssets,
}

#[derive(Debug, Clone, Default)]
pub struct RenderedPost {
    pub html: String,
    pub math_spans: usize,
    pub citations: usize,
    pub charts: usize,
    pub diagrams: usize,
}

pub struct Renderer {
    highlighter: SyntaxHighlighter,
    typesetter: Box<dyn Typesetter>,
    sanitizer: ammonia::Builder<'static>,
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

fn build_sanitizer() -> ammonia::Builder<'static> {
    let mut builder = ammonia::Builder::default();
    builder
        .add_tags(&["input"])
        .add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<div>@@BLOCK(\d+)@@</div>\n?|@@(MATH|CITE)(\d+)@@").unwrap())
}

impl Renderer {
    /// Renderer typesetting math with KaTeX.
    pub fn new() -> Result<Self> {
        Ok(Self::with_typesetter(Box::new(KatexTypesetter::new()?)))
    }

    pub fn with_typesetter(typesetter: Box<dyn Typesetter>) -> Self {
        Self {
            highlighter: SyntaxHighlighter::new(),
            typesetter,
            sanitizer: build_sanitizer(),
        }
    }

    /// Markdown (with optional front matter) to sanitized HTML with math,
    /// citations, and block containers restored. Charts and diagrams are
    /// not mounted yet.
    pub fn render_markdown(&self, markdown: &str) -> String {
        self.render_body(markdown).0
    }

    fn render_body(&self, markdown: &str) -> (String, usize, usize) {
        let (_, body) = Parser::split_frontmatter(markdown);
        let (text, citations) = citation::extract(body);
        let (text, spans) = math::extract(&text);

        let mut blocks = BlockPass::new(&self.highlighter);
        let events = blocks.transform(MdParser::new_ext(&text, markdown_options()));
        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        let clean = self.sanitizer.clean(&html_output).to_string();
        let restored = self.restore(&clean, &spans, &citations, blocks.rendered());
        (restored, spans.len(), citations.len())
    }

    /// Substitute every placeholder in one pass.
    fn restore(
        &self,
        html: &str,
        spans: &[MathSpan],
        citations: &[Citation],
        blocks: &[String],
    ) -> String {
        placeholder_regex()
            .replace_all(html, |caps: &Captures| {
                let restored = if let Some(index) = caps.get(1) {
                    index
                        .as_str()
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| blocks.get(i))
                        .cloned()
                } else {
                    let index = caps[3].parse::<usize>().ok();
                    match &caps[2] {
                        "MATH" => index
                            .and_then(|i| spans.get(i))
                            .map(|span| span.render(self.typesetter.as_ref())),
                        _ => index.and_then(|i| citations.get(i)).map(Citation::to_html),
                    }
                };
                restored.unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Full post body: render, then mount charts and diagrams into their
    /// containers.
    pub fn render_post(&self, markdown: &str, ctx: &MountContext) -> RenderedPost {
        let (html, math_spans, citations) = self.render_body(markdown);

        let (html, charts) = mount_charts(&html, ctx.source, ctx.scale).unwrap_or_else(|e| {
            log::warn!("Mounting charts failed: {}", e);
            (html.clone(), 0)
        });
        let (html, diagrams) = mount_diagrams(&html, &ctx.assets).unwrap_or_else(|e| {
            log::warn!("Mounting diagrams failed: {}", e);
            (html.clone(), 0)
        });

        RenderedPost {
            html,
            math_spans,
            citations,
            charts,
            diagrams,
        }
    }
}
