use crate::charts::ChartGroupSpec;
use crate::dom::escape_html;
use crate::syntax_highlighter::SyntaxHighlighter;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Tag};

const DIAGRAM_PREFIX: &str = "diagram:";

/// What a fenced block turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    ChartGroup(ChartGroupSpec),
    /// Diagram type name as written after `diagram:`
    Diagram(String),
    Code { lang: String, code: String },
}

impl Block {
    pub fn classify(info: &str, code: &str) -> Self {
        let lang = info.split_whitespace().next().unwrap_or("");

        if let Some(name) = lang.strip_prefix(DIAGRAM_PREFIX) {
            return Block::Diagram(name.trim().to_string());
        }
        if let Some(spec) = ChartGroupSpec::parse_block(code) {
            return Block::ChartGroup(spec);
        }

        Block::Code {
            lang: lang.to_string(),
            code: code.to_string(),
        }
    }
}

pub fn placeholder(index: usize) -> String {
    format!("<div>@@BLOCK{}@@</div>\n", index)
}

/// Replaces fenced blocks in a markdown event stream with placeholders and
/// keeps their rendered HTML for later restoration.
pub struct BlockPass<'h> {
    highlighter: &'h SyntaxHighlighter,
    rendered: Vec<String>,
    charts: usize,
    diagrams: usize,
}

impl<'h> BlockPass<'h> {
    pub fn new(highlighter: &'h SyntaxHighlighter) -> Self {
        Self {
            highlighter,
            rendered: Vec::new(),
            charts: 0,
            diagrams: 0,
        }
    }

    /// Soft breaks become hard breaks; every code block becomes a
    /// placeholder.
    pub fn transform<'a>(&mut self, events: impl IntoIterator<Item = Event<'a>>) -> Vec<Event<'a>> {
        let mut out = Vec::new();
        let mut open: Option<(String, String)> = None;

        for event in events {
            if let Some((info, code)) = open.as_mut() {
                match event {
                    Event::Text(text) => code.push_str(&text),
                    Event::End(Tag::CodeBlock(_)) => {
                        let block = Block::classify(info, code);
                        open = None;
                        let html = self.render(block);
                        out.push(Event::Html(CowStr::from(self.push(html))));
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let info = match kind {
                        CodeBlockKind::Fenced(info) => info.to_string(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    open = Some((info, String::new()));
                }
                Event::SoftBreak => out.push(Event::HardBreak),
                event => out.push(event),
            }
        }

        out
    }

    fn push(&mut self, html: String) -> String {
        self.rendered.push(html);
        placeholder(self.rendered.len() - 1)
    }

    pub fn render(&mut self, block: Block) -> String {
        match block {
            Block::ChartGroup(spec) => {
                let id = format!("chart-group-{}", self.charts);
                self.charts += 1;
                spec.container_html(&id)
            }
            Block::Diagram(name) => {
                let id = format!("diagram-{}", self.diagrams);
                self.diagrams += 1;
                format!(
                    "<div class=\"diagram-container\" id=\"{}\" data-diagram=\"{}\"></div>",
                    id,
                    escape_html(&name)
                )
            }
            Block::Code { lang, code } => self.highlighter.render_block(&code, &lang),
        }
    }

    pub fn rendered(&self) -> &[String] {
        &self.rendered
    }
}
