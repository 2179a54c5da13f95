use crate::dom::escape_html;
use std::fmt::{Display, Write};

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// One SVG (or HTML) element with ordered attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    name: &'static str,
    attrs: Vec<(&'static str, String)>,
    children: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq)]
enum Content {
    Tag(Tag),
    Text(String),
}

impl Tag {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &'static str, value: impl Display) -> Self {
        self.attrs.push((key, value.to_string()));
        self
    }

    /// Numeric attribute, written with at most two decimals.
    pub fn num(self, key: &'static str, value: f64) -> Self {
        self.attr(key, fmt_num(value))
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn child(mut self, child: Tag) -> Self {
        self.children.push(Content::Tag(child));
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Tag>) -> Self {
        self.children
            .extend(children.into_iter().map(Content::Tag));
        self
    }

    pub fn push(&mut self, child: Tag) {
        self.children.push(Content::Tag(child));
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Content::Text(text.into()));
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.name);
        for (key, value) in &self.attrs {
            let _ = write!(out, " {}=\"{}\"", key, escape_html(value));
        }

        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        for child in &self.children {
            match child {
                Content::Tag(tag) => tag.write_to(out),
                Content::Text(text) => out.push_str(&escape_html(text)),
            }
        }
        let _ = write!(out, "</{}>", self.name);
    }
}

/// Root `<svg>` with a fixed viewBox.
pub fn svg(width: f64, height: f64) -> Tag {
    Tag::new("svg")
        .attr("xmlns", SVG_NS)
        .attr("viewBox", format!("0 0 {} {}", fmt_num(width), fmt_num(height)))
        .num("width", width)
        .num("height", height)
}

pub fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Tag {
    Tag::new("line")
        .num("x1", x1)
        .num("y1", y1)
        .num("x2", x2)
        .num("y2", y2)
}

pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Tag {
    Tag::new("rect")
        .num("x", x)
        .num("y", y)
        .num("width", width)
        .num("height", height)
}

pub fn text(x: f64, y: f64, content: &str) -> Tag {
    Tag::new("text").num("x", x).num("y", y).text(content)
}

pub fn fmt_num(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let s = format!("{:.2}", rounded);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
