use crate::autocomplete::{Autocomplete, Key, KeyOutcome};
use crate::debounce::Debouncer;
use crate::types::{Catalog, Post};
use std::time::{Duration, Instant};

/// Free-text search input split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedInput {
    /// `#tag` tokens that are finished (followed by whitespace)
    pub tags: Vec<String>,
    /// Every other token, joined by single spaces
    pub query: String,
    /// The `#token` still being typed at the end of the input, without `#`
    pub pending: Option<String>,
}

impl ParsedInput {
    /// Finished tags plus the pending one, as applied on confirmation.
    pub fn all_tags(&self) -> Vec<String> {
        let mut tags = self.tags.clone();
        if let Some(pending) = self.pending.as_ref().filter(|p| !p.is_empty()) {
            if !tags.contains(pending) {
                tags.push(pending.clone());
            }
        }
        tags
    }
}

pub fn parse_input(input: &str) -> ParsedInput {
    let mut parsed = ParsedInput::default();
    let mut words = Vec::new();
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let trailing_open = !input.ends_with(char::is_whitespace);

    for (i, token) in tokens.iter().enumerate() {
        let Some(tag) = token.strip_prefix('#') else {
            words.push(*token);
            continue;
        };

        if trailing_open && i + 1 == tokens.len() {
            parsed.pending = Some(tag.to_string());
        } else if !tag.is_empty() && !parsed.tags.iter().any(|t| t == tag) {
            parsed.tags.push(tag.to_string());
        }
    }

    parsed.query = words.join(" ");
    parsed
}

/// Replace the trailing `#partial` token of `input` with `#tag `.
pub fn complete_input(input: &str, tag: &str) -> String {
    let head = match input.rfind(char::is_whitespace) {
        Some(pos) if !input.ends_with(char::is_whitespace) => &input[..=pos],
        Some(_) => input,
        None if input.starts_with('#') => "",
        None => input,
    };
    let head = if head.is_empty() || head.ends_with(char::is_whitespace) {
        head.to_string()
    } else {
        format!("{} ", head)
    };
    format!("{}#{} ", head, tag)
}

/// Filters over the catalog. The rendered list is the catalog filtered by
/// the conjunction of all three, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub active_tag: Option<String>,
    pub selected_tags: Vec<String>,
    pub query: String,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag-button click; `None` or an empty tag means "all".
    pub fn click_tag(&mut self, tag: Option<&str>) {
        self.active_tag = tag.filter(|t| !t.is_empty()).map(str::to_string);
    }

    /// Confirm the free-text input: `#tag` tokens select tags, the rest is
    /// the text query.
    pub fn apply_input(&mut self, input: &str) {
        let parsed = parse_input(input);
        self.selected_tags = parsed.all_tags();
        self.query = parsed.query;
    }

    /// Apply input that is still being typed. A trailing `#token` is not a
    /// tag until it is completed or followed by whitespace.
    pub fn apply_typed(&mut self, input: &str) {
        let parsed = parse_input(input);
        self.selected_tags = parsed.tags;
        self.query = parsed.query;
    }

    pub fn matches(&self, post: &Post, lang: &str) -> bool {
        if let Some(tag) = &self.active_tag {
            if !post.has_tag(tag) {
                return false;
            }
        }

        let has_all_selected = self
            .selected_tags
            .iter()
            .all(|selected| post.has_tag_folded(selected));
        if !has_all_selected {
            return false;
        }

        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        let (title, summary) = post
            .version_for(lang)
            .map(|v| (v.title.to_lowercase(), v.summary.to_lowercase()))
            .unwrap_or_default();

        title.contains(&query)
            || summary.contains(&query)
            || post.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

pub fn filter<'a>(catalog: &'a Catalog, state: &SearchState, lang: &str) -> Vec<&'a Post> {
    catalog
        .posts
        .iter()
        .filter(|post| state.matches(post, lang))
        .collect()
}

type Listener<'a> = Box<dyn FnMut(&[&'a Post]) + 'a>;

/// Search box, tag buttons, and suggestion popup over one catalog.
///
/// Listeners receive the filtered list on every re-render. Text input
/// re-renders after the debounce delay; tag clicks and committed
/// suggestions re-render immediately.
pub struct SearchSession<'a> {
    catalog: &'a Catalog,
    lang: String,
    state: SearchState,
    input: String,
    autocomplete: Autocomplete,
    debouncer: Debouncer,
    listeners: Vec<Listener<'a>>,
}

impl<'a> SearchSession<'a> {
    pub fn new(catalog: &'a Catalog, lang: &str, debouncer: Debouncer) -> Self {
        Self {
            catalog,
            lang: lang.to_string(),
            state: SearchState::new(),
            input: String::new(),
            autocomplete: Autocomplete::new(),
            debouncer,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&[&'a Post]) + 'a) {
        self.listeners.push(Box::new(listener));
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn suggestions(&self) -> &[String] {
        self.autocomplete.suggestions()
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.autocomplete.highlighted()
    }

    pub fn popup_open(&self) -> bool {
        self.autocomplete.is_open()
    }

    pub fn results(&self) -> Vec<&'a Post> {
        filter(self.catalog, &self.state, &self.lang)
    }

    pub fn click_tag(&mut self, tag: Option<&str>) {
        self.state.click_tag(tag);
        self.render();
    }

    pub fn type_text(&mut self, text: &str, now: Instant) {
        self.input = text.to_string();
        let parsed = parse_input(text);
        self.autocomplete
            .update(parsed.pending.as_deref(), &self.catalog.tags, &parsed.tags);
        self.debouncer.schedule(now);
    }

    pub fn press(&mut self, key: Key) -> KeyOutcome {
        let outcome = self.autocomplete.handle_key(key);
        if let KeyOutcome::Committed(tag) = &outcome {
            self.input = complete_input(&self.input, tag);
            self.flush();
        }
        outcome
    }

    pub fn has_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Time left before a scheduled re-render, if one is pending.
    pub fn pending_delay(&self, now: Instant) -> Option<Duration> {
        self.debouncer.remaining(now)
    }

    /// Re-render if the debounce delay has passed. Returns whether it did.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.debouncer.poll(now) {
            return false;
        }
        self.state.apply_typed(&self.input);
        self.render();
        true
    }

    /// Apply the current input right away.
    pub fn flush(&mut self) {
        self.debouncer.cancel();
        self.state.apply_input(&self.input);
        self.render();
    }

    fn render(&mut self) {
        let results = filter(self.catalog, &self.state, &self.lang);
        for listener in &mut self.listeners {
            listener(&results);
        }
    }
}
