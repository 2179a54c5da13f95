use crate::types::same_tag;

/// Keys the suggestion popup reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Tab,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Cursor moved to another suggestion
    Moved,
    /// The highlighted tag was accepted
    Committed(String),
    Dismissed,
    /// Popup closed or key not handled; the caller may use it
    Ignored,
}

/// Tag suggestions for the `#token` currently being typed.
#[derive(Debug, Clone, Default)]
pub struct Autocomplete {
    suggestions: Vec<String>,
    cursor: usize,
    open: bool,
}

impl Autocomplete {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute suggestions for `pending` (the text after `#`). Matching is a
    /// case-insensitive substring test; tags already selected are left out.
    pub fn update(&mut self, pending: Option<&str>, tags: &[String], selected: &[String]) {
        let Some(pending) = pending else {
            self.close();
            return;
        };

        let needle = pending.to_lowercase();
        self.suggestions = tags
            .iter()
            .filter(|tag| tag.to_lowercase().contains(&needle))
            .filter(|tag| !selected.iter().any(|s| same_tag(s, tag)))
            .cloned()
            .collect();
        self.cursor = 0;
        self.open = !self.suggestions.is_empty();
    }

    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        if !self.open {
            return KeyOutcome::Ignored;
        }

        match key {
            Key::Down => {
                if self.cursor + 1 < self.suggestions.len() {
                    self.cursor += 1;
                }
                KeyOutcome::Moved
            }
            Key::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                KeyOutcome::Moved
            }
            Key::Tab | Key::Enter => match self.highlighted().map(str::to_string) {
                Some(tag) => {
                    self.close();
                    KeyOutcome::Committed(tag)
                }
                None => KeyOutcome::Ignored,
            },
            Key::Escape => {
                self.close();
                KeyOutcome::Dismissed
            }
        }
    }

    pub fn suggestions(&self) -> &[String] {
        if self.open {
            &self.suggestions
        } else {
            &[]
        }
    }

    pub fn highlighted(&self) -> Option<&str> {
        if !self.open {
            return None;
        }
        self.suggestions.get(self.cursor).map(String::as_str)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
        self.suggestions.clear();
        self.cursor = 0;
    }
}
