//! Interactive incremental selection.
//!
//! A [`Picker`] is a small state machine fed one [`Key`] at a time. After every
//! edit it recomputes its candidate list and a preview of the best candidate
//! from a [`CandidateSource`], so the whole "live preview while typing"
//! behaviour is a pure function of (source, buffer) and can be tested without
//! a terminal. [`terminal`] wires it to real key events.
//!
//! The same machine drives node navigation ([`NodeSource`]), tag entry
//! ([`TagSource`]), and session browsing ([`SessionSource`]).

pub mod sources;
pub mod terminal;

pub use sources::{NodeSource, SessionSource, TagSource};

/// Editing input understood by a picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter,
    Escape,
    Up,
    Down,
    Tab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerState {
    /// Nothing typed yet.
    Idle,
    /// The buffer holds input and candidates track it.
    Searching,
}

/// Why Enter did not commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoMatches,
    /// More than one candidate and none picked from the shortlist.
    Ambiguous(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent<T> {
    /// Buffer, candidates, or highlight changed.
    Updated,
    /// Key not accepted by this source.
    Ignored,
    /// Enter pressed but nothing could be chosen. State is unchanged.
    Rejected(Rejection),
    Committed(T),
    Cancelled,
}

/// Supplies and describes the things a picker chooses between.
pub trait CandidateSource {
    type Item: Clone + PartialEq;

    /// Candidates still consistent with `query`, best first.
    fn candidates(&self, query: &str) -> Vec<Self::Item>;

    /// Text that selects `item` when typed; used for Tab completion.
    fn key(&self, item: &Self::Item) -> String;

    /// One shortlist row.
    fn describe(&self, item: &Self::Item) -> String;

    /// Preview of the best candidate.
    fn preview(&self, item: &Self::Item) -> String;

    /// An item built from raw input, for sources that accept novel text.
    fn free_form(&self, _query: &str) -> Option<Self::Item> {
        None
    }

    fn accepts(&self, c: char) -> bool {
        !c.is_control()
    }
}

pub struct Picker<S: CandidateSource> {
    source: S,
    state: PickerState,
    buffer: String,
    candidates: Vec<S::Item>,
    highlight: Option<usize>,
    preview: Option<String>,
    last_rejection: Option<Rejection>,
}

impl<S: CandidateSource> Picker<S> {
    pub fn new(source: S) -> Self {
        let mut picker = Self {
            source,
            state: PickerState::Idle,
            buffer: String::new(),
            candidates: Vec::new(),
            highlight: None,
            preview: None,
            last_rejection: None,
        };
        picker.refresh();
        picker
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> PickerState {
        self.state
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn candidates(&self) -> &[S::Item] {
        &self.candidates
    }

    pub fn highlighted(&self) -> Option<&S::Item> {
        self.highlight.and_then(|i| self.candidates.get(i))
    }

    pub fn highlight_index(&self) -> Option<usize> {
        self.highlight
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    /// The outcome of the most recent rejected Enter, cleared by any edit.
    pub fn last_rejection(&self) -> Option<Rejection> {
        self.last_rejection
    }

    pub fn handle(&mut self, key: Key) -> PickerEvent<S::Item> {
        match key {
            Key::Char(c) => {
                if !self.source.accepts(c) {
                    return PickerEvent::Ignored;
                }
                self.buffer.push(c);
                self.refresh();
                PickerEvent::Updated
            }
            Key::Backspace => {
                if self.buffer.pop().is_none() {
                    return PickerEvent::Ignored;
                }
                self.refresh();
                PickerEvent::Updated
            }
            Key::Up => self.move_highlight(-1),
            Key::Down => self.move_highlight(1),
            Key::Tab => self.complete(),
            Key::Escape => self.finish(PickerEvent::Cancelled),
            Key::Enter => self.confirm(),
        }
    }

    /// Feed every character of `text`, as if typed.
    pub fn type_str(&mut self, text: &str) {
        for c in text.chars() {
            self.handle(Key::Char(c));
        }
    }

    fn confirm(&mut self) -> PickerEvent<S::Item> {
        if let Some(item) = self.highlighted().cloned() {
            return self.finish(PickerEvent::Committed(item));
        }
        if self.buffer.trim().is_empty() {
            return self.finish(PickerEvent::Cancelled);
        }
        if let Some(item) = self.source.free_form(&self.buffer) {
            return self.finish(PickerEvent::Committed(item));
        }
        let rejection = match self.candidates.as_slice() {
            [only] => return self.finish(PickerEvent::Committed(only.clone())),
            [] => Rejection::NoMatches,
            many => Rejection::Ambiguous(many.len()),
        };
        self.last_rejection = Some(rejection);
        PickerEvent::Rejected(rejection)
    }

    fn move_highlight(&mut self, step: isize) -> PickerEvent<S::Item> {
        let len = self.candidates.len();
        if len == 0 {
            return PickerEvent::Ignored;
        }
        let next = match (self.highlight, step.is_negative()) {
            (None, false) => 0,
            (None, true) => len - 1,
            (Some(i), false) => (i + 1) % len,
            (Some(i), true) => (i + len - 1) % len,
        };
        self.highlight = Some(next);
        if self.state == PickerState::Idle {
            self.state = PickerState::Searching;
        }
        self.preview = Some(self.source.preview(&self.candidates[next]));
        self.last_rejection = None;
        PickerEvent::Updated
    }

    fn complete(&mut self) -> PickerEvent<S::Item> {
        let Some(target) = self
            .highlighted()
            .or_else(|| self.candidates.first())
            .cloned()
        else {
            return PickerEvent::Ignored;
        };
        self.buffer = self.source.key(&target);
        self.refresh();
        self.highlight = self.candidates.iter().position(|c| *c == target);
        if let Some(i) = self.highlight {
            self.preview = Some(self.source.preview(&self.candidates[i]));
        }
        PickerEvent::Updated
    }

    fn refresh(&mut self) {
        self.state = if self.buffer.is_empty() {
            PickerState::Idle
        } else {
            PickerState::Searching
        };
        self.candidates = self.source.candidates(&self.buffer);
        self.highlight = None;
        self.preview = self.candidates.first().map(|c| self.source.preview(c));
        self.last_rejection = None;
    }

    /// Leave the picker ready for reuse, back in `Idle`.
    fn finish(&mut self, event: PickerEvent<S::Item>) -> PickerEvent<S::Item> {
        self.buffer.clear();
        self.refresh();
        event
    }
}

/// First `max` characters of `text` on one line, with an ellipsis when cut.
pub fn snippet(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let mut cut: String = flat.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
