//! The "current location" capability the filter controller reads from and
//! writes to, plus the in-memory history the application uses for it.

/// Read/write access to the shareable query state of the song list.
pub trait Location {
    /// Query string of the current entry, without the leading `?`.
    fn current_query(&self) -> String;
    /// Make `query` the current entry.
    fn navigate(&mut self, query: &str);
}

/// Oldest entries are dropped past this many.
pub const MAX_HISTORY: usize = 100;

/// Linear back/forward history of query strings, like a browser tab's.
/// Navigating drops any forward entries, and the history keeps at most
/// [`MAX_HISTORY`] entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLocation {
    entries: Vec<String>,
    cursor: usize,
}

impl HistoryLocation {
    pub fn new(initial: &str) -> Self {
        Self {
            entries: vec![normalize(initial).to_string()],
            cursor: 0,
        }
    }

    /// Step back one entry. Returns `false` at the start of the history.
    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Step forward one entry. Returns `false` at the end of the history.
    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for HistoryLocation {
    fn default() -> Self {
        Self::new("")
    }
}

impl Location for HistoryLocation {
    fn current_query(&self) -> String {
        self.entries[self.cursor].clone()
    }

    fn navigate(&mut self, query: &str) {
        let query = normalize(query);
        if self.entries[self.cursor] == query {
            return;
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(query.to_string());
        let overflow = self.entries.len().saturating_sub(MAX_HISTORY);
        self.entries.drain(..overflow);
        self.cursor = self.entries.len() - 1;
    }
}

fn normalize(query: &str) -> &str {
    query.strip_prefix('?').unwrap_or(query)
}
