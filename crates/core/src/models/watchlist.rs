use serde::{Deserialize, Serialize};

/// A watched fund. Display order is insertion order, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub code: String,
    #[serde(default)]
    pub name: String,
}

/// The user's watchlist: unique by code, most-recent-first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Watchlist {
    entries: Vec<WatchEntry>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the front. A code already present is left untouched.
    pub fn add(&mut self, code: impl Into<String>, name: impl Into<String>) -> bool {
        let code = code.into();
        if code.is_empty() || self.contains(&code) {
            return false;
        }
        self.entries.insert(
            0,
            WatchEntry {
                code,
                name: name.into(),
            },
        );
        true
    }

    /// Remove by code. Returns whether anything was removed.
    pub fn remove(&mut self, code: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.code != code);
        self.entries.len() != before
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.iter().any(|entry| entry.code == code)
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
