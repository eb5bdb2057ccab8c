use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::storage::keys;
use crate::storage::store::Store;

use super::account::Account;
use super::holding::HoldingsMap;
use super::watchlist::Watchlist;

/// Search-history cap, most-recent-first.
pub const MAX_SEARCH_HISTORY: usize = 20;

/// Sector codes known (shipped) to have no queryable fund membership,
/// so the overview never wastes a constituent query on them.
pub const DEFAULT_EMPTY_SECTORS: &[&str] = &["BK000585"];

/// Recent search keywords, deduped, newest first, capped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHistory {
    entries: Vec<String>,
}

impl SearchHistory {
    pub fn push(&mut self, keyword: &str) {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return;
        }
        self.entries.retain(|k| k != keyword);
        self.entries.insert(0, keyword.to_string());
        self.entries.truncate(MAX_SEARCH_HISTORY);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Best-effort fund-code → name map, learned opportunistically from
/// holdings, watchlist, search results, hot lists and detail responses.
///
/// Never authoritative: it only provides a provisional title before a
/// detail fetch resolves, and any fresher authoritative name overwrites.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameHints {
    names: HashMap<String, String>,
}

impl NameHints {
    pub fn learn(&mut self, code: &str, name: &str) {
        if code.is_empty() || name.is_empty() {
            return;
        }
        self.names.insert(code.to_string(), name.to_string());
    }

    pub fn hint(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Sector codes confirmed (by a query returning zero constituent funds)
/// to have no queryable membership. Persisted so the overview does not
/// re-discover this every session; membership is permanent until the set
/// itself is cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmptySectors {
    codes: HashSet<String>,
}

impl Default for EmptySectors {
    fn default() -> Self {
        Self {
            codes: DEFAULT_EMPTY_SECTORS
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl EmptySectors {
    /// Record a sector as confirmed empty. Returns true when newly added.
    pub fn mark(&mut self, code: &str) -> bool {
        if code.is_empty() {
            return false;
        }
        self.codes.insert(code.to_string())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn clear(&mut self) {
        self.codes.clear();
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// The whole of the user's durable state, one field per storage key.
///
/// Mutations go through the facade, which persists the affected piece
/// immediately. There is no ambient global; components receive this
/// container (or a field of it) explicitly.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub accounts: Vec<Account>,
    pub holdings: HoldingsMap,
    pub watchlist: Watchlist,
    pub search_history: SearchHistory,
    pub name_hints: NameHints,
    pub empty_sectors: EmptySectors,
}

impl AppState {
    /// Load every piece from the store, falling back to defaults for
    /// missing or unreadable blobs. An empty accounts list is replaced by
    /// the seeded default set (first-run behavior).
    pub fn load(store: &Store) -> Self {
        let mut accounts: Vec<Account> = store.load_or_default(keys::ACCOUNTS);
        if accounts.is_empty() {
            accounts = Account::default_set();
        }
        Self {
            accounts,
            holdings: store.load_or_default(keys::HOLDINGS),
            watchlist: store.load_or_default(keys::WATCHLIST),
            search_history: store.load_or_default(keys::SEARCH_HISTORY),
            name_hints: store.load_or_default(keys::NAME_HINTS),
            empty_sectors: store.load_or_default(keys::EMPTY_SECTORS),
        }
    }
}
