//! Storage keys. Each key maps to one whole JSON blob, read and written
//! independently.

pub const ACCOUNTS: &str = "accounts";
pub const HOLDINGS: &str = "holdings";
pub const WATCHLIST: &str = "watchlist";
pub const SEARCH_HISTORY: &str = "search_history";
pub const RESPONSE_CACHE: &str = "response_cache";
pub const NAME_HINTS: &str = "fund_names";
pub const EMPTY_SECTORS: &str = "empty_sectors";
