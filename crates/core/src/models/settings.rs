use serde::{Deserialize, Serialize};

/// Default backend aggregation API base. Override with `FUND_API_BASE`.
pub const DEFAULT_API_BASE: &str = "http://localhost:3000/api";

/// Runtime configuration for the data layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the backend aggregation API (`?module=..&action=..`).
    pub api_base: String,

    /// Timeout for backend requests, in seconds.
    pub backend_timeout_secs: u64,

    /// Timeout for direct-upstream requests, in seconds. Shorter than the
    /// backend timeout: a slow upstream should fall back, not stall.
    pub upstream_timeout_secs: u64,

    /// Maximum number of cached responses before oldest-first eviction.
    pub cache_cap: usize,

    /// Concurrency cap for the per-sector streak fan-out.
    pub streak_pool: usize,

    /// How many daily closes to request per sector for streak computation.
    pub kline_depth: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            backend_timeout_secs: 10,
            upstream_timeout_secs: 8,
            cache_cap: super::cache::DEFAULT_CACHE_CAP,
            streak_pool: 10,
            kline_depth: 10,
        }
    }
}

impl Settings {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(base) = std::env::var("FUND_API_BASE") {
            if !base.trim().is_empty() {
                settings.api_base = base;
            }
        }
        settings
    }
}
