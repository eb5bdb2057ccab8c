use serde::Serialize;

/// Derived aggregation over a set of holdings and their live quotes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HoldingStats {
    /// Sum of principal over all holdings.
    pub asset: f64,

    /// Sum of `amount * estimate_change / 100`; holdings without a quote
    /// contribute 0.
    pub day_profit: f64,

    /// `day_profit / asset * 100`, or 0 when nothing is held.
    pub day_profit_pct: f64,

    /// Sum of the user-entered cumulative profit fields. Independent of
    /// live quotes.
    pub hold_profit: f64,

    /// Return relative to the estimated cost basis (`asset - hold_profit`).
    /// Unguarded: grows without bound as profit approaches asset.
    pub hold_profit_pct: f64,

    /// Holdings whose quote change is strictly positive.
    pub up_count: usize,

    /// Holdings whose quote change is strictly negative.
    pub down_count: usize,
}

/// One account's aggregated numbers on the summary view.
#[derive(Debug, Clone, Serialize)]
pub struct AccountOverview {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub stats: HoldingStats,
}

/// The cross-account summary: grand totals plus per-account breakdown.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryOverview {
    pub total_asset: f64,
    pub total_day_profit: f64,
    pub accounts: Vec<AccountOverview>,
}

/// One holdings-list row, enriched with its live quote figures.
#[derive(Debug, Clone, Serialize)]
pub struct HoldingRow {
    pub code: String,
    pub name: String,
    pub amount: f64,
    pub profit: f64,
    /// Signed percent change from the live quote; 0 when absent.
    pub change: f64,
    pub day_profit: f64,
}

/// The holdings view for one scope (an account, or all merged).
#[derive(Debug, Clone, Default, Serialize)]
pub struct HoldingsView {
    pub rows: Vec<HoldingRow>,
    pub stats: HoldingStats,
}

/// One watchlist row with its live change.
#[derive(Debug, Clone, Serialize)]
pub struct WatchRow {
    pub code: String,
    pub name: String,
    pub change: f64,
}
