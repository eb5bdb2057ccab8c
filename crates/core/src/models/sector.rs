use serde::{Deserialize, Serialize};

use super::fund::parse_change;

/// One sector row on the overview (`sector/list` and `sector/streak`;
/// the latter fills `streak_days`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectorOverview {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub change_percent: String,
    #[serde(default)]
    pub up_count: i64,
    #[serde(default)]
    pub down_count: i64,
    /// Signed count of consecutive same-direction daily closes.
    /// Positive = up-streak, negative = down-streak, 0 = none known.
    #[serde(default)]
    pub streak_days: i32,
}

impl SectorOverview {
    pub fn change_value(&self) -> f64 {
        parse_change(&self.change_percent)
    }
}

/// A constituent fund of a sector (`sector/funds`). An empty constituent
/// list is a valid terminal answer: the sector has no queryable fund
/// membership and gets excluded from future overviews.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectorFund {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub change: String,
    #[serde(default)]
    pub year_change: String,
}
