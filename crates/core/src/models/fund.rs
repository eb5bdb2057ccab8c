use serde::{Deserialize, Deserializer, Serialize};

/// Parse a backend change figure ("+1.50", "-0.3%", "1.2") into a signed
/// percentage. Empty or unparseable input degrades to 0.
pub fn parse_change(raw: &str) -> f64 {
    raw.trim().trim_end_matches('%').parse().unwrap_or(0.0)
}

/// Lenient numeric field: the upstream wire mixes numbers, numeric strings
/// and placeholder dashes in the same position.
pub(crate) fn de_loose_f64<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    Ok(loose_f64(&value))
}

pub(crate) fn loose_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}

/// Real-time estimate for one fund, as served by `fund/info` and
/// `fund/batch`. All figures arrive as preformatted strings; `change()`
/// gives the numeric estimate for aggregation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundQuote {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nav: String,
    #[serde(default)]
    pub nav_date: String,
    #[serde(default)]
    pub estimate_nav: String,
    #[serde(default)]
    pub estimate_change: String,
    #[serde(default)]
    pub estimate_time: String,
    /// Set on `fund/batch` entries whose individual lookup failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FundQuote {
    /// Signed percent change for the current session; 0 when unavailable.
    pub fn change(&self) -> f64 {
        parse_change(&self.estimate_change)
    }
}

/// A sector a fund is associated with (on the detail view).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectorRef {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
}

/// One of a fund's top stock positions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundStock {
    #[serde(default)]
    pub rank: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ratio: String,
    #[serde(default, deserialize_with = "de_loose_f64")]
    pub change: Option<f64>,
}

/// Full fund detail (`fund/detail`): the quote fields plus holdings
/// breakdown, associated sectors and prospectus blurbs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nav: String,
    #[serde(default)]
    pub nav_date: String,
    #[serde(default)]
    pub estimate_nav: String,
    #[serde(default)]
    pub estimate_change: String,
    #[serde(default)]
    pub estimate_time: String,
    #[serde(default)]
    pub year_change: String,
    #[serde(default)]
    pub perf_cmp: String,
    #[serde(default)]
    pub inv_tgt: String,
    #[serde(default)]
    pub sectors: Vec<SectorRef>,
    #[serde(default)]
    pub stocks: Vec<FundStock>,
}

impl FundDetail {
    pub fn change(&self) -> f64 {
        parse_change(&self.estimate_change)
    }
}

/// A search hit or hot-list row: just enough to render and to seed the
/// fund-name hint map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundBrief {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub change: String,
}
