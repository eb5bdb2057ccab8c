use serde::{Deserialize, Serialize};

use super::fund::parse_change;

/// One market index quote (`market/indices`). Values arrive preformatted
/// for display; `change_value()` exposes the numeric percent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexQuote {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub change: String,
    #[serde(default)]
    pub change_percent: String,
}

impl IndexQuote {
    pub fn change_value(&self) -> f64 {
        parse_change(&self.change_percent)
    }
}
