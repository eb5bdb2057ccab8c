use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

use crate::errors::CoreError;

const LIST_URL: &str = "https://push2.eastmoney.com/api/qt/clist/get";
const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const UT_TOKEN: &str = "fa5fd1943c7b386f172d6893dbfba10b";

/// Mobile UA; the quote endpoints serve the mobile payload shape for it.
const USER_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15";

/// Client for the public Eastmoney quote endpoints used by the direct
/// sector sources: the board list query and the daily-kline history query.
///
/// Both are unauthenticated GETs with provider-specific field codes
/// (f12 = code, f14 = name, f3 = change percent, f104/f105 = up/down
/// constituent counts).
pub struct EastmoneyClient {
    client: Client,
    timeout: Duration,
    kline_depth: u32,
}

impl EastmoneyClient {
    pub fn new(timeout: Duration, kline_depth: u32) -> Result<Self, CoreError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CoreError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout,
            kline_depth,
        })
    }

    /// Fetch the sector/board listing with per-board change and
    /// constituent up/down counts. May legitimately be empty — callers
    /// decide whether that is acceptable.
    pub async fn board_list(&self) -> Result<Vec<BoardRow>, CoreError> {
        let resp = self
            .client
            .get(LIST_URL)
            .query(&[
                ("fid", "f62"),
                ("po", "1"),
                ("pz", "100"),
                ("pn", "1"),
                ("np", "1"),
                ("fltt", "2"),
                ("invt", "2"),
                ("ut", UT_TOKEN),
                ("fs", "m:90+t:2"),
                ("fields", "f12,f14,f2,f3,f62,f184,f104,f105"),
            ])
            .timeout(self.timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(CoreError::Upstream {
                source_name: "eastmoney".to_string(),
                message: format!("board list returned HTTP {}", resp.status()),
            });
        }
        let text = resp.text().await?;
        Self::parse_board_json(&text)
    }

    /// Fetch the most recent daily kline records for one board, as raw
    /// comma-separated strings (date,open,close,…).
    pub async fn daily_klines(&self, board_code: &str) -> Result<Vec<String>, CoreError> {
        let secid = format!("90.{board_code}");
        let depth = self.kline_depth.to_string();
        let resp = self
            .client
            .get(KLINE_URL)
            .query(&[
                ("secid", secid.as_str()),
                ("klt", "101"),
                ("fqt", "1"),
                ("lmt", depth.as_str()),
                ("end", "20500101"),
                ("fields1", "f1,f2,f3,f4,f5,f6"),
                ("fields2", "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61"),
                ("ut", UT_TOKEN),
            ])
            .timeout(self.timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(CoreError::Upstream {
                source_name: "eastmoney".to_string(),
                message: format!("kline query for {board_code} returned HTTP {}", resp.status()),
            });
        }
        let text = resp.text().await?;
        Self::parse_kline_json(&text)
    }

    /// Parse a board-list response body into rows.
    pub fn parse_board_json(text: &str) -> Result<Vec<BoardRow>, CoreError> {
        let body: ClistResponse = serde_json::from_str(text).map_err(|e| CoreError::Upstream {
            source_name: "eastmoney".to_string(),
            message: format!("board list was not valid JSON: {e}"),
        })?;
        Ok(body.data.and_then(|d| d.diff).unwrap_or_default())
    }

    /// Parse a kline response body into the raw record strings.
    pub fn parse_kline_json(text: &str) -> Result<Vec<String>, CoreError> {
        let body: KlineResponse = serde_json::from_str(text).map_err(|e| CoreError::Upstream {
            source_name: "eastmoney".to_string(),
            message: format!("kline payload was not valid JSON: {e}"),
        })?;
        Ok(body.data.map(|d| d.klines).unwrap_or_default())
    }
}

// ── Eastmoney response types ────────────────────────────────────────

/// One row of the board listing, with wire field codes mapped to names.
/// Numeric fields may arrive as numbers, strings or a placeholder dash.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardRow {
    #[serde(rename = "f12", default)]
    pub code: String,
    #[serde(rename = "f14", default)]
    pub name: String,
    #[serde(rename = "f3", default, deserialize_with = "crate::models::fund::de_loose_f64")]
    pub change_percent: Option<f64>,
    #[serde(rename = "f104", default, deserialize_with = "de_loose_i64")]
    pub up_count: i64,
    #[serde(rename = "f105", default, deserialize_with = "de_loose_i64")]
    pub down_count: i64,
}

#[derive(Deserialize)]
struct ClistResponse {
    data: Option<ClistData>,
}

#[derive(Deserialize)]
struct ClistData {
    diff: Option<Vec<BoardRow>>,
}

#[derive(Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

fn de_loose_i64<'de, D>(de: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    Ok(value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .unwrap_or(0))
}
