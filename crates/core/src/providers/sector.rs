use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::api::ApiResponse;
use crate::models::cache::STREAK_ITEM_TTL;
use crate::models::sector::SectorOverview;
use crate::services::data_gateway::SharedCache;
use crate::services::streak_service::{parse_kline_closes, streak_from_closes};

use super::eastmoney::{BoardRow, EastmoneyClient};
use super::traits::UpstreamSource;

/// Map a raw board row to the sector-overview shape.
pub fn overview_from_row(row: BoardRow, streak_days: i32) -> SectorOverview {
    let change = row.change_percent.unwrap_or(0.0);
    SectorOverview {
        code: row.code,
        name: row.name,
        change_percent: format!("{change:+.2}%"),
        up_count: row.up_count,
        down_count: row.down_count,
        streak_days,
    }
}

/// Direct source for `sector/list`: one board-list query, mapped into
/// overview rows. An empty listing is an upstream failure, not a valid
/// empty state — the gateway then falls back to the backend.
pub struct SectorListSource {
    client: Arc<EastmoneyClient>,
}

impl SectorListSource {
    pub fn new(client: Arc<EastmoneyClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UpstreamSource for SectorListSource {
    fn name(&self) -> &str {
        "eastmoney-sector-list"
    }

    fn handles(&self, module: &str, action: &str) -> bool {
        module == "sector" && action == "list"
    }

    async fn fetch(&self, _params: &[(&str, &str)]) -> Result<ApiResponse, CoreError> {
        let rows = self.client.board_list().await?;
        if rows.is_empty() {
            return Err(CoreError::Upstream {
                source_name: self.name().to_string(),
                message: "board listing came back empty".to_string(),
            });
        }
        let sectors: Vec<SectorOverview> = rows
            .into_iter()
            .map(|row| overview_from_row(row, 0))
            .collect();
        let data = serde_json::to_value(sectors)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        Ok(ApiResponse::ok(data))
    }
}

/// Direct source for `sector/streak`: fetches the board listing, then
/// fans out one kline query per sector through a bounded worker pool.
///
/// Per-sector failures are isolated — a sector whose series cannot be
/// fetched or parsed reports streak 0 instead of aborting the batch.
/// Individual streak values are cached separately with a long TTL, since
/// each one costs a round-trip and only changes at daily granularity.
pub struct SectorStreakSource {
    client: Arc<EastmoneyClient>,
    cache: SharedCache,
    pool: usize,
}

impl SectorStreakSource {
    pub fn new(client: Arc<EastmoneyClient>, cache: SharedCache, pool: usize) -> Self {
        Self {
            client,
            cache,
            pool: pool.max(1),
        }
    }

    async fn streak_for(client: &EastmoneyClient, cache: &SharedCache, code: &str) -> i32 {
        let key = format!("upstream/sector_streak?code={code}");
        if let Some(hit) = cache.read(&key) {
            if let Ok(streak) = hit.decode::<i32>() {
                return streak;
            }
        }
        match client.daily_klines(code).await {
            Ok(klines) => {
                let closes = parse_kline_closes(&klines);
                let streak = streak_from_closes(&closes);
                cache.write(&key, ApiResponse::ok(streak.into()), STREAK_ITEM_TTL);
                streak
            }
            Err(e) => {
                debug!(code, error = %e, "streak series unavailable; reporting 0");
                0
            }
        }
    }
}

#[async_trait]
impl UpstreamSource for SectorStreakSource {
    fn name(&self) -> &str {
        "eastmoney-sector-streak"
    }

    fn handles(&self, module: &str, action: &str) -> bool {
        module == "sector" && action == "streak"
    }

    async fn fetch(&self, params: &[(&str, &str)]) -> Result<ApiResponse, CoreError> {
        let limit = params
            .iter()
            .find(|(k, _)| *k == "limit")
            .and_then(|(_, v)| v.parse::<usize>().ok());

        let mut rows = self.client.board_list().await?;
        if rows.is_empty() {
            return Err(CoreError::Upstream {
                source_name: self.name().to_string(),
                message: "board listing came back empty".to_string(),
            });
        }
        if let Some(limit) = limit {
            rows.truncate(limit);
        }

        // Pool shrinks to the item count but never exceeds the fixed cap.
        let pool = self.pool.min(rows.len());
        let mut sectors: Vec<(usize, SectorOverview)> = stream::iter(rows.into_iter().enumerate())
            .map(|(idx, row)| {
                let client = Arc::clone(&self.client);
                let cache = self.cache.clone();
                async move {
                    let streak = Self::streak_for(&client, &cache, &row.code).await;
                    (idx, overview_from_row(row, streak))
                }
            })
            .buffer_unordered(pool)
            .collect()
            .await;

        // Completion order is arbitrary; restore listing order.
        sectors.sort_by_key(|(idx, _)| *idx);
        let sectors: Vec<SectorOverview> = sectors.into_iter().map(|(_, s)| s).collect();

        let data = serde_json::to_value(sectors)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        Ok(ApiResponse::ok(data))
    }
}
