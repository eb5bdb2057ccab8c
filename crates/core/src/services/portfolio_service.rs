use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::account::Account;
use crate::models::analytics::{HoldingRow, HoldingStats};
use crate::models::fund::FundQuote;
use crate::models::holding::{Holding, HoldingsMap};
use crate::models::state::NameHints;

/// Holdings mutation and aggregation.
///
/// Pure business logic — no I/O, no API calls. Live quotes come in as a
/// code→quote map produced by the gateway's batch fetch.
pub struct PortfolioService;

impl PortfolioService {
    pub fn new() -> Self {
        Self
    }

    /// Insert or update a holding in one account. At most one holding per
    /// code per account: an existing entry is overwritten in place,
    /// keeping its list position.
    pub fn upsert_holding(
        &self,
        holdings: &mut HoldingsMap,
        account_id: &str,
        holding: Holding,
    ) -> Result<(), CoreError> {
        if holding.code.is_empty() {
            return Err(CoreError::Validation("holding code must not be empty".into()));
        }
        if !holding.amount.is_finite() || holding.amount <= 0.0 {
            return Err(CoreError::Validation(format!(
                "holding amount must be positive, got {}",
                holding.amount
            )));
        }
        let list = holdings.entry(account_id.to_string()).or_default();
        match list.iter_mut().find(|h| h.code == holding.code) {
            Some(existing) => *existing = holding,
            None => list.push(holding),
        }
        Ok(())
    }

    /// Remove a holding by code from one account.
    pub fn remove_holding(
        &self,
        holdings: &mut HoldingsMap,
        account_id: &str,
        code: &str,
    ) -> Result<(), CoreError> {
        let list = holdings
            .get_mut(account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;
        let before = list.len();
        list.retain(|h| h.code != code);
        if list.len() == before {
            return Err(CoreError::Validation(format!(
                "no holding with code {code} in account {account_id}"
            )));
        }
        Ok(())
    }

    /// Merge holdings across all accounts into one presentation list: a
    /// fund held in several accounts appears once with summed amount and
    /// profit. Underlying per-account records are untouched.
    ///
    /// Iterates accounts in display order (then any orphaned account ids,
    /// sorted) so output order is deterministic.
    pub fn merge_all(&self, holdings: &HoldingsMap, accounts: &[Account]) -> Vec<Holding> {
        let mut order: Vec<&str> = accounts.iter().map(|a| a.id.as_str()).collect();
        let mut orphans: Vec<&str> = holdings
            .keys()
            .map(String::as_str)
            .filter(|id| !order.contains(id))
            .collect();
        orphans.sort_unstable();
        order.extend(orphans);

        let mut merged: Vec<Holding> = Vec::new();
        for account_id in order {
            let Some(list) = holdings.get(account_id) else {
                continue;
            };
            for holding in list {
                match merged.iter_mut().find(|m| m.code == holding.code) {
                    Some(existing) => {
                        existing.amount += holding.amount;
                        existing.profit += holding.profit;
                        if existing.name.is_empty() {
                            existing.name = holding.name.clone();
                        }
                    }
                    None => merged.push(holding.clone()),
                }
            }
        }
        merged
    }

    /// Aggregate a holdings list against live quotes.
    pub fn aggregate(
        &self,
        holdings: &[Holding],
        quotes: &HashMap<String, FundQuote>,
    ) -> HoldingStats {
        let mut stats = HoldingStats::default();
        for holding in holdings {
            stats.asset += holding.amount;
            stats.hold_profit += holding.profit;
            if let Some(quote) = quotes.get(&holding.code) {
                let change = quote.change();
                stats.day_profit += holding.amount * change / 100.0;
                if change > 0.0 {
                    stats.up_count += 1;
                } else if change < 0.0 {
                    stats.down_count += 1;
                }
            }
        }
        if stats.asset > 0.0 {
            stats.day_profit_pct = stats.day_profit / stats.asset * 100.0;
            // Return relative to estimated cost basis (asset - profit).
            // Unguarded: approaches infinity as profit nears asset.
            stats.hold_profit_pct = stats.hold_profit / (stats.asset - stats.hold_profit) * 100.0;
        }
        stats
    }

    /// Produce display rows for a holdings list: quote change and derived
    /// day profit per holding, names filled from the hint map when the
    /// stored record has none.
    pub fn enrich(
        &self,
        holdings: &[Holding],
        quotes: &HashMap<String, FundQuote>,
        hints: &NameHints,
    ) -> Vec<HoldingRow> {
        holdings
            .iter()
            .map(|holding| {
                let change = quotes.get(&holding.code).map(FundQuote::change).unwrap_or(0.0);
                let name = if !holding.name.is_empty() {
                    holding.name.clone()
                } else if let Some(hint) = hints.hint(&holding.code) {
                    hint.to_string()
                } else {
                    holding.code.clone()
                };
                HoldingRow {
                    code: holding.code.clone(),
                    name,
                    amount: holding.amount,
                    profit: holding.profit,
                    change,
                    day_profit: holding.amount * change / 100.0,
                }
            })
            .collect()
    }
}

impl Default for PortfolioService {
    fn default() -> Self {
        Self::new()
    }
}
