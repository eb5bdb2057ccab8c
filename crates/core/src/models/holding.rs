use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One position in one account.
///
/// `amount` is the principal currently held, `profit` the user-entered
/// cumulative gain. Both are user-maintained — live quotes only ever feed
/// the derived day-profit numbers, never these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub profit: f64,
}

/// Holdings per account id, each list in user-defined order.
/// At most one holding per fund code per account (upsert on add).
pub type HoldingsMap = HashMap<String, Vec<Holding>>;
