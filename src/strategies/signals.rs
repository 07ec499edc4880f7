use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A scored long setup, not yet accepted into the ledger.
///
/// Always satisfies `stop < entry < target` and
/// `target - entry == R * (entry - stop)` for the configured R.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeProposal {
    pub symbol: String,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub score: f64,
    pub date: NaiveDate,
    /// Timestamp of the bar the proposal was scored on.
    pub bar_time: DateTime<Utc>,
}
