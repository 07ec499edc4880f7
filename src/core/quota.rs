use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::trading::trade_record::TradeRecord;

/// Symbols already signaled on one calendar day, capped at `limit`.
///
/// Rebuilt from the ledger whenever the trading date changes and kept in
/// memory for the rest of that day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyQuota {
    date: NaiveDate,
    limit: usize,
    symbols: BTreeSet<String>,
    issued: usize,
}

impl DailyQuota {
    pub fn new(date: NaiveDate, limit: usize) -> Self {
        Self {
            date,
            limit,
            symbols: BTreeSet::new(),
            issued: 0,
        }
    }

    /// Counts every record opened on `date`.
    pub fn from_records(records: &[TradeRecord], date: NaiveDate, limit: usize) -> Self {
        let mut quota = Self::new(date, limit);
        for r in records.iter().filter(|r| r.open_date == date) {
            quota.symbols.insert(r.symbol.clone());
            quota.issued += 1;
        }
        quota
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn issued(&self) -> usize {
        self.issued
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.issued)
    }

    pub fn is_exhausted(&self) -> bool {
        self.issued >= self.limit
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    /// Whether a new signal for `symbol` fits today's quota.
    pub fn admits(&self, symbol: &str) -> bool {
        !self.is_exhausted() && !self.contains(symbol)
    }

    pub fn record(&mut self, symbol: &str) {
        self.symbols.insert(symbol.to_string());
        self.issued += 1;
    }
}
