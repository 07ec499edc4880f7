use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Bar, TradeStatus};
use crate::strategies::signals::TradeProposal;

/// One persisted signal and its outcome. Created OPEN, closed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub entry: f64,
    #[serde(alias = "sl")]
    pub stop: f64,
    pub target: f64,
    #[serde(default)]
    pub score: f64,
    #[serde(rename = "date")]
    pub open_date: NaiveDate,
    pub status: TradeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_date: Option<NaiveDate>,
    /// Timestamp of the bar the signal was scored on; exits only consider
    /// later bars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_bar: Option<DateTime<Utc>>,
}

/// A closing decision for an open record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exit {
    pub status: TradeStatus,
    pub price: f64,
}

impl TradeRecord {
    pub fn from_proposal(p: &TradeProposal) -> Self {
        Self {
            symbol: p.symbol.clone(),
            entry: p.entry,
            stop: p.stop,
            target: p.target,
            score: p.score,
            open_date: p.date,
            status: TradeStatus::Open,
            exit_price: None,
            exit_date: None,
            signal_bar: Some(p.bar_time),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Decides the exit implied by `bar`, if any.
    ///
    /// The stop is checked before the target: when one bar spans both levels
    /// the order of the touches is unknown, so the worse outcome is assumed.
    pub fn exit_on(&self, bar: &Bar) -> Option<Exit> {
        if !self.is_open() {
            return None;
        }
        if let Some(signal_ts) = self.signal_bar {
            if bar.timestamp <= signal_ts {
                return None;
            }
        }
        if bar.low <= self.stop {
            Some(Exit {
                status: TradeStatus::Loss,
                price: self.stop,
            })
        } else if bar.high >= self.target {
            Some(Exit {
                status: TradeStatus::Win,
                price: self.target,
            })
        } else {
            None
        }
    }

    /// Applies `exit`. A record that is already closed is left untouched.
    pub fn close(&mut self, exit: Exit, date: NaiveDate) -> bool {
        if !self.is_open() || !exit.status.is_closed() {
            return false;
        }
        self.status = exit.status;
        self.exit_price = Some(exit.price);
        self.exit_date = Some(date);
        true
    }
}
