use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional read of the benchmark, gating the long-only scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketBias {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for MarketBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MarketBias {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketBias::Bullish => "BULLISH",
            MarketBias::Bearish => "BEARISH",
            MarketBias::Neutral => "NEUTRAL",
        }
    }

    pub fn is_bullish(self) -> bool {
        self == MarketBias::Bullish
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Win,
    Loss,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Open => write!(f, "OPEN"),
            TradeStatus::Win => write!(f, "WIN"),
            TradeStatus::Loss => write!(f, "LOSS"),
        }
    }
}

impl TradeStatus {
    pub fn is_closed(self) -> bool {
        self != TradeStatus::Open
    }
}
