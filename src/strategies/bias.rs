use chrono::TimeZone;

use crate::core::indicators::{session_twap, session_vwap};
use crate::models::{BarSeries, MarketBias};

/// Benchmark direction from its latest close against its session VWAP.
///
/// `tolerance_pct` is a neutral band around VWAP. Benchmarks that report no
/// volume fall back to the session's time-weighted typical price.
pub fn market_bias<Tz: TimeZone>(benchmark: &BarSeries, tz: &Tz, tolerance_pct: f64) -> MarketBias {
    let Some(last) = benchmark.last() else {
        return MarketBias::Neutral;
    };
    let Some(anchor) = session_vwap(benchmark, tz).or_else(|| session_twap(benchmark, tz)) else {
        return MarketBias::Neutral;
    };
    if !last.close.is_finite() {
        return MarketBias::Neutral;
    }

    let band = anchor * tolerance_pct / 100.0;
    if last.close > anchor + band {
        MarketBias::Bullish
    } else if last.close < anchor - band {
        MarketBias::Bearish
    } else {
        MarketBias::Neutral
    }
}
