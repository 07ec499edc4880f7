use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::market::{BarWindow, MarketData};
use crate::models::{Bar, BarSeries};

/// A `MarketData` implementation that replays pre-loaded bars.
/// A cursor (`now`) controls which bars are visible: only bars with
/// timestamp <= now, and no older than the requested window, are returned.
pub struct ReplayMarket {
    data: HashMap<String, Vec<Bar>>,
    now: DateTime<Utc>,
    fail: bool,
}

impl ReplayMarket {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            now: Utc::now(),
            fail: false,
        }
    }

    /// Load bars for `symbol`, replacing any previous set.
    pub fn load(&mut self, symbol: &str, bars: Vec<Bar>) {
        let series = BarSeries::new(bars);
        self.data.insert(symbol.to_string(), series.as_slice().to_vec());
    }

    /// Advance the replay clock.
    pub fn set_time(&mut self, t: DateTime<Utc>) {
        self.now = t;
    }

    /// Make every subsequent fetch fail, as an unreachable provider would.
    pub fn set_failing(&mut self, fail: bool) {
        self.fail = fail;
    }

    fn visible_bars(&self, symbol: &str, window: BarWindow) -> BarSeries {
        let Some(all) = self.data.get(symbol) else {
            return BarSeries::default();
        };
        let end = all.partition_point(|b| b.timestamp <= self.now);
        let since = self.now - Duration::days(i64::from(window.days));
        let start = all[..end].partition_point(|b| b.timestamp <= since);
        BarSeries::new(all[start..end].to_vec())
    }
}

impl Default for ReplayMarket {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketData for ReplayMarket {
    async fn fetch_bars(
        &mut self,
        symbols: &[String],
        window: BarWindow,
    ) -> Result<HashMap<String, BarSeries>> {
        if self.fail {
            anyhow::bail!("replay provider unavailable");
        }
        Ok(symbols
            .iter()
            .map(|s| (s.clone(), self.visible_bars(s, window)))
            .filter(|(_, series)| !series.is_empty())
            .collect())
    }
}
