use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::market::{BarWindow, MarketData};
use crate::models::BarSeries;

/// Read-through view of the latest bars for the whole universe.
///
/// Each refresh is one batched provider call. Failures never escape: a
/// failed fetch leaves the view empty for this cycle and a symbol with no
/// bars is absent.
pub struct BarCache {
    provider: Box<dyn MarketData>,
    window: BarWindow,
    bars: HashMap<String, BarSeries>,
    fetched_at: Option<DateTime<Utc>>,
}

impl BarCache {
    pub fn new(provider: Box<dyn MarketData>, window: BarWindow) -> Self {
        Self {
            provider,
            window,
            bars: HashMap::new(),
            fetched_at: None,
        }
    }

    pub async fn refresh(
        &mut self,
        symbols: &BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> &HashMap<String, BarSeries> {
        let request: Vec<String> = symbols.iter().cloned().collect();
        self.bars = match self.provider.fetch_bars(&request, self.window).await {
            Ok(mut data) => {
                data.retain(|_, series| !series.is_empty());
                debug!("Fetched bars for {}/{} symbols", data.len(), request.len());
                data
            }
            Err(e) => {
                warn!("Market data fetch failed, skipping cycle data: {:#}", e);
                HashMap::new()
            }
        };
        self.fetched_at = Some(now);
        &self.bars
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}
