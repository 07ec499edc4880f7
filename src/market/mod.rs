pub mod cache;
pub mod replay;
pub mod yahoo;

pub use cache::BarCache;
pub use replay::ReplayMarket;
pub use yahoo::YahooMarket;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::{BarSeries, Timeframe};

/// Lookback window and resolution of one batched fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarWindow {
    pub days: u32,
    pub interval: Timeframe,
}

/// Market-data collaborator. One call covers every requested symbol.
///
/// Symbols without data are simply absent from the map; `Err` means the
/// whole request failed.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn fetch_bars(
        &mut self,
        symbols: &[String],
        window: BarWindow,
    ) -> Result<HashMap<String, BarSeries>>;
}

/// Shared handle, so a caller can keep steering a provider the cache owns.
#[async_trait]
impl<M: MarketData> MarketData for Arc<Mutex<M>> {
    async fn fetch_bars(
        &mut self,
        symbols: &[String],
        window: BarWindow,
    ) -> Result<HashMap<String, BarSeries>> {
        self.lock().await.fetch_bars(symbols, window).await
    }
}
