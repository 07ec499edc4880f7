use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::market::{BarWindow, MarketData};
use crate::models::{Bar, BarSeries};

const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Intraday bars from Yahoo's chart endpoint, one request per symbol inside
/// a single batched fetch.
pub struct YahooMarket {
    client: Client,
    last_request: Option<Instant>,
}

impl YahooMarket {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            last_request: None,
        })
    }

    async fn rate_limit(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    async fn fetch_symbol(&mut self, symbol: &str, window: BarWindow) -> Result<BarSeries> {
        self.rate_limit().await;

        let range = format!("{}d", window.days);
        let resp = self
            .client
            .get(format!("{}/{}", BASE_URL, symbol))
            .query(&[
                ("range", range.as_str()),
                ("interval", window.interval.as_str()),
                ("includePrePost", "false"),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to fetch chart for {}", symbol))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Yahoo chart error {} for {}: {}", status, symbol, body);
        }

        let data: ChartResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse chart for {}", symbol))?;
        parse_chart(data)
    }
}

/// Turns a chart response into bars, dropping rows with any missing OHLC
/// value (the still-forming bar and exchange gaps). Missing volume reads
/// as zero.
fn parse_chart(resp: ChartResponse) -> Result<BarSeries> {
    let result = match resp.chart.result {
        Some(r) => r,
        None => match resp.chart.error {
            Some(err) => anyhow::bail!("{}: {}", err.code, err.description),
            None => anyhow::bail!("empty chart result"),
        },
    };
    let data = result.into_iter().next().context("chart result array is empty")?;
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .context("chart has no quote data")?;

    let bars = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let at = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
            Some(Bar {
                timestamp: DateTime::from_timestamp(ts, 0)?,
                open: at(&quote.open)?,
                high: at(&quote.high)?,
                low: at(&quote.low)?,
                close: at(&quote.close)?,
                volume: at(&quote.volume).unwrap_or(0.0),
            })
        })
        .collect();

    Ok(BarSeries::new(bars))
}

#[async_trait]
impl MarketData for YahooMarket {
    async fn fetch_bars(
        &mut self,
        symbols: &[String],
        window: BarWindow,
    ) -> Result<HashMap<String, BarSeries>> {
        let mut out = HashMap::new();
        let mut last_error = None;

        for symbol in symbols {
            match self.fetch_symbol(symbol, window).await {
                Ok(series) if !series.is_empty() => {
                    out.insert(symbol.clone(), series);
                }
                Ok(_) => debug!("No bars for {}", symbol),
                Err(e) => {
                    debug!("Fetch {}: {:#}", symbol, e);
                    last_error = Some(e);
                }
            }
        }

        if out.is_empty() && !symbols.is_empty() {
            return Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no bars for any symbol")));
        }
        Ok(out)
    }
}
