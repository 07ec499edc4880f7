#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Asia::Kolkata;
use std::sync::{Arc, Mutex};

use momentum_signal_bot::config::Config;
use momentum_signal_bot::models::Bar;
use momentum_signal_bot::notify::Notifier;

/// Exchange-local wall time as UTC.
pub fn ist(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Kolkata
        .with_ymd_and_hms(y, m, d, h, mi, 0)
        .unwrap()
        .with_timezone(&Utc)
}

/// 60 five-minute bars ending at `last`: a steady climb of 0.1 per bar with
/// a 0.4 range, closing at 105.9 on a volume spike. Against [`index_drift`]
/// it scores 7.5 (trend 4, momentum 2, relative strength 1.5) with ATR 0.4,
/// giving entry 105.9, stop 105.1, target 107.5.
pub fn qualifying_uptrend(last: DateTime<Utc>) -> Vec<Bar> {
    (0..60)
        .map(|i| {
            let close = 100.0 + 0.1 * i as f64;
            Bar {
                timestamp: last - Duration::minutes(5 * (59 - i) as i64),
                open: close - 0.05,
                high: close + 0.2,
                low: close - 0.2,
                close,
                volume: if i == 59 { 400.0 } else { 100.0 },
            }
        })
        .collect()
}

/// A volumeless index drifting by `step` points per bar from 20000.
pub fn index_drift(last: DateTime<Utc>, step: f64) -> Vec<Bar> {
    (0..60)
        .map(|i| {
            let close = 20000.0 + step * i as f64;
            Bar {
                timestamp: last - Duration::minutes(5 * (59 - i) as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0.0,
            }
        })
        .collect()
}

pub fn bar(ts: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: ts,
        open,
        high,
        low,
        close,
        volume: 150.0,
    }
}

pub fn test_config(dir: &tempfile::TempDir, watchlist: &[&str]) -> Config {
    Config {
        trades_file: dir.path().join("trades.json"),
        watchlist: watchlist.iter().map(|s| s.to_string()).collect(),
        log_level: "error".to_string(),
        ..Config::default()
    }
}

/// Keeps every message it is asked to send.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Fails every send.
pub struct BrokenNotifier;

#[async_trait]
impl Notifier for BrokenNotifier {
    async fn send(&self, _text: &str) -> Result<()> {
        anyhow::bail!("chat unreachable")
    }
}
