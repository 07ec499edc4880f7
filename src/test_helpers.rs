use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Asia::Kolkata;

use crate::config::Config;
use crate::models::{Bar, BarSeries, TradeStatus};
use crate::strategies::TradeProposal;
use crate::trading::TradeRecord;

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Create bars from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_bars(data: &[(f64, f64, f64, f64)]) -> BarSeries {
    let base = base_time();
    let bars: Vec<Bar> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Bar {
            timestamp: base + Duration::minutes(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect();

    BarSeries::new(bars)
}

pub fn bar_at(ts: &str, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
    Bar {
        timestamp: DateTime::parse_from_rfc3339(ts)
            .unwrap()
            .with_timezone(&Utc),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Flat (close, volume) bars every 5m from 09:15 IST on `date`.
pub fn make_session_bars(date: &str, data: &[(f64, f64)]) -> Vec<Bar> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
    let open = day.and_hms_opt(3, 45, 0).unwrap().and_utc();
    data.iter()
        .enumerate()
        .map(|(i, &(c, v))| Bar {
            timestamp: open + Duration::minutes(5 * i as i64),
            open: c,
            high: c,
            low: c,
            close: c,
            volume: v,
        })
        .collect()
}

/// Exchange-local wall time as UTC.
pub fn ist(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Kolkata
        .with_ymd_and_hms(y, m, d, h, mi, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn open_record(symbol: &str, date: NaiveDate, entry: f64, stop: f64, target: f64) -> TradeRecord {
    TradeRecord {
        symbol: symbol.to_string(),
        entry,
        stop,
        target,
        score: 7.5,
        open_date: date,
        status: TradeStatus::Open,
        exit_price: None,
        exit_date: None,
        signal_bar: None,
    }
}

pub fn proposal(symbol: &str, date: NaiveDate) -> TradeProposal {
    TradeProposal {
        symbol: symbol.to_string(),
        entry: 50.0,
        stop: 49.0,
        target: 52.0,
        score: 7.5,
        date,
        bar_time: date.and_hms_opt(4, 0, 0).unwrap().and_utc(),
    }
}

/// A Config suitable for testing: no notifications, ledger in a temp dir.
pub fn default_test_config() -> Config {
    Config {
        trades_file: std::env::temp_dir().join(format!("trades-test-{}.json", std::process::id())),
        log_level: "error".to_string(),
        ..Config::default()
    }
}

/// `n` five-minute bars ending 10:00 IST on 2024-01-16, climbing 0.1 per bar
/// with a 0.4 range and volume 100, the last bar carrying `last_volume`.
pub fn uptrend_session(n: usize, last_volume: f64) -> BarSeries {
    let last = ist(2024, 1, 16, 10, 0);
    let bars = (0..n)
        .map(|i| {
            let close = 100.0 + 0.1 * i as f64;
            Bar {
                timestamp: last - Duration::minutes(5 * (n - 1 - i) as i64),
                open: close - 0.05,
                high: close + 0.2,
                low: close - 0.2,
                close,
                volume: if i + 1 == n { last_volume } else { 100.0 },
            }
        })
        .collect();
    BarSeries::new(bars)
}

/// Volumeless index bars aligned with [`uptrend_session`], drifting `step`
/// points per bar from 20000.
pub fn index_session(n: usize, step: f64) -> BarSeries {
    let last = ist(2024, 1, 16, 10, 0);
    let bars = (0..n)
        .map(|i| {
            let close = 20000.0 + step * i as f64;
            Bar {
                timestamp: last - Duration::minutes(5 * (n - 1 - i) as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0.0,
            }
        })
        .collect();
    BarSeries::new(bars)
}
