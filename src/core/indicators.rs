//! Per-symbol indicator vector computed at the latest bar.
//!
//! Every function answers `None` when the value is undefined: not enough
//! history, a non-finite input, or a zero denominator. Callers treat `None`
//! as "ineligible this cycle", never as an error.

use chrono::TimeZone;

use crate::models::{Bar, BarSeries};

pub const EMA_FAST_PERIOD: usize = 9;
pub const EMA_SLOW_PERIOD: usize = 21;
pub const RVOL_WINDOW: usize = 20;
pub const ATR_PERIOD: usize = 14;
/// Bars required before a snapshot is defined at all.
pub const MIN_LOOKBACK: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub vwap: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rvol: f64,
    pub atr: f64,
}

impl IndicatorSnapshot {
    /// Computes the full vector at the last bar of `bars`. VWAP is anchored
    /// to the last bar's calendar day in `tz`.
    pub fn compute<Tz: TimeZone>(bars: &BarSeries, tz: &Tz) -> Option<Self> {
        if bars.len() < MIN_LOOKBACK {
            return None;
        }
        let close = finite(bars.last()?.close)?;
        let closes = bars.closes();
        Some(Self {
            close,
            vwap: session_vwap(bars, tz)?,
            ema_fast: ema(&closes, EMA_FAST_PERIOD)?,
            ema_slow: ema(&closes, EMA_SLOW_PERIOD)?,
            rvol: relative_volume(bars.as_slice(), RVOL_WINDOW)?,
            atr: atr(bars.as_slice(), ATR_PERIOD)?,
        })
    }

    /// ATR as a percentage of the close.
    pub fn atr_pct(&self) -> f64 {
        self.atr / self.close * 100.0
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Latest simple moving average over the trailing `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    finite(window.iter().sum::<f64>() / period as f64)
}

/// Latest exponential moving average, seeded with the SMA of the first
/// `period` values and smoothed with alpha = 2 / (period + 1).
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;
    let last = values[period..]
        .iter()
        .fold(seed, |prev, &v| alpha * v + (1.0 - alpha) * prev);
    finite(last)
}

/// True range per bar. Bar 0 has no previous close and is reported as the
/// plain high-low range.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, b)| match i.checked_sub(1).map(|p| bars[p].close) {
            Some(pc) => b.range().max((b.high - pc).abs()).max((b.low - pc).abs()),
            None => b.range(),
        })
        .collect()
}

/// Wilder ATR at the last bar. The seed is the mean of the first `period`
/// true ranges that have a previous close (TR[1..=period]), then
/// ATR[t] = ATR[t-1] + (TR[t] - ATR[t-1]) / period.
pub fn atr(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let tr = true_range(bars);
    let seed = tr[1..=period].iter().sum::<f64>() / period as f64;
    let alpha = 1.0 / period as f64;
    let last = tr[period + 1..]
        .iter()
        .fold(seed, |prev, &v| prev + alpha * (v - prev));
    finite(last)
}

/// Current bar volume over the SMA of the trailing `window` volumes
/// (current bar included). Zero average volume is undefined, not infinite.
pub fn relative_volume(bars: &[Bar], window: usize) -> Option<f64> {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let avg = sma(&volumes, window)?;
    if avg <= 0.0 {
        return None;
    }
    finite(volumes.last()? / avg)
}

/// Session-anchored VWAP: cumulative typical price x volume over cumulative
/// volume since the first bar of the latest calendar day.
pub fn session_vwap<Tz: TimeZone>(bars: &BarSeries, tz: &Tz) -> Option<f64> {
    let session = bars.latest_session(tz);
    let (pv, vol) = session.iter().fold((0.0, 0.0), |(pv, vol), b| {
        (pv + b.typical_price() * b.volume, vol + b.volume)
    });
    if vol <= 0.0 {
        return None;
    }
    finite(pv / vol)
}

/// Equal-weighted mean typical price of the latest session. Stands in for
/// VWAP on instruments that report no volume (indices).
pub fn session_twap<Tz: TimeZone>(bars: &BarSeries, tz: &Tz) -> Option<f64> {
    let session = bars.latest_session(tz);
    if session.is_empty() {
        return None;
    }
    finite(session.iter().map(Bar::typical_price).sum::<f64>() / session.len() as f64)
}

/// Fractional return across the last `window` bars:
/// close[n-1] / close[n-window] - 1.
pub fn window_return(bars: &BarSeries, window: usize) -> Option<f64> {
    if window < 2 {
        return None;
    }
    let last = bars.last()?.close;
    let base = bars.back(window - 1)?.close;
    if base == 0.0 {
        return None;
    }
    finite(last / base - 1.0)
}
