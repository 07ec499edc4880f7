use chrono::NaiveDate;
use chrono_tz::Tz;
use std::fmt;

use crate::config::{Config, StrategyConfig};
use crate::core::indicators::{window_return, IndicatorSnapshot};
use crate::models::{BarSeries, MarketBias};
use crate::strategies::signals::TradeProposal;

/// Bars spanned by the relative-strength comparison.
pub const RS_WINDOW: usize = 6;

const TREND_VWAP_POINTS: f64 = 2.0;
const TREND_EMA_POINTS: f64 = 2.0;
const MOMENTUM_HIGH_POINTS: f64 = 2.0;
const MOMENTUM_LOW_POINTS: f64 = 1.0;
const RS_POINTS: f64 = 1.5;
const RS_STRONG_POINTS: f64 = 1.5;

/// Why a symbol produced no proposal this cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    NotBullish(MarketBias),
    InsufficientBars { have: usize, need: usize },
    IndicatorUndefined,
    BelowVwap { close: f64, vwap: f64 },
    LowRelativeVolume(f64),
    AtrOutOfBand(f64),
    ScoreBelowMin(f64),
    InvalidPrices,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotBullish(b) => write!(f, "market bias {}", b),
            Rejection::InsufficientBars { have, need } => {
                write!(f, "{} bars, need {}", have, need)
            }
            Rejection::IndicatorUndefined => write!(f, "indicators undefined"),
            Rejection::BelowVwap { close, vwap } => {
                write!(f, "close {:.2} <= vwap {:.2}", close, vwap)
            }
            Rejection::LowRelativeVolume(r) => write!(f, "rvol {:.2} below limit", r),
            Rejection::AtrOutOfBand(p) => write!(f, "atr {:.2}% outside band", p),
            Rejection::ScoreBelowMin(s) => write!(f, "score {:.1} below minimum", s),
            Rejection::InvalidPrices => write!(f, "degenerate price levels"),
        }
    }
}

/// Points earned per rubric line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreBreakdown {
    pub trend: f64,
    pub momentum: f64,
    pub relative_strength: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.trend + self.momentum + self.relative_strength
    }
}

/// Pure evaluator: bars in, proposal or rejection out. Persistence and
/// quota checks belong to the caller.
pub struct SignalScorer {
    cfg: StrategyConfig,
    tz: Tz,
}

impl SignalScorer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            cfg: cfg.strategy.clone(),
            tz: cfg.session.timezone,
        }
    }

    /// `evaluate` without the rejection reason.
    pub fn propose(
        &self,
        symbol: &str,
        bars: &BarSeries,
        benchmark: &BarSeries,
        bias: MarketBias,
        date: NaiveDate,
    ) -> Option<TradeProposal> {
        match self.evaluate(symbol, bars, benchmark, bias, date) {
            Ok(p) => Some(p),
            Err(reason) => {
                tracing::trace!("[SCORE] {} rejected: {}", symbol, reason);
                None
            }
        }
    }

    pub fn evaluate(
        &self,
        symbol: &str,
        bars: &BarSeries,
        benchmark: &BarSeries,
        bias: MarketBias,
        date: NaiveDate,
    ) -> Result<TradeProposal, Rejection> {
        if !bias.is_bullish() {
            return Err(Rejection::NotBullish(bias));
        }
        if bars.len() < self.cfg.min_bars {
            return Err(Rejection::InsufficientBars {
                have: bars.len(),
                need: self.cfg.min_bars,
            });
        }
        let last = bars.last().ok_or(Rejection::IndicatorUndefined)?;
        let snap = IndicatorSnapshot::compute(bars, &self.tz).ok_or(Rejection::IndicatorUndefined)?;

        self.check_filters(&snap)?;

        let breakdown = self.score(
            &snap,
            window_return(bars, RS_WINDOW),
            window_return(benchmark, RS_WINDOW),
        );
        let score = breakdown.total();
        if score < self.cfg.min_score {
            return Err(Rejection::ScoreBelowMin(score));
        }

        let (entry, stop, target) = self
            .price_levels(snap.close, snap.atr)
            .ok_or(Rejection::InvalidPrices)?;

        Ok(TradeProposal {
            symbol: symbol.to_string(),
            entry,
            stop,
            target,
            score,
            date,
            bar_time: last.timestamp,
        })
    }

    /// Hard filters after the bias gate, in order, short-circuiting.
    pub fn check_filters(&self, snap: &IndicatorSnapshot) -> Result<(), Rejection> {
        if snap.close <= snap.vwap {
            return Err(Rejection::BelowVwap {
                close: snap.close,
                vwap: snap.vwap,
            });
        }
        if snap.rvol < self.cfg.rvol_limit {
            return Err(Rejection::LowRelativeVolume(snap.rvol));
        }
        let atr_pct = snap.atr_pct();
        if !(self.cfg.atr_pct_min..=self.cfg.atr_pct_max).contains(&atr_pct) {
            return Err(Rejection::AtrOutOfBand(atr_pct));
        }
        Ok(())
    }

    /// Additive rubric. Every line is judged independently; the momentum
    /// tiers are exclusive. Returns are fractions over [`RS_WINDOW`] bars.
    pub fn score(
        &self,
        snap: &IndicatorSnapshot,
        symbol_return: Option<f64>,
        benchmark_return: Option<f64>,
    ) -> ScoreBreakdown {
        let mut b = ScoreBreakdown::default();

        if snap.close > snap.vwap {
            b.trend += TREND_VWAP_POINTS;
        }
        if snap.ema_fast > snap.ema_slow {
            b.trend += TREND_EMA_POINTS;
        }

        if snap.rvol > self.cfg.rvol_high {
            b.momentum = MOMENTUM_HIGH_POINTS;
        } else if snap.rvol > self.cfg.rvol_limit {
            b.momentum = MOMENTUM_LOW_POINTS;
        }

        if let (Some(sym), Some(bench)) = (symbol_return, benchmark_return) {
            if sym > bench {
                b.relative_strength += RS_POINTS;
                if (sym - bench) * 100.0 >= self.cfg.rs_strong_margin {
                    b.relative_strength += RS_STRONG_POINTS;
                }
            }
        }

        b
    }

    /// (entry, stop, target) from the latest close and ATR, or `None` when
    /// the geometry would not satisfy `0 < stop < entry < target`.
    pub fn price_levels(&self, close: f64, atr: f64) -> Option<(f64, f64, f64)> {
        let entry = close * (1.0 + self.cfg.slippage_pct / 100.0);
        let stop = entry - self.cfg.stop_atr_mult * atr;
        let target = entry + self.cfg.reward_mult * (entry - stop);
        let valid = [entry, stop, target].iter().all(|v| v.is_finite())
            && stop > 0.0
            && stop < entry
            && entry < target;
        valid.then_some((entry, stop, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{default_test_config, index_session, uptrend_session, ymd};

    fn scenario_a() -> IndicatorSnapshot {
        IndicatorSnapshot {
            close: 50.0,
            vwap: 49.8,
            ema_fast: 49.9,
            ema_slow: 49.5,
            rvol: 2.6,
            atr: 0.5,
        }
    }

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn scenario_a_scores_seven_and_a_half() {
        let scorer = SignalScorer::new(&default_test_config());
        let snap = scenario_a();
        assert!(scorer.check_filters(&snap).is_ok());
        let b = scorer.score(&snap, Some(0.012), Some(0.004));
        approx(b.trend, 4.0);
        approx(b.momentum, 2.0);
        approx(b.relative_strength, 1.5);
        approx(b.total(), 7.5);
    }

    #[test]
    fn scenario_a_price_levels() {
        let scorer = SignalScorer::new(&default_test_config());
        let (entry, stop, target) = scorer.price_levels(50.0, 0.5).unwrap();
        approx(entry, 50.0);
        approx(stop, 49.0);
        approx(target, 52.0);
    }

    #[test]
    fn scenario_b_low_rvol_rejected_by_filter() {
        let scorer = SignalScorer::new(&default_test_config());
        let snap = IndicatorSnapshot {
            rvol: 1.3,
            ..scenario_a()
        };
        assert_eq!(scorer.check_filters(&snap), Err(Rejection::LowRelativeVolume(1.3)));
    }

    #[test]
    fn filters_reject_close_at_vwap() {
        let scorer = SignalScorer::new(&default_test_config());
        let snap = IndicatorSnapshot {
            vwap: 50.0,
            ..scenario_a()
        };
        assert!(matches!(scorer.check_filters(&snap), Err(Rejection::BelowVwap { .. })));
    }

    #[test]
    fn filters_reject_atr_outside_band() {
        let scorer = SignalScorer::new(&default_test_config());
        let dead = IndicatorSnapshot {
            atr: 0.05, // 0.1%
            ..scenario_a()
        };
        let wild = IndicatorSnapshot {
            atr: 2.0, // 4%
            ..scenario_a()
        };
        assert!(matches!(scorer.check_filters(&dead), Err(Rejection::AtrOutOfBand(_))));
        assert!(matches!(scorer.check_filters(&wild), Err(Rejection::AtrOutOfBand(_))));
    }

    #[test]
    fn strong_outperformance_earns_both_rs_awards() {
        let scorer = SignalScorer::new(&default_test_config());
        let b = scorer.score(&scenario_a(), Some(0.02), Some(0.004));
        approx(b.relative_strength, 3.0);
        approx(b.total(), 9.0);
    }

    #[test]
    fn equal_returns_earn_no_rs_points() {
        // even a margin that validation would refuse never rewards a laggard
        let mut cfg = default_test_config();
        cfg.strategy.rs_strong_margin = 0.0;
        let scorer = SignalScorer::new(&cfg);
        approx(scorer.score(&scenario_a(), Some(0.01), Some(0.01)).relative_strength, 0.0);
        cfg.strategy.rs_strong_margin = -1.0;
        let scorer = SignalScorer::new(&cfg);
        approx(scorer.score(&scenario_a(), Some(0.005), Some(0.01)).relative_strength, 0.0);
    }

    #[test]
    fn missing_benchmark_window_scores_no_rs() {
        let scorer = SignalScorer::new(&default_test_config());
        let b = scorer.score(&scenario_a(), Some(0.02), None);
        approx(b.relative_strength, 0.0);
    }

    #[test]
    fn momentum_tiers_are_exclusive() {
        let scorer = SignalScorer::new(&default_test_config());
        let low = IndicatorSnapshot {
            rvol: 2.0,
            ..scenario_a()
        };
        approx(scorer.score(&low, None, None).momentum, 1.0);
        approx(scorer.score(&scenario_a(), None, None).momentum, 2.0);
    }

    #[test]
    fn score_never_drops_as_rvol_crosses_tiers() {
        let scorer = SignalScorer::new(&default_test_config());
        let mut prev = f64::NEG_INFINITY;
        for step in 0..=40 {
            let snap = IndicatorSnapshot {
                rvol: 1.0 + step as f64 * 0.05,
                ..scenario_a()
            };
            let total = scorer.score(&snap, Some(0.01), Some(0.0)).total();
            assert!(total >= prev, "score fell at rvol {}", snap.rvol);
            prev = total;
        }
    }

    #[test]
    fn price_levels_keep_ordering_and_r_multiple() {
        let mut cfg = default_test_config();
        cfg.strategy.slippage_pct = 0.1;
        cfg.strategy.stop_atr_mult = 1.5;
        cfg.strategy.reward_mult = 1.8;
        let scorer = SignalScorer::new(&cfg);
        for &(close, atr) in &[(50.0, 0.5), (1234.5, 3.7), (7.1, 0.02)] {
            let (entry, stop, target) = scorer.price_levels(close, atr).unwrap();
            assert!(stop < entry && entry < target);
            approx(entry, close * 1.001);
            assert!(((target - entry) - 1.8 * (entry - stop)).abs() < 1e-9);
        }
    }

    #[test]
    fn price_levels_reject_degenerate_geometry() {
        let scorer = SignalScorer::new(&default_test_config());
        assert!(scorer.price_levels(50.0, 0.0).is_none());
        assert!(scorer.price_levels(50.0, 30.0).is_none()); // stop below zero
        assert!(scorer.price_levels(f64::NAN, 1.0).is_none());
    }

    #[test]
    fn bias_gate_runs_first() {
        let scorer = SignalScorer::new(&default_test_config());
        let empty = BarSeries::default();
        let r = scorer.evaluate("X", &empty, &empty, MarketBias::Bearish, ymd(2024, 1, 16));
        assert_eq!(r, Err(Rejection::NotBullish(MarketBias::Bearish)));
        let r = scorer.evaluate("X", &empty, &empty, MarketBias::Bullish, ymd(2024, 1, 16));
        assert_eq!(r, Err(Rejection::InsufficientBars { have: 0, need: 50 }));
    }

    #[test]
    fn fifty_bars_is_the_eligibility_boundary() {
        let scorer = SignalScorer::new(&default_test_config());
        let bench = index_session(60, 1.0);
        let today = ymd(2024, 1, 16);

        let short = uptrend_session(49, 400.0);
        assert_eq!(
            scorer.evaluate("X", &short, &bench, MarketBias::Bullish, today),
            Err(Rejection::InsufficientBars { have: 49, need: 50 })
        );

        let enough = uptrend_session(50, 400.0);
        let p = scorer
            .evaluate("X", &enough, &bench, MarketBias::Bullish, today)
            .unwrap();
        approx(p.score, 7.5);
        approx(p.entry, 104.9);
        assert!(p.stop < p.entry && p.entry < p.target);
        assert_eq!(p.bar_time, enough.last().unwrap().timestamp);
    }

    #[test]
    fn thin_last_bar_fails_rvol_and_yields_no_proposal() {
        let scorer = SignalScorer::new(&default_test_config());
        // rvol = 120 / ((19 * 100 + 120) / 20) ~ 1.19
        let bars = uptrend_session(60, 120.0);
        let r = scorer.evaluate("X", &bars, &index_session(60, 1.0), MarketBias::Bullish, ymd(2024, 1, 16));
        assert!(matches!(r, Err(Rejection::LowRelativeVolume(v)) if v < 1.5));
        assert!(scorer
            .propose("X", &bars, &index_session(60, 1.0), MarketBias::Bullish, ymd(2024, 1, 16))
            .is_none());
    }
}
