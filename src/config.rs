use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::models::Timeframe;

const DEFAULT_WATCHLIST: &[&str] = &[
    "HDFCBANK.NS", "ICICIBANK.NS", "SBIN.NS", "AXISBANK.NS", "KOTAKBANK.NS",
    "RELIANCE.NS", "TCS.NS", "INFY.NS", "HCLTECH.NS", "WIPRO.NS",
    "ITC.NS", "HINDUNILVR.NS", "TITAN.NS", "LT.NS", "BHARTIARTL.NS",
    "TATAMOTORS.NS", "MARUTI.NS", "M&M.NS", "SUNPHARMA.NS", "ULTRACEMCO.NS",
    "ADANIENT.NS", "BAJFINANCE.NS", "ASIANPAINT.NS", "JSWSTEEL.NS", "POWERGRID.NS",
];

/// Thresholds and multiples of the scoring rubric and price construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Hard filter: minimum relative volume.
    pub rvol_limit: f64,
    /// Relative volume above this earns the upper momentum tier.
    pub rvol_high: f64,
    pub min_score: f64,
    pub max_alerts_per_day: usize,
    pub atr_pct_min: f64,
    pub atr_pct_max: f64,
    /// Stop distance in ATRs (k).
    pub stop_atr_mult: f64,
    /// Target distance as a multiple of stop distance (R).
    pub reward_mult: f64,
    /// Adverse fill adjustment on entry, in percent.
    pub slippage_pct: f64,
    /// Neutral band around the benchmark VWAP, in percent.
    pub vwap_tolerance_pct: f64,
    /// Outperformance in percentage points that earns the second RS award.
    pub rs_strong_margin: f64,
    pub min_bars: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            rvol_limit: 1.5,
            rvol_high: 2.5,
            min_score: 7.5,
            max_alerts_per_day: 3,
            atr_pct_min: 0.2,
            atr_pct_max: 2.5,
            stop_atr_mult: 2.0,
            reward_mult: 2.0,
            slippage_pct: 0.0,
            vwap_tolerance_pct: 0.05,
            rs_strong_margin: 1.0,
            min_bars: 50,
        }
    }
}

/// Session clock boundaries, in exchange local time.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub timezone: Tz,
    pub start: NaiveTime,
    pub lunch_start: NaiveTime,
    pub lunch_end: NaiveTime,
    pub stop: NaiveTime,
    pub trade_weekends: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Kolkata,
            start: hm(9, 30),
            lunch_start: hm(11, 0),
            lunch_end: hm(13, 30),
            stop: hm(15, 0),
            trade_weekends: false,
        }
    }
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone)]
pub struct Config {
    // Notifications
    pub tg_bot_token: Option<String>,
    pub tg_chat_id: Option<String>,

    // Ledger
    pub trades_file: PathBuf,

    // Universe
    pub watchlist: Vec<String>,
    pub benchmark: String,
    pub symbol_suffix: String,
    pub interval: Timeframe,
    pub lookback_days: u32,

    pub strategy: StrategyConfig,
    pub session: SessionConfig,

    // Cadence (seconds)
    pub cycle_interval_secs: u64,
    pub pre_open_poll_secs: u64,
    pub midday_poll_secs: u64,
    pub bias_max_age_secs: u64,
    pub max_runtime_minutes: Option<u64>,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tg_bot_token: None,
            tg_chat_id: None,
            trades_file: PathBuf::from("trades.json"),
            watchlist: DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect(),
            benchmark: "^NSEI".to_string(),
            symbol_suffix: ".NS".to_string(),
            interval: Timeframe::M5,
            lookback_days: 5,
            strategy: StrategyConfig::default(),
            session: SessionConfig::default(),
            cycle_interval_secs: 300,
            pre_open_poll_secs: 60,
            midday_poll_secs: 300,
            bias_max_age_secs: 900,
            max_runtime_minutes: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from defaults overridden by whatever `lookup` returns.
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Config::default();

        cfg.tg_bot_token = get("TG_BOT_TOKEN");
        cfg.tg_chat_id = get("TG_CHAT_ID");
        if let Some(path) = get("TRADES_FILE") {
            cfg.trades_file = PathBuf::from(path);
        }
        if let Some(list) = get("WATCHLIST") {
            cfg.watchlist = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(b) = get("BENCHMARK") {
            cfg.benchmark = b.trim().to_string();
        }
        if let Some(s) = lookup("SYMBOL_SUFFIX") {
            cfg.symbol_suffix = s.trim().to_string();
        }
        if let Some(raw) = get("BAR_INTERVAL") {
            cfg.interval = Timeframe::from_str_loose(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "BAR_INTERVAL",
                value: raw.clone(),
                reason: "expected one of 1m, 2m, 5m, 15m, 30m, 60m".to_string(),
            })?;
        }
        parse_into(&get, "LOOKBACK_DAYS", &mut cfg.lookback_days)?;

        let s = &mut cfg.strategy;
        parse_into(&get, "RVOL_LIMIT", &mut s.rvol_limit)?;
        parse_into(&get, "RVOL_HIGH", &mut s.rvol_high)?;
        parse_into(&get, "MIN_SCORE", &mut s.min_score)?;
        parse_into(&get, "MAX_ALERTS_PER_DAY", &mut s.max_alerts_per_day)?;
        parse_into(&get, "ATR_PCT_MIN", &mut s.atr_pct_min)?;
        parse_into(&get, "ATR_PCT_MAX", &mut s.atr_pct_max)?;
        parse_into(&get, "STOP_ATR_MULT", &mut s.stop_atr_mult)?;
        parse_into(&get, "REWARD_MULT", &mut s.reward_mult)?;
        parse_into(&get, "SLIPPAGE_PCT", &mut s.slippage_pct)?;
        parse_into(&get, "VWAP_TOLERANCE", &mut s.vwap_tolerance_pct)?;
        parse_into(&get, "RS_STRONG_MARGIN", &mut s.rs_strong_margin)?;

        let sess = &mut cfg.session;
        if let Some(tz) = get("EXCHANGE_TZ") {
            sess.timezone = Tz::from_str(tz.trim()).map_err(|_| ConfigError::TimeZone(tz))?;
        }
        parse_time(&get, "SESSION_START", &mut sess.start)?;
        parse_time(&get, "LUNCH_START", &mut sess.lunch_start)?;
        parse_time(&get, "LUNCH_END", &mut sess.lunch_end)?;
        parse_time(&get, "SESSION_STOP", &mut sess.stop)?;
        parse_into(&get, "TRADE_WEEKENDS", &mut sess.trade_weekends)?;

        parse_into(&get, "CYCLE_INTERVAL_SECS", &mut cfg.cycle_interval_secs)?;
        parse_into(&get, "PRE_OPEN_POLL_SECS", &mut cfg.pre_open_poll_secs)?;
        parse_into(&get, "MIDDAY_POLL_SECS", &mut cfg.midday_poll_secs)?;
        parse_into(&get, "BIAS_MAX_AGE_SECS", &mut cfg.bias_max_age_secs)?;
        let mut runtime = 0u64;
        parse_into(&get, "MAX_RUNTIME_MINUTES", &mut runtime)?;
        cfg.max_runtime_minutes = (runtime > 0).then_some(runtime);
        if let Some(level) = get("LOG_LEVEL") {
            cfg.log_level = level;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watchlist.is_empty() {
            return Err(ConfigError::EmptyWatchlist);
        }
        let s = &self.strategy;
        finite("ATR_PCT_MIN", s.atr_pct_min)?;
        finite("ATR_PCT_MAX", s.atr_pct_max)?;
        finite("SLIPPAGE_PCT", s.slippage_pct)?;
        finite("VWAP_TOLERANCE", s.vwap_tolerance_pct)?;
        positive("RVOL_LIMIT", s.rvol_limit)?;
        positive("RVOL_HIGH", s.rvol_high)?;
        positive("MIN_SCORE", s.min_score)?;
        positive("STOP_ATR_MULT", s.stop_atr_mult)?;
        positive("REWARD_MULT", s.reward_mult)?;
        positive("RS_STRONG_MARGIN", s.rs_strong_margin)?;
        if s.rvol_high < s.rvol_limit {
            return Err(invalid("RVOL_HIGH", s.rvol_high, "must be >= RVOL_LIMIT"));
        }
        if s.atr_pct_min < 0.0 || s.atr_pct_max <= s.atr_pct_min {
            return Err(invalid("ATR_PCT_MAX", s.atr_pct_max, "band must satisfy 0 <= min < max"));
        }
        if !(0.0..100.0).contains(&s.slippage_pct) {
            return Err(invalid("SLIPPAGE_PCT", s.slippage_pct, "must be in [0, 100)"));
        }
        if s.vwap_tolerance_pct < 0.0 {
            return Err(invalid("VWAP_TOLERANCE", s.vwap_tolerance_pct, "must be >= 0"));
        }
        for (key, secs) in [
            ("CYCLE_INTERVAL_SECS", self.cycle_interval_secs),
            ("PRE_OPEN_POLL_SECS", self.pre_open_poll_secs),
            ("MIDDAY_POLL_SECS", self.midday_poll_secs),
        ] {
            if secs == 0 {
                return Err(invalid(key, secs, "must be >= 1"));
            }
        }
        if self.lookback_days == 0 {
            return Err(invalid("LOOKBACK_DAYS", self.lookback_days, "must be >= 1"));
        }

        let sess = &self.session;
        if !(sess.start <= sess.lunch_start
            && sess.lunch_start <= sess.lunch_end
            && sess.lunch_end <= sess.stop
            && sess.start < sess.stop)
        {
            return Err(ConfigError::SessionOrder(format!(
                "{} <= {} <= {} <= {} required",
                sess.start.format("%H:%M"),
                sess.lunch_start.format("%H:%M"),
                sess.lunch_end.format("%H:%M"),
                sess.stop.format("%H:%M"),
            )));
        }
        Ok(())
    }

    /// Watchlist symbol as recorded in the ledger (`RELIANCE.NS` -> `RELIANCE`).
    pub fn clean_symbol<'a>(&self, ticker: &'a str) -> &'a str {
        if self.symbol_suffix.is_empty() {
            return ticker;
        }
        ticker.strip_suffix(self.symbol_suffix.as_str()).unwrap_or(ticker)
    }

    /// Inverse of [`Config::clean_symbol`].
    pub fn ticker_for(&self, symbol: &str) -> String {
        if self.symbol_suffix.is_empty() || symbol.ends_with(self.symbol_suffix.as_str()) {
            symbol.to_string()
        } else {
            format!("{}{}", symbol, self.symbol_suffix)
        }
    }

    pub fn notifications_enabled(&self) -> bool {
        self.tg_bot_token.is_some() && self.tg_chat_id.is_some()
    }
}

fn parse_into<T, G>(get: &G, key: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(key) {
        *slot = raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn parse_time<G>(get: &G, key: &'static str, slot: &mut NaiveTime) -> Result<(), ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(key) {
        *slot = NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
            ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }
        })?;
    }
    Ok(())
}

fn finite(key: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(invalid(key, v, "must be a finite number"))
    }
}

fn positive(key: &'static str, v: f64) -> Result<(), ConfigError> {
    if v > 0.0 && v.is_finite() {
        Ok(())
    } else {
        Err(invalid(key, v, "must be a positive number"))
    }
}

fn invalid(key: &'static str, v: impl ToString, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: v.to_string(),
        reason: reason.to_string(),
    }
}
