use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::core::quota::DailyQuota;
use crate::core::sessions::{poll_interval, trading_date, SessionClock, SessionState};
use crate::market::{BarCache, BarWindow, MarketData};
use crate::models::{BarSeries, MarketBias};
use crate::notify::{alerts, Notifier};
use crate::strategies::{market_bias, SignalScorer};
use crate::trading::{Acceptance, TradeLedger, TradeRecord};

/// What one ACTIVE cycle did.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub bias: Option<MarketBias>,
    pub closed: Vec<TradeRecord>,
    pub opened: Vec<TradeRecord>,
    /// Watchlist symbols that were scored this cycle.
    pub scanned: usize,
}

/// The session controller: gates cycles by the session clock, owns the
/// ledger and the daily quota, and drives fetch -> exits -> scan.
pub struct SignalBot {
    config: Config,
    cache: BarCache,
    scorer: SignalScorer,
    ledger: TradeLedger,
    quota: DailyQuota,
    clock: SessionClock,
    notifier: Box<dyn Notifier>,
    last_bias: Option<(MarketBias, DateTime<Utc>)>,
    started_at: Option<DateTime<Utc>>,
}

impl SignalBot {
    pub fn new(config: Config, market: Box<dyn MarketData>, notifier: Box<dyn Notifier>) -> Self {
        let window = BarWindow {
            days: config.lookback_days,
            interval: config.interval,
        };
        let ledger = TradeLedger::open(&config.trades_file);
        let today = trading_date(Utc::now(), &config.session);
        let quota = DailyQuota::from_records(
            ledger.records(),
            today,
            config.strategy.max_alerts_per_day,
        );

        info!("{}", "=".repeat(60));
        info!("Momentum signal bot starting up");
        info!(
            "Watchlist: {} symbols | Benchmark: {} | Interval: {}",
            config.watchlist.len(),
            config.benchmark,
            config.interval
        );
        info!(
            "Session ({}): {} - {} | Lunch {} - {}",
            config.session.timezone,
            config.session.start.format("%H:%M"),
            config.session.stop.format("%H:%M"),
            config.session.lunch_start.format("%H:%M"),
            config.session.lunch_end.format("%H:%M")
        );
        info!(
            "Min score: {} | Max alerts/day: {} | Notifications: {}",
            config.strategy.min_score,
            config.strategy.max_alerts_per_day,
            if config.notifications_enabled() {
                "TELEGRAM"
            } else {
                "OFF"
            }
        );
        info!("{}", "=".repeat(60));

        Self {
            scorer: SignalScorer::new(&config),
            cache: BarCache::new(market, window),
            ledger,
            quota,
            clock: SessionClock::new(),
            notifier,
            last_bias: None,
            started_at: None,
            config,
        }
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    pub fn quota(&self) -> &DailyQuota {
        &self.quota
    }

    /// Runs until the session closes, the runtime cap elapses, or Ctrl+C.
    pub async fn run(&mut self) -> Result<()> {
        info!("Bot is now running. Press Ctrl+C to stop.");
        self.print_status();

        loop {
            let now = Utc::now();
            if self.runtime_exceeded(now) {
                info!("Runtime limit reached");
                break;
            }

            let state = self.tick(now).await;
            let Some(wait) = poll_interval(state, &self.config) else {
                info!("Session {}, stopping", state);
                break;
            };
            debug!("Session {}, sleeping {}s", state, wait.as_secs());

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Re-reads the session clock at `now` and, when ACTIVE, runs one cycle.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> SessionState {
        self.started_at.get_or_insert(now);

        if self.clock.update(&self.config.session, Some(now)) {
            if let Some(today) = self.clock.date {
                self.roll_day(today);
            }
        }

        if self.clock.is_active() {
            self.run_cycle(now).await;
        }
        self.clock.state
    }

    fn roll_day(&mut self, today: NaiveDate) {
        if self.quota.date() == today {
            return;
        }
        self.quota = DailyQuota::from_records(
            self.ledger.records(),
            today,
            self.config.strategy.max_alerts_per_day,
        );
        info!(
            "New trading day {} | {} signal(s) already issued",
            today,
            self.quota.issued()
        );
    }

    fn runtime_exceeded(&self, now: DateTime<Utc>) -> bool {
        match (self.config.max_runtime_minutes, self.started_at) {
            (Some(limit), Some(start)) => now - start >= ChronoDuration::minutes(limit as i64),
            _ => false,
        }
    }

    /// One full pass: fetch the universe, close hit records, then scan the
    /// watchlist for new signals while the quota allows.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::default();
        let today = trading_date(now, &self.config.session);
        if self.quota.date() != today {
            self.roll_day(today);
        }

        let universe = self.universe();
        let fetched = self.cache.refresh(&universe, now).await;
        if fetched.is_empty() {
            warn!("No market data this cycle");
            return report;
        }

        let benchmark = fetched.get(&self.config.benchmark).cloned().unwrap_or_default();
        let by_symbol: HashMap<String, BarSeries> = fetched
            .iter()
            .filter(|(ticker, _)| **ticker != self.config.benchmark)
            .map(|(ticker, series)| (self.config.clean_symbol(ticker).to_string(), series.clone()))
            .collect();

        report.closed = self.update_exits(&by_symbol, today).await;

        let bias = self.current_bias(&benchmark, now);
        report.bias = Some(bias);
        if !bias.is_bullish() {
            info!("Market bias {}, not scanning", bias);
            return report;
        }
        if self.quota.is_exhausted() {
            debug!("Daily quota exhausted ({}/{})", self.quota.issued(), self.quota.limit());
            return report;
        }

        let watchlist = self.config.watchlist.clone();
        for ticker in &watchlist {
            if self.quota.is_exhausted() {
                break;
            }
            let symbol = self.config.clean_symbol(ticker).to_string();
            if !self.quota.admits(&symbol) || self.ledger.has_open(&symbol) {
                continue;
            }
            let Some(bars) = by_symbol.get(&symbol) else {
                continue;
            };
            report.scanned += 1;

            let Some(proposal) = self.scorer.propose(&symbol, bars, &benchmark, bias, today) else {
                continue;
            };

            match self.ledger.accept(&proposal, &mut self.quota) {
                Ok(Acceptance::Opened(record)) => {
                    info!(
                        "NEW SIGNAL {} score {:.1} | entry {:.2} stop {:.2} target {:.2}",
                        record.symbol, record.score, record.entry, record.stop, record.target
                    );
                    self.notify(&alerts::new_trade(&proposal)).await;
                    report.opened.push(record);
                }
                Ok(other) => debug!("{} not accepted: {:?}", symbol, other),
                Err(e) => error!("Failed to persist signal for {}: {}", symbol, e),
            }
        }

        report
    }

    /// Watchlist, every symbol with an OPEN record, and the benchmark.
    fn universe(&self) -> BTreeSet<String> {
        let mut symbols: BTreeSet<String> = self.config.watchlist.iter().cloned().collect();
        for symbol in self.ledger.open_symbols() {
            symbols.insert(self.config.ticker_for(&symbol));
        }
        symbols.insert(self.config.benchmark.clone());
        symbols
    }

    async fn update_exits(
        &mut self,
        bars: &HashMap<String, BarSeries>,
        today: NaiveDate,
    ) -> Vec<TradeRecord> {
        let (closed, saved) = self.ledger.update_exits(bars, today);
        if let Err(e) = saved {
            error!("Failed to persist closed trades: {}", e);
        }

        let stats = self.ledger.stats();
        for record in &closed {
            info!(
                "{} {} at {:.2} | Win rate {}",
                record.symbol,
                record.status,
                record.exit_price.unwrap_or_default(),
                stats.win_rate()
            );
            self.notify(&alerts::closed_trade(record, &stats)).await;
        }
        closed
    }

    /// Bias from the benchmark bars, or the previous reading while it is
    /// fresh enough when the benchmark is missing from this fetch.
    fn current_bias(&mut self, benchmark: &BarSeries, now: DateTime<Utc>) -> MarketBias {
        if benchmark.is_empty() {
            let max_age = ChronoDuration::seconds(self.config.bias_max_age_secs as i64);
            return match self.last_bias {
                Some((bias, at)) if now - at <= max_age => {
                    debug!("Benchmark missing, reusing {} bias", bias);
                    bias
                }
                _ => MarketBias::Neutral,
            };
        }

        let bias = market_bias(
            benchmark,
            &self.config.session.timezone,
            self.config.strategy.vwap_tolerance_pct,
        );
        self.last_bias = Some((bias, now));
        bias
    }

    async fn notify(&self, text: &str) {
        if let Err(e) = self.notifier.send(text).await {
            warn!("Notification failed: {:#}", e);
        }
    }

    pub fn print_status(&self) {
        let stats = self.ledger.stats();
        info!("Session: {}", self.clock.state);
        info!(
            "Trades: {} | Open: {} | Wins: {} | Losses: {} | Win Rate: {}",
            stats.total,
            stats.open,
            stats.wins,
            stats.losses,
            stats.win_rate()
        );
        info!(
            "Signals today: {}/{} ({} remaining)",
            self.quota.issued(),
            self.quota.limit(),
            self.quota.remaining()
        );
        if let Some(at) = self.cache.fetched_at() {
            info!("Last market fetch: {}", at.to_rfc3339());
        }
    }

    fn shutdown(&mut self) {
        info!("Shutting down...");
        self.print_status();
        info!("Bot stopped.");
    }
}
