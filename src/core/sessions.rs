use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::{Config, SessionConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    PreOpen,
    Active,
    MiddayPause,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::PreOpen => write!(f, "PRE_OPEN"),
            SessionState::Active => write!(f, "ACTIVE"),
            SessionState::MiddayPause => write!(f, "MIDDAY_PAUSE"),
            SessionState::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Session state at `now`, judged on the exchange's local clock.
pub fn session_state(now: DateTime<Utc>, cfg: &SessionConfig) -> SessionState {
    let local = now.with_timezone(&cfg.timezone);
    if !cfg.trade_weekends && matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return SessionState::Closed;
    }

    let t = local.time();
    if t < cfg.start {
        SessionState::PreOpen
    } else if t >= cfg.stop {
        SessionState::Closed
    } else if t >= cfg.lunch_start && t < cfg.lunch_end {
        SessionState::MiddayPause
    } else {
        SessionState::Active
    }
}

/// Exchange-local calendar day of `now`.
pub fn trading_date(now: DateTime<Utc>, cfg: &SessionConfig) -> NaiveDate {
    now.with_timezone(&cfg.timezone).date_naive()
}

/// How long to sleep after observing `state`. `None` means the run is over.
pub fn poll_interval(state: SessionState, cfg: &Config) -> Option<Duration> {
    match state {
        SessionState::PreOpen => Some(Duration::from_secs(cfg.pre_open_poll_secs)),
        SessionState::MiddayPause => Some(Duration::from_secs(cfg.midday_poll_secs)),
        SessionState::Active => Some(Duration::from_secs(cfg.cycle_interval_secs)),
        SessionState::Closed => None,
    }
}

/// Tracks the current session state and trading date across polls.
pub struct SessionClock {
    pub state: SessionState,
    pub date: Option<NaiveDate>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            state: SessionState::PreOpen,
            date: None,
        }
    }

    /// Re-reads the clock. Returns true when the trading date changed since
    /// the previous update (including the very first one).
    pub fn update(&mut self, cfg: &SessionConfig, utc_now: Option<DateTime<Utc>>) -> bool {
        let utc_now = utc_now.unwrap_or_else(Utc::now);
        self.state = session_state(utc_now, cfg);
        let today = trading_date(utc_now, cfg);
        let rolled = self.date != Some(today);
        self.date = Some(today);
        rolled
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{default_test_config, ist};

    #[test]
    fn pre_open_before_start() {
        let cfg = default_test_config();
        assert_eq!(session_state(ist(2024, 1, 15, 9, 29), &cfg.session), SessionState::PreOpen);
        assert_eq!(session_state(ist(2024, 1, 15, 0, 5), &cfg.session), SessionState::PreOpen);
    }

    #[test]
    fn active_from_start_until_lunch() {
        let cfg = default_test_config();
        assert_eq!(session_state(ist(2024, 1, 15, 9, 30), &cfg.session), SessionState::Active);
        assert_eq!(session_state(ist(2024, 1, 15, 10, 59), &cfg.session), SessionState::Active);
    }

    #[test]
    fn midday_pause_is_half_open() {
        let cfg = default_test_config();
        assert_eq!(session_state(ist(2024, 1, 15, 11, 0), &cfg.session), SessionState::MiddayPause);
        assert_eq!(session_state(ist(2024, 1, 15, 13, 29), &cfg.session), SessionState::MiddayPause);
        assert_eq!(session_state(ist(2024, 1, 15, 13, 30), &cfg.session), SessionState::Active);
    }

    #[test]
    fn closed_at_and_after_stop() {
        let cfg = default_test_config();
        assert_eq!(session_state(ist(2024, 1, 15, 14, 59), &cfg.session), SessionState::Active);
        assert_eq!(session_state(ist(2024, 1, 15, 15, 0), &cfg.session), SessionState::Closed);
        assert_eq!(session_state(ist(2024, 1, 15, 23, 0), &cfg.session), SessionState::Closed);
    }

    #[test]
    fn weekends_closed_unless_enabled() {
        let mut cfg = default_test_config();
        // 2024-01-13 is a Saturday
        assert_eq!(session_state(ist(2024, 1, 13, 10, 0), &cfg.session), SessionState::Closed);
        cfg.session.trade_weekends = true;
        assert_eq!(session_state(ist(2024, 1, 13, 10, 0), &cfg.session), SessionState::Active);
    }

    #[test]
    fn no_pause_when_lunch_is_empty() {
        let mut cfg = default_test_config();
        cfg.session.lunch_end = cfg.session.lunch_start;
        assert_eq!(session_state(ist(2024, 1, 15, 11, 0), &cfg.session), SessionState::Active);
    }

    #[test]
    fn trading_date_is_exchange_local() {
        let cfg = default_test_config();
        // 00:30 IST on the 16th is still the 15th in UTC
        let now = ist(2024, 1, 16, 0, 30);
        assert_eq!(now.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(
            trading_date(now, &cfg.session),
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()
        );
    }

    #[test]
    fn poll_intervals_follow_state() {
        let cfg = default_test_config();
        assert_eq!(poll_interval(SessionState::PreOpen, &cfg), Some(Duration::from_secs(60)));
        assert_eq!(poll_interval(SessionState::MiddayPause, &cfg), Some(Duration::from_secs(300)));
        assert_eq!(poll_interval(SessionState::Active, &cfg), Some(Duration::from_secs(300)));
        assert_eq!(poll_interval(SessionState::Closed, &cfg), None);
    }

    #[test]
    fn clock_reports_date_roll() {
        let cfg = default_test_config();
        let mut clock = SessionClock::new();
        assert!(clock.update(&cfg.session, Some(ist(2024, 1, 15, 9, 45))));
        assert!(clock.is_active());
        assert!(!clock.update(&cfg.session, Some(ist(2024, 1, 15, 9, 50))));
        assert!(clock.update(&cfg.session, Some(ist(2024, 1, 16, 9, 30))));
    }
}
