use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::quota::DailyQuota;
use crate::error::LedgerError;
use crate::models::{BarSeries, TradeStatus};
use crate::strategies::signals::TradeProposal;
use crate::trading::trade_record::TradeRecord;

/// Outcome of offering a proposal to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum Acceptance {
    Opened(TradeRecord),
    /// The symbol already has an OPEN record.
    DuplicateOpen,
    /// The symbol was already signaled today.
    AlreadySignaled,
    QuotaExhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerStats {
    pub total: usize,
    pub open: usize,
    pub wins: usize,
    pub losses: usize,
}

impl LedgerStats {
    pub fn from_records(records: &[TradeRecord]) -> Self {
        let count = |s: TradeStatus| records.iter().filter(|r| r.status == s).count();
        Self {
            total: records.len(),
            open: count(TradeStatus::Open),
            wins: count(TradeStatus::Win),
            losses: count(TradeStatus::Loss),
        }
    }

    /// Rounded percentage of closed records that won; 0 when none closed.
    pub fn win_rate_pct(&self) -> u32 {
        let closed = self.wins + self.losses;
        if closed == 0 {
            return 0;
        }
        (self.wins as f64 / closed as f64 * 100.0).round() as u32
    }

    pub fn win_rate(&self) -> String {
        format!("{}%", self.win_rate_pct())
    }
}

/// Closes every OPEN record whose symbol's latest bar hits its stop or
/// target. Returns the indices of records that changed.
pub fn update_exits(
    records: &mut [TradeRecord],
    bars: &HashMap<String, BarSeries>,
    today: NaiveDate,
) -> Vec<usize> {
    let mut changed = Vec::new();
    for (i, record) in records.iter_mut().enumerate() {
        if !record.is_open() {
            continue;
        }
        let Some(bar) = bars.get(&record.symbol).and_then(|s| s.last()) else {
            continue;
        };
        if let Some(exit) = record.exit_on(bar) {
            if record.close(exit, today) {
                changed.push(i);
            }
        }
    }
    changed
}

/// The durable, full-document list of trade records.
///
/// Every mutation is followed by a whole-file rewrite through a temp file
/// and rename, so a reader never observes a half-written document.
pub struct TradeLedger {
    path: PathBuf,
    records: Vec<TradeRecord>,
}

impl TradeLedger {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = Self::load(&path);
        Self { path, records }
    }

    /// Start from `records` without touching disk until the first save.
    pub fn with_records(path: impl Into<PathBuf>, records: Vec<TradeRecord>) -> Self {
        Self {
            path: path.into(),
            records,
        }
    }

    /// Reads the document at `path`. A missing file is an empty ledger. An
    /// unreadable or corrupt file is moved aside to `<file>.corrupt-<ts>` and
    /// also yields an empty ledger.
    pub fn load(path: &Path) -> Vec<TradeRecord> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No ledger at {}, starting empty", path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("Ledger {} unreadable ({}), starting empty", path.display(), e);
                return Vec::new();
            }
        };
        if content.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str::<Vec<TradeRecord>>(&content) {
            Ok(records) => records,
            Err(e) => {
                let aside = sibling(path, &format!("corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S")));
                match fs::rename(path, &aside) {
                    Ok(()) => warn!(
                        "Ledger {} corrupt ({}), moved to {}; starting empty",
                        path.display(),
                        e,
                        aside.display()
                    ),
                    Err(re) => warn!(
                        "Ledger {} corrupt ({}), could not move aside ({}); starting empty",
                        path.display(),
                        e,
                        re
                    ),
                }
                Vec::new()
            }
        }
    }

    pub fn save(&self) -> Result<(), LedgerError> {
        write_atomic(&self.path, &self.records)
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn has_open(&self, symbol: &str) -> bool {
        self.records.iter().any(|r| r.symbol == symbol && r.is_open())
    }

    pub fn open_symbols(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| r.is_open())
            .map(|r| r.symbol.clone())
            .collect()
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats::from_records(&self.records)
    }

    /// Evaluates exits against `bars` and persists if anything closed.
    /// Returns the closed records. Closures stay applied in memory even when
    /// the save fails; the next successful save carries them.
    pub fn update_exits(
        &mut self,
        bars: &HashMap<String, BarSeries>,
        today: NaiveDate,
    ) -> (Vec<TradeRecord>, Result<(), LedgerError>) {
        let changed = update_exits(&mut self.records, bars, today);
        if changed.is_empty() {
            return (Vec::new(), Ok(()));
        }
        let closed = changed.iter().map(|&i| self.records[i].clone()).collect();
        (closed, self.save())
    }

    /// Appends a record for `proposal` if the symbol has no OPEN record and
    /// today's quota admits it, then persists before returning. A failed save
    /// rolls the append back so the quota and the document stay in step.
    pub fn accept(
        &mut self,
        proposal: &TradeProposal,
        quota: &mut DailyQuota,
    ) -> Result<Acceptance, LedgerError> {
        if self.has_open(&proposal.symbol) {
            return Ok(Acceptance::DuplicateOpen);
        }
        if quota.is_exhausted() {
            return Ok(Acceptance::QuotaExhausted);
        }
        if quota.contains(&proposal.symbol) {
            return Ok(Acceptance::AlreadySignaled);
        }

        let record = TradeRecord::from_proposal(proposal);
        self.records.push(record.clone());
        if let Err(e) = self.save() {
            self.records.pop();
            return Err(e);
        }
        quota.record(&proposal.symbol);
        Ok(Acceptance::Opened(record))
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}", suffix));
    path.with_file_name(name)
}

fn write_atomic(path: &Path, records: &[TradeRecord]) -> Result<(), LedgerError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| LedgerError::io(dir, e))?;
    }
    let json = serde_json::to_string_pretty(records)?;
    let tmp = sibling(path, "tmp");

    let mut file = fs::File::create(&tmp).map_err(|e| LedgerError::io(&tmp, e))?;
    file.write_all(json.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|e| LedgerError::io(&tmp, e))?;
    drop(file);

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(LedgerError::io(path, e));
    }
    Ok(())
}
