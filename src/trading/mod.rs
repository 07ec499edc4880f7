pub mod ledger;
pub mod trade_record;

pub use ledger::{Acceptance, LedgerStats, TradeLedger};
pub use trade_record::{Exit, TradeRecord};
