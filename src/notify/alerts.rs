//! Alert message bodies, Telegram Markdown.

use crate::models::TradeStatus;
use crate::strategies::TradeProposal;
use crate::trading::{LedgerStats, TradeRecord};

pub fn new_trade(p: &TradeProposal) -> String {
    format!(
        "🚨 **NEW TRADE**\n💎 **{}** (Score: {:.1})\n🟢 Entry: {:.2}\n🛑 Stop: {:.2}\n🎯 Target: {:.2}",
        p.symbol, p.score, p.entry, p.stop, p.target
    )
}

/// Closure alert for `record`, with the win rate after the closure.
pub fn closed_trade(record: &TradeRecord, stats: &LedgerStats) -> String {
    match record.status {
        TradeStatus::Win => format!(
            "✅ **TARGET HIT!**\n💎 **{}** hit {:.2}\n🏆 Win Rate: {}",
            record.symbol,
            record.target,
            stats.win_rate()
        ),
        _ => format!(
            "🛑 **STOP HIT**\n🔻 **{}** hit {:.2}\n⚠️ Win Rate: {}",
            record.symbol,
            record.stop,
            stats.win_rate()
        ),
    }
}
