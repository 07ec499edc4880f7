pub mod bias;
pub mod scorer;
pub mod signals;

pub use bias::market_bias;
pub use scorer::{Rejection, ScoreBreakdown, SignalScorer};
pub use signals::TradeProposal;
