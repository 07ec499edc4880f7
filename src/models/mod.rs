pub mod bar;
pub mod status;
pub mod timeframe;

pub use bar::{Bar, BarSeries};
pub use status::*;
pub use timeframe::Timeframe;
