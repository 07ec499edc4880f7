use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use momentum_signal_bot::bot::SignalBot;
use momentum_signal_bot::config::Config;
use momentum_signal_bot::market::YahooMarket;
use momentum_signal_bot::notify::TelegramNotifier;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let market = Box::new(YahooMarket::new()?);
    let notifier = Box::new(TelegramNotifier::new(&cfg)?);

    let mut bot = SignalBot::new(cfg, market, notifier);
    bot.run().await?;

    Ok(())
}
