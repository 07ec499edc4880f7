pub mod alerts;
pub mod telegram;

pub use telegram::TelegramNotifier;

use anyhow::Result;
use async_trait::async_trait;

/// Outbound alert channel. Delivery is best-effort: callers log and drop
/// errors rather than retrying.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Discards every message. Used when no channel is configured.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}
