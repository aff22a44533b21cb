mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;

use crate::error::Result;

/// Outbound messaging channel. Delivery failures are the caller's to log;
/// a failed delivery must not stop the remaining fan-out.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, owner_id: i64, text: &str) -> Result<()>;
}
