use async_trait::async_trait;
use tracing::info;

use super::{Notification, NotificationSender};

/// Development sender: prints the link instead of mailing it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(&self, n: &Notification) -> anyhow::Result<()> {
        info!(kind = ?n.kind, to = %n.email, link = %n.link, "email not sent (log provider)");
        Ok(())
    }
}
