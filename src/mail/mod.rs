//! Outbound email for verification and password-reset links.
//!
//! Handlers only see [`NotificationSender`]; the concrete provider is picked
//! once at startup from [`EmailConfig`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{EmailConfig, EmailProvider};

mod log;
mod mailersend;
mod sendgrid;

pub use self::log::LogSender;
pub use self::mailersend::MailerSendSender;
pub use self::sendgrid::SendGridSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Verify,
    ResetPassword,
}

/// A templated email addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub name: String,
    pub email: String,
    pub link: String,
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

pub fn build_sender(cfg: &EmailConfig) -> Arc<dyn NotificationSender> {
    match &cfg.provider {
        EmailProvider::SendGrid {
            api_key,
            template_verify,
            template_reset,
        } => Arc::new(SendGridSender::new(
            api_key,
            &cfg.from_email,
            &cfg.from_name,
            template_verify,
            template_reset,
        )),
        EmailProvider::MailerSend {
            api_key,
            template_verify,
            template_reset,
        } => Arc::new(MailerSendSender::new(
            api_key,
            &cfg.from_email,
            &cfg.from_name,
            template_verify,
            template_reset,
        )),
        EmailProvider::Log => Arc::new(LogSender),
    }
}

/// Turns a non-2xx provider response into an error carrying its body.
async fn ensure_success(provider: &str, res: reqwest::Response) -> anyhow::Result<()> {
    let status = res.status();
    if status.is_success() {
        return Ok(());
    }
    let body = res.text().await.unwrap_or_default();
    anyhow::bail!("{provider} rejected email ({status}): {body}")
}
