use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use time::{macros::format_description, OffsetDateTime};
use tracing::{debug, instrument};

use super::{ensure_success, Notification, NotificationKind, NotificationSender};

const SENDGRID_API: &str = "https://api.sendgrid.com";

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TemplateData<'a> {
    name: &'a str,
    email: &'a str,
    link: &'a str,
    #[serde(rename = "type")]
    kind: NotificationKind,
    date: String,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
    dynamic_template_data: TemplateData<'a>,
}

#[derive(Debug, Serialize)]
struct MailSend<'a> {
    from: Address<'a>,
    template_id: &'a str,
    personalizations: Vec<Personalization<'a>>,
}

/// SendGrid v3 dynamic-template sender.
#[derive(Debug, Clone)]
pub struct SendGridSender {
    client: Client,
    base_url: String,
    api_key: String,
    from_email: String,
    from_name: String,
    template_verify: String,
    template_reset: String,
}

impl SendGridSender {
    pub fn new(
        api_key: &str,
        from_email: &str,
        from_name: &str,
        template_verify: &str,
        template_reset: &str,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: SENDGRID_API.to_string(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
            template_verify: template_verify.to_string(),
            template_reset: template_reset.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl NotificationSender for SendGridSender {
    #[instrument(skip_all, fields(kind = ?n.kind))]
    async fn send(&self, n: &Notification) -> anyhow::Result<()> {
        let template_id = match n.kind {
            NotificationKind::Verify => &self.template_verify,
            NotificationKind::ResetPassword => &self.template_reset,
        };
        let date = OffsetDateTime::now_utc()
            .format(format_description!("[day]/[month]/[year]"))
            .context("format send date")?;

        let body = MailSend {
            from: Address {
                email: &self.from_email,
                name: Some(&self.from_name),
            },
            template_id,
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &n.email,
                    name: Some(&n.name),
                }],
                dynamic_template_data: TemplateData {
                    name: &n.name,
                    email: &n.email,
                    link: &n.link,
                    kind: n.kind,
                    date,
                },
            }],
        };

        let res = self
            .client
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("sendgrid request")?;
        ensure_success("sendgrid", res).await?;
        debug!("sendgrid accepted email");
        Ok(())
    }
}
