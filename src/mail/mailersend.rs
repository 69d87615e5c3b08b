use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{ensure_success, Notification, NotificationKind, NotificationSender};

const MAILERSEND_API: &str = "https://api.mailersend.com";

#[derive(Debug, Serialize)]
struct Contact<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct PersonalizationData<'a> {
    name: &'a str,
    link: &'a str,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    email: &'a str,
    data: PersonalizationData<'a>,
}

#[derive(Debug, Serialize)]
struct EmailRequest<'a> {
    from: Contact<'a>,
    to: Vec<Contact<'a>>,
    subject: &'a str,
    template_id: &'a str,
    personalization: Vec<Personalization<'a>>,
}

/// MailerSend template sender.
#[derive(Debug, Clone)]
pub struct MailerSendSender {
    client: Client,
    base_url: String,
    api_key: String,
    from_email: String,
    from_name: String,
    template_verify: String,
    template_reset: String,
}

impl MailerSendSender {
    pub fn new(
        api_key: &str,
        from_email: &str,
        from_name: &str,
        template_verify: &str,
        template_reset: &str,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: MAILERSEND_API.to_string(),
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
impl NotificationSender for MailerSendSender {
    #[instrument(skip_all, fields(kind = ?n.kind))]
    async fn send(&self, n: &Notification) -> anyhow::Result<()> {
        let (template_id, subject) = match n.kind {
            NotificationKind::Verify => (&self.template_verify, "Verify your email"),
            NotificationKind::ResetPassword => (&self.template_reset, "Reset your password"),
        };

        let body = EmailRequest {
            from: Contact {
                email: &self.from_email,
                name: &self.from_name,
            },
            to: vec![Contact {
                email: &n.email,
                name: &n.name,
            }],
            subject,
            template_id,
            personalization: vec![Personalization {
                email: &n.email,
                data: PersonalizationData {
                    name: &n.name,
                    link: &n.link,
                },
            }],
        };

        let res = self
            .client
            .post(format!("{}/v1/email", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("mailersend request")?;
        ensure_success("mailersend", res).await?;
        debug!("mailersend accepted email");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_verify_template_with_personalization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/email"))
            .and(header("authorization", "Bearer ms-key"))
            .and(body_partial_json(serde_json::json!({
                "subject": "Verify your email",
                "template_id": "tpl-verify",
                "to": [{ "email": "a@x.com", "name": "Alice" }],
                "personalization": [{
                    "email": "a@x.com",
                    "data": { "name": "Alice", "link": "http://localhost:8080/verify/t" }
                }]
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let sender = MailerSendSender::new(
            "ms-key",
            "no-reply@example.com",
            "Keygate",
            "tpl-verify",
            "tpl-reset",
        )
        .with_base_url(&server.uri());

        sender
            .send(&Notification {
                kind: NotificationKind::Verify,
                name: "Alice".into(),
                email: "a@x.com".into(),
                link: "http://localhost:8080/verify/t".into(),
            })
            .await
            .expect("send ok");
    }
}
