use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_ttl_minutes: i64,
    pub verification_ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

/// Which outbound mail integration the app talks to.
#[derive(Debug, Clone, Deserialize)]
pub enum EmailProvider {
    SendGrid {
        api_key: String,
        template_verify: String,
        template_reset: String,
    },
    MailerSend {
        api_key: String,
        template_verify: String,
        template_reset: String,
    },
    /// Writes the notification to the log instead of sending it.
    Log,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub provider: EmailProvider,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    /// Prefix for links embedded in emails, without a trailing slash.
    pub base_url: String,
    pub production: bool,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "keygate".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "keygate-users".into()),
            session_ttl_minutes: minutes_var("SESSION_TTL_MINUTES", 60 * 24 * 7)?,
            verification_ttl_minutes: minutes_var("VERIFICATION_TTL_MINUTES", 60)?,
            reset_ttl_minutes: minutes_var("RESET_TTL_MINUTES", 15)?,
        };
        let email = EmailConfig {
            provider: email_provider_from_env()?,
            from_email: std::env::var("EMAIL_FROM").unwrap_or_else(|_| "no-reply@localhost".into()),
            from_name: std::env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "Keygate".into()),
        };
        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".into())
            .trim_end_matches('/')
            .to_string();
        let production = std::env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT")
            .ok()
            .map(|v| v.parse::<u16>())
            .transpose()
            .context("APP_PORT must be a port number")?
            .unwrap_or(8080);

        Ok(Self {
            database_url,
            jwt,
            email,
            base_url,
            production,
            host,
            port,
        })
    }
}

fn minutes_var(key: &str, default: i64) -> anyhow::Result<i64> {
    parse_minutes(key, std::env::var(key).ok().as_deref(), default)
}

/// A token lifetime in minutes; unset means `default`, anything else must be
/// a positive integer.
fn parse_minutes(key: &str, raw: Option<&str>, default: i64) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let minutes = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("{key} must be a number of minutes"))?;
    anyhow::ensure!(minutes > 0, "{key} must be positive, got {minutes}");
    Ok(minutes)
}

fn email_provider_from_env() -> anyhow::Result<EmailProvider> {
    let required = |key: &str| std::env::var(key).with_context(|| format!("{key} must be set"));

    let provider = std::env::var("EMAIL_PROVIDER").unwrap_or_else(|_| "log".into());
    match provider.to_lowercase().as_str() {
        "sendgrid" => Ok(EmailProvider::SendGrid {
            api_key: required("SENDGRID_API_KEY")?,
            template_verify: required("SENDGRID_TEMPLATE_ID_VERIFY")?,
            template_reset: required("SENDGRID_TEMPLATE_ID_RESET")?,
        }),
        "mailersend" => Ok(EmailProvider::MailerSend {
            api_key: required("MAILERSEND_API_KEY")?,
            template_verify: required("MAILERSEND_TEMPLATE_ID_VERIFY")?,
            template_reset: required("MAILERSEND_TEMPLATE_ID_RESET")?,
        }),
        "log" => Ok(EmailProvider::Log),
        other => anyhow::bail!("unknown EMAIL_PROVIDER `{other}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_defaults_when_unset() {
        assert_eq!(parse_minutes("RESET_TTL_MINUTES", None, 15).unwrap(), 15);
        assert_eq!(parse_minutes("RESET_TTL_MINUTES", Some(" 30 "), 15).unwrap(), 30);
    }

    #[test]
    fn ttl_rejects_garbage_and_non_positive_values() {
        let err = parse_minutes("RESET_TTL_MINUTES", Some("soon"), 15).unwrap_err();
        assert!(err.to_string().contains("RESET_TTL_MINUTES"));
        assert!(parse_minutes("RESET_TTL_MINUTES", Some("0"), 15).is_err());
        assert!(parse_minutes("RESET_TTL_MINUTES", Some("-5"), 15).is_err());
    }
}
