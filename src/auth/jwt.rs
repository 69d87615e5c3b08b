use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use crate::{config::JwtConfig, state::AppState};

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub session_ttl: Duration,
    pub verification_ttl: Duration,
    pub reset_ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            session_ttl: Duration::minutes(cfg.session_ttl_minutes),
            verification_ttl: Duration::minutes(cfg.verification_ttl_minutes),
            reset_ttl: Duration::minutes(cfg.reset_ttl_minutes),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

impl JwtKeys {
    fn sign_with_kind(
        &self,
        kind: TokenKind,
        sub: Option<Uuid>,
        email: &str,
        name: Option<&str>,
    ) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Session => self.session_ttl,
            TokenKind::Verification => self.verification_ttl,
            TokenKind::Reset => self.reset_ttl,
        };
        let claims = Claims {
            sub,
            email: email.to_string(),
            name: name.map(str::to_string),
            iat: now.unix_timestamp() as usize,
            exp: (now + ttl).unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(kind = ?kind, "jwt signed");
        Ok(token)
    }

    /// Long-lived identity token stored in the session cookie.
    pub fn sign_session(&self, user_id: Uuid, email: &str, name: &str) -> anyhow::Result<String> {
        self.sign_with_kind(TokenKind::Session, Some(user_id), email, Some(name))
    }

    /// Token embedded in the verification link. Issued before the user row
    /// exists, so it only names the email.
    pub fn sign_verification(&self, email: &str) -> anyhow::Result<String> {
        self.sign_with_kind(TokenKind::Verification, None, email, None)
    }

    pub fn sign_reset(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        self.sign_with_kind(TokenKind::Reset, Some(user_id), email, None)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    /// Verifies the token and checks it was issued for `kind`.
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            anyhow::bail!("expected a {:?} token, got {:?}", kind, claims.kind);
        }
        Ok(claims)
    }
}
