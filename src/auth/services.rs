use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use super::{
    claims::TokenKind,
    dto::{ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest},
    jwt::JwtKeys,
    password::{hash_password_blocking, verify_password_blocking},
    repo_types::{NewUser, User},
};
use crate::{
    error::AppError,
    mail::{Notification, NotificationKind},
    state::AppState,
};

const INVALID_RESET_LINK: &str = "Invalid or expired reset link";
const INVALID_VERIFICATION_LINK: &str = "Invalid verification link.";
const EMAIL_TAKEN: &str = "Email already registered";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trims a text field and treats blank as missing.
fn filled(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Passwords are taken verbatim; only emptiness counts as missing.
fn filled_password(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}

pub struct Registered {
    pub user: User,
    pub session_token: String,
}

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<Registered, AppError> {
    let (Some(name), Some(email), Some(password)) = (
        filled(req.name),
        filled(req.email),
        filled_password(req.password),
    ) else {
        return Err(AppError::Validation("Please fill all fields".into()));
    };

    let email = normalize_email(&email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Validation(EMAIL_TAKEN.into()));
    }

    let password_hash = hash_password_blocking(password).await?;

    // The mailed link and the stored column carry the same token.
    let keys = JwtKeys::from_ref(state);
    let verification_token = keys.sign_verification(&email)?;
    state
        .mailer
        .send(&Notification {
            kind: NotificationKind::Verify,
            name: name.clone(),
            email: email.clone(),
            link: format!("{}/verify/{}", state.config.base_url, verification_token),
        })
        .await?;

    let user = state
        .users
        .create(NewUser {
            email,
            name,
            password_hash,
            verification_token,
        })
        .await?
        // lost a race with a concurrent registration for the same address
        .ok_or_else(|| AppError::Validation(EMAIL_TAKEN.into()))?;

    let session_token = keys.sign_session(user.id, &user.email, &user.name)?;
    info!(user_id = %user.id, "user registered");
    Ok(Registered {
        user,
        session_token,
    })
}

/// Checks credentials and returns a session token.
pub async fn login(state: &AppState, req: LoginRequest) -> Result<String, AppError> {
    let (Some(email), Some(password)) = (filled(req.email), filled_password(req.password)) else {
        return Err(AppError::Validation("Please fill all fields".into()));
    };
    let email = normalize_email(&email);

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::UnknownUser("User not found".into()))?;

    if !user.is_verified {
        return Err(AppError::Auth("Email is not verified!".into()));
    }

    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Auth("Invalid credentials".into()));
    }

    let token = JwtKeys::from_ref(state).sign_session(user.id, &user.email, &user.name)?;
    info!(user_id = %user.id, "user logged in");
    Ok(token)
}

pub async fn verify_email(state: &AppState, token: &str) -> Result<User, AppError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Validation("Invalid token".into()));
    }

    let claims = JwtKeys::from_ref(state)
        .verify_kind(token, TokenKind::Verification)
        .map_err(|e| {
            debug!(error = %e, "verification token rejected");
            AppError::Auth(INVALID_VERIFICATION_LINK.into())
        })?;
    if claims.email.is_empty() {
        return Err(AppError::Auth(INVALID_VERIFICATION_LINK.into()));
    }

    let user = state
        .users
        .find_by_email(&claims.email)
        .await?
        .ok_or_else(|| AppError::UnknownUser("No user found!".into()))?;

    if user.is_verified {
        return Err(AppError::Auth("Is already verified!".into()));
    }
    if user.verification_token.as_deref() != Some(token) {
        return Err(AppError::Auth(INVALID_VERIFICATION_LINK.into()));
    }

    if !state.users.mark_verified(user.id, token).await? {
        return Err(AppError::Auth("Is already verified!".into()));
    }
    info!(user_id = %user.id, "email verified");
    Ok(User {
        is_verified: true,
        verification_token: None,
        ..user
    })
}

pub async fn forgot_password(state: &AppState, req: ForgotPasswordRequest) -> Result<(), AppError> {
    let Some(email) = filled(req.email) else {
        return Err(AppError::Validation("Email is required".into()));
    };
    let email = normalize_email(&email);

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::UnknownUser("No user found".into()))?;
    if !user.is_verified {
        return Err(AppError::Auth("User is not verified".into()));
    }

    let reset_token = JwtKeys::from_ref(state).sign_reset(user.id, &user.email)?;
    // Stored before sending so a failed send can simply be retried.
    state.users.set_reset_token(user.id, &reset_token).await?;
    state
        .mailer
        .send(&Notification {
            kind: NotificationKind::ResetPassword,
            name: user.name.clone(),
            email: user.email.clone(),
            link: format!("{}/reset/{}", state.config.base_url, reset_token),
        })
        .await?;

    info!(user_id = %user.id, "password reset requested");
    Ok(())
}

/// A reset token is only good for the user it names and only while it is the
/// one currently stored for them.
fn reset_token_matches(keys: &JwtKeys, token: &str, user: &User) -> bool {
    match keys.verify_kind(token, TokenKind::Reset) {
        Ok(claims) => {
            claims.email == user.email
                && claims.sub == Some(user.id)
                && user.reset_token.as_deref() == Some(token)
        }
        Err(e) => {
            debug!(error = %e, "reset token rejected");
            false
        }
    }
}

/// Resolves the user behind a reset link, for rendering the reset page.
pub async fn check_reset_token(state: &AppState, token: &str) -> Result<User, AppError> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys
        .verify_kind(token, TokenKind::Reset)
        .map_err(|_| AppError::Auth(INVALID_RESET_LINK.into()))?;
    let user = state
        .users
        .find_by_email(&claims.email)
        .await?
        .ok_or_else(|| AppError::UnknownUser("No user found!".into()))?;
    if !reset_token_matches(&keys, token, &user) {
        return Err(AppError::Auth(INVALID_RESET_LINK.into()));
    }
    Ok(user)
}

pub async fn reset_password(state: &AppState, req: ResetPasswordRequest) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (filled(req.email), filled_password(req.password)) else {
        return Err(AppError::Validation("fields are required".into()));
    };
    let email = normalize_email(&email);

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::UnknownUser("No user found!".into()))?;

    let Some(token) = filled(req.token) else {
        return Err(AppError::Validation("Reset token is required".into()));
    };
    if !reset_token_matches(&JwtKeys::from_ref(state), &token, &user) {
        warn!(user_id = %user.id, "reset password with invalid token");
        return Err(AppError::Auth(INVALID_RESET_LINK.into()));
    }

    let password_hash = hash_password_blocking(password).await?;
    if !state
        .users
        .update_password(user.id, &token, &password_hash)
        .await?
    {
        warn!(user_id = %user.id, "reset link spent by a concurrent reset");
        return Err(AppError::Auth(INVALID_RESET_LINK.into()));
    }
    info!(user_id = %user.id, "password reset");
    Ok(())
}
