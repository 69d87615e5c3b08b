use axum::{
    extract::{FromRef, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        cookies,
        dto::{
            ForgotPasswordRequest, LoginRequest, PublicUser, RegisterRequest, RegisterResponse,
            ResetPasswordRequest,
        },
        jwt::JwtKeys,
        services,
    },
    error::{AppError, MessageBody},
    extract::{ApiJson, ApiPath},
    pages,
    state::AppState,
};

/// Routes mounted under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/reset", post(forgot_password))
}

/// Routes opened from emailed links.
pub fn link_routes() -> Router<AppState> {
    Router::new()
        .route("/verify/:token", get(verify_email))
        .route("/reset/:token", get(reset_page))
        .route("/reset-password", post(reset_password))
}

fn message(text: &str) -> Json<MessageBody> {
    Json(MessageBody {
        message: text.to_string(),
    })
}

fn session_cookie(state: &AppState, token: &str) -> String {
    let keys = JwtKeys::from_ref(state);
    cookies::session_cookie(token, keys.session_ttl, state.config.production)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let registered = services::register(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&state, &registered.session_token))],
        Json(RegisterResponse {
            message: "User created successfully".into(),
            user: PublicUser::from(registered.user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = services::login(&state, payload).await?;
    Ok((
        [(header::SET_COOKIE, session_cookie(&state, &token))],
        message("User logged in successfully"),
    ))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, cookies::cleared_cookie(state.config.production))],
        message("User logged out successfully"),
    )
}

#[instrument(skip(state, token))]
pub async fn verify_email(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<Json<MessageBody>, AppError> {
    services::verify_email(&state, &token).await?;
    Ok(message("Email is verified"))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageBody>, AppError> {
    services::forgot_password(&state, payload).await?;
    Ok(message("Email sent successfully"))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageBody>, AppError> {
    services::reset_password(&state, payload).await?;
    Ok(message("Password reset successfully"))
}

#[instrument(skip(state, token))]
pub async fn reset_page(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Response {
    match services::check_reset_token(&state, &token).await {
        Ok(user) => pages::reset_page(&user.email, &token).into_response(),
        Err(AppError::Internal(e)) => AppError::Internal(e).into_response(),
        Err(e) => pages::link_error_page(e.status(), &e.to_string()),
    }
}
