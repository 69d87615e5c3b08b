mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod mail;
mod pages;
mod state;
mod todos;

#[cfg(test)]
mod testing;

use crate::config::AppConfig;
use crate::state::AppState;

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "keygate=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        production = config.production,
        base_url = %config.base_url,
        "configuration loaded"
    );

    let state = AppState::init(config).await?;
    let config = state.config.clone();
    let app = app::build_app(state);
    app::serve(app, &config).await
}
