use std::time::Duration;

mod app;
mod auth;
mod config;
mod db;
mod error;
mod feedback;
mod state;
#[cfg(test)]
mod testing;

use crate::{auth::session::spawn_purge_task, config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "coursefeedback=debug,axum=info,tower_http=info".to_string());
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

    let config = AppConfig::from_env()?;
    let addr = config.bind_addr;
    let purge_every = Duration::from_secs(config.session.purge_interval_secs.max(1));

    let app_state = AppState::init(config).await?;
    spawn_purge_task(app_state.sessions.clone(), purge_every);

    app::serve(app::build_app(app_state), addr).await
}
