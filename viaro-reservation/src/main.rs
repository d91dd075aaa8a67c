use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use viaro_reservation::schedule_client::HttpScheduleClient;
use viaro_reservation::{app, app_config::Config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "viaro_reservation=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("failed to load configuration")?;
    tracing::info!(
        port = config.server.port,
        schedule = %config.schedule.base_url,
        "starting viaro reservation authority"
    );

    let schedule = HttpScheduleClient::new(
        config.schedule.base_url.clone(),
        Duration::from_millis(config.schedule.request_timeout_ms),
    )
    .context("failed to build schedule client")?;

    let state = AppState::new(Arc::new(schedule), config.retry.policy());
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
