use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use viaro_schedule::coordinator::AllocationPolicy;
use viaro_schedule::{app, app_config::Config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "viaro_schedule=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("failed to load configuration")?;
    tracing::info!(port = config.server.port, "starting viaro schedule authority");

    let state = AppState::new(AllocationPolicy {
        max_seats_per_request: config.policy.max_seats_per_request,
    });

    if config.seed.demo_data {
        state.catalog.seed_demo_data().context("failed to seed demo data")?;
        tracing::info!(routes = state.catalog.route_count(), "seeded demo routes and trips");
    }

    // Background sweep keeps the released-allocation window bounded.
    let ledger = state.ledger.clone();
    let retention = chrono::Duration::seconds(config.policy.allocation_retention_seconds as i64);
    let sweep_interval = std::time::Duration::from_secs(config.policy.sweep_interval_seconds.max(1));
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(sweep_interval);
        loop {
            tick.tick().await;
            let pruned = ledger.prune_released(retention);
            if pruned > 0 {
                tracing::debug!(pruned, "dropped released allocation records past retention");
            }
        }
    });

    let app = app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
