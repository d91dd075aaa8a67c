use axum::{
    http::{header, HeaderName, Method},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod allocations;
pub mod app_config;
pub mod auth;
pub mod catalog;
pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod state;
pub mod trips;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(auth::CALLER_ID_HEADER),
            HeaderName::from_static(auth::CALLER_ROLE_HEADER),
        ]);

    Router::new()
        .route("/health", get(health))
        .merge(trips::routes())
        .merge(allocations::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
