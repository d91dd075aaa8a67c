use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;
use viaro_domain::trip::{Route, Trip, TripAvailability, TripView};

use crate::auth::{require_admin, Identity};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateRouteRequest {
    origin: String,
    destination: String,
}

#[derive(Debug, Deserialize)]
struct CreateTripRequest {
    route_id: Uuid,
    departure_time: DateTime<Utc>,
    seats_total: u32,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    origin: String,
    destination: String,
    date: NaiveDate,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/routes", get(list_routes).post(create_route))
        .route("/v1/trips", post(create_trip))
        .route("/v1/trips/search", get(search_trips))
        .route("/v1/trips/{trip_id}", get(get_trip))
        .route("/v1/trips/{trip_id}/availability", get(trip_availability))
}

async fn create_route(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Json(req): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<Route>), ApiError> {
    require_admin(&caller)?;
    let route = state.catalog.create_route(&req.origin, &req.destination)?;
    tracing::info!(route_id = %route.id, origin = %route.origin, destination = %route.destination, "route created");
    Ok((StatusCode::CREATED, Json(route)))
}

async fn list_routes(State(state): State<AppState>) -> Json<Vec<Route>> {
    Json(state.catalog.list_routes())
}

async fn create_trip(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Json(req): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<Trip>), ApiError> {
    require_admin(&caller)?;
    let trip = state
        .catalog
        .create_trip(req.route_id, req.departure_time, req.seats_total)?;
    tracing::info!(trip_id = %trip.id, route_id = %trip.route_id, seats_total = trip.seats_total, "trip created");
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn search_trips(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<TripView>>, ApiError> {
    let views = state.catalog.search(&query.origin, &query.destination, query.date)?;
    Ok(Json(views))
}

async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripView>, ApiError> {
    Ok(Json(state.catalog.get_trip(trip_id)?))
}

async fn trip_availability(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripAvailability>, ApiError> {
    Ok(Json(state.coordinator.availability(trip_id)?))
}
