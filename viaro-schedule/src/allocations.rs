use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use uuid::Uuid;
use viaro_domain::allocation::{AllocateRequest, AllocationOutcome, ReleaseOutcome, ReleaseRequest};

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trips/{trip_id}/allocate", post(allocate_seats))
        .route("/v1/trips/{trip_id}/release", post(release_seats))
}

// Both endpoints answer 200 with a tagged outcome body; a denial is a
// legitimate result the caller must handle, not a transport failure.
async fn allocate_seats(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<AllocateRequest>,
) -> Result<Json<AllocationOutcome>, ApiError> {
    let outcome = state.coordinator.allocate(trip_id, req.seats, req.allocation_id)?;
    if let AllocationOutcome::Denied { reason, .. } = &outcome {
        tracing::info!(%trip_id, allocation_id = %req.allocation_id, seats = req.seats, %reason, "allocation denied");
    }
    Ok(Json(outcome))
}

async fn release_seats(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<ReleaseRequest>,
) -> Result<Json<ReleaseOutcome>, ApiError> {
    let outcome = state.coordinator.release(trip_id, req.allocation_id)?;
    Ok(Json(outcome))
}
