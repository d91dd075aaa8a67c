use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use viaro_domain::reservation::{CreateReservationRequest, ReservationRecord};

use crate::auth::{require_admin, Identity, OptionalIdentity};
use crate::error::ApiError;
use crate::reconciliation::ReconciliationEntry;
use crate::state::AppState;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations", post(create_reservation).get(list_reservations))
        .route("/v1/reservations/{reservation_id}", get(get_reservation))
        .route("/v1/reservations/{reservation_id}/cancel", post(cancel_reservation))
        .route("/v1/reconciliation", get(list_reconciliation))
}

async fn create_reservation(
    State(state): State<AppState>,
    OptionalIdentity(caller): OptionalIdentity,
    headers: HeaderMap,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationRecord>), ApiError> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    let record = state
        .orchestrator
        .book(req, caller.as_ref(), idempotency_key)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_reservations(
    State(state): State<AppState>,
    Identity(caller): Identity,
) -> Result<Json<Vec<ReservationRecord>>, ApiError> {
    Ok(Json(state.orchestrator.list(&caller).await?))
}

async fn get_reservation(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<ReservationRecord>, ApiError> {
    Ok(Json(state.orchestrator.get(reservation_id, &caller).await?))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<ReservationRecord>, ApiError> {
    Ok(Json(state.orchestrator.cancel(reservation_id, &caller).await?))
}

async fn list_reconciliation(
    State(state): State<AppState>,
    Identity(caller): Identity,
) -> Result<Json<Vec<ReconciliationEntry>>, ApiError> {
    require_admin(&caller)?;
    Ok(Json(state.reconciliation.entries()))
}
