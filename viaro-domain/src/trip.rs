use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
}

/// Trip metadata owned by the schedule authority. Seat counters live in the
/// seat ledger, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub route_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub seats_total: u32,
    pub created_at: DateTime<Utc>,
}

/// Trip joined with its route and live seat counts, as served to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripView {
    pub id: Uuid,
    pub route: Route,
    pub departure_time: DateTime<Utc>,
    pub seats_total: u32,
    pub seats_available: u32,
}

/// Response of `GET /v1/trips/{trip_id}/availability`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripAvailability {
    pub trip_id: Uuid,
    pub seats_total: u32,
    pub seats_allocated: u32,
}

impl TripAvailability {
    pub fn seats_available(&self) -> u32 {
        self.seats_total.saturating_sub(self.seats_allocated)
    }
}
