use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Booked,
    Cancelled,
    Failed,
}

impl ReservationStatus {
    /// Legal per-record transitions; everything else is a conflict.
    ///
    /// `PENDING -> {BOOKED, FAILED}`, `BOOKED -> CANCELLED`.
    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Booked) | (Pending, Failed) | (Booked, Cancelled)
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Booked => "BOOKED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// Reservation record owned by the reservation authority.
///
/// A BOOKED record always references a held allocation on the schedule
/// authority; a CANCELLED record references a released (or never-granted)
/// one. That pairing is maintained by the booking orchestrator, not by
/// shared storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub passenger_name: String,
    pub seats_booked: u32,
    pub status: ReservationStatus,
    /// Identity of the booking caller; `None` for the anonymous legacy flow.
    pub booked_by: Option<String>,
    pub allocation_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /v1/reservations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReservationRequest {
    pub trip_id: Uuid,
    pub passenger_name: String,
    pub seats: u32,
}

#[cfg(test)]
mod tests {
    use super::ReservationStatus::*;

    #[test]
    fn transition_matrix() {
        assert!(Pending.can_transition_to(Booked));
        assert!(Pending.can_transition_to(Failed));
        assert!(Booked.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Cancelled));
        assert!(!Booked.can_transition_to(Failed));
        assert!(!Booked.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Booked));
        assert!(!Cancelled.can_transition_to(Cancelled));
        assert!(!Failed.can_transition_to(Booked));
    }
}
