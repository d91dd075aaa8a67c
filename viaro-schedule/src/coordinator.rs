use std::sync::Arc;
use uuid::Uuid;
use viaro_domain::allocation::{AllocationOutcome, ReleaseOutcome};
use viaro_domain::error::ServiceError;
use viaro_domain::trip::TripAvailability;

use crate::ledger::SeatLedger;

/// Request-size policy enforced in front of the ledger.
#[derive(Debug, Clone)]
pub struct AllocationPolicy {
    /// Upper bound on seats per allocate call; blocks pathological requests.
    pub max_seats_per_request: u32,
}

/// Guarded entry point to the seat ledger.
///
/// Holds no state of its own: validation happens here, atomicity in the
/// ledger, so the ledger's critical section stays the sole correctness
/// anchor.
pub struct AllocationCoordinator {
    ledger: Arc<SeatLedger>,
    policy: AllocationPolicy,
}

impl AllocationCoordinator {
    pub fn new(ledger: Arc<SeatLedger>, policy: AllocationPolicy) -> Self {
        Self { ledger, policy }
    }

    pub fn allocate(
        &self,
        trip_id: Uuid,
        seats: u32,
        allocation_id: Uuid,
    ) -> Result<AllocationOutcome, ServiceError> {
        if seats < 1 {
            return Err(ServiceError::Validation("seats must be at least 1".to_string()));
        }
        if seats > self.policy.max_seats_per_request {
            return Err(ServiceError::Validation(format!(
                "seats must not exceed {} per request",
                self.policy.max_seats_per_request
            )));
        }
        self.ledger.allocate(trip_id, seats, allocation_id)
    }

    pub fn release(
        &self,
        trip_id: Uuid,
        allocation_id: Uuid,
    ) -> Result<ReleaseOutcome, ServiceError> {
        self.ledger.release(trip_id, allocation_id)
    }

    pub fn availability(&self, trip_id: Uuid) -> Result<TripAvailability, ServiceError> {
        let (seats_total, seats_allocated) = self
            .ledger
            .availability(trip_id)
            .ok_or_else(|| ServiceError::NotFound(format!("trip {trip_id}")))?;
        Ok(TripAvailability {
            trip_id,
            seats_total,
            seats_allocated,
        })
    }
}
