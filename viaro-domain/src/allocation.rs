use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /v1/trips/{trip_id}/allocate`.
///
/// `allocation_id` is the caller-supplied idempotency key: repeating a call
/// with the same key replays the original outcome without re-incrementing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocateRequest {
    pub seats: u32,
    pub allocation_id: Uuid,
}

/// Body of `POST /v1/trips/{trip_id}/release`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRequest {
    pub allocation_id: Uuid,
}

/// Outcome of an allocate call. Tagged so every caller handles every arm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationOutcome {
    Granted { seats_allocated: u32 },
    Denied { reason: String, seats_available: u32 },
}

/// Outcome of a release call. Releasing an unknown or already-released
/// allocation is a no-op, not an error, so compensations retry freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseOutcome {
    Released { seats_allocated: u32 },
    Noop,
}
