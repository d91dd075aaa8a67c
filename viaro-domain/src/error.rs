use thiserror::Error;

/// Failure taxonomy shared by both services.
///
/// HTTP-only concerns (unauthenticated, forbidden) are deliberately absent:
/// credential issuance and verification belong to an upstream collaborator,
/// so each service models them on its own API error type instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Bad input; rejected before any side effect.
    #[error("{0}")]
    Validation(String),

    /// Allocation denied because the trip cannot seat the request.
    #[error("insufficient seats: requested {requested}, available {available}")]
    Capacity { requested: u32, available: u32 },

    #[error("{0} not found")]
    NotFound(String),

    /// Illegal state transition, e.g. cancelling a reservation that never
    /// reached BOOKED.
    #[error("{0}")]
    Conflict(String),

    /// Peer service timed out or is unreachable; safe to retry.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// A compensating release exhausted its retries. The held allocation is
    /// flagged for out-of-band repair, never silently dropped.
    #[error("reconciliation required: {0}")]
    ReconciliationRequired(String),
}

impl ServiceError {
    /// Stable machine-readable code used in HTTP bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::Capacity { .. } => "insufficient_seats",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::DependencyUnavailable(_) => "dependency_unavailable",
            ServiceError::ReconciliationRequired(_) => "reconciliation_required",
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, ServiceError::DependencyUnavailable(_))
    }
}
