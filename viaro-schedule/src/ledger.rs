use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;
use viaro_domain::allocation::{AllocationOutcome, ReleaseOutcome};
use viaro_domain::error::ServiceError;

/// State of one idempotency-keyed allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AllocationState {
    Held,
    Released,
}

#[derive(Debug, Clone)]
struct AllocationRecord {
    seats: u32,
    state: AllocationState,
    /// Counter value right after the grant; replayed verbatim on retries.
    seats_allocated_after: u32,
    updated_at: DateTime<Utc>,
}

/// Per-trip counters plus the allocation records scoped to that trip.
#[derive(Debug)]
struct TripLedger {
    seats_total: u32,
    seats_allocated: u32,
    allocations: HashMap<Uuid, AllocationRecord>,
}

/// Sole owner of seat counts.
///
/// All mutation goes through [`allocate`](SeatLedger::allocate) and
/// [`release`](SeatLedger::release); the per-trip mutex makes the capacity
/// check and the increment one indivisible step, so `seats_allocated` can
/// never exceed `seats_total` under any interleaving. There is no lock
/// spanning trips.
pub struct SeatLedger {
    trips: DashMap<Uuid, Mutex<TripLedger>>,
}

impl SeatLedger {
    pub fn new() -> Self {
        Self { trips: DashMap::new() }
    }

    /// Creates the counter pair for a new trip. Re-registering an existing
    /// trip is a no-op; counters are never reset.
    pub fn register_trip(&self, trip_id: Uuid, seats_total: u32) {
        self.trips.entry(trip_id).or_insert_with(|| {
            Mutex::new(TripLedger {
                seats_total,
                seats_allocated: 0,
                allocations: HashMap::new(),
            })
        });
    }

    pub fn availability(&self, trip_id: Uuid) -> Option<(u32, u32)> {
        self.trips.get(&trip_id).map(|entry| {
            let ledger = lock(entry.value());
            (ledger.seats_total, ledger.seats_allocated)
        })
    }

    /// Atomically holds `seats` on the trip, keyed by `allocation_id`.
    ///
    /// A repeat call with a HELD key replays the original grant without
    /// re-incrementing. A key already RELEASED is denied outright, which
    /// blocks replays arriving after a compensation ran.
    pub fn allocate(
        &self,
        trip_id: Uuid,
        seats: u32,
        allocation_id: Uuid,
    ) -> Result<AllocationOutcome, ServiceError> {
        let entry = self
            .trips
            .get(&trip_id)
            .ok_or_else(|| ServiceError::NotFound(format!("trip {trip_id}")))?;
        let mut ledger = lock(entry.value());

        if let Some(record) = ledger.allocations.get(&allocation_id) {
            return Ok(match record.state {
                AllocationState::Held => AllocationOutcome::Granted {
                    seats_allocated: record.seats_allocated_after,
                },
                AllocationState::Released => AllocationOutcome::Denied {
                    reason: "allocation already released".to_string(),
                    seats_available: ledger.seats_total - ledger.seats_allocated,
                },
            });
        }

        let next = match ledger.seats_allocated.checked_add(seats) {
            Some(n) if n <= ledger.seats_total => n,
            _ => {
                return Ok(AllocationOutcome::Denied {
                    reason: "insufficient seats".to_string(),
                    seats_available: ledger.seats_total - ledger.seats_allocated,
                });
            }
        };

        ledger.seats_allocated = next;
        ledger.allocations.insert(
            allocation_id,
            AllocationRecord {
                seats,
                state: AllocationState::Held,
                seats_allocated_after: next,
                updated_at: Utc::now(),
            },
        );
        tracing::debug!(%trip_id, %allocation_id, seats, seats_allocated = next, "seats allocated");
        Ok(AllocationOutcome::Granted { seats_allocated: next })
    }

    /// Returns the seats held under `allocation_id` and marks it RELEASED.
    ///
    /// Idempotent: a RELEASED or unknown allocation, or an unknown trip, is
    /// a no-op so compensations can be retried freely.
    pub fn release(
        &self,
        trip_id: Uuid,
        allocation_id: Uuid,
    ) -> Result<ReleaseOutcome, ServiceError> {
        let Some(entry) = self.trips.get(&trip_id) else {
            return Ok(ReleaseOutcome::Noop);
        };
        let mut ledger = lock(entry.value());

        let seats = match ledger.allocations.get(&allocation_id) {
            Some(record) if record.state == AllocationState::Held => record.seats,
            _ => return Ok(ReleaseOutcome::Noop),
        };

        ledger.seats_allocated = ledger.seats_allocated.saturating_sub(seats);
        let seats_allocated = ledger.seats_allocated;
        if let Some(record) = ledger.allocations.get_mut(&allocation_id) {
            record.state = AllocationState::Released;
            record.updated_at = Utc::now();
        }
        tracing::debug!(%trip_id, %allocation_id, seats, seats_allocated, "seats released");
        Ok(ReleaseOutcome::Released { seats_allocated })
    }

    /// Drops RELEASED records older than `retention`. HELD records are never
    /// pruned. Returns how many records were dropped.
    ///
    /// Retention bounds how long idempotent retries of a released allocation
    /// keep answering DENIED; past the window a replayed key reads as new.
    pub fn prune_released(&self, retention: Duration) -> usize {
        let cutoff = Utc::now() - retention;
        let mut pruned = 0;
        for entry in self.trips.iter() {
            let mut ledger = lock(entry.value());
            let before = ledger.allocations.len();
            ledger
                .allocations
                .retain(|_, record| record.state == AllocationState::Held || record.updated_at > cutoff);
            pruned += before - ledger.allocations.len();
        }
        pruned
    }
}

impl Default for SeatLedger {
    fn default() -> Self {
        Self::new()
    }
}

// The critical sections only do checked arithmetic and map inserts; a
// poisoned lock still guards a consistent ledger, so recover it.
fn lock(mutex: &Mutex<TripLedger>) -> MutexGuard<'_, TripLedger> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
