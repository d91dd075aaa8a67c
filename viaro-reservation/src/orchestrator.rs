use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use viaro_domain::allocation::AllocationOutcome;
use viaro_domain::error::ServiceError;
use viaro_domain::identity::Caller;
use viaro_domain::reservation::{CreateReservationRequest, ReservationRecord, ReservationStatus};

use crate::reconciliation::{ReconciliationEntry, ReconciliationQueue};
use crate::retry::{retry_with_predicate, RetryPolicy};
use crate::schedule_client::ScheduleAuthority;
use crate::store::{ListScope, ReservationStore};

/// Namespace for deriving allocation ids from client idempotency keys.
/// Fixed so a retried request derives the same id across processes.
const ALLOCATION_NAMESPACE: Uuid = Uuid::from_u128(0x7b3e_5a1d_92c4_4f08_a6d1_0e8b_74c2_9f35);

/// Drives the booking saga: validate, allocate on the schedule authority,
/// persist locally, and compensate with a release when a later step fails.
/// There is no transaction spanning the two services; idempotency keys and
/// compensating actions carry the consistency instead.
pub struct BookingOrchestrator {
    schedule: Arc<dyn ScheduleAuthority>,
    store: Arc<dyn ReservationStore>,
    reconciliation: Arc<ReconciliationQueue>,
    retry: RetryPolicy,
}

impl BookingOrchestrator {
    pub fn new(
        schedule: Arc<dyn ScheduleAuthority>,
        store: Arc<dyn ReservationStore>,
        reconciliation: Arc<ReconciliationQueue>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            schedule,
            store,
            reconciliation,
            retry,
        }
    }

    pub async fn book(
        &self,
        request: CreateReservationRequest,
        caller: Option<&Caller>,
        idempotency_key: Option<&str>,
    ) -> Result<ReservationRecord, ServiceError> {
        let passenger_name = request.passenger_name.trim().to_string();
        if passenger_name.is_empty() {
            return Err(ServiceError::Validation("passenger_name is required".to_string()));
        }
        if request.seats < 1 {
            return Err(ServiceError::Validation("seats must be at least 1".to_string()));
        }

        // Trip existence check. The returned counts are advisory only; the
        // ledger's allocate is the sole authority on capacity.
        self.with_retry(|| self.schedule.trip_availability(request.trip_id))
            .await?;

        let allocation_id = derive_allocation_id(caller, idempotency_key);
        let record = match self.store.find_by_allocation(allocation_id).await? {
            Some(existing) => match existing.status {
                ReservationStatus::Booked => {
                    tracing::info!(
                        reservation_id = %existing.id,
                        %allocation_id,
                        "replaying booked reservation for idempotent retry"
                    );
                    return Ok(existing);
                }
                // An interrupted attempt left the record pending; resume it.
                ReservationStatus::Pending => existing,
                ReservationStatus::Failed | ReservationStatus::Cancelled => {
                    return Err(ServiceError::Conflict(format!(
                        "reservation {} for this idempotency key is already {}",
                        existing.id, existing.status
                    )));
                }
            },
            None => {
                let now = Utc::now();
                let record = ReservationRecord {
                    id: Uuid::new_v4(),
                    trip_id: request.trip_id,
                    passenger_name,
                    seats_booked: request.seats,
                    status: ReservationStatus::Pending,
                    booked_by: caller.map(|c| c.id.clone()),
                    allocation_id,
                    created_at: now,
                    updated_at: now,
                };
                self.store.create(record.clone()).await?;
                record
            }
        };

        let outcome = match self
            .with_retry(|| self.schedule.allocate(record.trip_id, record.seats_booked, allocation_id))
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                // A timed-out allocate is denied-unknown: the hold may exist
                // on the authority, so release it (a no-op if it never did)
                // before failing the record.
                let compensation = if err.is_retriable() {
                    self.compensate(&record, "allocate outcome unknown").await
                } else {
                    Ok(())
                };
                self.fail_record(record.id).await;
                compensation?;
                return Err(err);
            }
        };

        match outcome {
            AllocationOutcome::Denied { reason, seats_available } => {
                tracing::info!(reservation_id = %record.id, %reason, "allocation denied");
                self.fail_record(record.id).await;
                Err(ServiceError::Capacity {
                    requested: record.seats_booked,
                    available: seats_available,
                })
            }
            AllocationOutcome::Granted { seats_allocated } => {
                tracing::debug!(reservation_id = %record.id, seats_allocated, "allocation granted");
                match self.store.update_status(record.id, ReservationStatus::Booked).await {
                    Ok(booked) => {
                        tracing::info!(
                            reservation_id = %booked.id,
                            trip_id = %booked.trip_id,
                            seats = booked.seats_booked,
                            "reservation booked"
                        );
                        Ok(booked)
                    }
                    Err(persist_err) => {
                        tracing::warn!(
                            reservation_id = %record.id,
                            error = %persist_err,
                            "persist failed after grant, compensating"
                        );
                        let compensation =
                            self.compensate(&record, "persist failed after grant").await;
                        self.fail_record(record.id).await;
                        compensation?;
                        Err(persist_err)
                    }
                }
            }
        }
    }

    /// Cancels a booked reservation, releasing its seats first.
    ///
    /// Re-cancelling a cancelled reservation is a no-op success. If the
    /// release exhausts its retries the record stays BOOKED: the seats are
    /// still reachable through another cancel, so nothing leaks and no
    /// reconciliation entry is warranted.
    pub async fn cancel(
        &self,
        reservation_id: Uuid,
        caller: &Caller,
    ) -> Result<ReservationRecord, ServiceError> {
        let record = self
            .store
            .get(reservation_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("reservation {reservation_id}")))?;

        if !can_access(&record, caller) {
            // Hide other callers' reservations rather than confirm they exist.
            return Err(ServiceError::NotFound(format!("reservation {reservation_id}")));
        }

        match record.status {
            ReservationStatus::Cancelled => {
                tracing::debug!(reservation_id = %record.id, "reservation already cancelled");
                return Ok(record);
            }
            ReservationStatus::Booked => {}
            other => {
                return Err(ServiceError::Conflict(format!(
                    "cannot cancel a {other} reservation"
                )));
            }
        }

        self.with_retry(|| self.schedule.release(record.trip_id, record.allocation_id))
            .await?;

        let cancelled = self
            .store
            .update_status(record.id, ReservationStatus::Cancelled)
            .await?;
        tracing::info!(
            reservation_id = %cancelled.id,
            trip_id = %cancelled.trip_id,
            seats = cancelled.seats_booked,
            "reservation cancelled"
        );
        Ok(cancelled)
    }

    pub async fn get(
        &self,
        reservation_id: Uuid,
        caller: &Caller,
    ) -> Result<ReservationRecord, ServiceError> {
        let record = self
            .store
            .get(reservation_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("reservation {reservation_id}")))?;
        if !can_access(&record, caller) {
            return Err(ServiceError::NotFound(format!("reservation {reservation_id}")));
        }
        Ok(record)
    }

    pub async fn list(&self, caller: &Caller) -> Result<Vec<ReservationRecord>, ServiceError> {
        let scope = if caller.is_admin() {
            ListScope::All
        } else {
            ListScope::Owner(caller.id.clone())
        };
        self.store.list(scope).await
    }

    /// Compensating release under the retry policy. Exhausting the attempts
    /// flags the allocation for out-of-band repair and reports
    /// `ReconciliationRequired`; the leak is never silent.
    async fn compensate(
        &self,
        record: &ReservationRecord,
        reason: &str,
    ) -> Result<(), ServiceError> {
        let trip_id = record.trip_id;
        let allocation_id = record.allocation_id;
        match self
            .with_retry(|| self.schedule.release(trip_id, allocation_id))
            .await
        {
            Ok(_) => {
                tracing::info!(%allocation_id, %trip_id, reason, "compensating release completed");
                Ok(())
            }
            Err(err) => {
                self.reconciliation.flag(ReconciliationEntry {
                    reservation_id: record.id,
                    trip_id,
                    allocation_id,
                    seats: record.seats_booked,
                    reason: format!("{reason}: {err}"),
                    flagged_at: Utc::now(),
                });
                Err(ServiceError::ReconciliationRequired(format!(
                    "compensating release failed for allocation {allocation_id}"
                )))
            }
        }
    }

    /// Best-effort terminal mark. A failure here only loses bookkeeping,
    /// never a held allocation.
    async fn fail_record(&self, id: Uuid) {
        if let Err(err) = self.store.update_status(id, ReservationStatus::Failed).await {
            tracing::debug!(reservation_id = %id, error = %err, "could not mark reservation failed");
        }
    }

    async fn with_retry<T, F, Fut>(&self, operation: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        retry_with_predicate(&self.retry, operation, ServiceError::is_retriable).await
    }
}

fn derive_allocation_id(caller: Option<&Caller>, idempotency_key: Option<&str>) -> Uuid {
    match idempotency_key {
        // Scoped by caller so one client's key cannot replay another's.
        Some(key) => {
            let scope = caller.map(|c| c.id.as_str()).unwrap_or("anonymous");
            Uuid::new_v5(&ALLOCATION_NAMESPACE, format!("{scope}:{key}").as_bytes())
        }
        None => Uuid::new_v4(),
    }
}

fn can_access(record: &ReservationRecord, caller: &Caller) -> bool {
    caller.is_admin()
        // Anonymous legacy records stay reachable to any caller.
        || record.booked_by.is_none()
        || record.booked_by.as_deref() == Some(caller.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use viaro_domain::allocation::ReleaseOutcome;
    use viaro_domain::identity::Role;
    use viaro_domain::trip::TripAvailability;
    use viaro_schedule::coordinator::{AllocationCoordinator, AllocationPolicy};
    use viaro_schedule::ledger::SeatLedger;

    use crate::store::InMemoryReservationStore;

    fn user(id: &str) -> Caller {
        Caller { id: id.to_string(), role: Role::User }
    }

    fn admin() -> Caller {
        Caller { id: "ops".to_string(), role: Role::Admin }
    }

    fn booking(trip_id: Uuid, seats: u32) -> CreateReservationRequest {
        CreateReservationRequest {
            trip_id,
            passenger_name: "Ada Lovelace".to_string(),
            seats,
        }
    }

    /// Consumes one unit from a failure budget.
    fn take(budget: &AtomicUsize) -> bool {
        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// In-process schedule authority over the real seat ledger, with taps
    /// for injecting transport failures.
    struct LocalSchedule {
        coordinator: AllocationCoordinator,
        ledger: Arc<SeatLedger>,
        /// Fail this many allocate calls before they reach the ledger.
        fail_allocates: AtomicUsize,
        /// Let this many allocate calls reach the ledger but lose the reply,
        /// mimicking a response timeout after the grant landed.
        blackhole_allocates: AtomicUsize,
        fail_releases: AtomicUsize,
    }

    impl LocalSchedule {
        fn with_trip(seats_total: u32) -> (Arc<Self>, Uuid) {
            let ledger = Arc::new(SeatLedger::new());
            let trip_id = Uuid::new_v4();
            ledger.register_trip(trip_id, seats_total);
            let schedule = Arc::new(Self {
                coordinator: AllocationCoordinator::new(
                    ledger.clone(),
                    AllocationPolicy { max_seats_per_request: 10 },
                ),
                ledger,
                fail_allocates: AtomicUsize::new(0),
                blackhole_allocates: AtomicUsize::new(0),
                fail_releases: AtomicUsize::new(0),
            });
            (schedule, trip_id)
        }

        fn seats_allocated(&self, trip_id: Uuid) -> u32 {
            self.ledger.availability(trip_id).unwrap().1
        }
    }

    #[async_trait]
    impl ScheduleAuthority for LocalSchedule {
        async fn trip_availability(&self, trip_id: Uuid) -> Result<TripAvailability, ServiceError> {
            self.coordinator.availability(trip_id)
        }

        async fn allocate(
            &self,
            trip_id: Uuid,
            seats: u32,
            allocation_id: Uuid,
        ) -> Result<AllocationOutcome, ServiceError> {
            if take(&self.fail_allocates) {
                return Err(ServiceError::DependencyUnavailable(
                    "injected allocate failure".to_string(),
                ));
            }
            let outcome = self.coordinator.allocate(trip_id, seats, allocation_id)?;
            if take(&self.blackhole_allocates) {
                return Err(ServiceError::DependencyUnavailable(
                    "allocate response lost".to_string(),
                ));
            }
            Ok(outcome)
        }

        async fn release(
            &self,
            trip_id: Uuid,
            allocation_id: Uuid,
        ) -> Result<ReleaseOutcome, ServiceError> {
            if take(&self.fail_releases) {
                return Err(ServiceError::DependencyUnavailable(
                    "injected release failure".to_string(),
                ));
            }
            self.coordinator.release(trip_id, allocation_id)
        }
    }

    /// Store wrapper that fails a budgeted number of BOOKED transitions,
    /// simulating storage loss in the persist step.
    struct FlakyStore {
        inner: InMemoryReservationStore,
        fail_booked_updates: AtomicUsize,
    }

    impl FlakyStore {
        fn new(fail_booked_updates: usize) -> Self {
            Self {
                inner: InMemoryReservationStore::new(),
                fail_booked_updates: AtomicUsize::new(fail_booked_updates),
            }
        }
    }

    #[async_trait]
    impl ReservationStore for FlakyStore {
        async fn create(&self, record: ReservationRecord) -> Result<(), ServiceError> {
            self.inner.create(record).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<ReservationRecord>, ServiceError> {
            self.inner.get(id).await
        }

        async fn find_by_allocation(
            &self,
            allocation_id: Uuid,
        ) -> Result<Option<ReservationRecord>, ServiceError> {
            self.inner.find_by_allocation(allocation_id).await
        }

        async fn update_status(
            &self,
            id: Uuid,
            next: ReservationStatus,
        ) -> Result<ReservationRecord, ServiceError> {
            if next == ReservationStatus::Booked && take(&self.fail_booked_updates) {
                return Err(ServiceError::DependencyUnavailable(
                    "reservation storage unavailable".to_string(),
                ));
            }
            self.inner.update_status(id, next).await
        }

        async fn list(&self, scope: ListScope) -> Result<Vec<ReservationRecord>, ServiceError> {
            self.inner.list(scope).await
        }
    }

    struct Fixture {
        orchestrator: BookingOrchestrator,
        schedule: Arc<LocalSchedule>,
        reconciliation: Arc<ReconciliationQueue>,
        trip_id: Uuid,
    }

    fn fixture(seats_total: u32) -> Fixture {
        fixture_with_store(seats_total, Arc::new(InMemoryReservationStore::new()))
    }

    fn fixture_with_store(seats_total: u32, store: Arc<dyn ReservationStore>) -> Fixture {
        let (schedule, trip_id) = LocalSchedule::with_trip(seats_total);
        let reconciliation = Arc::new(ReconciliationQueue::new());
        let orchestrator = BookingOrchestrator::new(
            schedule.clone(),
            store,
            reconciliation.clone(),
            RetryPolicy::immediate(2),
        );
        Fixture {
            orchestrator,
            schedule,
            reconciliation,
            trip_id,
        }
    }

    #[tokio::test]
    async fn books_and_holds_seats() {
        let f = fixture(5);
        let caller = user("alice");

        let record = f
            .orchestrator
            .book(booking(f.trip_id, 3), Some(&caller), None)
            .await
            .unwrap();

        assert_eq!(record.status, ReservationStatus::Booked);
        assert_eq!(record.seats_booked, 3);
        assert_eq!(record.booked_by.as_deref(), Some("alice"));
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 3);
    }

    #[tokio::test]
    async fn validation_failures_have_no_side_effects() {
        let f = fixture(5);

        let blank = f
            .orchestrator
            .book(
                CreateReservationRequest {
                    trip_id: f.trip_id,
                    passenger_name: "   ".to_string(),
                    seats: 1,
                },
                None,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(blank, ServiceError::Validation(_)));

        let zero = f
            .orchestrator
            .book(booking(f.trip_id, 0), None, None)
            .await
            .unwrap_err();
        assert!(matches!(zero, ServiceError::Validation(_)));

        assert_eq!(f.schedule.seats_allocated(f.trip_id), 0);
        assert!(f.orchestrator.list(&admin()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_trip_is_terminal() {
        let f = fixture(5);
        let err = f
            .orchestrator
            .book(booking(Uuid::new_v4(), 1), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(f.orchestrator.list(&admin()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn denial_records_failed_reservation() {
        let f = fixture(5);

        let err = f
            .orchestrator
            .book(booking(f.trip_id, 6), None, None)
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Capacity { requested: 6, available: 5 });

        let records = f.orchestrator.list(&admin()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ReservationStatus::Failed);
        // Nothing was held, so nothing to compensate.
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 0);
        assert!(f.reconciliation.is_empty());
    }

    #[tokio::test]
    async fn idempotency_key_replays_booked_reservation() {
        let f = fixture(5);
        let caller = user("alice");

        let first = f
            .orchestrator
            .book(booking(f.trip_id, 3), Some(&caller), Some("req-1"))
            .await
            .unwrap();
        let replay = f
            .orchestrator
            .book(booking(f.trip_id, 3), Some(&caller), Some("req-1"))
            .await
            .unwrap();

        assert_eq!(first.id, replay.id);
        // One hold, not two.
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 3);
    }

    #[tokio::test]
    async fn idempotency_keys_are_scoped_per_caller() {
        let f = fixture(10);

        let alice = f
            .orchestrator
            .book(booking(f.trip_id, 2), Some(&user("alice")), Some("req-1"))
            .await
            .unwrap();
        let bob = f
            .orchestrator
            .book(booking(f.trip_id, 2), Some(&user("bob")), Some("req-1"))
            .await
            .unwrap();

        assert_ne!(alice.id, bob.id);
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 4);
    }

    #[tokio::test]
    async fn lost_allocate_reply_is_recovered_by_retry() {
        let f = fixture(5);
        // First allocate lands on the ledger but the reply is lost; the
        // retried call replays the grant idempotently.
        f.schedule.blackhole_allocates.store(1, Ordering::SeqCst);

        let record = f
            .orchestrator
            .book(booking(f.trip_id, 3), Some(&user("alice")), Some("req-1"))
            .await
            .unwrap();

        assert_eq!(record.status, ReservationStatus::Booked);
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 3);
    }

    #[tokio::test]
    async fn allocate_outage_fails_cleanly_after_compensation() {
        let f = fixture(5);
        // Outlast the retry budget (1 initial + 2 retries) for allocate;
        // the compensating release then finds nothing held.
        f.schedule.fail_allocates.store(10, Ordering::SeqCst);

        let err = f
            .orchestrator
            .book(booking(f.trip_id, 3), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::DependencyUnavailable(_)));
        let records = f.orchestrator.list(&admin()).await.unwrap();
        assert_eq!(records[0].status, ReservationStatus::Failed);
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 0);
        assert!(f.reconciliation.is_empty());
    }

    #[tokio::test]
    async fn persist_failure_releases_held_seats() {
        let store = Arc::new(FlakyStore::new(1));
        let f = fixture_with_store(5, store);

        let err = f
            .orchestrator
            .book(booking(f.trip_id, 3), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::DependencyUnavailable(_)));
        // The compensating release returned the counter to its pre-booking
        // value, so nothing needs reconciliation.
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 0);
        assert!(f.reconciliation.is_empty());

        let records = f.orchestrator.list(&admin()).await.unwrap();
        assert_eq!(records[0].status, ReservationStatus::Failed);
    }

    #[tokio::test]
    async fn failed_compensation_is_flagged_for_reconciliation() {
        let store = Arc::new(FlakyStore::new(1));
        let f = fixture_with_store(5, store);
        f.schedule.fail_releases.store(10, Ordering::SeqCst);

        let err = f
            .orchestrator
            .book(booking(f.trip_id, 3), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::ReconciliationRequired(_)));
        // The hold leaked, but loudly: one queue entry, seats still held.
        assert_eq!(f.reconciliation.len(), 1);
        assert_eq!(f.reconciliation.entries()[0].seats, 3);
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 3);
    }

    #[tokio::test]
    async fn cancel_round_trip_restores_availability() {
        let f = fixture(5);
        let caller = user("alice");

        let record = f
            .orchestrator
            .book(booking(f.trip_id, 3), Some(&caller), None)
            .await
            .unwrap();
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 3);

        let cancelled = f.orchestrator.cancel(record.id, &caller).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 0);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let f = fixture(5);
        let caller = user("alice");

        let record = f
            .orchestrator
            .book(booking(f.trip_id, 3), Some(&caller), None)
            .await
            .unwrap();
        f.orchestrator.cancel(record.id, &caller).await.unwrap();

        let again = f.orchestrator.cancel(record.id, &caller).await.unwrap();
        assert_eq!(again.status, ReservationStatus::Cancelled);
        // Second cancel neither errors nor touches the counter.
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 0);
    }

    #[tokio::test]
    async fn cancel_rejects_non_booked_reservations() {
        let f = fixture(5);

        let err = f
            .orchestrator
            .book(booking(f.trip_id, 6), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Capacity { .. }));

        let failed = &f.orchestrator.list(&admin()).await.unwrap()[0];
        let conflict = f.orchestrator.cancel(failed.id, &admin()).await.unwrap_err();
        assert!(matches!(conflict, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn cancel_release_failure_leaves_record_booked() {
        let f = fixture(5);
        let caller = user("alice");

        let record = f
            .orchestrator
            .book(booking(f.trip_id, 3), Some(&caller), None)
            .await
            .unwrap();

        f.schedule.fail_releases.store(10, Ordering::SeqCst);
        let err = f.orchestrator.cancel(record.id, &caller).await.unwrap_err();
        assert!(matches!(err, ServiceError::DependencyUnavailable(_)));

        // Still BOOKED and still held: the client can simply retry.
        let current = f.orchestrator.get(record.id, &caller).await.unwrap();
        assert_eq!(current.status, ReservationStatus::Booked);
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 3);
        assert!(f.reconciliation.is_empty());

        f.schedule.fail_releases.store(0, Ordering::SeqCst);
        let cancelled = f.orchestrator.cancel(record.id, &caller).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 0);
    }

    #[tokio::test]
    async fn concurrent_bookings_never_oversell() {
        let f = fixture(2);

        let two = f.orchestrator.book(booking(f.trip_id, 2), None, None);
        let one = f.orchestrator.book(booking(f.trip_id, 1), None, None);
        let (two, one) = tokio::join!(two, one);

        // Whichever hit the ledger first won; the other was denied.
        assert_eq!(two.is_ok() as u8 + one.is_ok() as u8, 1);
        let held = f.schedule.seats_allocated(f.trip_id);
        assert!(held == 1 || held == 2);
    }

    #[tokio::test]
    async fn non_owner_cannot_see_or_cancel() {
        let f = fixture(5);
        let alice = user("alice");
        let bob = user("bob");

        let record = f
            .orchestrator
            .book(booking(f.trip_id, 2), Some(&alice), None)
            .await
            .unwrap();

        assert!(matches!(
            f.orchestrator.get(record.id, &bob).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.orchestrator.cancel(record.id, &bob).await,
            Err(ServiceError::NotFound(_))
        ));

        // Admin sees and may cancel anything.
        let cancelled = f.orchestrator.cancel(record.id, &admin()).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn list_is_role_scoped() {
        let f = fixture(10);
        f.orchestrator
            .book(booking(f.trip_id, 1), Some(&user("alice")), None)
            .await
            .unwrap();
        f.orchestrator
            .book(booking(f.trip_id, 1), Some(&user("bob")), None)
            .await
            .unwrap();
        f.orchestrator.book(booking(f.trip_id, 1), None, None).await.unwrap();

        assert_eq!(f.orchestrator.list(&admin()).await.unwrap().len(), 3);
        let alices = f.orchestrator.list(&user("alice")).await.unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].booked_by.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn anonymous_booking_stays_cancellable() {
        let f = fixture(5);

        let record = f.orchestrator.book(booking(f.trip_id, 2), None, None).await.unwrap();
        assert_eq!(record.booked_by, None);

        // Legacy flow: any authenticated caller may cancel an anonymous record.
        let cancelled = f.orchestrator.cancel(record.id, &user("carol")).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(f.schedule.seats_allocated(f.trip_id), 0);
    }
}
