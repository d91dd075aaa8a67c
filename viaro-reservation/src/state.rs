use std::sync::Arc;

use crate::orchestrator::BookingOrchestrator;
use crate::reconciliation::ReconciliationQueue;
use crate::retry::RetryPolicy;
use crate::schedule_client::ScheduleAuthority;
use crate::store::{InMemoryReservationStore, ReservationStore};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BookingOrchestrator>,
    pub reconciliation: Arc<ReconciliationQueue>,
}

impl AppState {
    pub fn new(schedule: Arc<dyn ScheduleAuthority>, retry: RetryPolicy) -> Self {
        let store: Arc<dyn ReservationStore> = Arc::new(InMemoryReservationStore::new());
        let reconciliation = Arc::new(ReconciliationQueue::new());
        let orchestrator = Arc::new(BookingOrchestrator::new(
            schedule,
            store,
            reconciliation.clone(),
            retry,
        ));
        Self {
            orchestrator,
            reconciliation,
        }
    }
}
