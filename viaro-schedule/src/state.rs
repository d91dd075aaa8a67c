use std::sync::Arc;

use crate::catalog::TripCatalog;
use crate::coordinator::{AllocationCoordinator, AllocationPolicy};
use crate::ledger::SeatLedger;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<TripCatalog>,
    pub ledger: Arc<SeatLedger>,
    pub coordinator: Arc<AllocationCoordinator>,
}

impl AppState {
    pub fn new(policy: AllocationPolicy) -> Self {
        let ledger = Arc::new(SeatLedger::new());
        let catalog = Arc::new(TripCatalog::new(ledger.clone()));
        let coordinator = Arc::new(AllocationCoordinator::new(ledger.clone(), policy));
        Self {
            catalog,
            ledger,
            coordinator,
        }
    }
}
