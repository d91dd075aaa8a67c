use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;
use viaro_domain::error::ServiceError;
use viaro_domain::reservation::{ReservationRecord, ReservationStatus};

/// Listing scope derived from the caller's role.
#[derive(Debug, Clone)]
pub enum ListScope {
    All,
    Owner(String),
}

/// Reservation ledger contract.
///
/// The in-memory implementation backs the service; tests substitute failing
/// variants to drive the orchestrator's compensation paths, and a durable
/// backend can slot in without touching the orchestrator.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn create(&self, record: ReservationRecord) -> Result<(), ServiceError>;
    async fn get(&self, id: Uuid) -> Result<Option<ReservationRecord>, ServiceError>;
    async fn find_by_allocation(
        &self,
        allocation_id: Uuid,
    ) -> Result<Option<ReservationRecord>, ServiceError>;
    /// Applies a status transition, rejecting anything the per-record state
    /// machine forbids.
    async fn update_status(
        &self,
        id: Uuid,
        next: ReservationStatus,
    ) -> Result<ReservationRecord, ServiceError>;
    async fn list(&self, scope: ListScope) -> Result<Vec<ReservationRecord>, ServiceError>;
}

#[derive(Default)]
pub struct InMemoryReservationStore {
    records: DashMap<Uuid, ReservationRecord>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn create(&self, record: ReservationRecord) -> Result<(), ServiceError> {
        if self.records.contains_key(&record.id) {
            return Err(ServiceError::Conflict(format!(
                "reservation {} already exists",
                record.id
            )));
        }
        self.records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ReservationRecord>, ServiceError> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_allocation(
        &self,
        allocation_id: Uuid,
    ) -> Result<Option<ReservationRecord>, ServiceError> {
        Ok(self
            .records
            .iter()
            .find(|entry| entry.value().allocation_id == allocation_id)
            .map(|entry| entry.value().clone()))
    }

    async fn update_status(
        &self,
        id: Uuid,
        next: ReservationStatus,
    ) -> Result<ReservationRecord, ServiceError> {
        // The keyed guard serializes transitions for one record; the state
        // machine check rejects anything that raced past it.
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("reservation {id}")))?;
        if !entry.status.can_transition_to(next) {
            return Err(ServiceError::Conflict(format!(
                "illegal reservation transition {} -> {}",
                entry.status, next
            )));
        }
        entry.status = next;
        entry.updated_at = Utc::now();
        Ok(entry.value().clone())
    }

    async fn list(&self, scope: ListScope) -> Result<Vec<ReservationRecord>, ServiceError> {
        let mut records: Vec<ReservationRecord> = match scope {
            ListScope::All => self.records.iter().map(|entry| entry.value().clone()).collect(),
            ListScope::Owner(owner) => self
                .records
                .iter()
                .filter(|entry| entry.value().booked_by.as_deref() == Some(owner.as_str()))
                .map(|entry| entry.value().clone())
                .collect(),
        };
        records.sort_by_key(|record| std::cmp::Reverse(record.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(owner: Option<&str>) -> ReservationRecord {
        ReservationRecord {
            id: Uuid::new_v4(),
            trip_id: Uuid::new_v4(),
            passenger_name: "Ada".to_string(),
            seats_booked: 2,
            status: ReservationStatus::Pending,
            booked_by: owner.map(str::to_string),
            allocation_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_ids() {
        let store = InMemoryReservationStore::new();
        let r = record(None);
        store.create(r.clone()).await.unwrap();
        assert!(matches!(
            store.create(r).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn update_status_enforces_state_machine() {
        let store = InMemoryReservationStore::new();
        let r = record(None);
        store.create(r.clone()).await.unwrap();

        // PENDING -> CANCELLED is illegal.
        assert!(matches!(
            store.update_status(r.id, ReservationStatus::Cancelled).await,
            Err(ServiceError::Conflict(_))
        ));

        let booked = store.update_status(r.id, ReservationStatus::Booked).await.unwrap();
        assert_eq!(booked.status, ReservationStatus::Booked);

        // BOOKED -> FAILED is illegal.
        assert!(matches!(
            store.update_status(r.id, ReservationStatus::Failed).await,
            Err(ServiceError::Conflict(_))
        ));

        let cancelled = store
            .update_status(r.id, ReservationStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);

        // CANCELLED is terminal.
        assert!(matches!(
            store.update_status(r.id, ReservationStatus::Booked).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn update_status_unknown_record_is_not_found() {
        let store = InMemoryReservationStore::new();
        assert!(matches!(
            store.update_status(Uuid::new_v4(), ReservationStatus::Booked).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn find_by_allocation_matches_exactly() {
        let store = InMemoryReservationStore::new();
        let r = record(None);
        store.create(r.clone()).await.unwrap();

        let found = store.find_by_allocation(r.allocation_id).await.unwrap();
        assert_eq!(found.map(|f| f.id), Some(r.id));
        assert!(store.find_by_allocation(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_scopes_by_owner() {
        let store = InMemoryReservationStore::new();
        store.create(record(Some("alice"))).await.unwrap();
        store.create(record(Some("bob"))).await.unwrap();
        store.create(record(None)).await.unwrap();

        assert_eq!(store.list(ListScope::All).await.unwrap().len(), 3);
        let alices = store.list(ListScope::Owner("alice".to_string())).await.unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].booked_by.as_deref(), Some("alice"));
    }
}
