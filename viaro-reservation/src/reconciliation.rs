use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

/// A held allocation this service failed to release; repaired out of band.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationEntry {
    pub reservation_id: Uuid,
    pub trip_id: Uuid,
    pub allocation_id: Uuid,
    pub seats: u32,
    pub reason: String,
    pub flagged_at: DateTime<Utc>,
}

/// Compensations that exhausted their retries.
///
/// Flagging is loud: every entry also lands in the error log with a
/// `reconciliation` field, distinct from ordinary request failures.
#[derive(Default)]
pub struct ReconciliationQueue {
    entries: DashMap<Uuid, ReconciliationEntry>,
}

impl ReconciliationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self, entry: ReconciliationEntry) {
        tracing::error!(
            reconciliation = true,
            reservation_id = %entry.reservation_id,
            trip_id = %entry.trip_id,
            allocation_id = %entry.allocation_id,
            seats = entry.seats,
            reason = %entry.reason,
            "allocation leaked; out-of-band repair required"
        );
        self.entries.insert(entry.allocation_id, entry);
    }

    pub fn entries(&self) -> Vec<ReconciliationEntry> {
        let mut entries: Vec<ReconciliationEntry> =
            self.entries.iter().map(|entry| entry.value().clone()).collect();
        entries.sort_by_key(|entry| entry.flagged_at);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
