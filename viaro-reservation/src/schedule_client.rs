use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use uuid::Uuid;
use viaro_domain::allocation::{AllocateRequest, AllocationOutcome, ReleaseOutcome, ReleaseRequest};
use viaro_domain::error::ServiceError;
use viaro_domain::trip::TripAvailability;

/// The schedule authority as seen from this service: an availability read
/// plus the allocate/release pair. Implemented over HTTP in production and
/// in-process in tests.
#[async_trait]
pub trait ScheduleAuthority: Send + Sync {
    async fn trip_availability(&self, trip_id: Uuid) -> Result<TripAvailability, ServiceError>;
    async fn allocate(
        &self,
        trip_id: Uuid,
        seats: u32,
        allocation_id: Uuid,
    ) -> Result<AllocationOutcome, ServiceError>;
    async fn release(
        &self,
        trip_id: Uuid,
        allocation_id: Uuid,
    ) -> Result<ReleaseOutcome, ServiceError>;
}

pub struct HttpScheduleClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpScheduleClient {
    /// `timeout` bounds every request; a timed-out call surfaces as
    /// `DependencyUnavailable` and the orchestrator decides whether the
    /// outcome is safe to retry.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                ServiceError::DependencyUnavailable(format!("failed to build http client: {err}"))
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn transport(err: reqwest::Error) -> ServiceError {
        ServiceError::DependencyUnavailable(format!("schedule authority unreachable: {err}"))
    }

    async fn decode_error(trip_id: Uuid, response: reqwest::Response) -> ServiceError {
        let status = response.status();
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| format!("schedule authority returned {status}"));
        match status {
            StatusCode::NOT_FOUND => ServiceError::NotFound(format!("trip {trip_id}")),
            StatusCode::BAD_REQUEST => ServiceError::Validation(message),
            _ => ServiceError::DependencyUnavailable(message),
        }
    }
}

#[async_trait]
impl ScheduleAuthority for HttpScheduleClient {
    async fn trip_availability(&self, trip_id: Uuid) -> Result<TripAvailability, ServiceError> {
        let url = format!("{}/v1/trips/{}/availability", self.base_url, trip_id);
        let response = self.http.get(&url).send().await.map_err(Self::transport)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(trip_id, response).await);
        }
        response.json().await.map_err(Self::transport)
    }

    async fn allocate(
        &self,
        trip_id: Uuid,
        seats: u32,
        allocation_id: Uuid,
    ) -> Result<AllocationOutcome, ServiceError> {
        let url = format!("{}/v1/trips/{}/allocate", self.base_url, trip_id);
        let response = self
            .http
            .post(&url)
            .json(&AllocateRequest { seats, allocation_id })
            .send()
            .await
            .map_err(Self::transport)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(trip_id, response).await);
        }
        response.json().await.map_err(Self::transport)
    }

    async fn release(
        &self,
        trip_id: Uuid,
        allocation_id: Uuid,
    ) -> Result<ReleaseOutcome, ServiceError> {
        let url = format!("{}/v1/trips/{}/release", self.base_url, trip_id);
        let response = self
            .http
            .post(&url)
            .json(&ReleaseRequest { allocation_id })
            .send()
            .await
            .map_err(Self::transport)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(trip_id, response).await);
        }
        response.json().await.map_err(Self::transport)
    }
}
