use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;
use viaro_domain::error::ServiceError;
use viaro_domain::trip::{Route, Trip, TripView};

use crate::ledger::SeatLedger;

/// Route and trip metadata.
///
/// Seat counts live in the ledger; the catalog registers each new trip
/// there and joins live counts back in when serving views.
pub struct TripCatalog {
    routes: DashMap<Uuid, Route>,
    trips: DashMap<Uuid, Trip>,
    ledger: Arc<SeatLedger>,
}

impl TripCatalog {
    pub fn new(ledger: Arc<SeatLedger>) -> Self {
        Self {
            routes: DashMap::new(),
            trips: DashMap::new(),
            ledger,
        }
    }

    pub fn create_route(&self, origin: &str, destination: &str) -> Result<Route, ServiceError> {
        let origin = origin.trim();
        let destination = destination.trim();
        if origin.is_empty() || destination.is_empty() {
            return Err(ServiceError::Validation(
                "origin and destination are required".to_string(),
            ));
        }
        let route = Route {
            id: Uuid::new_v4(),
            origin: origin.to_string(),
            destination: destination.to_string(),
        };
        self.routes.insert(route.id, route.clone());
        Ok(route)
    }

    pub fn list_routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self.routes.iter().map(|entry| entry.value().clone()).collect();
        routes.sort_by(|a, b| (&a.origin, &a.destination).cmp(&(&b.origin, &b.destination)));
        routes
    }

    pub fn create_trip(
        &self,
        route_id: Uuid,
        departure_time: DateTime<Utc>,
        seats_total: u32,
    ) -> Result<Trip, ServiceError> {
        if !self.routes.contains_key(&route_id) {
            return Err(ServiceError::NotFound(format!("route {route_id}")));
        }
        let trip = Trip {
            id: Uuid::new_v4(),
            route_id,
            departure_time,
            seats_total,
            created_at: Utc::now(),
        };
        self.trips.insert(trip.id, trip.clone());
        self.ledger.register_trip(trip.id, seats_total);
        Ok(trip)
    }

    pub fn get_trip(&self, trip_id: Uuid) -> Result<TripView, ServiceError> {
        let trip = self
            .trips
            .get(&trip_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::NotFound(format!("trip {trip_id}")))?;
        self.view(trip)
    }

    /// Trips on the given route departing within the given calendar day.
    pub fn search(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> Result<Vec<TripView>, ServiceError> {
        let route_ids: Vec<Uuid> = self
            .routes
            .iter()
            .filter(|entry| entry.value().origin == origin && entry.value().destination == destination)
            .map(|entry| *entry.key())
            .collect();

        let mut views = Vec::new();
        for entry in self.trips.iter() {
            let trip = entry.value();
            if route_ids.contains(&trip.route_id) && trip.departure_time.date_naive() == date {
                views.push(self.view(trip.clone())?);
            }
        }
        views.sort_by_key(|view| view.departure_time);
        Ok(views)
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Demo fixtures matching the operational bootstrap: three city pairs,
    /// three departures each, 40 seats per trip. No-op once routes exist.
    pub fn seed_demo_data(&self) -> Result<(), ServiceError> {
        if !self.routes.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        for (origin, destination) in [("City A", "City B"), ("City A", "City C"), ("City B", "City C")] {
            let route = self.create_route(origin, destination)?;
            for hours in [2i64, 6, 10] {
                self.create_trip(route.id, now + chrono::Duration::hours(hours), 40)?;
            }
        }
        Ok(())
    }

    fn view(&self, trip: Trip) -> Result<TripView, ServiceError> {
        let route = self
            .routes
            .get(&trip.route_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::NotFound(format!("route {}", trip.route_id)))?;
        let (seats_total, seats_allocated) =
            self.ledger.availability(trip.id).unwrap_or((trip.seats_total, 0));
        Ok(TripView {
            id: trip.id,
            route,
            departure_time: trip.departure_time,
            seats_total,
            seats_available: seats_total.saturating_sub(seats_allocated),
        })
    }
}
