//! Domain and wire types shared by the schedule and reservation authorities.
//!
//! The two services share no storage; everything they agree on lives here:
//! trip and route models, the tagged allocate/release outcomes, reservation
//! records and their state machine, caller identity, and the error taxonomy.

pub mod allocation;
pub mod error;
pub mod identity;
pub mod reservation;
pub mod trip;

pub use error::ServiceError;
