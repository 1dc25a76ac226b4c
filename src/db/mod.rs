mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::entities::{NewTrip, Trip, TripStatus};
use crate::error::Error;

/// Persistence for trips. Every lifecycle operation runs inside one
/// [`TripTransaction`] so that its checks and writes land together.
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn TripTransaction>, Error>;
}

/// A unit of work against the store. Dropping it without calling
/// [`TripTransaction::commit`] discards every write made through it.
///
/// Callers take at most one driver lock and one passenger lock per
/// transaction, driver first.
#[async_trait]
pub trait TripTransaction: Send {
    /// Blocks until no other transaction holds the lock for this driver.
    async fn lock_driver(&mut self, driver_id: i64) -> Result<(), Error>;

    /// Blocks until no other transaction holds the lock for this passenger.
    async fn lock_passenger(&mut self, passenger_id: i64) -> Result<(), Error>;

    async fn insert(&mut self, trip: NewTrip) -> Result<Trip, Error>;

    async fn list_all(&mut self) -> Result<Vec<Trip>, Error>;

    async fn find_by_id_and_driver(
        &mut self,
        id: i64,
        driver_id: i64,
    ) -> Result<Option<Trip>, Error>;

    /// A pending or accepted trip between this passenger and driver.
    async fn find_open_pairing(
        &mut self,
        passenger_id: i64,
        driver_id: i64,
    ) -> Result<Option<Trip>, Error>;

    async fn find_active_by_driver(&mut self, driver_id: i64) -> Result<Option<Trip>, Error>;

    async fn find_active_by_passenger(&mut self, passenger_id: i64)
        -> Result<Option<Trip>, Error>;

    /// Writes a new status for the trip. Returns `None` when no row matched.
    async fn update(&mut self, id: i64, status: TripStatus) -> Result<Option<i64>, Error>;

    /// Marks every pending trip of this driver or passenger, other than
    /// `keep_id`, as superseded. Returns whether any row changed.
    async fn supersede_pending_except(
        &mut self,
        keep_id: i64,
        driver_id: i64,
        passenger_id: i64,
    ) -> Result<bool, Error>;

    async fn commit(self: Box<Self>) -> Result<(), Error>;
}
