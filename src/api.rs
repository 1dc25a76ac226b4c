use async_trait::async_trait;

use crate::auth::User;
use crate::entities::{CreateTripParams, Trip};
use crate::error::Error;

#[async_trait]
pub trait TripAPI {
    /// Books a pending trip with `user` as the passenger.
    async fn create_trip(&self, user: User, params: CreateTripParams) -> Result<Trip, Error>;

    /// Looks a trip up with `user` as its driver.
    async fn find_trip(&self, user: User, id: i64) -> Result<Trip, Error>;

    /// Every trip in the store. Not scoped to `user`.
    async fn find_trips(&self, user: User) -> Result<Vec<Trip>, Error>;

    async fn confirm_trip(&self, user: User, id: i64) -> Result<Trip, Error>;

    async fn finish_trip(&self, user: User, id: i64) -> Result<Trip, Error>;

    async fn cancel_trip(&self, user: User, id: i64) -> Result<Trip, Error>;
}

pub trait API: TripAPI {}
