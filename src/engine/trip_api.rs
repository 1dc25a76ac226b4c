use super::helpers::{
    ensure_driver_is_free, ensure_no_open_pairing, ensure_passenger_is_free,
    fetch_trip_for_driver, update_trip,
};
use super::Engine;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    api::TripAPI,
    auth::User,
    db::TripStore,
    entities::{CreateTripParams, NewTrip, Trip},
    error::Error,
};

#[async_trait]
impl<S: TripStore> TripAPI for Engine<S> {
    #[tracing::instrument(skip(self, params), fields(driver_id = params.driver_id))]
    async fn create_trip(&self, user: User, params: CreateTripParams) -> Result<Trip, Error> {
        tracing::info!("creating trip");

        let mut tx = self.store.begin().await?;

        tx.lock_driver(params.driver_id).await?;
        tx.lock_passenger(user.id).await?;

        ensure_no_open_pairing(tx.as_mut(), user.id, params.driver_id).await?;
        ensure_driver_is_free(tx.as_mut(), params.driver_id).await?;
        ensure_passenger_is_free(tx.as_mut(), user.id).await?;

        let trip = tx.insert(NewTrip::new(user.id, params, Utc::now())).await?;

        tx.commit().await?;

        tracing::info!(trip_id = trip.id, "created trip");

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn find_trip(&self, user: User, id: i64) -> Result<Trip, Error> {
        tracing::info!("finding trip by id");

        let mut tx = self.store.begin().await?;
        let trip = fetch_trip_for_driver(tx.as_mut(), id, user.id).await?;
        tx.commit().await?;

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn find_trips(&self, user: User) -> Result<Vec<Trip>, Error> {
        tracing::info!(user_id = user.id, "finding all trips");

        let mut tx = self.store.begin().await?;
        let trips = tx.list_all().await?;
        tx.commit().await?;

        Ok(trips)
    }

    #[tracing::instrument(skip(self))]
    async fn confirm_trip(&self, user: User, id: i64) -> Result<Trip, Error> {
        tracing::info!("confirming trip");

        let mut tx = self.store.begin().await?;

        tx.lock_driver(user.id).await?;
        let trip = fetch_trip_for_driver(tx.as_mut(), id, user.id).await?;

        tx.lock_passenger(trip.passenger_id).await?;

        // a confirm holding only the passenger lock may have superseded the
        // trip between the first read and the lock
        let mut trip = fetch_trip_for_driver(tx.as_mut(), id, user.id).await?;

        ensure_driver_is_free(tx.as_mut(), user.id).await?;
        ensure_passenger_is_free(tx.as_mut(), trip.passenger_id).await?;

        trip.accept(Utc::now())?;

        tx.supersede_pending_except(trip.id, user.id, trip.passenger_id)
            .await?;
        update_trip(tx.as_mut(), &trip).await?;

        tx.commit().await?;

        tracing::info!("confirmed trip");

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn finish_trip(&self, user: User, id: i64) -> Result<Trip, Error> {
        tracing::info!("finishing trip");

        self.close_trip(user, id, Trip::finish).await
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_trip(&self, user: User, id: i64) -> Result<Trip, Error> {
        tracing::info!("canceling trip");

        self.close_trip(user, id, Trip::cancel).await
    }
}

impl<S: TripStore> Engine<S> {
    /// Moves an accepted trip into a terminal state. Only the trip's driver
    /// gets to do this, so the driver lock is enough.
    async fn close_trip<F>(&self, user: User, id: i64, close: F) -> Result<Trip, Error>
    where
        F: FnOnce(&mut Trip, DateTime<Utc>) -> Result<(), Error> + Send,
    {
        let mut tx = self.store.begin().await?;

        tx.lock_driver(user.id).await?;
        let mut trip = fetch_trip_for_driver(tx.as_mut(), id, user.id).await?;

        if let Err(err) = close(&mut trip, Utc::now()) {
            tracing::warn!(status = %trip.status.name(), "trip cannot be closed");
            return Err(err);
        }

        update_trip(tx.as_mut(), &trip).await?;

        tx.commit().await?;

        Ok(trip)
    }
}
