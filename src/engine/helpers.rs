use crate::{
    db::TripTransaction,
    entities::{Trip, DRIVER_ON_TRIP, PAIRING_EXISTS, PASSENGER_ON_TRIP},
    error::{conflict_error, not_found_error, unexpected_error, Error},
};

#[tracing::instrument(skip(tx))]
pub async fn fetch_trip_for_driver(
    tx: &mut dyn TripTransaction,
    id: i64,
    driver_id: i64,
) -> Result<Trip, Error> {
    tx.find_by_id_and_driver(id, driver_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("trip does not exist for this driver");
            not_found_error()
        })
}

#[tracing::instrument(skip(tx))]
pub async fn ensure_no_open_pairing(
    tx: &mut dyn TripTransaction,
    passenger_id: i64,
    driver_id: i64,
) -> Result<(), Error> {
    if let Some(trip) = tx.find_open_pairing(passenger_id, driver_id).await? {
        tracing::warn!(trip_id = trip.id, "passenger already booked this driver");
        return Err(conflict_error(PAIRING_EXISTS));
    }

    Ok(())
}

#[tracing::instrument(skip(tx))]
pub async fn ensure_driver_is_free(
    tx: &mut dyn TripTransaction,
    driver_id: i64,
) -> Result<(), Error> {
    if let Some(trip) = tx.find_active_by_driver(driver_id).await? {
        tracing::warn!(trip_id = trip.id, "driver is on another trip");
        return Err(conflict_error(DRIVER_ON_TRIP));
    }

    Ok(())
}

#[tracing::instrument(skip(tx))]
pub async fn ensure_passenger_is_free(
    tx: &mut dyn TripTransaction,
    passenger_id: i64,
) -> Result<(), Error> {
    if let Some(trip) = tx.find_active_by_passenger(passenger_id).await? {
        tracing::warn!(trip_id = trip.id, "passenger is on another trip");
        return Err(conflict_error(PASSENGER_ON_TRIP));
    }

    Ok(())
}

#[tracing::instrument(skip(tx, trip), fields(trip_id = trip.id, status = %trip.status.name()))]
pub async fn update_trip(tx: &mut dyn TripTransaction, trip: &Trip) -> Result<(), Error> {
    // the row was read in this same transaction, so it must still be there
    tx.update(trip.id, trip.status.clone())
        .await?
        .ok_or_else(unexpected_error)?;

    Ok(())
}
