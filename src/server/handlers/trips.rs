use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;

use crate::auth::User;
use crate::entities::{CreateTripParams, Trip};
use crate::error::Error;
use crate::server::DynAPI;

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(params): Json<CreateTripParams>,
) -> Result<(StatusCode, Json<Trip>), Error> {
    let trip = api.create_trip(user, params).await?;

    Ok((StatusCode::CREATED, trip.into()))
}

pub async fn find_all(
    Extension(api): Extension<DynAPI>,
    user: User,
) -> Result<Json<Vec<Trip>>, Error> {
    let trips = api.find_trips(user).await?;

    Ok(trips.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<i64>,
) -> Result<Json<Trip>, Error> {
    let trip = api.find_trip(user, id).await?;

    Ok(trip.into())
}

pub async fn confirm(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<Trip>), Error> {
    let trip = api.confirm_trip(user, id).await?;

    Ok((StatusCode::CREATED, trip.into()))
}

pub async fn finish(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<Trip>), Error> {
    let trip = api.finish_trip(user, id).await?;

    Ok((StatusCode::CREATED, trip.into()))
}

pub async fn cancel(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<i64>,
) -> Result<Json<Trip>, Error> {
    let trip = api.cancel_trip(user, id).await?;

    Ok(trip.into())
}
