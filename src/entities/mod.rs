mod trip;
mod waypoints;

pub use trip::{
    CreateTripParams, NewTrip, Status as TripStatus, Trip, DRIVER_ON_TRIP, NOT_ACCEPTED,
    NOT_PENDING, PAIRING_EXISTS, PASSENGER_ON_TRIP,
};
pub use waypoints::{Waypoints, WaypointsParams};

#[cfg(test)]
pub(crate) use trip::sample_params;
