use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Waypoints, WaypointsParams};
use crate::error::{conflict_error, Error};

pub const PAIRING_EXISTS: &str = "Passenger already book a trip with this driver";
pub const DRIVER_ON_TRIP: &str = "Driver is already on a trip";
pub const PASSENGER_ON_TRIP: &str = "Passenger is already on a trip";
pub const NOT_ACCEPTED: &str = "Trip is not accepted or is already finished or canceled";
pub const NOT_PENDING: &str = "Trip is not pending";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: i64,
    pub fare: f64,
    pub category_id: i64,
    pub passenger_id: i64,
    pub driver_id: i64,
    pub waypoints: Waypoints,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Status {
    Pending,
    Accepted {
        accepted_at: DateTime<Utc>,
    },
    Finished {
        accepted_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    Canceled {
        accepted_at: DateTime<Utc>,
        canceled_at: DateTime<Utc>,
    },
    Superseded {
        deleted_at: DateTime<Utc>,
    },
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "pending".into(),
            Self::Accepted { .. } => "accepted".into(),
            Self::Finished { .. } => "finished".into(),
            Self::Canceled { .. } => "canceled".into(),
            Self::Superseded { .. } => "superseded".into(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Accepted and not yet finished, canceled or deleted.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Not finished, canceled or deleted, whether accepted or not.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted { .. })
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    pub fn accepted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Accepted { accepted_at }
            | Self::Finished { accepted_at, .. }
            | Self::Canceled { accepted_at, .. } => Some(*accepted_at),
            _ => None,
        }
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Finished { finished_at, .. } => Some(*finished_at),
            _ => None,
        }
    }

    pub fn canceled_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Canceled { canceled_at, .. } => Some(*canceled_at),
            _ => None,
        }
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Superseded { deleted_at } => Some(*deleted_at),
            _ => None,
        }
    }
}

/// Everything the store needs to persist a fresh trip. The store assigns
/// the id and audit timestamps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTrip {
    pub fare: f64,
    pub category_id: i64,
    pub passenger_id: i64,
    pub driver_id: i64,
    pub waypoints: Waypoints,
}

/// Body of a create request. camelCase keys are accepted as well.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateTripParams {
    #[serde(alias = "driverId")]
    pub driver_id: i64,
    #[serde(alias = "categoryId")]
    pub category_id: i64,
    pub fare: f64,
    pub waypoints: WaypointsParams,
}

impl NewTrip {
    pub fn new(passenger_id: i64, params: CreateTripParams, now: DateTime<Utc>) -> Self {
        Self {
            fare: params.fare,
            category_id: params.category_id,
            passenger_id,
            driver_id: params.driver_id,
            waypoints: Waypoints::new(params.waypoints, now),
        }
    }

    pub fn into_trip(self, id: i64, now: DateTime<Utc>) -> Trip {
        Trip {
            id,
            fare: self.fare,
            category_id: self.category_id,
            passenger_id: self.passenger_id,
            driver_id: self.driver_id,
            waypoints: self.waypoints,
            status: Status::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Trip {
    #[tracing::instrument(skip(self), fields(trip_id = self.id))]
    pub fn accept(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::Accepted { accepted_at: now };
                Ok(())
            }
            _ => Err(conflict_error(NOT_PENDING)),
        }
    }

    #[tracing::instrument(skip(self), fields(trip_id = self.id))]
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Accepted { accepted_at } => {
                self.status = Status::Finished {
                    accepted_at,
                    finished_at: now,
                };
                Ok(())
            }
            _ => Err(conflict_error(NOT_ACCEPTED)),
        }
    }

    #[tracing::instrument(skip(self), fields(trip_id = self.id))]
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Accepted { accepted_at } => {
                self.status = Status::Canceled {
                    accepted_at,
                    canceled_at: now,
                };
                Ok(())
            }
            _ => Err(conflict_error(NOT_ACCEPTED)),
        }
    }

    pub fn supersede(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::Superseded { deleted_at: now };
                Ok(())
            }
            _ => Err(conflict_error(NOT_PENDING)),
        }
    }

    pub fn involves(&self, driver_id: i64, passenger_id: i64) -> bool {
        self.driver_id == driver_id || self.passenger_id == passenger_id
    }
}

#[cfg(test)]
pub(crate) fn sample_params(driver_id: i64) -> CreateTripParams {
    CreateTripParams {
        driver_id,
        category_id: 1,
        fare: 10.5,
        waypoints: WaypointsParams {
            lat_from: 1.0,
            lon_from: 1.0,
            lat_to: -10.0,
            lon_to: -10.0,
        },
    }
}

#[test]
fn new_trip_is_pending() {
    let now = Utc::now();
    let trip = NewTrip::new(7, sample_params(3), now).into_trip(1, now);

    assert!(trip.status.is_pending());
    assert_eq!(trip.passenger_id, 7);
    assert_eq!(trip.driver_id, 3);
    assert_eq!(trip.status.accepted_at(), None);
    assert_eq!(trip.status.finished_at(), None);
    assert_eq!(trip.status.canceled_at(), None);
    assert_eq!(trip.status.deleted_at(), None);
}

#[test]
fn accepted_at_survives_terminal_transitions() {
    let now = Utc::now();
    let mut finished = NewTrip::new(1, sample_params(1), now).into_trip(1, now);
    finished.accept(now).unwrap();
    let accepted_at = finished.status.accepted_at();
    finished.finish(Utc::now()).unwrap();

    assert_eq!(finished.status.accepted_at(), accepted_at);
    assert!(finished.status.finished_at().is_some());
    assert_eq!(finished.status.canceled_at(), None);

    let mut canceled = NewTrip::new(1, sample_params(1), now).into_trip(2, now);
    canceled.accept(now).unwrap();
    canceled.cancel(Utc::now()).unwrap();

    assert_eq!(canceled.status.accepted_at(), Some(now));
    assert!(canceled.status.canceled_at().is_some());
    assert_eq!(canceled.status.finished_at(), None);
}

#[test]
fn finish_and_cancel_require_an_accepted_trip() {
    let now = Utc::now();
    let mut trip = NewTrip::new(1, sample_params(1), now).into_trip(1, now);

    assert_eq!(trip.finish(now), Err(conflict_error(NOT_ACCEPTED)));
    assert_eq!(trip.cancel(now), Err(conflict_error(NOT_ACCEPTED)));

    trip.accept(now).unwrap();
    trip.finish(now).unwrap();

    assert_eq!(trip.cancel(now), Err(conflict_error(NOT_ACCEPTED)));
    assert_eq!(trip.finish(now), Err(conflict_error(NOT_ACCEPTED)));
}

#[test]
fn superseded_trips_never_move_again() {
    let now = Utc::now();
    let mut trip = NewTrip::new(1, sample_params(1), now).into_trip(1, now);
    trip.supersede(now).unwrap();

    assert!(trip.status.is_terminal());
    assert_eq!(trip.status.deleted_at(), Some(now));
    assert_eq!(trip.accept(now), Err(conflict_error(NOT_PENDING)));
    assert_eq!(trip.finish(now), Err(conflict_error(NOT_ACCEPTED)));
    assert_eq!(trip.supersede(now), Err(conflict_error(NOT_PENDING)));
}

#[test]
fn status_serializes_with_name_tag() {
    let now = Utc::now();
    let value = serde_json::to_value(Status::Accepted { accepted_at: now }).unwrap();

    assert_eq!(value["name"], "accepted");
    assert_eq!(
        serde_json::from_value::<Status>(value).unwrap(),
        Status::Accepted { accepted_at: now }
    );
}

#[test]
fn create_params_accept_camel_case_keys() {
    let params: CreateTripParams = serde_json::from_value(serde_json::json!({
        "driverId": 1,
        "categoryId": 1,
        "fare": 10.5,
        "waypoints": { "latFrom": 1, "lonFrom": 1, "latTo": -10, "lonTo": -10 }
    }))
    .unwrap();

    assert_eq!(params, sample_params(1));
}
