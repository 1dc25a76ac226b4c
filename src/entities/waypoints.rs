use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin and destination of a trip, as given by the passenger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoints {
    pub lat_from: f64,
    pub lon_from: f64,
    pub lat_to: f64,
    pub lon_to: f64,
    pub created_at: DateTime<Utc>,
}

/// Waypoints as they arrive in a create request, before they are stamped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaypointsParams {
    #[serde(alias = "latFrom")]
    pub lat_from: f64,
    #[serde(alias = "lonFrom")]
    pub lon_from: f64,
    #[serde(alias = "latTo")]
    pub lat_to: f64,
    #[serde(alias = "lonTo")]
    pub lon_to: f64,
}

impl Waypoints {
    pub fn new(params: WaypointsParams, created_at: DateTime<Utc>) -> Self {
        Self {
            lat_from: params.lat_from,
            lon_from: params.lon_from,
            lat_to: params.lat_to,
            lon_to: params.lon_to,
            created_at,
        }
    }
}
