//! Ride status records delivered by the alerting backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current operating status of a ride.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RideStatus {
    /// Ride is running without a posted wait, often because it just opened.
    Open,
    /// Ride is closed.
    Closed,
    /// Ride is running with a posted wait, in minutes.
    #[serde(rename = "Wait")]
    Waiting(u32),
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RideStatus::Open => write!(f, "open"),
            RideStatus::Closed => write!(f, "closed"),
            RideStatus::Waiting(minutes) => write!(f, "waiting {} minutes", minutes),
        }
    }
}

/// Status of one ride at the time the push was produced.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RideStatusRecord {
    /// Ride name, matched against [`RideAlertRule::ride_name`](crate::alerts::RideAlertRule).
    pub name: String,
    /// Status of the ride
    pub status: RideStatus,
}

impl fmt::Display for RideStatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.status)
    }
}
