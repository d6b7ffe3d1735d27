//! Alert configuration data structures.
//!
//! This module provides the [`AlertConfiguration`] a user builds in a foreground
//! context, made of one [`RideAlertRule`] per ride they want to hear about.
//!
//! # Wire Format
//!
//! The configuration travels as a two-element JSON array, the park identifier
//! followed by the rules:
//!
//! ```json
//! ["magic-kingdom", [
//!   { "rideName": "Space Mountain", "alertOn": "Open" },
//!   { "rideName": "Jungle Cruise", "alertOn": { "wait": 30 } }
//! ]]
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Park identifier meaning "no park selected".
pub const NO_PARK: &str = "none";

/// Condition under which a ride should raise a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertCondition {
    /// Notify when the ride is running, with or without a posted wait.
    Open,
    /// Notify when the ride is closed.
    Closed,
    /// Notify when the posted wait is at most this many minutes.
    #[serde(rename = "wait")]
    WaitAtMost(u32),
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AlertCondition::Open => write!(f, "open"),
            AlertCondition::Closed => write!(f, "closed"),
            AlertCondition::WaitAtMost(minutes) => write!(f, "wait <= {} minutes", minutes),
        }
    }
}

/// Alert rule for a single ride.
///
/// The ride name is the rule's key: a configuration holds at most one rule per
/// ride once normalized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideAlertRule {
    /// Name of the ride, as it appears in the park's status feed.
    #[serde(rename = "rideName")]
    pub ride_name: String,
    /// When to notify for this ride.
    #[serde(rename = "alertOn", alias = "alertCondition")]
    pub alert_condition: AlertCondition,
}

/// Errors raised when a configuration breaks its invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Rides were configured without choosing a park.
    #[error("{0} ride rules configured without a park")]
    RidesWithoutPark(usize),
}

/// The full set of alerts a user configured.
///
/// A configuration is replaced wholesale by each `setConfig` message and is
/// only ever read during push evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "(String, Vec<RideAlertRule>)",
    into = "(String, Vec<RideAlertRule>)"
)]
pub struct AlertConfiguration {
    /// Identifier of the park the rides belong to, or [`NO_PARK`].
    pub park_identifier: String,
    /// Rules in insertion order.
    pub rides: Vec<RideAlertRule>,
}

impl AlertConfiguration {
    /// Creates the empty configuration: no park, no rides.
    pub fn empty() -> Self {
        AlertConfiguration {
            park_identifier: NO_PARK.to_string(),
            rides: Vec::new(),
        }
    }

    /// Checks that rides are only configured alongside a park.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.rides.is_empty() && self.park_identifier == NO_PARK {
            return Err(ConfigurationError::RidesWithoutPark(self.rides.len()));
        }
        Ok(())
    }

    /// Collapses rules sharing a ride name.
    ///
    /// The first occurrence keeps its position and takes the condition of the
    /// last occurrence.
    pub fn normalized(mut self) -> Self {
        let mut rides: Vec<RideAlertRule> = Vec::with_capacity(self.rides.len());

        for rule in self.rides.drain(..) {
            match rides.iter_mut().find(|r| r.ride_name == rule.ride_name) {
                Some(existing) => existing.alert_condition = rule.alert_condition,
                None => rides.push(rule),
            }
        }

        self.rides = rides;
        self
    }
}

impl Default for AlertConfiguration {
    fn default() -> Self {
        AlertConfiguration::empty()
    }
}

impl From<(String, Vec<RideAlertRule>)> for AlertConfiguration {
    fn from((park_identifier, rides): (String, Vec<RideAlertRule>)) -> Self {
        AlertConfiguration {
            park_identifier,
            rides,
        }
    }
}

impl From<AlertConfiguration> for (String, Vec<RideAlertRule>) {
    fn from(config: AlertConfiguration) -> Self {
        (config.park_identifier, config.rides)
    }
}

impl fmt::Display for AlertConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "park={}, rides=[{}]",
            self.park_identifier,
            self.rides
                .iter()
                .map(|r| format!("{}: {}", r.ride_name, r.alert_condition))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
