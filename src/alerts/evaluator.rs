//! Evaluation of ride status records against the alert configuration.
//!
//! This module decides which rides deserve a notification for a given push.
//! It is pure: the same configuration and records always produce the same
//! [`Evaluation`].

use std::fmt;

use log::debug;

use crate::{
    alerts::alert::{AlertCondition, AlertConfiguration, RideAlertRule},
    rides::{RideStatus, RideStatusRecord},
};

/// Why a rule matched, carrying what the notification text needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchReason {
    /// The ride is running, with its posted wait when one is known.
    Open { wait: Option<u32> },
    /// The ride is closed.
    Closed,
    /// The posted wait is at or under the configured threshold.
    WaitBelow { wait: u32, threshold: u32 },
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchReason::Open { wait: Some(wait) } => write!(f, "open, {} min wait", wait),
            MatchReason::Open { wait: None } => write!(f, "open"),
            MatchReason::Closed => write!(f, "closed"),
            MatchReason::WaitBelow { wait, threshold } => {
                write!(f, "{} min wait <= {} min", wait, threshold)
            }
        }
    }
}

/// A notification to raise for one ride.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationRequest {
    /// Ride name, also used as the de-duplication tag.
    pub ride_name: String,
    /// Matched condition
    pub reason: MatchReason,
}

impl NotificationRequest {
    /// Human readable description of the matched condition.
    pub fn body(&self) -> String {
        match self.reason {
            MatchReason::Open { wait: Some(wait) } => format!(
                "{} is Open with a wait of {} minutes!",
                self.ride_name, wait
            ),
            MatchReason::Open { wait: None } => format!("{} is Open!", self.ride_name),
            MatchReason::Closed => format!("{} is Closed!", self.ride_name),
            MatchReason::WaitBelow { wait, .. } => {
                format!("{}'s wait is {} minutes!", self.ride_name, wait)
            }
        }
    }
}

/// Outcome of evaluating one push.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Requests in configuration order.
    pub requests: Vec<NotificationRequest>,
}

impl Evaluation {
    /// Returns `true` if at least one rule matched.
    pub fn any_match(&self) -> bool {
        !self.requests.is_empty()
    }
}

/// Evaluates every configured rule against the pushed records.
///
/// # Arguments
///
/// * `config` - The stored configuration, `None` when unset. Unset behaves as
///   an empty configuration.
/// * `records` - Ride records decoded from the push.
///
/// # Behavior
///
/// Rules are visited in configuration order. A rule whose ride is missing from
/// the records is skipped; when a ride appears several times only its first
/// record counts.
pub fn evaluate(
    config: Option<&AlertConfiguration>,
    records: &[RideStatusRecord],
) -> Evaluation {
    let rules = config.map(|c| c.rides.as_slice()).unwrap_or_default();

    let requests = rules
        .iter()
        .filter_map(|rule| {
            let Some(record) = records.iter().find(|r| r.name == rule.ride_name) else {
                debug!("ride {} missing from push, skipping", rule.ride_name);
                return None;
            };

            let reason = match_rule(rule, record.status);
            debug!(
                "ride {} configured {} is {} -> {:?}",
                rule.ride_name, rule.alert_condition, record.status, reason
            );

            reason.map(|reason| NotificationRequest {
                ride_name: rule.ride_name.clone(),
                reason,
            })
        })
        .collect();

    Evaluation { requests }
}

/// Matches a single rule against the status of its ride.
fn match_rule(rule: &RideAlertRule, status: RideStatus) -> Option<MatchReason> {
    match (rule.alert_condition, status) {
        (AlertCondition::Open, RideStatus::Open) => Some(MatchReason::Open { wait: None }),
        (AlertCondition::Open, RideStatus::Waiting(wait)) => {
            Some(MatchReason::Open { wait: Some(wait) })
        }
        (AlertCondition::Open, RideStatus::Closed) => None,
        (AlertCondition::Closed, RideStatus::Closed) => Some(MatchReason::Closed),
        (AlertCondition::Closed, RideStatus::Open | RideStatus::Waiting(_)) => None,
        (AlertCondition::WaitAtMost(threshold), RideStatus::Waiting(wait)) if wait <= threshold => {
            Some(MatchReason::WaitBelow { wait, threshold })
        }
        (AlertCondition::WaitAtMost(_), _) => None,
    }
}
