//! Alert configuration, its persistence and its evaluation.
//!
//! This module holds everything the agent knows about what the user wants to be
//! alerted about:
//!
//! - [`AlertConfiguration`]: the park and per-ride rules a user configured
//! - [`ConfigStore`] and [`FileConfigStore`]: durable storage of the configuration
//! - [`ConfigGate`]: the exclusive lock every access to the store goes through
//! - [`evaluate`]: matching of pushed ride records against the rules
//!
//! # Architecture
//!
//! The store is created once at startup and moved into the gate, so nothing can
//! reach it without holding the lock:
//!
//! ```text
//! push ──► decode ──► ┌───────────────── gate ─────────────────┐
//!                     │ load ──► evaluate ──► dispatch          │
//! setConfig ────────► │ save                                    │
//! getConfig ────────► │ load ──► broadcast                      │
//!                     └─────────────────────────────────────────┘
//! ```

mod alert;
mod config_store;
mod evaluator;
mod gate;

pub use crate::alerts::alert::AlertConfiguration;
#[cfg(test)]
pub use crate::alerts::alert::{AlertCondition, NO_PARK, RideAlertRule};
#[cfg(test)]
pub use crate::alerts::config_store::{MockConfigStore, StoreError};
pub use crate::alerts::config_store::{ConfigStore, FileConfigStore};
#[cfg(test)]
pub use crate::alerts::evaluator::MatchReason;
pub use crate::alerts::evaluator::{Evaluation, NotificationRequest, evaluate};
pub use crate::alerts::gate::ConfigGate;
