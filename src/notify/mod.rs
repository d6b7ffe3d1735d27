//! User notifications.
//!
//! This module provides the [`Notification`] shown to the user, the
//! [`Notifier`] seam through which the platform displays it, and the
//! [`NotificationDispatcher`] turning an evaluation into notifications.
//!
//! # Platform Contract
//!
//! Every push delivery must end with at least one displayed notification, or
//! the platform may stop delivering pushes. The dispatcher therefore shows a
//! fallback notification whenever no rule matched.

mod dispatcher;

use std::io;

use mockall::automock;
use serde::Serialize;
use thiserror::Error;

pub use crate::notify::dispatcher::{DispatchReport, NotificationDispatcher};

/// A notification as handed to the platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Notification title
    pub title: String,
    /// Notification text
    pub body: String,
    /// Icon displayed with the notification
    pub icon: String,
    /// Badge displayed with the notification
    pub badge: String,
    /// De-duplication tag.
    ///
    /// A notification replaces any displayed notification with the same tag
    /// instead of stacking. Ride notifications are tagged with the ride name,
    /// the fallback notification has no tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Errors raised when a notification cannot be displayed.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The platform refused the notification, e.g. permission was revoked.
    #[error("notification display refused: {0}")]
    Refused(String),
    /// The notification could not be handed to the platform.
    #[error("notification display failed: {0}")]
    Io(#[from] io::Error),
}

/// Displays notifications to the user.
#[automock]
pub trait Notifier {
    /// Displays `notification`, returning once the platform accepted it.
    async fn show(&self, notification: Notification) -> Result<(), NotifyError>;
}
