//! Dispatch of evaluated alerts as notifications.

use log::{debug, info};

use crate::{
    alerts::{Evaluation, NotificationRequest},
    config::NotificationSettings,
    notify::{Notification, Notifier, NotifyError},
};

/// What a dispatch displayed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Tags of the ride notifications, in display order.
    pub tags: Vec<String>,
    /// Whether the fallback notification was displayed.
    pub fallback: bool,
}

impl DispatchReport {
    /// Number of notifications displayed.
    pub fn displayed(&self) -> usize {
        self.tags.len() + usize::from(self.fallback)
    }
}

/// Turns evaluations into displayed notifications.
///
/// One tagged notification is displayed per matched ride. When nothing matched,
/// exactly one untagged fallback notification is displayed instead.
pub struct NotificationDispatcher<N: Notifier> {
    /// Platform notifier
    notifier: N,
    /// Presentation of the notifications
    settings: NotificationSettings,
}

impl<N: Notifier> NotificationDispatcher<N> {
    /// Creates a new [`NotificationDispatcher`].
    pub fn new(notifier: N, settings: NotificationSettings) -> Self {
        NotificationDispatcher { notifier, settings }
    }

    /// Displays the notifications for `evaluation`.
    ///
    /// # Errors
    ///
    /// Stops at the first notification the platform refuses and returns its
    /// [`NotifyError`]. Nothing is retried: the push delivery is lost.
    pub async fn dispatch(&self, evaluation: &Evaluation) -> Result<DispatchReport, NotifyError> {
        let mut report = DispatchReport::default();

        for request in &evaluation.requests {
            debug!("notifying ride {} ({})", request.ride_name, request.reason);
            self.notifier.show(self.ride_notification(request)).await?;
            report.tags.push(request.ride_name.clone());
        }

        if !evaluation.any_match() {
            info!("no ride matched, showing fallback notification");
            self.notifier.show(self.fallback_notification()).await?;
            report.fallback = true;
        } else {
            info!("notified {} rides", report.tags.len());
        }

        Ok(report)
    }

    fn ride_notification(&self, request: &NotificationRequest) -> Notification {
        Notification {
            title: self.settings.title.clone(),
            body: request.body(),
            icon: self.settings.icon.clone(),
            badge: self.settings.badge.clone(),
            tag: Some(request.ride_name.clone()),
        }
    }

    fn fallback_notification(&self) -> Notification {
        Notification {
            title: self.settings.fallback_title.clone(),
            body: self.settings.fallback_body.clone(),
            icon: self.settings.icon.clone(),
            badge: self.settings.badge.clone(),
            tag: None,
        }
    }
}
