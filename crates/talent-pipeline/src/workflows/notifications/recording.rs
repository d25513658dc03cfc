use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::info;

use super::{Notification, NotificationDispatcher, NotificationError};

/// In-process dispatcher that logs and records every attempt.
///
/// Keeps every notification, attachments included, so it is meant for tests and
/// the demo. Tests can make selected templates fail to exercise degraded delivery.
#[derive(Default)]
pub struct RecordingDispatcher {
    attempts: Mutex<Vec<Notification>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingDispatcher {
    pub fn fail_template(&self, template: &str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(template.to_string());
    }

    /// Every notification handed to the dispatcher, including failed ones.
    pub fn attempts(&self) -> Vec<Notification> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn attempts_for(&self, template: &str) -> Vec<Notification> {
        self.attempts()
            .into_iter()
            .filter(|notification| notification.template == template)
            .collect()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.attempts
            .lock()
            .map_err(|_| NotificationError::DeliveryFailed("dispatcher mutex poisoned".into()))?
            .push(notification.clone());

        let failing = self
            .failing
            .lock()
            .map_err(|_| NotificationError::DeliveryFailed("dispatcher mutex poisoned".into()))?
            .contains(&notification.template);
        if failing {
            return Err(NotificationError::DeliveryFailed(format!(
                "{} rejected by relay",
                notification.template
            )));
        }

        info!(
            template = %notification.template,
            recipients = ?notification.recipients,
            subject = %notification.subject,
            attachments = notification.attachments.len(),
            "notification recorded"
        );
        Ok(())
    }
}
