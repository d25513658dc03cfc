use async_trait::async_trait;
use tracing::info;

use super::{Notification, NotificationDispatcher, NotificationError};

/// Dispatcher for deployments without a mail relay.
///
/// Each notification is written to the log as template, recipients, subject and
/// attachment count. Bodies and attachment bytes are dropped once logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            recipients = ?notification.recipients,
            subject = %notification.subject,
            attachments = notification.attachments.len(),
            "notification logged without delivery"
        );
        Ok(())
    }
}
