use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use super::{Notification, NotificationDispatcher, NotificationError};
use crate::config::{NotificationConfig, SmtpConfig};

/// SMTP relay transport built on lettre.
pub struct SmtpDispatcher {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpDispatcher {
    pub fn new(
        smtp: &SmtpConfig,
        notifications: &NotificationConfig,
    ) -> Result<Self, NotificationError> {
        let from = format!(
            "{} <{}>",
            notifications.sender_name, notifications.from_address
        )
        .parse::<Mailbox>()
        .map_err(|_| NotificationError::InvalidAddress(notifications.from_address.clone()))?;

        let transport = SmtpTransport::relay(&smtp.host)
            .map_err(|err| NotificationError::DeliveryFailed(format!("SMTP relay error: {err}")))?
            .port(smtp.port)
            .credentials(Credentials::new(
                smtp.username.clone(),
                smtp.password.clone(),
            ))
            .build();

        Ok(Self { transport, from })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, NotificationError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(notification.subject.clone());

        for recipient in &notification.recipients {
            let mailbox = recipient
                .parse::<Mailbox>()
                .map_err(|_| NotificationError::InvalidAddress(recipient.clone()))?;
            builder = builder.to(mailbox);
        }

        let text = notification.render_text();
        let built = if notification.attachments.is_empty() {
            builder.body(text)
        } else {
            let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(text));
            for attachment in &notification.attachments {
                let content_type = ContentType::parse(&attachment.content_type).map_err(|err| {
                    NotificationError::DeliveryFailed(format!(
                        "invalid attachment content type: {err}"
                    ))
                })?;
                parts = parts.singlepart(
                    Attachment::new(attachment.file_name.clone())
                        .body(attachment.content.clone(), content_type),
                );
            }
            builder.multipart(parts)
        };

        built.map_err(|err| NotificationError::DeliveryFailed(format!("failed to build email: {err}")))
    }
}

#[async_trait]
impl NotificationDispatcher for SmtpDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError> {
        if notification.recipients.is_empty() {
            return Err(NotificationError::InvalidAddress(String::new()));
        }

        let message = self.build_message(notification)?;
        let transport = self.transport.clone();

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|err| NotificationError::DeliveryFailed(err.to_string()))?
            .map_err(|err| NotificationError::DeliveryFailed(format!("SMTP send failed: {err}")))?;

        info!(
            template = %notification.template,
            recipients = notification.recipients.len(),
            "email sent"
        );
        Ok(())
    }
}
