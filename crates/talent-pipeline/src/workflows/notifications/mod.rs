//! Outbound notification primitives shared by triage and appointment flows.

mod logging;
mod recording;
mod smtp;

pub use logging::LoggingDispatcher;
pub use recording::RecordingDispatcher;
pub use smtp::SmtpDispatcher;

use std::collections::BTreeMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Binary payload attached to a notification (e.g. a watermarked CV).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAttachment {
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// Templated message addressed to one or more recipients.
///
/// `context` carries the template variables; `render_text` produces the plain-text
/// body used by transports without a template engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub context: BTreeMap<String, String>,
    #[serde(default)]
    pub attachments: Vec<NotificationAttachment>,
}

impl Notification {
    pub fn new(template: &str, subject: impl Into<String>) -> Self {
        Self {
            template: template.to_string(),
            recipients: Vec::new(),
            subject: subject.into(),
            context: BTreeMap::new(),
            attachments: Vec::new(),
        }
    }

    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.recipients.push(address.into());
        self
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_list(self, key: &str, items: &[String]) -> Self {
        let joined = items.join("; ");
        self.with(key, joined)
    }

    pub fn attach(mut self, attachment: NotificationAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn render_text(&self) -> String {
        let mut body = String::new();
        let _ = writeln!(body, "{}", self.subject);
        let _ = writeln!(body);
        for (key, value) in &self.context {
            if value.is_empty() {
                continue;
            }
            let _ = writeln!(body, "{}: {}", humanize_key(key), value);
        }
        body
    }
}

fn humanize_key(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Join a base URL and a path without doubling or dropping slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
}

impl NotificationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, NotificationError::DeliveryFailed(_))
    }
}

/// Transport that renders and sends a notification.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Send a notice whose failure must not affect the calling flow; failures are logged.
pub async fn dispatch_secondary(
    dispatcher: &dyn NotificationDispatcher,
    notification: &Notification,
) {
    if let Err(err) = dispatcher.dispatch(notification).await {
        warn!(
            template = %notification.template,
            recipients = ?notification.recipients,
            error = %err,
            "secondary notification not delivered"
        );
    }
}
