//! Append-only audit trail of document deliveries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::domain::ApplicationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipientCategory {
    Client,
    Admin,
    Consultant,
}

impl RecipientCategory {
    pub const fn label(self) -> &'static str {
        match self {
            RecipientCategory::Client => "CLIENT",
            RecipientCategory::Admin => "ADMIN",
            RecipientCategory::Consultant => "CONSULTANT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransmissionMethod {
    Email,
    Download,
    Api,
}

impl TransmissionMethod {
    pub const fn label(self) -> &'static str {
        match self {
            TransmissionMethod::Email => "EMAIL",
            TransmissionMethod::Download => "DOWNLOAD",
            TransmissionMethod::Api => "API",
        }
    }
}

/// Fact recorded before a document leaves the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransmission {
    pub application_id: ApplicationId,
    pub document_id: String,
    pub recipient_email: String,
    pub recipient_category: RecipientCategory,
    pub method: TransmissionMethod,
    pub watermarked: bool,
    pub caption: Option<String>,
    pub metadata: Value,
}

impl NewTransmission {
    pub fn into_entry(self, sent_at: DateTime<Utc>) -> TransmissionLogEntry {
        TransmissionLogEntry {
            id: Uuid::new_v4(),
            application_id: self.application_id,
            document_id: self.document_id,
            recipient_email: self.recipient_email,
            recipient_category: self.recipient_category,
            method: self.method,
            watermarked: self.watermarked,
            caption: self.caption,
            metadata: self.metadata,
            sent_at,
        }
    }
}

/// Persisted log entry. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionLogEntry {
    pub id: Uuid,
    pub application_id: ApplicationId,
    pub document_id: String,
    pub recipient_email: String,
    pub recipient_category: RecipientCategory,
    pub method: TransmissionMethod,
    pub watermarked: bool,
    pub caption: Option<String>,
    pub metadata: Value,
    pub sent_at: DateTime<Utc>,
}

impl TransmissionLogEntry {
    pub fn is_addressed_to(&self, document_id: &str, recipient: &str) -> bool {
        self.document_id == document_id
            && self
                .recipient_email
                .trim()
                .eq_ignore_ascii_case(recipient.trim())
    }
}

pub trait TransmissionLog: Send + Sync {
    fn log(&self, entry: NewTransmission) -> Result<TransmissionLogEntry, TransmissionLogError>;
    /// Append `entry` unless its document was already sent to the same recipient.
    ///
    /// The check and the append are one step; `None` means an earlier entry won.
    fn log_if_absent(
        &self,
        entry: NewTransmission,
    ) -> Result<Option<TransmissionLogEntry>, TransmissionLogError>;
    /// Entries for an application, most recent first.
    fn list_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<TransmissionLogEntry>, TransmissionLogError>;
    /// Entries for a document, most recent first.
    fn list_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<TransmissionLogEntry>, TransmissionLogError>;
    fn has_been_sent_to(
        &self,
        document_id: &str,
        recipient: &str,
    ) -> Result<bool, TransmissionLogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransmissionLogError {
    #[error("transmission log unavailable: {0}")]
    Unavailable(String),
    #[error("transmission log export failed: {0}")]
    Export(String),
}

const CSV_HEADER: [&str; 10] = [
    "id",
    "application_id",
    "document_id",
    "recipient_email",
    "recipient_category",
    "method",
    "watermarked",
    "caption",
    "metadata",
    "sent_at",
];

/// Render entries as CSV for compliance review.
pub fn export_csv(entries: &[TransmissionLogEntry]) -> Result<String, TransmissionLogError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .map_err(|err| TransmissionLogError::Export(err.to_string()))?;

    for entry in entries {
        let metadata = entry.metadata.to_string();
        let sent_at = entry.sent_at.to_rfc3339();
        let id = entry.id.to_string();
        writer
            .write_record([
                id.as_str(),
                entry.application_id.0.as_str(),
                entry.document_id.as_str(),
                entry.recipient_email.as_str(),
                entry.recipient_category.label(),
                entry.method.label(),
                if entry.watermarked { "true" } else { "false" },
                entry.caption.as_deref().unwrap_or(""),
                metadata.as_str(),
                sent_at.as_str(),
            ])
            .map_err(|err| TransmissionLogError::Export(err.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| TransmissionLogError::Export(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| TransmissionLogError::Export(err.to_string()))
}
