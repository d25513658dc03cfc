//! Application triage and secure CV transmission.
//!
//! An application enters with a match score; the engine routes it to the client,
//! to a reviewer, or to rejection, and every CV that leaves the system is
//! watermarked and logged first.

pub mod documents;
pub mod domain;
pub mod engine;
pub(crate) mod evaluation;
pub mod memory;
pub mod notices;
pub mod repository;
pub mod router;
pub mod transmission;
pub mod watermark;

#[cfg(test)]
mod tests;

pub use documents::{DocumentError, DocumentSource, StorageDocumentSource};
pub use domain::{
    ApplicationId, ApplicationStatus, CandidateSnapshot, CompanySnapshot, DocumentRef,
    JobSnapshot, MatchResult, MatchResultId, NewApplication, ProcessingType,
};
pub use engine::{
    ApplicationTriageEngine, ContractOutcome, EngineSettings, ReviewOutcome, TriageError,
    TriageOutcome, TriagePorts, TriageStage, AUTO_REJECTION_REASON, MANUAL_REJECTION_REASON,
};
pub use evaluation::{ScoreBand, ThresholdError, TriageDecision, TriageThresholds};
pub use notices::NoticeSettings;
pub use repository::{
    ApplicationRecord, ApplicationRepository, ApplicationStatusView, MatchResultRepository,
    RepositoryError, StatusChange,
};
pub use router::application_router;
pub use transmission::{
    export_csv, NewTransmission, RecipientCategory, TransmissionLog, TransmissionLogEntry,
    TransmissionLogError, TransmissionMethod,
};
pub use watermark::{default_caption, watermark_pdf, WatermarkOptions};
