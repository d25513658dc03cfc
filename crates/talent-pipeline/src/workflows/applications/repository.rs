use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationId, ApplicationStatus, CandidateSnapshot, DocumentRef, JobSnapshot, MatchResult,
    MatchResultId, NewApplication, ProcessingType,
};

/// Repository record for an application under triage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub application_id: ApplicationId,
    pub job: JobSnapshot,
    pub candidate: CandidateSnapshot,
    pub cv: DocumentRef,
    pub match_result: Option<MatchResultId>,
    pub match_score: Option<f32>,
    pub status: ApplicationStatus,
    pub processing_type: Option<ProcessingType>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationRecord {
    pub fn from_submission(submission: NewApplication, now: DateTime<Utc>) -> Self {
        Self {
            application_id: submission.application_id,
            job: submission.job,
            candidate: submission.candidate,
            cv: submission.cv,
            match_result: None,
            match_score: None,
            status: ApplicationStatus::InReview,
            processing_type: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.application_id.clone(),
            status: self.status.label(),
            processing_type: self.processing_type.map(ProcessingType::label),
            match_score: self.match_score,
            rejection_reason: self.rejection_reason.clone(),
            job_title: self.job.title.clone(),
            updated_at: self.updated_at,
        }
    }

    /// Apply a transition in place. Callers check `change.from` first.
    pub fn apply(&mut self, change: &StatusChange, now: DateTime<Utc>) {
        self.status = change.to;
        self.processing_type = Some(change.processing_type);
        if let Some(score) = change.match_score {
            self.match_score = Some(score);
        }
        if change.rejection_reason.is_some() {
            self.rejection_reason = change.rejection_reason.clone();
        }
        self.updated_at = now;
    }
}

/// Conditional status write: only applied while the stored status equals `from`.
///
/// `match_score` and `rejection_reason` are left untouched when `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub processing_type: ProcessingType,
    pub match_score: Option<f32>,
    pub rejection_reason: Option<String>,
}

/// Storage abstraction so the engine can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    /// Returns `None` when the stored status no longer matches `change.from`.
    fn transition(
        &self,
        id: &ApplicationId,
        change: &StatusChange,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;
    /// Re-point the application at a new current result while it is still in `expected`.
    fn attach_match_result(
        &self,
        id: &ApplicationId,
        expected: ApplicationStatus,
        result: MatchResultId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;
    fn by_status(
        &self,
        status: ApplicationStatus,
        limit: usize,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError>;
}

/// Append-only store of scorer results.
pub trait MatchResultRepository: Send + Sync {
    fn insert(&self, result: MatchResult) -> Result<MatchResult, RepositoryError>;
    fn fetch(&self, id: &MatchResultId) -> Result<Option<MatchResult>, RepositoryError>;
    /// Every result ever scored for the application, most recent first.
    fn history(&self, application_id: &ApplicationId) -> Result<Vec<MatchResult>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub job_title: String,
    pub updated_at: DateTime<Utc>,
}
