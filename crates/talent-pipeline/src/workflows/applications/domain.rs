use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::scoring::{MatchAssessment, ScoreRequest};

/// Identifier wrapper for candidate applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchResultId(pub Uuid);

impl MatchResultId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MatchResultId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MatchResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hiring company as captured when the application was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySnapshot {
    pub company_id: String,
    pub name: String,
    pub email: Option<String>,
}

impl CompanySnapshot {
    /// Contact address usable for delivery, ignoring blank values.
    pub fn contact_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub experience_years: Option<u8>,
    pub company: CompanySnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSnapshot {
    pub candidate_id: String,
    pub full_name: String,
    pub email: String,
    pub profile_text: String,
}

/// Pointer to a stored document; the bytes live in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document_id: String,
    pub file_name: String,
    pub storage_location: String,
}

/// Lifecycle of an application inside the triage pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    InReview,
    PendingReview,
    AutoSentToClient,
    Validated,
    Denied,
    AwaitingContract,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::InReview => "IN_REVIEW",
            ApplicationStatus::PendingReview => "PENDING_REVIEW",
            ApplicationStatus::AutoSentToClient => "AUTO_SENT_TO_CLIENT",
            ApplicationStatus::Validated => "VALIDATED",
            ApplicationStatus::Denied => "DENIED",
            ApplicationStatus::AwaitingContract => "AWAITING_CONTRACT",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::AutoSentToClient
                | ApplicationStatus::Denied
                | ApplicationStatus::AwaitingContract
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether the last transition was decided by thresholds or by a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingType {
    Auto,
    Manual,
}

impl ProcessingType {
    pub const fn label(self) -> &'static str {
        match self {
            ProcessingType::Auto => "AUTO",
            ProcessingType::Manual => "MANUAL",
        }
    }
}

/// Payload used to register an application with the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub application_id: ApplicationId,
    pub job: JobSnapshot,
    pub candidate: CandidateSnapshot,
    pub cv: DocumentRef,
}

/// Immutable scorer output owned by an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: MatchResultId,
    pub application_id: ApplicationId,
    pub assessment: MatchAssessment,
    pub scored_at: DateTime<Utc>,
}

impl MatchResult {
    pub fn new(application_id: ApplicationId, assessment: MatchAssessment) -> Self {
        Self {
            id: MatchResultId::new(),
            application_id,
            assessment,
            scored_at: Utc::now(),
        }
    }

    /// Percentage usable for triage, if it is a finite value in range.
    pub fn usable_percentage(&self) -> Option<f32> {
        let percentage = self.assessment.percentage;
        (percentage.is_finite() && (0.0..=100.0).contains(&percentage)).then_some(percentage)
    }
}

impl JobSnapshot {
    pub fn score_request(&self, candidate: &CandidateSnapshot) -> ScoreRequest {
        ScoreRequest {
            profile_text: candidate.profile_text.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            requirements: self.requirements.clone(),
            skills: self.skills.clone(),
            experience_years: self.experience_years,
        }
    }
}
