use chrono::{DateTime, Utc};

use super::domain::{
    Appointment, AppointmentId, AppointmentStatus, CompanyId, CompanyListing, CompanyMatch,
    CompanyMatchId, MatchingProfile, ProfileId, ProfileStatus,
};
use crate::workflows::applications::RepositoryError;

pub trait ProfileRepository: Send + Sync {
    fn fetch(&self, id: &ProfileId) -> Result<Option<MatchingProfile>, RepositoryError>;
    fn set_status(&self, id: &ProfileId, status: ProfileStatus) -> Result<(), RepositoryError>;
}

/// Read-only view of the company catalogue.
pub trait CompanyDirectory: Send + Sync {
    fn fetch(&self, id: &CompanyId) -> Result<Option<CompanyListing>, RepositoryError>;
    /// Public companies in a stable order, at most `limit`.
    fn public_companies(&self, limit: usize) -> Result<Vec<CompanyListing>, RepositoryError>;
}

pub trait CompanyMatchRepository: Send + Sync {
    fn find(
        &self,
        profile_id: &ProfileId,
        company_id: &CompanyId,
    ) -> Result<Option<CompanyMatch>, RepositoryError>;
    fn fetch(&self, id: &CompanyMatchId) -> Result<Option<CompanyMatch>, RepositoryError>;
    /// Insert or replace the match for its (profile, company) pair.
    fn upsert(&self, company_match: CompanyMatch) -> Result<CompanyMatch, RepositoryError>;
    fn list_for_profile(&self, profile_id: &ProfileId) -> Result<Vec<CompanyMatch>, RepositoryError>;
    fn set_selected(
        &self,
        id: &CompanyMatchId,
        selected: bool,
    ) -> Result<CompanyMatch, RepositoryError>;
}

/// Status change applied only when the stored status still equals `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentChange {
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
    pub company_notes: Option<String>,
    pub rejection_reason: Option<String>,
}

impl Appointment {
    pub fn apply(&mut self, change: &AppointmentChange, now: DateTime<Utc>) {
        self.status = change.to;
        if let Some(notes) = &change.company_notes {
            self.company_notes = Some(notes.clone());
        }
        if let Some(reason) = &change.rejection_reason {
            self.rejection_reason = Some(reason.clone());
        }
        self.updated_at = now;
    }
}

pub trait AppointmentRepository: Send + Sync {
    fn insert(&self, appointment: Appointment) -> Result<Appointment, RepositoryError>;
    fn fetch(&self, id: &AppointmentId) -> Result<Option<Appointment>, RepositoryError>;
    fn transition(
        &self,
        id: &AppointmentId,
        change: &AppointmentChange,
    ) -> Result<Option<Appointment>, RepositoryError>;
    /// Confirmed appointments whose reminder has not gone out yet.
    fn awaiting_reminder(&self) -> Result<Vec<Appointment>, RepositoryError>;
    /// Flag the reminder as sent; `false` if another sweep already did.
    fn mark_reminded(&self, id: &AppointmentId) -> Result<bool, RepositoryError>;
}
