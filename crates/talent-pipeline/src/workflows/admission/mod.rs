//! Admission control: matching candidate profiles against companies and
//! scheduling the appointments that follow.
//!
//! Matching reuses the application scorer and the triage thresholds, so a
//! "strong" company match means the same thing as an auto-sent application.

pub mod appointments;
pub mod domain;
pub mod matcher;
pub mod memory;
pub mod notices;
pub mod repository;
pub mod router;

#[cfg(test)]
mod tests;

pub use appointments::{AppointmentDesk, AppointmentPorts, ReminderSweep};
pub use domain::{
    Appointment, AppointmentId, AppointmentRequest, AppointmentStatus, AppointmentUpdate,
    CompanyId, CompanyListing, CompanyMatch, CompanyMatchId, MatchStrength, MatchingProfile,
    ProfileId, ProfileStatus, RankedMatch, UserId, DEFAULT_TIMEZONE,
};
pub use matcher::{CompanyMatcher, MatchFailure, MatchRun, MatcherPorts, MAX_CANDIDATE_COMPANIES};
pub use notices::AdmissionNoticeSettings;
pub use repository::{
    AppointmentChange, AppointmentRepository, CompanyDirectory, CompanyMatchRepository,
    ProfileRepository,
};
pub use router::{admission_router, AdmissionState};

use crate::workflows::applications::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("matching profile {0} not found")]
    ProfileNotFound(ProfileId),
    #[error("company {0} not found")]
    CompanyNotFound(CompanyId),
    #[error("company match {0} not found")]
    MatchNotFound(CompanyMatchId),
    #[error("appointment {0} not found")]
    AppointmentNotFound(AppointmentId),
    #[error("user {0} does not own this resource")]
    Forbidden(UserId),
    #[error("profile {0} needs a CV or at least one skill or interest")]
    IncompleteProfile(ProfileId),
    #[error("no public company is available for matching")]
    NoCompaniesAvailable,
    #[error("invalid appointment: {0}")]
    InvalidAppointment(String),
    #[error("appointment {appointment_id} cannot move from {from} to {to}")]
    InvalidTransition {
        appointment_id: AppointmentId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
