//! In-process admission adapters for the demo, local development and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    Appointment, AppointmentId, AppointmentStatus, CompanyId, CompanyListing, CompanyMatch,
    CompanyMatchId, MatchingProfile, ProfileId, ProfileStatus,
};
use super::repository::{
    AppointmentChange, AppointmentRepository, CompanyDirectory, CompanyMatchRepository,
    ProfileRepository,
};
use crate::workflows::applications::RepositoryError;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
}

#[derive(Default)]
pub struct InMemoryProfiles {
    profiles: Mutex<HashMap<ProfileId, MatchingProfile>>,
}

impl InMemoryProfiles {
    pub fn save(&self, profile: MatchingProfile) -> Result<(), RepositoryError> {
        lock(&self.profiles)?.insert(profile.id.clone(), profile);
        Ok(())
    }
}

impl ProfileRepository for InMemoryProfiles {
    fn fetch(&self, id: &ProfileId) -> Result<Option<MatchingProfile>, RepositoryError> {
        Ok(lock(&self.profiles)?.get(id).cloned())
    }

    fn set_status(&self, id: &ProfileId, status: ProfileStatus) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.profiles)?;
        let profile = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        profile.status = status;
        Ok(())
    }
}

/// Company catalogue ordered by identifier.
#[derive(Default)]
pub struct InMemoryCompanies {
    companies: Mutex<BTreeMap<CompanyId, CompanyListing>>,
}

impl InMemoryCompanies {
    pub fn add(&self, company: CompanyListing) -> Result<(), RepositoryError> {
        lock(&self.companies)?.insert(company.id.clone(), company);
        Ok(())
    }
}

impl CompanyDirectory for InMemoryCompanies {
    fn fetch(&self, id: &CompanyId) -> Result<Option<CompanyListing>, RepositoryError> {
        Ok(lock(&self.companies)?.get(id).cloned())
    }

    fn public_companies(&self, limit: usize) -> Result<Vec<CompanyListing>, RepositoryError> {
        Ok(lock(&self.companies)?
            .values()
            .filter(|company| company.public)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryCompanyMatches {
    matches: Mutex<HashMap<CompanyMatchId, CompanyMatch>>,
}

impl CompanyMatchRepository for InMemoryCompanyMatches {
    fn find(
        &self,
        profile_id: &ProfileId,
        company_id: &CompanyId,
    ) -> Result<Option<CompanyMatch>, RepositoryError> {
        Ok(lock(&self.matches)?
            .values()
            .find(|entry| &entry.profile_id == profile_id && &entry.company_id == company_id)
            .cloned())
    }

    fn fetch(&self, id: &CompanyMatchId) -> Result<Option<CompanyMatch>, RepositoryError> {
        Ok(lock(&self.matches)?.get(id).cloned())
    }

    fn upsert(&self, company_match: CompanyMatch) -> Result<CompanyMatch, RepositoryError> {
        let mut guard = lock(&self.matches)?;
        guard.retain(|id, entry| {
            *id == company_match.id
                || entry.profile_id != company_match.profile_id
                || entry.company_id != company_match.company_id
        });
        guard.insert(company_match.id, company_match.clone());
        Ok(company_match)
    }

    fn list_for_profile(&self, profile_id: &ProfileId) -> Result<Vec<CompanyMatch>, RepositoryError> {
        Ok(lock(&self.matches)?
            .values()
            .filter(|entry| &entry.profile_id == profile_id)
            .cloned()
            .collect())
    }

    fn set_selected(
        &self,
        id: &CompanyMatchId,
        selected: bool,
    ) -> Result<CompanyMatch, RepositoryError> {
        let mut guard = lock(&self.matches)?;
        let entry = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        entry.selected = selected;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }
}

#[derive(Default)]
pub struct InMemoryAppointments {
    appointments: Mutex<HashMap<AppointmentId, Appointment>>,
}

impl AppointmentRepository for InMemoryAppointments {
    fn insert(&self, appointment: Appointment) -> Result<Appointment, RepositoryError> {
        let mut guard = lock(&self.appointments)?;
        if guard.contains_key(&appointment.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    fn fetch(&self, id: &AppointmentId) -> Result<Option<Appointment>, RepositoryError> {
        Ok(lock(&self.appointments)?.get(id).cloned())
    }

    fn transition(
        &self,
        id: &AppointmentId,
        change: &AppointmentChange,
    ) -> Result<Option<Appointment>, RepositoryError> {
        let mut guard = lock(&self.appointments)?;
        let appointment = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if appointment.status != change.from {
            return Ok(None);
        }
        appointment.apply(change, Utc::now());
        Ok(Some(appointment.clone()))
    }

    fn awaiting_reminder(&self) -> Result<Vec<Appointment>, RepositoryError> {
        Ok(lock(&self.appointments)?
            .values()
            .filter(|entry| entry.status == AppointmentStatus::Confirmed && !entry.reminder_sent)
            .cloned()
            .collect())
    }

    fn mark_reminded(&self, id: &AppointmentId) -> Result<bool, RepositoryError> {
        let mut guard = lock(&self.appointments)?;
        let appointment = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if appointment.reminder_sent {
            return Ok(false);
        }
        appointment.reminder_sent = true;
        appointment.updated_at = Utc::now();
        Ok(true)
    }
}
