use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    Appointment, AppointmentId, AppointmentRequest, AppointmentStatus, AppointmentUpdate,
    MatchingProfile, UserId, DEFAULT_TIMEZONE,
};
use super::notices::{self, AdmissionNoticeSettings};
use super::repository::{
    AppointmentChange, AppointmentRepository, CompanyDirectory, ProfileRepository,
};
use super::AdmissionError;
use crate::workflows::notifications::{dispatch_secondary, NotificationDispatcher};

/// Reminders go out for appointments starting between 30 and 35 minutes from now.
const REMINDER_LEAD_MINUTES: i64 = 30;
const REMINDER_WINDOW_MINUTES: i64 = 5;

#[derive(Clone)]
pub struct AppointmentPorts {
    pub profiles: Arc<dyn ProfileRepository>,
    pub companies: Arc<dyn CompanyDirectory>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub notifications: Arc<dyn NotificationDispatcher>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReminderSweep {
    pub checked: usize,
    pub sent: Vec<AppointmentId>,
    pub failed: Vec<AppointmentId>,
}

pub struct AppointmentDesk {
    ports: AppointmentPorts,
    notices: AdmissionNoticeSettings,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

impl AppointmentDesk {
    pub fn new(ports: AppointmentPorts, notices: AdmissionNoticeSettings) -> Self {
        Self { ports, notices }
    }

    fn load(&self, id: &AppointmentId) -> Result<Appointment, AdmissionError> {
        self.ports
            .appointments
            .fetch(id)?
            .ok_or(AdmissionError::AppointmentNotFound(*id))
    }

    fn owned_profile(
        &self,
        request: &AppointmentRequest,
        owner: &UserId,
    ) -> Result<MatchingProfile, AdmissionError> {
        let profile = self
            .ports
            .profiles
            .fetch(&request.profile_id)?
            .ok_or_else(|| AdmissionError::ProfileNotFound(request.profile_id.clone()))?;
        if &profile.owner != owner {
            return Err(AdmissionError::Forbidden(owner.clone()));
        }
        Ok(profile)
    }

    /// Record a pending appointment and tell the admin team and the company.
    pub async fn request_appointment(
        &self,
        owner: &UserId,
        request: AppointmentRequest,
    ) -> Result<Appointment, AdmissionError> {
        let profile = self.owned_profile(&request, owner)?;
        let company = self
            .ports
            .companies
            .fetch(&request.company_id)?
            .ok_or_else(|| AdmissionError::CompanyNotFound(request.company_id.clone()))?;

        let time = NaiveTime::parse_from_str(request.time.trim(), "%H:%M").map_err(|_| {
            AdmissionError::InvalidAppointment(format!(
                "time '{}' is not formatted HH:MM",
                request.time
            ))
        })?;
        let timezone = trimmed(request.timezone).unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        if timezone.parse::<Tz>().is_err() {
            return Err(AdmissionError::InvalidAppointment(format!(
                "unknown timezone '{timezone}'"
            )));
        }

        let now = Utc::now();
        let appointment = self.ports.appointments.insert(Appointment {
            id: AppointmentId::new(),
            profile_id: profile.id,
            company_id: company.id.clone(),
            owner: owner.clone(),
            candidate_name: profile.owner_name,
            candidate_email: profile.owner_email,
            company_name: company.name.clone(),
            company_email: company.contact().map(str::to_string),
            date: request.date,
            time,
            timezone,
            message: trimmed(request.message),
            company_notes: None,
            rejection_reason: None,
            status: AppointmentStatus::Pending,
            reminder_sent: false,
            created_at: now,
            updated_at: now,
        })?;

        info!(
            appointment_id = %appointment.id,
            company_id = %appointment.company_id,
            "appointment requested"
        );

        let dispatcher = self.ports.notifications.as_ref();
        dispatch_secondary(dispatcher, &notices::request_admin(&appointment, &self.notices)).await;
        match company.contact() {
            Some(contact) => {
                let notice = notices::request_company(&appointment, contact, &self.notices);
                dispatch_secondary(dispatcher, &notice).await;
            }
            None => debug!(
                company_id = %company.id,
                "company has no contact address; request notice skipped"
            ),
        }

        Ok(appointment)
    }

    fn change(
        &self,
        current: &Appointment,
        change: AppointmentChange,
    ) -> Result<Appointment, AdmissionError> {
        let refused = |from| AdmissionError::InvalidTransition {
            appointment_id: current.id,
            from,
            to: change.to,
        };
        if !current.status.can_transition_to(change.to) {
            return Err(refused(current.status));
        }

        match self.ports.appointments.transition(&current.id, &change)? {
            Some(updated) => Ok(updated),
            None => {
                let latest = self.load(&current.id)?;
                warn!(
                    appointment_id = %current.id,
                    status = %latest.status,
                    "appointment changed concurrently"
                );
                Err(refused(latest.status))
            }
        }
    }

    /// Cancel on behalf of the candidate who requested the appointment.
    pub fn cancel(&self, id: &AppointmentId, user: &UserId) -> Result<Appointment, AdmissionError> {
        let current = self.load(id)?;
        if &current.owner != user {
            return Err(AdmissionError::Forbidden(user.clone()));
        }

        let cancelled = self.change(
            &current,
            AppointmentChange {
                from: current.status,
                to: AppointmentStatus::Cancelled,
                company_notes: None,
                rejection_reason: None,
            },
        )?;
        info!(appointment_id = %id, "appointment cancelled");
        Ok(cancelled)
    }

    pub async fn update_status(
        &self,
        id: &AppointmentId,
        update: AppointmentUpdate,
    ) -> Result<Appointment, AdmissionError> {
        let current = self.load(id)?;
        let updated = self.change(
            &current,
            AppointmentChange {
                from: current.status,
                to: update.status,
                company_notes: trimmed(update.company_notes),
                rejection_reason: trimmed(update.rejection_reason),
            },
        )?;

        info!(
            appointment_id = %id,
            from = %current.status,
            to = %updated.status,
            "appointment status updated"
        );

        let answered = current.status == AppointmentStatus::Pending
            && matches!(
                updated.status,
                AppointmentStatus::Confirmed | AppointmentStatus::Rejected
            );
        if answered {
            let dispatcher = self.ports.notifications.as_ref();
            dispatch_secondary(dispatcher, &notices::status_candidate(&updated)).await;
            dispatch_secondary(dispatcher, &notices::status_admin(&updated, &self.notices)).await;
        }

        Ok(updated)
    }

    /// Remind confirmed appointments starting 30 to 35 minutes after `now`.
    pub async fn send_due_reminders(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ReminderSweep, AdmissionError> {
        let window_start = now + Duration::minutes(REMINDER_LEAD_MINUTES);
        let window_end = window_start + Duration::minutes(REMINDER_WINDOW_MINUTES);
        let pending = self.ports.appointments.awaiting_reminder()?;

        let mut sweep = ReminderSweep {
            checked: pending.len(),
            ..ReminderSweep::default()
        };

        for appointment in pending {
            let Some(starts_at) = appointment.starts_at() else {
                warn!(appointment_id = %appointment.id, "appointment start cannot be resolved");
                continue;
            };
            if starts_at < window_start || starts_at > window_end {
                continue;
            }

            if let Err(err) = self
                .ports
                .notifications
                .dispatch(&notices::reminder(&appointment))
                .await
            {
                warn!(appointment_id = %appointment.id, error = %err, "reminder not delivered");
                sweep.failed.push(appointment.id);
                continue;
            }

            match self.ports.appointments.mark_reminded(&appointment.id) {
                Ok(_) => sweep.sent.push(appointment.id),
                Err(err) => {
                    warn!(appointment_id = %appointment.id, error = %err, "reminder flag not saved");
                    sweep.failed.push(appointment.id);
                }
            }
        }

        info!(
            checked = sweep.checked,
            sent = sweep.sent.len(),
            failed = sweep.failed.len(),
            "reminder sweep finished"
        );
        Ok(sweep)
    }
}
