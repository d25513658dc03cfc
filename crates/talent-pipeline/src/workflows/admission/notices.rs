use super::domain::{Appointment, AppointmentStatus};
use crate::workflows::notifications::{join_url, Notification};

pub const APPOINTMENT_REQUEST_ADMIN: &str = "appointment-request-admin";
pub const APPOINTMENT_REQUEST_COMPANY: &str = "appointment-request-company";
pub const APPOINTMENT_STATUS_CANDIDATE: &str = "appointment-status-candidate";
pub const APPOINTMENT_STATUS_ADMIN: &str = "appointment-status-admin";
pub const APPOINTMENT_REMINDER: &str = "appointment-reminder";

#[derive(Debug, Clone)]
pub struct AdmissionNoticeSettings {
    pub admin_email: String,
    pub frontend_base_url: String,
}

fn schedule(notification: Notification, appointment: &Appointment) -> Notification {
    notification
        .with("candidate", &appointment.candidate_name)
        .with("company", &appointment.company_name)
        .with("date", appointment.date.format("%d/%m/%Y"))
        .with("time", appointment.time.format("%H:%M"))
        .with("timezone", &appointment.timezone)
}

pub fn request_admin(appointment: &Appointment, settings: &AdmissionNoticeSettings) -> Notification {
    let notification = Notification::new(
        APPOINTMENT_REQUEST_ADMIN,
        format!(
            "Appointment requested: {} / {}",
            appointment.company_name, appointment.candidate_name
        ),
    )
    .to(&settings.admin_email);

    schedule(notification, appointment)
        .with("message", appointment.message.as_deref().unwrap_or(""))
        .with(
            "link",
            join_url(
                &settings.frontend_base_url,
                &format!("admin/appointments/{}", appointment.id),
            ),
        )
}

pub fn request_company(
    appointment: &Appointment,
    recipient: &str,
    settings: &AdmissionNoticeSettings,
) -> Notification {
    let notification = Notification::new(
        APPOINTMENT_REQUEST_COMPANY,
        format!("{} would like to meet you", appointment.candidate_name),
    )
    .to(recipient);

    schedule(notification, appointment)
        .with("message", appointment.message.as_deref().unwrap_or(""))
        .with(
            "link",
            join_url(&settings.frontend_base_url, "company/appointments"),
        )
}

fn decision(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Confirmed => "confirmed",
        _ => "rejected",
    }
}

pub fn status_candidate(appointment: &Appointment) -> Notification {
    let notification = Notification::new(
        APPOINTMENT_STATUS_CANDIDATE,
        format!(
            "Your appointment with {} was {}",
            appointment.company_name,
            decision(appointment.status)
        ),
    )
    .to(&appointment.candidate_email)
    .with("status", decision(appointment.status));

    schedule(notification, appointment)
        .with("company_notes", appointment.company_notes.as_deref().unwrap_or(""))
        .with(
            "rejection_reason",
            appointment.rejection_reason.as_deref().unwrap_or(""),
        )
}

pub fn status_admin(appointment: &Appointment, settings: &AdmissionNoticeSettings) -> Notification {
    let notification = Notification::new(
        APPOINTMENT_STATUS_ADMIN,
        format!(
            "Appointment {}: {} / {}",
            decision(appointment.status),
            appointment.company_name,
            appointment.candidate_name
        ),
    )
    .to(&settings.admin_email)
    .with("status", decision(appointment.status));

    schedule(notification, appointment)
}

/// Reminder for the candidate, copied to the company contact when known.
pub fn reminder(appointment: &Appointment) -> Notification {
    let mut notification = Notification::new(
        APPOINTMENT_REMINDER,
        format!("Reminder: appointment with {} in 30 minutes", appointment.company_name),
    )
    .to(&appointment.candidate_email);
    if let Some(company) = appointment
        .company_email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
    {
        notification = notification.to(company);
    }

    schedule(notification, appointment)
}
