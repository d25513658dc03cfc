use super::repository::ApplicationRecord;
use crate::workflows::notifications::{join_url, Notification, NotificationAttachment};
use crate::workflows::scoring::MatchAssessment;

pub const CLIENT_CANDIDATE: &str = "client-candidate-notification";
pub const ADMIN_HIGH_MATCH: &str = "admin-high-match-notification";
pub const ADMIN_PENDING_REVIEW: &str = "admin-pending-review";
pub const ADMIN_VALIDATION_COPY: &str = "admin-validation-copy";
pub const CANDIDATE_ENCOURAGEMENT: &str = "candidate-rejection-encouragement";
pub const CANDIDATE_CONTRACT: &str = "candidate-contract-request";

/// Links and addresses shared by every application notice.
#[derive(Debug, Clone)]
pub struct NoticeSettings {
    pub admin_email: String,
    pub frontend_base_url: String,
}

impl NoticeSettings {
    fn admin_link(&self, record: &ApplicationRecord) -> String {
        join_url(
            &self.frontend_base_url,
            &format!("admin/applications/{}", record.application_id),
        )
    }
}

fn with_summary(notification: Notification, assessment: &MatchAssessment) -> Notification {
    notification
        .with("match_score", format!("{:.0}%", assessment.percentage))
        .with_list("strengths", &assessment.strengths)
        .with_list("gaps", &assessment.gaps)
        .with("recommendation", &assessment.recommendation)
}

pub fn client_candidate(
    record: &ApplicationRecord,
    recipient: &str,
    assessment: &MatchAssessment,
    attachment: NotificationAttachment,
) -> Notification {
    let notification = Notification::new(
        CLIENT_CANDIDATE,
        format!(
            "New candidate for {}: {}",
            record.job.title, record.candidate.full_name
        ),
    )
    .to(recipient)
    .with("company", &record.job.company.name)
    .with("job_title", &record.job.title)
    .with("candidate", &record.candidate.full_name);

    with_summary(notification, assessment).attach(attachment)
}

pub fn admin_high_match(
    record: &ApplicationRecord,
    assessment: &MatchAssessment,
    settings: &NoticeSettings,
) -> Notification {
    let notification = Notification::new(
        ADMIN_HIGH_MATCH,
        format!(
            "Application forwarded to {}: {}",
            record.job.company.name, record.candidate.full_name
        ),
    )
    .to(&settings.admin_email)
    .with("job_title", &record.job.title)
    .with("candidate", &record.candidate.full_name)
    .with("link", settings.admin_link(record));

    with_summary(notification, assessment)
}

pub fn admin_pending_review(
    record: &ApplicationRecord,
    assessment: &MatchAssessment,
    settings: &NoticeSettings,
) -> Notification {
    let notification = Notification::new(
        ADMIN_PENDING_REVIEW,
        format!(
            "Review required for {} ({})",
            record.candidate.full_name, record.job.title
        ),
    )
    .to(&settings.admin_email)
    .with("job_title", &record.job.title)
    .with("candidate", &record.candidate.full_name)
    .with("link", settings.admin_link(record));

    with_summary(notification, assessment)
}

pub fn admin_validation_copy(record: &ApplicationRecord, settings: &NoticeSettings) -> Notification {
    Notification::new(
        ADMIN_VALIDATION_COPY,
        format!(
            "Application validated and sent to {}: {}",
            record.job.company.name, record.candidate.full_name
        ),
    )
    .to(&settings.admin_email)
    .with("job_title", &record.job.title)
    .with("candidate", &record.candidate.full_name)
    .with("link", settings.admin_link(record))
}

pub fn candidate_encouragement(record: &ApplicationRecord, settings: &NoticeSettings) -> Notification {
    Notification::new(
        CANDIDATE_ENCOURAGEMENT,
        format!("Your application for {}", record.job.title),
    )
    .to(&record.candidate.email)
    .with("candidate", &record.candidate.full_name)
    .with("job_title", &record.job.title)
    .with("company", &record.job.company.name)
    .with("link", join_url(&settings.frontend_base_url, "jobs"))
}

pub fn candidate_contract(record: &ApplicationRecord, contract_url: &str) -> Notification {
    Notification::new(
        CANDIDATE_CONTRACT,
        format!("Contract ready for {}", record.job.title),
    )
    .to(&record.candidate.email)
    .with("candidate", &record.candidate.full_name)
    .with("company", &record.job.company.name)
    .with("contract_link", contract_url)
}
