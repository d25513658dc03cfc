use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::workflows::admission::domain::{
    AppointmentRequest, CompanyId, CompanyListing, MatchingProfile, ProfileId, ProfileStatus,
    UserId,
};
use crate::workflows::admission::memory::{
    InMemoryAppointments, InMemoryCompanies, InMemoryCompanyMatches, InMemoryProfiles,
};
use crate::workflows::admission::{
    AdmissionNoticeSettings, AdmissionState, AppointmentDesk, AppointmentPorts, CompanyMatcher,
    MatcherPorts,
};
use crate::workflows::applications::TriageThresholds;
use crate::workflows::notifications::RecordingDispatcher;
use crate::workflows::scoring::{ScoreProvider, ScoreReport, ScoreRequest, ScoringError};

pub(super) const ADMIN_EMAIL: &str = "admin@talent.test";
pub(super) const OWNER: &str = "user-ada";
pub(super) const PROFILE: &str = "profile-ada";

/// Scorer keyed by company name, counting every call.
#[derive(Default)]
pub(super) struct CompanyScorer {
    scores: Vec<(String, f64)>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl CompanyScorer {
    pub(super) fn with(mut self, company: &str, score: f64) -> Self {
        self.scores.push((company.to_string(), score));
        self
    }

    pub(super) fn failing_for(mut self, company: &str) -> Self {
        self.failing.insert(company.to_string());
        self
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("scorer mutex poisoned").clone()
    }
}

#[async_trait]
impl ScoreProvider for CompanyScorer {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreReport, ScoringError> {
        self.calls
            .lock()
            .expect("scorer mutex poisoned")
            .push(request.title.clone());
        if self.failing.contains(&request.title) {
            return Err(ScoringError::Unavailable("scorer crashed".to_string()));
        }
        let score = self
            .scores
            .iter()
            .find(|(company, _)| company == &request.title)
            .map(|(_, score)| *score)
            .unwrap_or(50.0);
        Ok(ScoreReport {
            overall_match_percentage: score,
            criteria_scores: Vec::new(),
            strengths: vec!["Sector experience".to_string()],
            gaps: Vec::new(),
            recommendation: format!("Meet {}", request.title),
        })
    }
}

pub(super) fn profile() -> MatchingProfile {
    MatchingProfile {
        id: ProfileId(PROFILE.to_string()),
        owner: UserId(OWNER.to_string()),
        owner_name: "Ada Martin".to_string(),
        owner_email: "ada@candidates.test".to_string(),
        title: "Backend Engineer".to_string(),
        cv_text: None,
        skills: vec!["Rust".to_string(), "PostgreSQL".to_string()],
        interests: vec!["Payments".to_string()],
        target_sectors: vec!["fintech".to_string()],
        status: ProfileStatus::Draft,
    }
}

pub(super) fn company(id: &str, name: &str, sector: &str) -> CompanyListing {
    CompanyListing {
        id: CompanyId(id.to_string()),
        name: name.to_string(),
        sector: Some(sector.to_string()),
        city: Some("Lyon".to_string()),
        description: None,
        contact_email: Some(format!("contact@{id}.test")),
        open_positions: vec!["Platform Engineer".to_string()],
        public: true,
    }
}

pub(super) fn owner() -> UserId {
    UserId(OWNER.to_string())
}

pub(super) fn profile_id() -> ProfileId {
    ProfileId(PROFILE.to_string())
}

pub(super) fn appointment_request(company: &str, date: NaiveDate, time: &str) -> AppointmentRequest {
    AppointmentRequest {
        profile_id: profile_id(),
        company_id: CompanyId(company.to_string()),
        date,
        time: time.to_string(),
        timezone: None,
        message: Some("  Looking forward to it ".to_string()),
    }
}

pub(super) struct Harness {
    pub(super) matcher: Arc<CompanyMatcher>,
    pub(super) desk: Arc<AppointmentDesk>,
    pub(super) profiles: Arc<InMemoryProfiles>,
    pub(super) companies: Arc<InMemoryCompanies>,
    pub(super) matches: Arc<InMemoryCompanyMatches>,
    pub(super) appointments: Arc<InMemoryAppointments>,
    pub(super) notifications: Arc<RecordingDispatcher>,
    pub(super) scorer: Arc<CompanyScorer>,
}

pub(super) fn harness(scorer: CompanyScorer) -> Harness {
    let profiles = Arc::new(InMemoryProfiles::default());
    let companies = Arc::new(InMemoryCompanies::default());
    let matches = Arc::new(InMemoryCompanyMatches::default());
    let appointments = Arc::new(InMemoryAppointments::default());
    let notifications = Arc::new(RecordingDispatcher::default());
    let scorer = Arc::new(scorer);

    profiles.save(profile()).expect("profile saved");

    let matcher = CompanyMatcher::new(
        MatcherPorts {
            profiles: profiles.clone(),
            companies: companies.clone(),
            matches: matches.clone(),
            scorer: scorer.clone(),
        },
        TriageThresholds::new(80, 60).expect("valid thresholds"),
        Duration::from_secs(2),
    );
    let desk = AppointmentDesk::new(
        AppointmentPorts {
            profiles: profiles.clone(),
            companies: companies.clone(),
            appointments: appointments.clone(),
            notifications: notifications.clone(),
        },
        AdmissionNoticeSettings {
            admin_email: ADMIN_EMAIL.to_string(),
            frontend_base_url: "https://app.talent.test".to_string(),
        },
    );

    Harness {
        matcher: Arc::new(matcher),
        desk: Arc::new(desk),
        profiles,
        companies,
        matches,
        appointments,
        notifications,
        scorer,
    }
}

impl Harness {
    pub(super) fn state(&self) -> AdmissionState {
        AdmissionState {
            matcher: self.matcher.clone(),
            appointments: self.desk.clone(),
        }
    }
}
