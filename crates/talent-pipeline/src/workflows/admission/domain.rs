use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::applications::ScoreBand;
use crate::workflows::scoring::{MatchAssessment, ScoreRequest};

pub const DEFAULT_TIMEZONE: &str = "Europe/Paris";

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(UserId);
string_id!(ProfileId);
string_id!(CompanyId);
uuid_id!(CompanyMatchId);
uuid_id!(AppointmentId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileStatus {
    Draft,
    Active,
    Completed,
    Archived,
}

impl ProfileStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ProfileStatus::Draft => "DRAFT",
            ProfileStatus::Active => "ACTIVE",
            ProfileStatus::Completed => "COMPLETED",
            ProfileStatus::Archived => "ARCHIVED",
        }
    }
}

/// Candidate-owned description used to find companies worth meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingProfile {
    pub id: ProfileId,
    pub owner: UserId,
    pub owner_name: String,
    pub owner_email: String,
    pub title: String,
    pub cv_text: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub target_sectors: Vec<String>,
    pub status: ProfileStatus,
}

impl MatchingProfile {
    /// CV text when present, otherwise a summary of title, skills and interests.
    pub fn profile_text(&self) -> Option<String> {
        if let Some(cv) = self.cv_text.as_deref().map(str::trim) {
            if !cv.is_empty() {
                return Some(cv.to_string());
            }
        }
        if self.skills.is_empty() && self.interests.is_empty() {
            return None;
        }

        let mut text = format!("Title: {}\n", self.title);
        if !self.skills.is_empty() {
            text.push_str(&format!("Skills: {}\n", self.skills.join(", ")));
        }
        if !self.interests.is_empty() {
            text.push_str(&format!("Interests: {}\n", self.interests.join(", ")));
        }
        Some(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyListing {
    pub id: CompanyId,
    pub name: String,
    pub sector: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    #[serde(default)]
    pub open_positions: Vec<String>,
    pub public: bool,
}

impl CompanyListing {
    /// Case-insensitive containment in either direction against any target sector.
    pub fn in_sectors(&self, targets: &[String]) -> bool {
        let Some(sector) = self.sector.as_deref().map(str::to_lowercase) else {
            return false;
        };
        targets.iter().any(|target| {
            let target = target.trim().to_lowercase();
            !target.is_empty() && (sector.contains(&target) || target.contains(&sector))
        })
    }

    pub fn contact(&self) -> Option<&str> {
        self.contact_email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    /// Describe the company as if it were a single opening so the job scorer can rate it.
    pub fn score_request(&self, profile: &MatchingProfile, profile_text: String) -> ScoreRequest {
        let sector = self.sector.as_deref().unwrap_or("Unspecified");
        let about = self
            .description
            .as_deref()
            .or(self.city.as_deref())
            .unwrap_or(&self.name);
        let positions = if self.open_positions.is_empty() {
            "none published".to_string()
        } else {
            self.open_positions.join(", ")
        };

        ScoreRequest {
            profile_text,
            title: self.name.clone(),
            description: format!(
                "Company: {}\nSector: {sector}\nAbout: {about}\nOpen positions: {positions}",
                self.name
            ),
            requirements: (!profile.target_sectors.is_empty())
                .then(|| format!("Target sectors: {}", profile.target_sectors.join(", "))),
            skills: profile.skills.clone(),
            experience_years: None,
        }
    }
}

/// Score of one profile against one company. At most one per pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyMatch {
    pub id: CompanyMatchId,
    pub profile_id: ProfileId,
    pub company_id: CompanyId,
    pub company_name: String,
    pub percentage: f32,
    pub details: MatchAssessment,
    pub selected: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrength {
    Strong,
    Possible,
    Weak,
}

impl From<ScoreBand> for MatchStrength {
    fn from(band: ScoreBand) -> Self {
        match band {
            ScoreBand::High => MatchStrength::Strong,
            ScoreBand::Middle => MatchStrength::Possible,
            ScoreBand::Low => MatchStrength::Weak,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMatch {
    #[serde(flatten)]
    pub company_match: CompanyMatch,
    pub strength: MatchStrength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Rejected => "REJECTED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::Completed => "COMPLETED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Rejected | AppointmentStatus::Cancelled | AppointmentStatus::Completed
        )
    }

    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed | Rejected | Cancelled | Completed)
                | (Confirmed, Completed | Cancelled)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Meeting requested by a candidate with a matched company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub profile_id: ProfileId,
    pub company_id: CompanyId,
    pub owner: UserId,
    pub candidate_name: String,
    pub candidate_email: String,
    pub company_name: String,
    pub company_email: Option<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub timezone: String,
    pub message: Option<String>,
    pub company_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub status: AppointmentStatus,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Start instant, interpreting date and time in the appointment's own zone.
    /// Local times skipped by a DST change have no start.
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        let zone: Tz = self.timezone.parse().ok()?;
        zone.from_local_datetime(&self.date.and_time(self.time))
            .earliest()
            .map(|start| start.with_timezone(&Utc))
    }
}

/// Candidate input for a new appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub profile_id: ProfileId,
    pub company_id: CompanyId,
    pub date: NaiveDate,
    /// Local start time formatted `HH:MM`.
    pub time: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Requested change to an appointment, as sent by the company or an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    pub status: AppointmentStatus,
    #[serde(default)]
    pub company_notes: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}
