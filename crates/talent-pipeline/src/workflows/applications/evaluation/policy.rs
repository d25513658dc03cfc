use serde::{Deserialize, Serialize};

use super::config::TriageThresholds;

/// Band a compatibility score falls into relative to the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    High,
    Middle,
    Low,
}

impl ScoreBand {
    pub const fn label(self) -> &'static str {
        match self {
            ScoreBand::High => "high",
            ScoreBand::Middle => "middle",
            ScoreBand::Low => "low",
        }
    }
}

/// Decision taken by the threshold engine for an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageDecision {
    AutoSent,
    PendingReview,
    Rejected,
}

impl TriageDecision {
    pub fn summary(&self) -> &'static str {
        match self {
            TriageDecision::AutoSent => "forwarded to the client automatically",
            TriageDecision::PendingReview => "queued for manual review",
            TriageDecision::Rejected => "rejected for insufficient match score",
        }
    }
}

impl From<ScoreBand> for TriageDecision {
    fn from(band: ScoreBand) -> Self {
        match band {
            ScoreBand::High => TriageDecision::AutoSent,
            ScoreBand::Middle => TriageDecision::PendingReview,
            ScoreBand::Low => TriageDecision::Rejected,
        }
    }
}

impl TriageThresholds {
    /// Classify a score; a score equal to a threshold belongs to the higher band.
    pub fn classify(&self, score: f32) -> ScoreBand {
        if score >= f32::from(self.auto_send()) {
            ScoreBand::High
        } else if score >= f32::from(self.manual_review()) {
            ScoreBand::Middle
        } else {
            ScoreBand::Low
        }
    }
}
