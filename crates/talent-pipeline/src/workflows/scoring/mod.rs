//! Boundary with the external compatibility scorer.
//!
//! The scorer is treated as a black box: it receives a profile text and a job (or
//! company) description and answers with a percentage plus an explanation. Its raw
//! output is validated here into a typed [`MatchAssessment`] before anything else in
//! the crate sees it.

mod fixed;
mod process;

pub use fixed::StaticScoreProvider;
pub use process::ProcessScoreProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Inputs handed to the scorer for a single candidate/target pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub profile_text: String,
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub skills: Vec<String>,
    pub experience_years: Option<u8>,
}

/// Raw payload as emitted by the scorer process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub overall_match_percentage: f64,
    #[serde(default)]
    pub criteria_scores: Vec<RawCriterionScore>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCriterionScore {
    pub criterion: String,
    pub score: f64,
    #[serde(default)]
    pub explanation: String,
}

impl ScoreReport {
    /// Validate the untyped scorer output into an assessment the engines can trust.
    pub fn validate(self) -> Result<MatchAssessment, ScoringError> {
        let percentage = self.overall_match_percentage;
        if !percentage.is_finite() || !(0.0..=100.0).contains(&percentage) {
            return Err(ScoringError::InvalidReport(format!(
                "overall percentage {percentage} outside 0-100"
            )));
        }

        let mut criteria = Vec::with_capacity(self.criteria_scores.len());
        for raw in self.criteria_scores {
            if raw.criterion.trim().is_empty() {
                return Err(ScoringError::InvalidReport(
                    "criterion name missing".to_string(),
                ));
            }
            if !raw.score.is_finite() {
                return Err(ScoringError::InvalidReport(format!(
                    "criterion '{}' has a non-numeric score",
                    raw.criterion
                )));
            }
            criteria.push(CriterionScore {
                criterion: raw.criterion,
                score: raw.score as f32,
                explanation: raw.explanation,
            });
        }

        Ok(MatchAssessment {
            percentage: percentage as f32,
            criteria,
            strengths: clean_lines(self.strengths),
            gaps: clean_lines(self.gaps),
            recommendation: self.recommendation.trim().to_string(),
        })
    }
}

fn clean_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// One scored criterion, in the order the scorer reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: String,
    pub score: f32,
    pub explanation: String,
}

/// Validated match details shared by application triage and company matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAssessment {
    pub percentage: f32,
    pub criteria: Vec<CriterionScore>,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub recommendation: String,
}

impl MatchAssessment {
    /// Assessment carrying only a percentage, used where no explanation is available.
    pub fn bare(percentage: f32) -> Self {
        Self {
            percentage,
            criteria: Vec::new(),
            strengths: Vec::new(),
            gaps: Vec::new(),
            recommendation: String::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("scorer could not be started: {0}")]
    Spawn(String),
    #[error("scorer exited with status {code:?}: {stderr}")]
    Process { code: Option<i32>, stderr: String },
    #[error("scorer did not answer within {0:?}")]
    Timeout(std::time::Duration),
    #[error("scorer output could not be parsed: {0}")]
    Parse(String),
    #[error("scorer output rejected: {0}")]
    InvalidReport(String),
    #[error("scorer unavailable: {0}")]
    Unavailable(String),
}

impl ScoringError {
    /// Failures worth retrying with backoff; malformed output will not improve on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScoringError::Spawn(_)
                | ScoringError::Timeout(_)
                | ScoringError::Process { .. }
                | ScoringError::Unavailable(_)
        )
    }
}

/// Out-of-process compatibility scorer.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreReport, ScoringError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(percentage: f64) -> ScoreReport {
        ScoreReport {
            overall_match_percentage: percentage,
            criteria_scores: vec![RawCriterionScore {
                criterion: "Technical skills".to_string(),
                score: 82.0,
                explanation: "Rust and SQL match".to_string(),
            }],
            strengths: vec!["  Strong backend background ".to_string(), String::new()],
            gaps: vec!["No team lead experience".to_string()],
            recommendation: " Interview ".to_string(),
        }
    }

    #[test]
    fn validate_normalizes_lists_and_recommendation() {
        let assessment = report(85.5).validate().expect("valid report");
        assert_eq!(assessment.percentage, 85.5);
        assert_eq!(assessment.strengths, vec!["Strong backend background"]);
        assert_eq!(assessment.recommendation, "Interview");
        assert_eq!(assessment.criteria[0].criterion, "Technical skills");
    }

    #[test]
    fn validate_rejects_out_of_range_percentages() {
        for value in [-1.0, 100.5, f64::NAN] {
            match report(value).validate() {
                Err(ScoringError::InvalidReport(_)) => {}
                other => panic!("expected invalid report for {value}, got {other:?}"),
            }
        }
    }

    #[test]
    fn parses_scorer_json_with_missing_optional_fields() {
        let payload = r#"{"overall_match_percentage": 64}"#;
        let report: ScoreReport = serde_json::from_str(payload).expect("parses");
        let assessment = report.validate().expect("valid");
        assert_eq!(assessment.percentage, 64.0);
        assert!(assessment.criteria.is_empty());
        assert!(assessment.recommendation.is_empty());
    }
}
