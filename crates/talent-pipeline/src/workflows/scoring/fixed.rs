use std::collections::HashMap;

use async_trait::async_trait;

use super::{ScoreProvider, ScoreReport, ScoreRequest, ScoringError};

/// Deterministic scorer answering a configured percentage per target title.
///
/// Backs the demo command and local runs where the external scorer is not installed.
#[derive(Debug, Clone, Default)]
pub struct StaticScoreProvider {
    default: Option<f64>,
    by_title: HashMap<String, f64>,
}

impl StaticScoreProvider {
    pub fn new(default: f64) -> Self {
        Self {
            default: Some(default),
            by_title: HashMap::new(),
        }
    }

    /// Scorer that only knows the titles registered with `with_score`.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn with_score(mut self, title: impl Into<String>, percentage: f64) -> Self {
        self.by_title.insert(title.into(), percentage);
        self
    }
}

#[async_trait]
impl ScoreProvider for StaticScoreProvider {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreReport, ScoringError> {
        let percentage = self
            .by_title
            .get(&request.title)
            .copied()
            .or(self.default)
            .ok_or_else(|| ScoringError::Unavailable(format!("no score for '{}'", request.title)))?;

        Ok(ScoreReport {
            overall_match_percentage: percentage,
            criteria_scores: Vec::new(),
            strengths: request.skills.iter().take(3).cloned().collect(),
            gaps: Vec::new(),
            recommendation: format!("{percentage:.0}% match for {}", request.title),
        })
    }
}
