use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    CompanyId, CompanyListing, CompanyMatch, CompanyMatchId, MatchingProfile, ProfileId,
    ProfileStatus, RankedMatch, UserId,
};
use super::repository::{CompanyDirectory, CompanyMatchRepository, ProfileRepository};
use super::AdmissionError;
use crate::workflows::applications::TriageThresholds;
use crate::workflows::scoring::{MatchAssessment, ScoreProvider, ScoreReport, ScoringError};

pub const MAX_CANDIDATE_COMPANIES: usize = 50;

#[derive(Clone)]
pub struct MatcherPorts {
    pub profiles: Arc<dyn ProfileRepository>,
    pub companies: Arc<dyn CompanyDirectory>,
    pub matches: Arc<dyn CompanyMatchRepository>,
    pub scorer: Arc<dyn ScoreProvider>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchFailure {
    pub company_id: CompanyId,
    pub reason: String,
}

/// Summary of a matching pass over the candidate companies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRun {
    pub profile_id: ProfileId,
    pub matched: usize,
    pub reused: usize,
    pub failures: Vec<MatchFailure>,
}

pub struct CompanyMatcher {
    ports: MatcherPorts,
    thresholds: TriageThresholds,
    score_timeout: Duration,
}

impl CompanyMatcher {
    pub fn new(ports: MatcherPorts, thresholds: TriageThresholds, score_timeout: Duration) -> Self {
        Self {
            ports,
            thresholds,
            score_timeout,
        }
    }

    fn owned_profile(
        &self,
        id: &ProfileId,
        owner: &UserId,
    ) -> Result<MatchingProfile, AdmissionError> {
        let profile = self
            .ports
            .profiles
            .fetch(id)?
            .ok_or_else(|| AdmissionError::ProfileNotFound(id.clone()))?;
        if &profile.owner != owner {
            return Err(AdmissionError::Forbidden(owner.clone()));
        }
        Ok(profile)
    }

    /// Companies whose sector matches a target sector, or every public company
    /// when there are no targets or none match.
    fn candidate_companies(
        &self,
        profile: &MatchingProfile,
    ) -> Result<Vec<CompanyListing>, AdmissionError> {
        let public = self.ports.companies.public_companies(usize::MAX)?;
        let mut candidates: Vec<CompanyListing> = if profile.target_sectors.is_empty() {
            Vec::new()
        } else {
            public
                .iter()
                .filter(|company| company.in_sectors(&profile.target_sectors))
                .cloned()
                .collect()
        };
        if candidates.is_empty() {
            candidates = public;
        }
        candidates.truncate(MAX_CANDIDATE_COMPANIES);
        Ok(candidates)
    }

    async fn assess(
        &self,
        profile: &MatchingProfile,
        profile_text: &str,
        company: &CompanyListing,
    ) -> Result<MatchAssessment, ScoringError> {
        let request = company.score_request(profile, profile_text.to_string());
        let timeout = self.score_timeout;
        match tokio::time::timeout(timeout, self.ports.scorer.score(&request)).await {
            Ok(report) => report.and_then(ScoreReport::validate),
            Err(_) => Err(ScoringError::Timeout(timeout)),
        }
    }

    /// Score the profile against candidate companies and mark it active.
    pub async fn match_profile_with_companies(
        &self,
        profile_id: &ProfileId,
        owner: &UserId,
        refresh: bool,
    ) -> Result<MatchRun, AdmissionError> {
        let profile = self.owned_profile(profile_id, owner)?;
        let profile_text = profile
            .profile_text()
            .ok_or_else(|| AdmissionError::IncompleteProfile(profile_id.clone()))?;

        let companies = self.candidate_companies(&profile)?;
        if companies.is_empty() {
            return Err(AdmissionError::NoCompaniesAvailable);
        }

        let mut run = MatchRun {
            profile_id: profile_id.clone(),
            matched: 0,
            reused: 0,
            failures: Vec::new(),
        };

        for company in &companies {
            let existing = self.ports.matches.find(profile_id, &company.id)?;
            if existing.is_some() && !refresh {
                run.matched += 1;
                run.reused += 1;
                continue;
            }

            let assessment = match self.assess(&profile, &profile_text, company).await {
                Ok(assessment) => assessment,
                Err(err) => {
                    warn!(
                        profile_id = %profile_id,
                        company_id = %company.id,
                        error = %err,
                        "company match skipped"
                    );
                    run.failures.push(MatchFailure {
                        company_id: company.id.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let now = Utc::now();
            let company_match = match existing {
                Some(previous) => CompanyMatch {
                    percentage: assessment.percentage,
                    details: assessment,
                    company_name: company.name.clone(),
                    updated_at: now,
                    ..previous
                },
                None => CompanyMatch {
                    id: CompanyMatchId::new(),
                    profile_id: profile_id.clone(),
                    company_id: company.id.clone(),
                    company_name: company.name.clone(),
                    percentage: assessment.percentage,
                    details: assessment,
                    selected: false,
                    created_at: now,
                    updated_at: now,
                },
            };
            self.ports.matches.upsert(company_match)?;
            run.matched += 1;
        }

        self.ports
            .profiles
            .set_status(profile_id, ProfileStatus::Active)?;

        info!(
            profile_id = %profile_id,
            candidates = companies.len(),
            matched = run.matched,
            failed = run.failures.len(),
            "profile matched against companies"
        );
        Ok(run)
    }

    /// Matches ordered by score, best first, each tagged with its strength band.
    pub fn ranked_matches(
        &self,
        profile_id: &ProfileId,
        owner: &UserId,
        limit: usize,
    ) -> Result<Vec<RankedMatch>, AdmissionError> {
        self.owned_profile(profile_id, owner)?;
        let mut matches = self.ports.matches.list_for_profile(profile_id)?;
        matches.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
        matches.truncate(limit);

        Ok(matches
            .into_iter()
            .map(|company_match| RankedMatch {
                strength: self.thresholds.classify(company_match.percentage).into(),
                company_match,
            })
            .collect())
    }

    pub fn toggle_selection(
        &self,
        match_id: &CompanyMatchId,
        owner: &UserId,
        selected: bool,
    ) -> Result<CompanyMatch, AdmissionError> {
        let company_match = self
            .ports
            .matches
            .fetch(match_id)?
            .ok_or(AdmissionError::MatchNotFound(*match_id))?;
        self.owned_profile(&company_match.profile_id, owner)?;

        Ok(self.ports.matches.set_selected(match_id, selected)?)
    }
}
