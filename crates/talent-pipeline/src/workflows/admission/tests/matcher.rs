use super::common::*;
use crate::workflows::admission::domain::{
    CompanyMatchId, MatchStrength, ProfileStatus, UserId,
};
use crate::workflows::admission::repository::{CompanyMatchRepository, ProfileRepository};
use crate::workflows::admission::{AdmissionError, MAX_CANDIDATE_COMPANIES};

fn seed_companies(harness: &Harness) {
    harness
        .companies
        .add(company("c-payline", "Payline", "Fintech & Payments"))
        .expect("company added");
    harness
        .companies
        .add(company("c-shopco", "ShopCo", "Retail"))
        .expect("company added");
    harness
        .companies
        .add(company("c-ledgerly", "Ledgerly", "FinTech"))
        .expect("company added");
}

fn profile_status(harness: &Harness) -> ProfileStatus {
    harness
        .profiles
        .fetch(&profile_id())
        .expect("fetch")
        .expect("profile present")
        .status
}

#[tokio::test]
async fn matching_targets_companies_in_the_chosen_sectors() {
    let harness = harness(CompanyScorer::default());
    seed_companies(&harness);

    let run = harness
        .matcher
        .match_profile_with_companies(&profile_id(), &owner(), false)
        .await
        .expect("matching succeeds");

    assert_eq!(run.matched, 2);
    assert!(run.failures.is_empty());
    let mut called = harness.scorer.calls();
    called.sort();
    assert_eq!(called, vec!["Ledgerly".to_string(), "Payline".to_string()]);
    assert_eq!(profile_status(&harness), ProfileStatus::Active);
}

#[tokio::test]
async fn unmatched_sectors_fall_back_to_every_public_company() {
    let harness = harness(CompanyScorer::default());
    seed_companies(&harness);
    let mut hidden = company("c-hidden", "Hidden", "Aerospace");
    hidden.public = false;
    harness.companies.add(hidden).expect("company added");

    let mut profile = profile();
    profile.target_sectors = vec!["aerospace".to_string()];
    harness.profiles.save(profile).expect("profile saved");

    let run = harness
        .matcher
        .match_profile_with_companies(&profile_id(), &owner(), false)
        .await
        .expect("matching succeeds");

    assert_eq!(run.matched, 3);
    assert!(!harness.scorer.calls().contains(&"Hidden".to_string()));
}

#[tokio::test]
async fn candidate_companies_are_capped() {
    let harness = harness(CompanyScorer::default());
    for index in 0..60 {
        harness
            .companies
            .add(company(
                &format!("c-{index:02}"),
                &format!("Company {index:02}"),
                "Fintech",
            ))
            .expect("company added");
    }

    let run = harness
        .matcher
        .match_profile_with_companies(&profile_id(), &owner(), false)
        .await
        .expect("matching succeeds");

    assert_eq!(run.matched, MAX_CANDIDATE_COMPANIES);
    assert_eq!(harness.scorer.calls().len(), MAX_CANDIDATE_COMPANIES);
}

#[tokio::test]
async fn existing_matches_are_reused_unless_refreshed() {
    let harness = harness(CompanyScorer::default().with("Payline", 70.0));
    seed_companies(&harness);

    harness
        .matcher
        .match_profile_with_companies(&profile_id(), &owner(), false)
        .await
        .expect("first run");
    let first = harness
        .matches
        .list_for_profile(&profile_id())
        .expect("matches");

    let cached = harness
        .matcher
        .match_profile_with_companies(&profile_id(), &owner(), false)
        .await
        .expect("cached run");
    assert_eq!(cached.reused, 2);
    assert_eq!(harness.scorer.calls().len(), 2);

    let refreshed = harness
        .matcher
        .match_profile_with_companies(&profile_id(), &owner(), true)
        .await
        .expect("refreshed run");
    assert_eq!(refreshed.reused, 0);
    assert_eq!(harness.scorer.calls().len(), 4);

    let after = harness
        .matches
        .list_for_profile(&profile_id())
        .expect("matches");
    assert_eq!(after.len(), 2, "one match per company");
    for entry in &after {
        let original = first
            .iter()
            .find(|candidate| candidate.company_id == entry.company_id)
            .expect("same company");
        assert_eq!(original.id, entry.id);
        assert_eq!(original.created_at, entry.created_at);
    }
}

#[tokio::test]
async fn scorer_failures_skip_only_that_company() {
    let harness = harness(CompanyScorer::default().failing_for("Ledgerly"));
    seed_companies(&harness);

    let run = harness
        .matcher
        .match_profile_with_companies(&profile_id(), &owner(), false)
        .await
        .expect("matching succeeds");

    assert_eq!(run.matched, 1);
    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].company_id.0, "c-ledgerly");
    assert_eq!(profile_status(&harness), ProfileStatus::Active);
}

#[tokio::test]
async fn empty_profiles_cannot_be_matched() {
    let harness = harness(CompanyScorer::default());
    seed_companies(&harness);
    let mut profile = profile();
    profile.skills.clear();
    profile.interests.clear();
    profile.cv_text = Some("   ".to_string());
    harness.profiles.save(profile).expect("profile saved");

    match harness
        .matcher
        .match_profile_with_companies(&profile_id(), &owner(), false)
        .await
    {
        Err(AdmissionError::IncompleteProfile(id)) => assert_eq!(id, profile_id()),
        other => panic!("expected incomplete profile, got {other:?}"),
    }
    assert_eq!(profile_status(&harness), ProfileStatus::Draft);
    assert!(harness.scorer.calls().is_empty());
}

#[tokio::test]
async fn matching_needs_public_companies() {
    let harness = harness(CompanyScorer::default());

    match harness
        .matcher
        .match_profile_with_companies(&profile_id(), &owner(), false)
        .await
    {
        Err(AdmissionError::NoCompaniesAvailable) => {}
        other => panic!("expected no companies, got {other:?}"),
    }
}

#[tokio::test]
async fn profiles_are_private_to_their_owner() {
    let harness = harness(CompanyScorer::default());
    seed_companies(&harness);

    match harness
        .matcher
        .match_profile_with_companies(&profile_id(), &UserId("mallory".to_string()), false)
        .await
    {
        Err(AdmissionError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
}

#[tokio::test]
async fn ranked_matches_carry_threshold_bands() {
    let harness = harness(
        CompanyScorer::default()
            .with("Payline", 80.0)
            .with("ShopCo", 59.5)
            .with("Ledgerly", 60.0),
    );
    seed_companies(&harness);
    let mut profile = profile();
    profile.target_sectors.clear();
    harness.profiles.save(profile).expect("profile saved");

    harness
        .matcher
        .match_profile_with_companies(&profile_id(), &owner(), false)
        .await
        .expect("matching succeeds");

    let ranked = harness
        .matcher
        .ranked_matches(&profile_id(), &owner(), 10)
        .expect("ranking");
    let summary: Vec<_> = ranked
        .iter()
        .map(|entry| (entry.company_match.company_name.as_str(), entry.strength))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Payline", MatchStrength::Strong),
            ("Ledgerly", MatchStrength::Possible),
            ("ShopCo", MatchStrength::Weak),
        ]
    );

    let top = harness
        .matcher
        .ranked_matches(&profile_id(), &owner(), 1)
        .expect("ranking");
    assert_eq!(top.len(), 1);
}

#[tokio::test]
async fn only_the_owner_toggles_a_selection() {
    let harness = harness(CompanyScorer::default());
    seed_companies(&harness);
    harness
        .matcher
        .match_profile_with_companies(&profile_id(), &owner(), false)
        .await
        .expect("matching succeeds");
    let target = harness
        .matches
        .list_for_profile(&profile_id())
        .expect("matches")
        .remove(0);

    let selected = harness
        .matcher
        .toggle_selection(&target.id, &owner(), true)
        .expect("toggle");
    assert!(selected.selected);

    match harness
        .matcher
        .toggle_selection(&target.id, &UserId("mallory".to_string()), false)
    {
        Err(AdmissionError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
    assert!(
        harness
            .matches
            .fetch(&target.id)
            .expect("fetch")
            .expect("present")
            .selected
    );

    match harness
        .matcher
        .toggle_selection(&CompanyMatchId::new(), &owner(), true)
    {
        Err(AdmissionError::MatchNotFound(_)) => {}
        other => panic!("expected missing match, got {other:?}"),
    }
}
