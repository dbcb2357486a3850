use chrono::Duration;

use super::common::*;

use crate::marketplace::domain::ApplicationStatus;
use crate::marketplace::engine::{MatchingEngine, ScoringConfig};
use crate::marketplace::LenderResponse;

#[test]
fn perfect_match_scores_one_hundred() {
    let engine = MatchingEngine::default();
    let evaluation = engine
        .evaluate(
            &application(application_terms()),
            &offer(1, offer_terms()),
            &platform(),
            now(),
        )
        .expect("evaluation succeeds");

    assert_eq!(engine.score(&evaluation), Some(100));
}

#[test]
fn each_failed_criterion_costs_one_share() {
    let engine = MatchingEngine::default();
    let mut terms = application_terms();
    terms.credit_score = 600;
    assert_eq!(score_for(&engine, terms.clone()), Some(75));

    terms.annual_income = 40_000;
    assert_eq!(score_for(&engine, terms.clone()), Some(50));

    terms.loan_amount = 390_000;
    assert_eq!(score_for(&engine, terms.clone()), Some(25));

    terms.loan_amount = 40_000;
    terms.property_value = 40_000;
    assert_eq!(score_for(&engine, terms), Some(0));
}

#[test]
fn expired_offer_has_no_score() {
    let engine = MatchingEngine::default();
    let mut terms = offer_terms();
    terms.valid_until = now() - Duration::seconds(1);

    let evaluation = engine
        .evaluate(
            &application(application_terms()),
            &offer(1, terms),
            &platform(),
            now(),
        )
        .expect("evaluation succeeds");

    assert_eq!(engine.score(&evaluation), None);
}

#[test]
fn custom_share_is_applied() {
    let engine = MatchingEngine::new(ScoringConfig::new(20));
    let mut terms = application_terms();
    terms.credit_score = 600;

    assert_eq!(score_for(&engine, application_terms()), Some(80));
    assert_eq!(score_for(&engine, terms), Some(60));
}

#[test]
fn out_of_range_shares_fall_back_to_default() {
    assert_eq!(ScoringConfig::new(0).points_per_criterion(), 25);
    assert_eq!(ScoringConfig::new(26).points_per_criterion(), 25);
    assert_eq!(ScoringConfig::new(10).points_per_criterion(), 10);
    assert_eq!(ScoringConfig::default().points_per_criterion(), 25);
}

#[test]
fn snapshot_freezes_quote_and_starts_pending() {
    let engine = MatchingEngine::default();
    let application = application(application_terms());
    let snapshot = engine
        .snapshot_match(&application, &offer(3, offer_terms()), &platform(), now())
        .expect("evaluation succeeds")
        .expect("available offer produces a match");

    assert_eq!(snapshot.application_id, application.id);
    assert_eq!(snapshot.offer_id.0, 3);
    assert_eq!(snapshot.match_score, 100);
    assert_eq!(snapshot.estimated_payment, 1_432);
    assert_eq!(snapshot.total_interest, 215_520);
    assert_eq!(snapshot.lender_response, LenderResponse::Pending);
    assert_eq!(application.status, ApplicationStatus::Submitted);
}

#[test]
fn snapshot_skips_inactive_offers() {
    let mut inactive = offer(1, offer_terms());
    inactive.is_active = false;

    let snapshot = MatchingEngine::default()
        .snapshot_match(
            &application(application_terms()),
            &inactive,
            &platform(),
            now(),
        )
        .expect("evaluation succeeds");

    assert!(snapshot.is_none());
}

fn score_for(
    engine: &MatchingEngine,
    terms: crate::marketplace::domain::ApplicationTerms,
) -> Option<u8> {
    let evaluation = engine
        .evaluate(&application(terms), &offer(1, offer_terms()), &platform(), now())
        .expect("evaluation succeeds");
    engine.score(&evaluation)
}
