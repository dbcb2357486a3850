use chrono::Duration;

use super::common::*;

use crate::marketplace::engine::{FactorKind, MatchingEngine};

#[test]
fn qualifying_pair_passes_every_factor() {
    let engine = MatchingEngine::default();
    let result = engine
        .evaluate(
            &application(application_terms()),
            &offer(1, offer_terms()),
            &platform(),
            now(),
        )
        .expect("evaluation succeeds");

    assert!(result.eligible);
    assert!(result.failed_factors.is_empty());
    assert_eq!(result.factors.len(), FactorKind::ordered().len());
    assert_eq!(result.estimated_payment, 1_432);
    assert_eq!(result.total_interest, 215_520);
    assert_eq!(result.total_closing_costs, 11_000);
    assert_eq!(result.platform_fee, 3_000);
    assert_eq!(result.loan_to_value_bps, 7_500);
    assert_eq!(result.debt_to_income_bps, 2_000);
}

#[test]
fn failures_accumulate_without_short_circuit() {
    let mut terms = application_terms();
    terms.credit_score = 600;
    terms.annual_income = 50_000;

    let result = MatchingEngine::default()
        .evaluate(
            &application(terms),
            &offer(1, offer_terms()),
            &platform(),
            now(),
        )
        .expect("evaluation succeeds");

    assert!(!result.eligible);
    assert_eq!(
        result.failed_factors,
        vec![FactorKind::CreditScore, FactorKind::Income]
    );
    assert_eq!(result.satisfied_criteria(), 2);
    assert_eq!(result.estimated_payment, 1_432, "pricing is always reported");
}

#[test]
fn expired_offer_fails_the_gate() {
    let mut terms = offer_terms();
    terms.valid_until = now() - Duration::days(1);

    let result = MatchingEngine::default()
        .evaluate(
            &application(application_terms()),
            &offer(1, terms),
            &platform(),
            now(),
        )
        .expect("evaluation succeeds");

    assert!(!result.passed(FactorKind::OfferExpiredOrInactive));
    assert_eq!(result.satisfied_criteria(), 4);
    let check = &result.factors[0];
    assert!(check.notes.contains("expired"));
}

#[test]
fn offer_valid_until_now_is_still_available() {
    let mut terms = offer_terms();
    terms.valid_until = now();

    let result = MatchingEngine::default()
        .evaluate(
            &application(application_terms()),
            &offer(1, terms),
            &platform(),
            now(),
        )
        .expect("evaluation succeeds");

    assert!(result.passed(FactorKind::OfferExpiredOrInactive));
}

#[test]
fn inactive_offer_fails_the_gate() {
    let mut inactive = offer(1, offer_terms());
    inactive.is_active = false;

    let result = MatchingEngine::default()
        .evaluate(
            &application(application_terms()),
            &inactive,
            &platform(),
            now(),
        )
        .expect("evaluation succeeds");

    assert!(!result.eligible);
    assert_eq!(
        result.failed_factors,
        vec![FactorKind::OfferExpiredOrInactive]
    );
    assert_eq!(result.factors[0].notes, "offer is inactive");
}

#[test]
fn loan_amount_bounds_are_inclusive() {
    for loan_amount in [50_000, 360_000] {
        let mut terms = application_terms();
        terms.loan_amount = loan_amount;
        terms.property_value = 1_000_000;
        let result = MatchingEngine::default()
            .evaluate(&application(terms), &offer(1, offer_terms()), &platform(), now())
            .expect("evaluation succeeds");
        assert!(result.passed(FactorKind::LoanAmount), "amount {loan_amount}");
    }

    let mut terms = application_terms();
    terms.loan_amount = 500_001;
    terms.property_value = 1_000_000;
    let result = MatchingEngine::default()
        .evaluate(&application(terms), &offer(1, offer_terms()), &platform(), now())
        .expect("evaluation succeeds");
    assert!(!result.passed(FactorKind::LoanAmount));
}

#[test]
fn ltv_above_offer_cap_fails() {
    let mut terms = application_terms();
    terms.loan_amount = 370_000;

    let result = MatchingEngine::default()
        .evaluate(&application(terms), &offer(1, offer_terms()), &platform(), now())
        .expect("evaluation succeeds");

    assert_eq!(result.loan_to_value_bps, 9_250);
    assert_eq!(result.failed_factors, vec![FactorKind::LoanToValue]);
}

#[test]
fn zero_property_value_saturates_ltv() {
    let mut terms = application_terms();
    terms.property_value = 0;

    let result = MatchingEngine::default()
        .evaluate(&application(terms), &offer(1, offer_terms()), &platform(), now())
        .expect("evaluation succeeds");

    assert_eq!(result.loan_to_value_bps, 10_000);
    assert!(!result.passed(FactorKind::LoanToValue));
}

#[test]
fn preferred_term_overrides_offer_term() {
    let mut terms = application_terms();
    terms.preferred_term_months = Some(180);

    let result = MatchingEngine::default()
        .evaluate(&application(terms), &offer(1, offer_terms()), &platform(), now())
        .expect("evaluation succeeds");

    assert_eq!(result.estimated_payment, 2_219);
    assert_eq!(result.total_interest, 99_420);
}
