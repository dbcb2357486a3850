use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::{MortgageApplication, MortgageOffer, PlatformParameters};
use super::amortization::{
    closing_costs, compute_payment, loan_to_value_bps, mul_bps, AmortizationError,
};

/// Criteria checked for every (application, offer) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    OfferExpiredOrInactive,
    LoanAmount,
    CreditScore,
    Income,
    LoanToValue,
}

impl FactorKind {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::OfferExpiredOrInactive,
            Self::LoanAmount,
            Self::CreditScore,
            Self::Income,
            Self::LoanToValue,
        ]
    }

    /// Hard gates decide whether a match exists at all; they carry no score weight.
    pub const fn is_gate(self) -> bool {
        matches!(self, Self::OfferExpiredOrInactive)
    }
}

/// Outcome of a single criterion with a human readable trail for audits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorCheck {
    pub factor: FactorKind,
    pub passed: bool,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub eligible: bool,
    pub estimated_payment: u64,
    pub total_interest: u64,
    pub total_closing_costs: u64,
    pub platform_fee: u64,
    pub loan_to_value_bps: u32,
    pub debt_to_income_bps: u32,
    pub factors: Vec<FactorCheck>,
    pub failed_factors: Vec<FactorKind>,
}

impl EligibilityResult {
    pub fn passed(&self, factor: FactorKind) -> bool {
        !self.failed_factors.contains(&factor)
    }

    /// Number of weighted (non-gate) criteria satisfied.
    pub fn satisfied_criteria(&self) -> usize {
        self.factors
            .iter()
            .filter(|check| !check.factor.is_gate() && check.passed)
            .count()
    }
}

/// Evaluates every criterion independently and prices the loan regardless of the outcome.
pub fn evaluate(
    application: &MortgageApplication,
    offer: &MortgageOffer,
    platform: &PlatformParameters,
    now: DateTime<Utc>,
) -> Result<EligibilityResult, AmortizationError> {
    let terms = &application.terms;
    let offer_terms = &offer.terms;

    let loan_to_value = loan_to_value_bps(terms.loan_amount, terms.property_value);
    let mut factors = Vec::with_capacity(FactorKind::ordered().len());

    let available = offer.is_available(now);
    factors.push(FactorCheck {
        factor: FactorKind::OfferExpiredOrInactive,
        passed: available,
        notes: if !offer.is_active {
            "offer is inactive".to_string()
        } else if available {
            format!("offer valid until {}", offer_terms.valid_until)
        } else {
            format!("offer expired at {}", offer_terms.valid_until)
        },
    });

    let amount_within = (offer_terms.min_loan_amount..=offer_terms.max_loan_amount)
        .contains(&terms.loan_amount);
    factors.push(FactorCheck {
        factor: FactorKind::LoanAmount,
        passed: amount_within,
        notes: format!(
            "loan amount {} against range {}..={}",
            terms.loan_amount, offer_terms.min_loan_amount, offer_terms.max_loan_amount
        ),
    });

    let credit_ok = terms.credit_score >= offer_terms.min_credit_score;
    factors.push(FactorCheck {
        factor: FactorKind::CreditScore,
        passed: credit_ok,
        notes: format!(
            "credit score {} against minimum {}",
            terms.credit_score, offer_terms.min_credit_score
        ),
    });

    let income_ok = terms.annual_income >= offer_terms.min_income;
    factors.push(FactorCheck {
        factor: FactorKind::Income,
        passed: income_ok,
        notes: format!(
            "annual income {} against minimum {}",
            terms.annual_income, offer_terms.min_income
        ),
    });

    let ltv_ok = loan_to_value <= offer_terms.max_ltv_bps;
    factors.push(FactorCheck {
        factor: FactorKind::LoanToValue,
        passed: ltv_ok,
        notes: format!(
            "loan-to-value {loan_to_value} bps against maximum {} bps",
            offer_terms.max_ltv_bps
        ),
    });

    let quote = compute_payment(
        terms.loan_amount,
        offer_terms.interest_rate_bps,
        application.term_for(offer),
    )?;
    let total_closing_costs = closing_costs(
        terms.loan_amount,
        offer_terms.points_bps,
        offer_terms.origination_fee_bps,
        offer_terms.closing_cost_estimate,
    )?;
    let platform_fee = mul_bps(terms.loan_amount, u64::from(platform.platform_fee_rate_bps))?;

    let failed_factors: Vec<FactorKind> = factors
        .iter()
        .filter(|check| !check.passed)
        .map(|check| check.factor)
        .collect();

    Ok(EligibilityResult {
        eligible: failed_factors.is_empty(),
        estimated_payment: quote.monthly_payment,
        total_interest: quote.total_interest,
        total_closing_costs,
        platform_fee,
        loan_to_value_bps: loan_to_value,
        debt_to_income_bps: application.debt_to_income_bps,
        factors,
        failed_factors,
    })
}
