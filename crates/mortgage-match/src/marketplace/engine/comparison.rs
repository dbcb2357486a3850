use serde::{Deserialize, Serialize};

use super::super::domain::{MortgageApplication, MortgageOffer, OfferId};
use super::amortization::{closing_costs, compute_payment, AmortizationError};

/// Cost of one offer for a given application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferCost {
    pub offer_id: OfferId,
    pub monthly_payment: u64,
    pub total_interest: u64,
    pub closing_costs: u64,
}

impl OfferCost {
    pub fn for_application(
        offer: &MortgageOffer,
        application: &MortgageApplication,
    ) -> Result<Self, AmortizationError> {
        let loan_amount = application.terms.loan_amount;
        let quote = compute_payment(
            loan_amount,
            offer.terms.interest_rate_bps,
            application.term_for(offer),
        )?;
        let closing_costs = closing_costs(
            loan_amount,
            offer.terms.points_bps,
            offer.terms.origination_fee_bps,
            offer.terms.closing_cost_estimate,
        )?;

        Ok(Self {
            offer_id: offer.id,
            monthly_payment: quote.monthly_payment,
            total_interest: quote.total_interest,
            closing_costs,
        })
    }
}

/// Side-by-side figures. Differences are `offer2 - offer1`; ranking is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferComparison {
    pub offer1: OfferCost,
    pub offer2: OfferCost,
    pub payment_difference: i64,
    pub interest_difference: i64,
    pub closing_cost_difference: i64,
}

pub fn compare(
    offer1: &MortgageOffer,
    offer2: &MortgageOffer,
    application: &MortgageApplication,
) -> Result<OfferComparison, AmortizationError> {
    let first = OfferCost::for_application(offer1, application)?;
    let second = OfferCost::for_application(offer2, application)?;

    Ok(OfferComparison {
        offer1: first,
        offer2: second,
        payment_difference: signed_delta(first.monthly_payment, second.monthly_payment),
        interest_difference: signed_delta(first.total_interest, second.total_interest),
        closing_cost_difference: signed_delta(first.closing_costs, second.closing_costs),
    })
}

fn signed_delta(first: u64, second: u64) -> i64 {
    let delta = i128::from(second) - i128::from(first);
    delta.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
