//! Fixed-payment amortization in exact decimal arithmetic.
//!
//! Money is carried as whole units and rates as basis points. Intermediate values use
//! `rust_decimal` so identical inputs always produce identical integer outputs.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::super::domain::BASIS_POINTS;

const MONTHS_PER_YEAR: u32 = 12;

/// Monthly payment and lifetime interest for a fully amortizing loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentQuote {
    pub monthly_payment: u64,
    pub total_interest: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmortizationError {
    #[error("principal must be greater than zero")]
    InvalidPrincipal,
    #[error("loan term must be at least one month")]
    InvalidTerm,
    #[error("amortization figures exceed the representable range")]
    Overflow,
}

/// Standard annuity payment: `P * r / (1 - (1 + r)^-n)`, rounded half-up to whole units.
pub fn compute_payment(
    principal: u64,
    annual_rate_bps: u32,
    term_months: u32,
) -> Result<PaymentQuote, AmortizationError> {
    if term_months == 0 {
        return Err(AmortizationError::InvalidTerm);
    }
    if principal == 0 {
        return Err(AmortizationError::InvalidPrincipal);
    }

    let amount = Decimal::from(principal);

    if annual_rate_bps == 0 {
        let payment = amount
            .checked_div(Decimal::from(term_months))
            .ok_or(AmortizationError::Overflow)?;
        return Ok(PaymentQuote {
            monthly_payment: round_units(payment)?,
            total_interest: 0,
        });
    }

    let monthly_rate = Decimal::from(annual_rate_bps)
        .checked_div(Decimal::from(BASIS_POINTS * MONTHS_PER_YEAR))
        .ok_or(AmortizationError::Overflow)?;
    let growth = checked_powu(Decimal::ONE + monthly_rate, term_months)
        .ok_or(AmortizationError::Overflow)?;

    // Multiplying through by (1 + r)^n keeps the reciprocal out of the computation.
    let payment = amount
        .checked_mul(monthly_rate)
        .and_then(|value| value.checked_mul(growth))
        .and_then(|value| value.checked_div(growth - Decimal::ONE))
        .ok_or(AmortizationError::Overflow)?;
    let monthly_payment = round_units(payment)?;

    let total_paid = monthly_payment
        .checked_mul(u64::from(term_months))
        .ok_or(AmortizationError::Overflow)?;

    Ok(PaymentQuote {
        monthly_payment,
        total_interest: total_paid.saturating_sub(principal),
    })
}

/// Up-front cost: `loan * (points + origination) / 10000 + estimate`.
pub fn closing_costs(
    loan_amount: u64,
    points_bps: u32,
    origination_fee_bps: u32,
    closing_cost_estimate: u64,
) -> Result<u64, AmortizationError> {
    let fee_bps = u64::from(points_bps) + u64::from(origination_fee_bps);
    let fees = mul_bps(loan_amount, fee_bps)?;
    fees.checked_add(closing_cost_estimate)
        .ok_or(AmortizationError::Overflow)
}

/// `amount * bps / 10000`, rounded half-up.
pub fn mul_bps(amount: u64, bps: u64) -> Result<u64, AmortizationError> {
    let scaled = u128::from(amount) * u128::from(bps) + u128::from(BASIS_POINTS / 2);
    u64::try_from(scaled / u128::from(BASIS_POINTS)).map_err(|_| AmortizationError::Overflow)
}

/// Loan-to-value in bps. A zero property value saturates to 100%.
pub fn loan_to_value_bps(loan_amount: u64, property_value: u64) -> u32 {
    saturating_ratio_bps(loan_amount, property_value)
}

/// Debt-to-income in bps against monthly income. Zero monthly income saturates to 100%.
pub fn debt_to_income_bps(monthly_debt: u64, annual_income: u64) -> u32 {
    saturating_ratio_bps(monthly_debt, annual_income / u64::from(MONTHS_PER_YEAR))
}

fn saturating_ratio_bps(numerator: u64, denominator: u64) -> u32 {
    if denominator == 0 {
        return BASIS_POINTS;
    }
    let ratio = u128::from(numerator) * u128::from(BASIS_POINTS) / u128::from(denominator);
    u32::try_from(ratio).unwrap_or(u32::MAX)
}

fn round_units(value: Decimal) -> Result<u64, AmortizationError> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or(AmortizationError::Overflow)
}

fn checked_powu(base: Decimal, mut exponent: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    let mut factor = base;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result.checked_mul(factor)?;
        }
        exponent >>= 1;
        if exponent > 0 {
            factor = factor.checked_mul(factor)?;
        }
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn thirty_year_quote_matches_reference_figures() {
        let quote = compute_payment(300_000, 400, 360).expect("quote");
        assert_eq!(quote.monthly_payment, 1432);
        assert_eq!(quote.total_interest, 215_520);

        let quote = compute_payment(300_000, 550, 360).expect("quote");
        assert_eq!(quote.monthly_payment, 1703);
        assert_eq!(quote.total_interest, 1703 * 360 - 300_000);
    }

    #[test]
    fn zero_rate_spreads_principal_evenly() {
        let quote = compute_payment(120_000, 0, 360).expect("quote");
        assert_eq!(quote.monthly_payment, 333);
        assert_eq!(quote.total_interest, 0);

        // 62.5 rounds half-up
        assert_eq!(compute_payment(500, 0, 8).expect("quote").monthly_payment, 63);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        assert_eq!(
            compute_payment(300_000, 400, 0),
            Err(AmortizationError::InvalidTerm)
        );
        assert_eq!(
            compute_payment(0, 400, 360),
            Err(AmortizationError::InvalidPrincipal)
        );
        assert_eq!(
            compute_payment(u64::MAX, u32::MAX, 360),
            Err(AmortizationError::Overflow)
        );
    }

    #[test]
    fn payment_is_monotonic_in_rate_principal_and_term() {
        let base = compute_payment(250_000, 500, 360).expect("quote").monthly_payment;

        let mut previous = 0;
        for rate in [0, 1, 125, 350, 500, 775, 1200] {
            let payment = compute_payment(250_000, rate, 360).expect("quote").monthly_payment;
            assert!(payment >= previous, "rate {rate} lowered the payment");
            previous = payment;
        }

        assert!(compute_payment(250_001, 500, 360).expect("quote").monthly_payment >= base);
        assert!(compute_payment(500_000, 500, 360).expect("quote").monthly_payment > base);

        let mut previous = u64::MAX;
        for term in [12, 60, 120, 180, 240, 360, 480] {
            let payment = compute_payment(250_000, 500, term).expect("quote").monthly_payment;
            assert!(payment <= previous, "term {term} raised the payment");
            previous = payment;
        }
    }

    #[test]
    fn identical_inputs_yield_identical_quotes() {
        let first = compute_payment(412_345, 637, 300).expect("quote");
        for _ in 0..5 {
            assert_eq!(compute_payment(412_345, 637, 300).expect("quote"), first);
        }
    }

    #[test]
    fn single_month_term_repays_principal_plus_one_month_interest() {
        // 12000 at 12% for one month: 12000 * 1.01 = 12120
        let quote = compute_payment(12_000, 1200, 1).expect("quote");
        assert_eq!(quote.monthly_payment, 12_120);
        assert_eq!(quote.total_interest, 120);
    }

    #[test]
    fn exponentiation_is_exact_for_small_powers() {
        assert_eq!(checked_powu(dec!(1.01), 2), Some(dec!(1.0201)));
        assert_eq!(checked_powu(dec!(1.5), 0), Some(Decimal::ONE));
        assert_eq!(checked_powu(dec!(2), 10), Some(dec!(1024)));
    }

    #[test]
    fn closing_costs_combine_fees_and_estimate() {
        assert_eq!(closing_costs(300_000, 100, 100, 5_000), Ok(11_000));
        assert_eq!(closing_costs(300_000, 0, 0, 5_000), Ok(5_000));
        // 1% of 12345 = 123.45 rounds to 123; 1.5% = 185.175 rounds to 185
        assert_eq!(closing_costs(12_345, 100, 0, 0), Ok(123));
        assert_eq!(closing_costs(12_345, 100, 50, 0), Ok(185));
    }

    #[test]
    fn ratios_saturate_on_zero_denominators() {
        assert_eq!(loan_to_value_bps(300_000, 400_000), 7_500);
        assert_eq!(loan_to_value_bps(300_000, 0), 10_000);
        assert_eq!(debt_to_income_bps(1_500, 72_000), 2_500);
        assert_eq!(debt_to_income_bps(1_500, 11), 10_000);
        assert_eq!(debt_to_income_bps(0, 0), 10_000);
    }
}
