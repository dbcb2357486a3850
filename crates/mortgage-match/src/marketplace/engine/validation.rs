use super::super::domain::{
    ApplicationTerms, OfferTerms, PlatformParameters, BASIS_POINTS, CREDIT_SCORE_CEILING,
    CREDIT_SCORE_FLOOR, MAX_LOAN_TERM_MONTHS,
};
use super::amortization::loan_to_value_bps;

/// Structural failures raised before an offer or application is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("amount outside the permitted range")]
    InvalidAmount,
    #[error("interest rate must be within (0, 10000] basis points")]
    InvalidRate,
    #[error("loan term must be between 1 and 480 months")]
    InvalidLoanTerm,
    #[error("credit score outside the accepted range")]
    InvalidCreditScore,
    #[error("annual income must be greater than zero")]
    InsufficientIncome,
    #[error("lender has not been approved by the platform")]
    LenderNotApproved,
}

pub fn credit_score_in_band(score: u16) -> bool {
    (CREDIT_SCORE_FLOOR..=CREDIT_SCORE_CEILING).contains(&score)
}

pub fn term_in_band(months: u32) -> bool {
    (1..=MAX_LOAN_TERM_MONTHS).contains(&months)
}

/// Checks lender-authored terms. The approval flag is looked up by the caller.
pub fn validate_offer(terms: &OfferTerms, lender_approved: bool) -> Result<(), ValidationError> {
    if !lender_approved {
        return Err(ValidationError::LenderNotApproved);
    }
    if terms.interest_rate_bps == 0 || terms.interest_rate_bps > BASIS_POINTS {
        return Err(ValidationError::InvalidRate);
    }
    if !term_in_band(terms.loan_term_months) {
        return Err(ValidationError::InvalidLoanTerm);
    }
    if terms.min_loan_amount == 0 || terms.max_loan_amount <= terms.min_loan_amount {
        return Err(ValidationError::InvalidAmount);
    }
    if terms.max_ltv_bps == 0 || terms.max_ltv_bps > BASIS_POINTS {
        return Err(ValidationError::InvalidAmount);
    }
    if !credit_score_in_band(terms.min_credit_score) {
        return Err(ValidationError::InvalidCreditScore);
    }
    Ok(())
}

/// Checks borrower-authored terms against the platform thresholds.
pub fn validate_application(
    terms: &ApplicationTerms,
    platform: &PlatformParameters,
) -> Result<(), ValidationError> {
    if terms.loan_amount == 0 || terms.property_value == 0 {
        return Err(ValidationError::InvalidAmount);
    }
    if !credit_score_in_band(terms.credit_score) || terms.credit_score < platform.min_credit_score
    {
        return Err(ValidationError::InvalidCreditScore);
    }
    if terms.annual_income == 0 {
        return Err(ValidationError::InsufficientIncome);
    }
    if terms.preferred_term_months.is_some_and(|term| !term_in_band(term)) {
        return Err(ValidationError::InvalidLoanTerm);
    }
    if loan_to_value_bps(terms.loan_amount, terms.property_value) > platform.max_ltv_bps {
        return Err(ValidationError::InvalidAmount);
    }
    Ok(())
}

/// Checks owner-supplied platform thresholds.
pub fn validate_parameters(parameters: &PlatformParameters) -> Result<(), ValidationError> {
    if !credit_score_in_band(parameters.min_credit_score) {
        return Err(ValidationError::InvalidCreditScore);
    }
    if parameters.max_ltv_bps == 0 || parameters.max_ltv_bps > BASIS_POINTS {
        return Err(ValidationError::InvalidAmount);
    }
    if parameters.platform_fee_rate_bps > BASIS_POINTS {
        return Err(ValidationError::InvalidRate);
    }
    Ok(())
}
