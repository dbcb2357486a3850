pub mod amortization;
mod comparison;
mod eligibility;
mod scoring;
pub mod validation;

pub use amortization::{AmortizationError, PaymentQuote};
pub use comparison::{OfferComparison, OfferCost};
pub use eligibility::{EligibilityResult, FactorCheck, FactorKind};
pub use scoring::ScoringConfig;
pub use validation::ValidationError;

use chrono::{DateTime, Utc};

use super::domain::{
    ApplicationMatch, LenderResponse, MortgageApplication, MortgageOffer, PlatformParameters,
};

/// Stateless engine applying the scoring rubric to application/offer pairs.
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    scoring: ScoringConfig,
}

impl MatchingEngine {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self { scoring }
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn evaluate(
        &self,
        application: &MortgageApplication,
        offer: &MortgageOffer,
        platform: &PlatformParameters,
        now: DateTime<Utc>,
    ) -> Result<EligibilityResult, AmortizationError> {
        eligibility::evaluate(application, offer, platform, now)
    }

    pub fn score(&self, evaluation: &EligibilityResult) -> Option<u8> {
        scoring::score(&self.scoring, evaluation)
    }

    pub fn compare(
        &self,
        offer1: &MortgageOffer,
        offer2: &MortgageOffer,
        application: &MortgageApplication,
    ) -> Result<OfferComparison, AmortizationError> {
        comparison::compare(offer1, offer2, application)
    }

    /// Evaluates and scores the pair, freezing the figures into a match snapshot.
    ///
    /// Returns `None` when the offer is expired or inactive.
    pub fn snapshot_match(
        &self,
        application: &MortgageApplication,
        offer: &MortgageOffer,
        platform: &PlatformParameters,
        now: DateTime<Utc>,
    ) -> Result<Option<ApplicationMatch>, AmortizationError> {
        let evaluation = self.evaluate(application, offer, platform, now)?;

        Ok(self.score(&evaluation).map(|match_score| ApplicationMatch {
            application_id: application.id,
            offer_id: offer.id,
            match_score,
            estimated_payment: evaluation.estimated_payment,
            total_interest: evaluation.total_interest,
            lender_response: LenderResponse::Pending,
            created_at: now,
        }))
    }
}
