use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    ActorId, ApplicationId, ApplicationMatch, BorrowerId, BorrowerProfile, Lender, LenderId,
    MortgageApplication, MortgageOffer, OfferId, PlatformStats,
};

/// Storage collaborator. Implementations serialize writes to the same record.
pub trait MarketplaceRepository: Send + Sync {
    fn insert_lender(&self, lender: Lender) -> Result<Lender, RepositoryError>;
    fn update_lender(&self, lender: Lender) -> Result<(), RepositoryError>;
    fn fetch_lender(&self, id: &LenderId) -> Result<Option<Lender>, RepositoryError>;

    fn upsert_borrower(&self, profile: BorrowerProfile) -> Result<(), RepositoryError>;
    fn fetch_borrower(&self, id: &BorrowerId) -> Result<Option<BorrowerProfile>, RepositoryError>;

    fn insert_offer(&self, offer: MortgageOffer) -> Result<MortgageOffer, RepositoryError>;
    fn update_offer(&self, offer: MortgageOffer) -> Result<(), RepositoryError>;
    fn fetch_offer(&self, id: OfferId) -> Result<Option<MortgageOffer>, RepositoryError>;
    fn offers(&self) -> Result<Vec<MortgageOffer>, RepositoryError>;

    fn insert_application(
        &self,
        application: MortgageApplication,
    ) -> Result<MortgageApplication, RepositoryError>;
    fn update_application(&self, application: MortgageApplication) -> Result<(), RepositoryError>;
    fn fetch_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<MortgageApplication>, RepositoryError>;

    /// Must reject a second match for the same (application, offer) pair with `Conflict`.
    fn insert_match(&self, record: ApplicationMatch) -> Result<ApplicationMatch, RepositoryError>;
    fn update_match(&self, record: ApplicationMatch) -> Result<(), RepositoryError>;
    fn fetch_match(
        &self,
        application_id: ApplicationId,
        offer_id: OfferId,
    ) -> Result<Option<ApplicationMatch>, RepositoryError>;
    fn matches_for(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<ApplicationMatch>, RepositoryError>;

    fn stats(&self) -> Result<PlatformStats, RepositoryError>;
    fn update_stats(&self, stats: PlatformStats) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail, webhooks, lender portals).
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: MarketplaceEvent) -> Result<(), PublishError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MatchCreated,
    LenderResponded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceEvent {
    pub kind: EventKind,
    pub recipient: ActorId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized application status exposed to borrowers and lenders.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub loan_amount: u64,
    pub match_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_match_score: Option<u8>,
}

impl ApplicationStatusView {
    pub fn new(application: &MortgageApplication, matches: &[ApplicationMatch]) -> Self {
        Self {
            application_id: application.id,
            status: application.status.label(),
            loan_amount: application.terms.loan_amount,
            match_count: matches.len(),
            best_match_score: matches.iter().map(|record| record.match_score).max(),
        }
    }
}
