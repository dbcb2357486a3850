//! Mortgage marketplace: lender offers, borrower applications, and the matching engine.
//!
//! The engine is pure and synchronous. [`MarketplaceService`] layers access control,
//! platform counters, persistence, and event publication on top of it, and
//! [`marketplace_router`] exposes the service over HTTP.

pub mod domain;
pub mod engine;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ActorId, ApplicationId, ApplicationMatch, ApplicationStatus, ApplicationTerms, BorrowerId,
    BorrowerProfile, BorrowerRegistration, Lender, LenderId, LenderRegistration, LenderResponse,
    LoanPurpose, LoanType, MortgageApplication, MortgageOffer, OccupancyType, OfferId, OfferTerms,
    PlatformParameters, PlatformStats, PropertyType,
};
pub use engine::{
    EligibilityResult, FactorCheck, FactorKind, MatchingEngine, OfferComparison, OfferCost,
    PaymentQuote, ScoringConfig,
};
pub use repository::{
    ApplicationStatusView, EventKind, EventPublisher, MarketplaceEvent, MarketplaceRepository,
    PublishError, RepositoryError,
};
pub use router::{marketplace_router, ACTOR_HEADER};
pub use service::{MarketplaceError, MarketplaceService};
