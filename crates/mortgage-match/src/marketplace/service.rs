use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::domain::{
    ActorId, ApplicationId, ApplicationMatch, ApplicationStatus, ApplicationTerms, BorrowerId,
    BorrowerProfile, BorrowerRegistration, Lender, LenderId, LenderRegistration, LenderResponse,
    MortgageApplication, MortgageOffer, OfferId, OfferTerms, PlatformParameters, PlatformStats,
    MAX_REPUTATION,
};
use super::engine::amortization::debt_to_income_bps;
use super::engine::validation::{validate_application, validate_offer, validate_parameters};
use super::engine::{
    AmortizationError, EligibilityResult, MatchingEngine, OfferComparison, ScoringConfig,
    ValidationError,
};
use super::repository::{
    ApplicationStatusView, EventKind, EventPublisher, MarketplaceEvent, MarketplaceRepository,
    PublishError, RepositoryError,
};
use crate::config::MarketplaceConfig;

/// Service composing access control, counters, persistence, and the matching engine.
pub struct MarketplaceService<R, E> {
    repository: Arc<R>,
    events: Arc<E>,
    engine: Arc<MatchingEngine>,
    owner: ActorId,
}

impl<R, E> MarketplaceService<R, E>
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(repository: Arc<R>, events: Arc<E>, config: &MarketplaceConfig) -> Self {
        let engine = MatchingEngine::new(ScoringConfig::new(config.points_per_criterion));
        Self::with_engine(repository, events, engine, config.owner.clone())
    }

    pub fn with_engine(
        repository: Arc<R>,
        events: Arc<E>,
        engine: MatchingEngine,
        owner: ActorId,
    ) -> Self {
        Self {
            repository,
            events,
            engine: Arc::new(engine),
            owner,
        }
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    /// Register the caller as a lender. Lenders start unapproved with full reputation.
    pub fn register_lender(
        &self,
        caller: &ActorId,
        registration: LenderRegistration,
        now: DateTime<Utc>,
    ) -> Result<Lender, MarketplaceError> {
        let mut stats = self.running_stats()?;

        if self.repository.fetch_lender(caller)?.is_some() {
            return Err(MarketplaceError::AlreadyExists { record: "lender" });
        }

        let lender = Lender {
            id: caller.clone(),
            name: registration.name,
            license_number: registration.license_number,
            contact_info: registration.contact_info,
            is_approved: false,
            reputation_score: MAX_REPUTATION,
            total_loans_issued: 0,
            average_rate_bps: 0,
            registered_at: now,
        };
        let stored = self
            .repository
            .insert_lender(lender)
            .map_err(|err| conflict_as(err, "lender"))?;

        stats.total_lenders += 1;
        self.repository.update_stats(stats)?;

        info!(lender = %stored.id, "lender registered");
        Ok(stored)
    }

    pub fn approve_lender(
        &self,
        caller: &ActorId,
        lender_id: &LenderId,
    ) -> Result<Lender, MarketplaceError> {
        self.ensure_owner(caller)?;
        let mut lender = self.require_lender(lender_id)?;
        lender.is_approved = true;
        self.repository.update_lender(lender.clone())?;

        info!(lender = %lender.id, "lender approved");
        Ok(lender)
    }

    /// Create or refresh the caller's borrower profile, keeping its history.
    pub fn register_borrower(
        &self,
        caller: &ActorId,
        registration: BorrowerRegistration,
    ) -> Result<BorrowerProfile, MarketplaceError> {
        let existing = self.repository.fetch_borrower(caller)?;
        let profile = BorrowerProfile {
            id: caller.clone(),
            first_name: registration.first_name,
            last_name: registration.last_name,
            applications_count: existing
                .as_ref()
                .map(|profile| profile.applications_count)
                .unwrap_or(0),
            verified: existing.map(|profile| profile.verified).unwrap_or(false),
        };
        self.repository.upsert_borrower(profile.clone())?;
        Ok(profile)
    }

    pub fn verify_borrower(
        &self,
        caller: &ActorId,
        borrower_id: &BorrowerId,
    ) -> Result<BorrowerProfile, MarketplaceError> {
        self.ensure_owner(caller)?;
        let mut profile = self
            .repository
            .fetch_borrower(borrower_id)?
            .ok_or(MarketplaceError::NotFound { record: "borrower" })?;
        profile.verified = true;
        self.repository.upsert_borrower(profile.clone())?;
        Ok(profile)
    }

    /// Publish a new offer on behalf of the calling lender.
    pub fn create_offer(
        &self,
        caller: &ActorId,
        terms: OfferTerms,
        now: DateTime<Utc>,
    ) -> Result<OfferId, MarketplaceError> {
        let mut stats = self.running_stats()?;

        let approved = self
            .repository
            .fetch_lender(caller)?
            .map(|lender| lender.is_approved)
            .unwrap_or(false);
        validate_offer(&terms, approved)?;

        let offer_id = OfferId(stats.total_offers + 1);
        let offer = MortgageOffer {
            id: offer_id,
            lender: caller.clone(),
            terms,
            is_active: true,
            created_at: now,
        };
        self.repository
            .insert_offer(offer)
            .map_err(|err| conflict_as(err, "offer"))?;

        stats.total_offers += 1;
        self.repository.update_stats(stats)?;

        info!(%offer_id, lender = %caller, "offer created");
        Ok(offer_id)
    }

    pub fn update_offer_status(
        &self,
        caller: &ActorId,
        offer_id: OfferId,
        active: bool,
    ) -> Result<MortgageOffer, MarketplaceError> {
        let mut offer = self.require_offer(offer_id, "offer")?;
        if &offer.lender != caller {
            return Err(MarketplaceError::Unauthorized);
        }

        offer.is_active = active;
        self.repository.update_offer(offer.clone())?;

        info!(%offer_id, active, "offer status updated");
        Ok(offer)
    }

    /// Validate and file a borrower application against the current platform thresholds.
    pub fn submit_application(
        &self,
        caller: &ActorId,
        terms: ApplicationTerms,
        now: DateTime<Utc>,
    ) -> Result<ApplicationId, MarketplaceError> {
        let mut stats = self.running_stats()?;
        validate_application(&terms, &stats.parameters())?;

        let application_id = ApplicationId(stats.total_applications + 1);
        let application = MortgageApplication {
            id: application_id,
            borrower: caller.clone(),
            debt_to_income_bps: debt_to_income_bps(
                terms.monthly_debt_payments,
                terms.annual_income,
            ),
            terms,
            status: ApplicationStatus::Submitted,
            created_at: now,
            updated_at: now,
        };
        self.repository
            .insert_application(application)
            .map_err(|err| conflict_as(err, "application"))?;

        stats.total_applications += 1;
        self.repository.update_stats(stats)?;

        let mut profile = self
            .repository
            .fetch_borrower(caller)?
            .unwrap_or_else(|| BorrowerProfile {
                id: caller.clone(),
                first_name: String::new(),
                last_name: String::new(),
                applications_count: 0,
                verified: false,
            });
        profile.applications_count = profile.applications_count.saturating_add(1);
        self.repository.upsert_borrower(profile)?;

        info!(%application_id, borrower = %caller, "application submitted");
        Ok(application_id)
    }

    pub fn withdraw_application(
        &self,
        caller: &ActorId,
        application_id: ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<MortgageApplication, MarketplaceError> {
        let mut application = self.require_owned_application(caller, application_id)?;
        if application.status.is_terminal() {
            return Err(MarketplaceError::ApplicationClosed {
                status: application.status.label(),
            });
        }

        application.status = ApplicationStatus::Withdrawn;
        application.updated_at = now;
        self.repository.update_application(application.clone())?;

        info!(%application_id, "application withdrawn");
        Ok(application)
    }

    /// Price and check one application against one offer. Ineligibility is data, not an error.
    pub fn evaluate_eligibility(
        &self,
        application_id: ApplicationId,
        offer_id: OfferId,
        now: DateTime<Utc>,
    ) -> Result<EligibilityResult, MarketplaceError> {
        let offer = self.require_offer(offer_id, "offer")?;
        let application = self.require_application(application_id)?;
        let stats = self.repository.stats()?;

        let result = self
            .engine
            .evaluate(&application, &offer, &stats.parameters(), now)?;

        debug!(
            %application_id,
            %offer_id,
            eligible = result.eligible,
            failed = result.failed_factors.len(),
            "eligibility evaluated"
        );
        Ok(result)
    }

    pub fn compare_offers(
        &self,
        offer1: OfferId,
        offer2: OfferId,
        application_id: ApplicationId,
    ) -> Result<OfferComparison, MarketplaceError> {
        let first = self.require_offer(offer1, "offer1")?;
        let second = self.require_offer(offer2, "offer2")?;
        let application = self.require_application(application_id)?;

        Ok(self.engine.compare(&first, &second, &application)?)
    }

    /// `None` when the evaluated offer was expired or inactive.
    pub fn compute_match_score(&self, evaluation: &EligibilityResult) -> Option<u8> {
        self.engine.score(evaluation)
    }

    /// Snapshot a match against every available offer. Existing matches are left untouched.
    pub fn match_application(
        &self,
        caller: &ActorId,
        application_id: ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ApplicationMatch>, MarketplaceError> {
        let stats = self.running_stats()?;
        let mut application = self.require_owned_application(caller, application_id)?;
        if application.status.is_terminal() {
            return Err(MarketplaceError::ApplicationClosed {
                status: application.status.label(),
            });
        }

        let parameters = stats.parameters();
        let mut created = Vec::new();
        for offer in self.repository.offers()? {
            if self.repository.fetch_match(application_id, offer.id)?.is_some() {
                continue;
            }
            let snapshot = match self
                .engine
                .snapshot_match(&application, &offer, &parameters, now)
            {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => continue,
                Err(err) => {
                    warn!(
                        %application_id,
                        offer_id = %offer.id,
                        %err,
                        "offer could not be quoted"
                    );
                    continue;
                }
            };

            match self.repository.insert_match(snapshot) {
                Ok(stored) => created.push((stored, offer.lender)),
                Err(RepositoryError::Conflict) => {
                    warn!(%application_id, offer_id = %offer.id, "duplicate match skipped");
                }
                Err(err) => return Err(err.into()),
            }
        }

        if !created.is_empty() && application.status == ApplicationStatus::Submitted {
            application.status = ApplicationStatus::Matched;
            application.updated_at = now;
            self.repository.update_application(application)?;
        }

        // State is persisted before any lender is notified.
        for (stored, lender) in &created {
            self.publish(EventKind::MatchCreated, lender, match_details(stored))?;
        }

        let created: Vec<ApplicationMatch> =
            created.into_iter().map(|(stored, _)| stored).collect();
        info!(%application_id, matches = created.len(), "matching completed");
        Ok(created)
    }

    pub fn respond_to_match(
        &self,
        caller: &ActorId,
        application_id: ApplicationId,
        offer_id: OfferId,
        response: LenderResponse,
    ) -> Result<ApplicationMatch, MarketplaceError> {
        self.running_stats()?;
        let offer = self.require_offer(offer_id, "offer")?;
        if &offer.lender != caller {
            return Err(MarketplaceError::Unauthorized);
        }

        let mut record = self
            .repository
            .fetch_match(application_id, offer_id)?
            .ok_or(MarketplaceError::NotFound { record: "match" })?;
        let application = self.require_application(application_id)?;

        record.lender_response = response;
        self.repository.update_match(record.clone())?;

        let mut details = match_details(&record);
        details.insert("response".to_string(), format!("{response:?}").to_lowercase());
        self.publish(EventKind::LenderResponded, &application.borrower, details)?;

        info!(%application_id, %offer_id, ?response, "lender responded to match");
        Ok(record)
    }

    /// Fold a completed loan into the lender's running statistics.
    pub fn record_completed_loan(
        &self,
        caller: &ActorId,
        lender_id: &LenderId,
        rate_bps: u32,
    ) -> Result<Lender, MarketplaceError> {
        self.ensure_owner(caller)?;
        let mut lender = self.require_lender(lender_id)?;
        lender.record_completed_loan(rate_bps);
        self.repository.update_lender(lender.clone())?;
        Ok(lender)
    }

    pub fn adjust_reputation(
        &self,
        caller: &ActorId,
        lender_id: &LenderId,
        delta: i16,
    ) -> Result<Lender, MarketplaceError> {
        self.ensure_owner(caller)?;
        let mut lender = self.require_lender(lender_id)?;
        lender.adjust_reputation(delta);
        self.repository.update_lender(lender.clone())?;
        Ok(lender)
    }

    pub fn set_platform_parameters(
        &self,
        caller: &ActorId,
        parameters: PlatformParameters,
    ) -> Result<PlatformStats, MarketplaceError> {
        self.ensure_owner(caller)?;
        validate_parameters(&parameters)?;

        let mut stats = self.repository.stats()?;
        stats.min_credit_score = parameters.min_credit_score;
        stats.max_ltv_bps = parameters.max_ltv_bps;
        stats.platform_fee_rate_bps = parameters.platform_fee_rate_bps;
        self.repository.update_stats(stats.clone())?;

        info!(?parameters, "platform parameters updated");
        Ok(stats)
    }

    /// Emergency stop: while paused, registrations, intake, matching, and responses fail.
    pub fn set_paused(&self, caller: &ActorId, paused: bool) -> Result<(), MarketplaceError> {
        self.ensure_owner(caller)?;
        let mut stats = self.repository.stats()?;
        stats.paused = paused;
        self.repository.update_stats(stats)?;

        warn!(paused, "platform pause flag changed");
        Ok(())
    }

    pub fn lender(&self, lender_id: &LenderId) -> Result<Lender, MarketplaceError> {
        self.require_lender(lender_id)
    }

    pub fn borrower(&self, borrower_id: &BorrowerId) -> Result<BorrowerProfile, MarketplaceError> {
        self.repository
            .fetch_borrower(borrower_id)?
            .ok_or(MarketplaceError::NotFound { record: "borrower" })
    }

    pub fn offer(&self, offer_id: OfferId) -> Result<MortgageOffer, MarketplaceError> {
        self.require_offer(offer_id, "offer")
    }

    pub fn application(
        &self,
        application_id: ApplicationId,
    ) -> Result<MortgageApplication, MarketplaceError> {
        self.require_application(application_id)
    }

    pub fn application_match(
        &self,
        application_id: ApplicationId,
        offer_id: OfferId,
    ) -> Result<ApplicationMatch, MarketplaceError> {
        self.repository
            .fetch_match(application_id, offer_id)?
            .ok_or(MarketplaceError::NotFound { record: "match" })
    }

    pub fn matches_for(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<ApplicationMatch>, MarketplaceError> {
        self.require_application(application_id)?;
        Ok(self.repository.matches_for(application_id)?)
    }

    pub fn application_status(
        &self,
        application_id: ApplicationId,
    ) -> Result<ApplicationStatusView, MarketplaceError> {
        let application = self.require_application(application_id)?;
        let matches = self.repository.matches_for(application_id)?;
        Ok(ApplicationStatusView::new(&application, &matches))
    }

    pub fn platform_stats(&self) -> Result<PlatformStats, MarketplaceError> {
        Ok(self.repository.stats()?)
    }

    fn ensure_owner(&self, caller: &ActorId) -> Result<(), MarketplaceError> {
        if caller == &self.owner {
            Ok(())
        } else {
            Err(MarketplaceError::OwnerOnly)
        }
    }

    fn running_stats(&self) -> Result<PlatformStats, MarketplaceError> {
        let stats = self.repository.stats()?;
        if stats.paused {
            return Err(MarketplaceError::PlatformPaused);
        }
        Ok(stats)
    }

    fn require_lender(&self, lender_id: &LenderId) -> Result<Lender, MarketplaceError> {
        self.repository
            .fetch_lender(lender_id)?
            .ok_or(MarketplaceError::NotFound { record: "lender" })
    }

    fn require_offer(
        &self,
        offer_id: OfferId,
        record: &'static str,
    ) -> Result<MortgageOffer, MarketplaceError> {
        self.repository
            .fetch_offer(offer_id)?
            .ok_or(MarketplaceError::NotFound { record })
    }

    fn require_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<MortgageApplication, MarketplaceError> {
        self.repository
            .fetch_application(application_id)?
            .ok_or(MarketplaceError::NotFound {
                record: "application",
            })
    }

    fn require_owned_application(
        &self,
        caller: &ActorId,
        application_id: ApplicationId,
    ) -> Result<MortgageApplication, MarketplaceError> {
        let application = self.require_application(application_id)?;
        if &application.borrower != caller {
            return Err(MarketplaceError::Unauthorized);
        }
        Ok(application)
    }

    fn publish(
        &self,
        kind: EventKind,
        recipient: &ActorId,
        details: BTreeMap<String, String>,
    ) -> Result<(), MarketplaceError> {
        self.events.publish(MarketplaceEvent {
            kind,
            recipient: recipient.clone(),
            details,
        })?;
        Ok(())
    }
}

fn match_details(record: &ApplicationMatch) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    details.insert(
        "application_id".to_string(),
        record.application_id.0.to_string(),
    );
    details.insert("offer_id".to_string(), record.offer_id.0.to_string());
    details.insert("match_score".to_string(), record.match_score.to_string());
    details.insert(
        "estimated_payment".to_string(),
        record.estimated_payment.to_string(),
    );
    details
}

fn conflict_as(err: RepositoryError, record: &'static str) -> MarketplaceError {
    match err {
        RepositoryError::Conflict => MarketplaceError::AlreadyExists { record },
        other => MarketplaceError::Repository(other),
    }
}

/// Error raised by the marketplace service. Every variant maps to a stable client code.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("operation restricted to the platform owner")]
    OwnerOnly,
    #[error("{record} not found")]
    NotFound { record: &'static str },
    #[error("caller does not own this record")]
    Unauthorized,
    #[error("{record} already exists")]
    AlreadyExists { record: &'static str },
    #[error("platform is paused")]
    PlatformPaused,
    #[error("application is {status} and can no longer change")]
    ApplicationClosed { status: &'static str },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl From<AmortizationError> for MarketplaceError {
    fn from(value: AmortizationError) -> Self {
        match value {
            AmortizationError::InvalidTerm => Self::Validation(ValidationError::InvalidLoanTerm),
            AmortizationError::InvalidPrincipal | AmortizationError::Overflow => {
                Self::Validation(ValidationError::InvalidAmount)
            }
        }
    }
}

impl MarketplaceError {
    /// Numeric code clients key on.
    pub fn code(&self) -> u16 {
        match self {
            MarketplaceError::OwnerOnly => 100,
            MarketplaceError::NotFound { .. } => 101,
            MarketplaceError::Unauthorized => 102,
            MarketplaceError::AlreadyExists { .. } => 106,
            MarketplaceError::PlatformPaused => 107,
            MarketplaceError::ApplicationClosed { .. } => 111,
            MarketplaceError::Validation(kind) => match kind {
                ValidationError::InvalidAmount => 103,
                ValidationError::InvalidRate => 104,
                ValidationError::LenderNotApproved => 105,
                ValidationError::InvalidCreditScore => 108,
                ValidationError::InsufficientIncome => 109,
                ValidationError::InvalidLoanTerm => 110,
            },
            MarketplaceError::Repository(RepositoryError::NotFound) => 101,
            MarketplaceError::Repository(RepositoryError::Conflict) => 106,
            MarketplaceError::Repository(RepositoryError::Unavailable(_))
            | MarketplaceError::Publish(_) => 500,
        }
    }

    /// Symbolic code mirroring [`Self::code`].
    pub fn symbol(&self) -> &'static str {
        match self.code() {
            100 => "err-owner-only",
            101 => "err-not-found",
            102 => "err-unauthorized",
            103 => "err-invalid-amount",
            104 => "err-invalid-rate",
            105 => "err-lender-not-approved",
            106 => "err-already-exists",
            107 => "err-platform-paused",
            108 => "err-invalid-credit-score",
            109 => "err-insufficient-income",
            110 => "err-invalid-loan-term",
            111 => "err-application-closed",
            _ => "err-internal",
        }
    }
}
