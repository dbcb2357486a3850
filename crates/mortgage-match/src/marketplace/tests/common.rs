use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::MarketplaceConfig;
use crate::marketplace::domain::{
    ActorId, ApplicationId, ApplicationMatch, ApplicationStatus, ApplicationTerms,
    BorrowerProfile, BorrowerRegistration, Lender, LenderId, LenderRegistration, LoanPurpose,
    LoanType, MortgageApplication, MortgageOffer, OccupancyType, OfferId, OfferTerms,
    PlatformParameters, PlatformStats, PropertyType,
};
use crate::marketplace::engine::amortization::debt_to_income_bps;
use crate::marketplace::repository::{
    EventPublisher, MarketplaceEvent, MarketplaceRepository, PublishError, RepositoryError,
};
use crate::marketplace::{marketplace_router, MarketplaceService};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn owner() -> ActorId {
    ActorId("platform-owner".to_string())
}

pub(super) fn lender_id() -> LenderId {
    ActorId("lender-harbor".to_string())
}

pub(super) fn rival_lender_id() -> LenderId {
    ActorId("lender-summit".to_string())
}

pub(super) fn borrower_id() -> ActorId {
    ActorId("borrower-ada".to_string())
}

pub(super) fn marketplace_config() -> MarketplaceConfig {
    MarketplaceConfig::default()
}

pub(super) fn platform() -> PlatformParameters {
    PlatformStats::from(&marketplace_config()).parameters()
}

pub(super) fn lender_registration(name: &str) -> LenderRegistration {
    LenderRegistration {
        name: name.to_string(),
        license_number: format!("NMLS-{}", name.len() * 1111),
        contact_info: format!("loans@{}.example", name.to_ascii_lowercase()),
    }
}

pub(super) fn borrower_registration() -> BorrowerRegistration {
    BorrowerRegistration {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
    }
}

/// 400 bps fixed over 30 years, 50k..=500k, 90% LTV, 620 credit, 60k income.
pub(super) fn offer_terms() -> OfferTerms {
    OfferTerms {
        loan_type: LoanType::Fixed,
        interest_rate_bps: 400,
        loan_term_months: 360,
        min_loan_amount: 50_000,
        max_loan_amount: 500_000,
        max_ltv_bps: 9_000,
        min_credit_score: 620,
        min_income: 60_000,
        points_bps: 100,
        origination_fee_bps: 100,
        closing_cost_estimate: 5_000,
        apr_bps: 420,
        valid_until: Utc
            .with_ymd_and_hms(2030, 1, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp"),
    }
}

/// 300k on a 400k purchase, 720 credit, 120k income, 2k monthly debt.
pub(super) fn application_terms() -> ApplicationTerms {
    ApplicationTerms {
        loan_amount: 300_000,
        property_value: 400_000,
        credit_score: 720,
        annual_income: 120_000,
        monthly_debt_payments: 2_000,
        loan_purpose: LoanPurpose::Purchase,
        property_type: PropertyType::SingleFamily,
        occupancy_type: OccupancyType::Primary,
        down_payment: 100_000,
        preferred_term_months: None,
    }
}

pub(super) fn offer(id: u64, terms: OfferTerms) -> MortgageOffer {
    MortgageOffer {
        id: OfferId(id),
        lender: lender_id(),
        terms,
        is_active: true,
        created_at: now(),
    }
}

pub(super) fn application(terms: ApplicationTerms) -> MortgageApplication {
    MortgageApplication {
        id: ApplicationId(1),
        borrower: borrower_id(),
        debt_to_income_bps: debt_to_income_bps(terms.monthly_debt_payments, terms.annual_income),
        terms,
        status: ApplicationStatus::Submitted,
        created_at: now(),
        updated_at: now(),
    }
}

pub(super) type TestService = MarketplaceService<MemoryRepository, MemoryEvents>;

pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<MemoryEvents>) {
    let config = marketplace_config();
    let repository = Arc::new(MemoryRepository::seeded(&config));
    let events = Arc::new(MemoryEvents::default());
    let service = MarketplaceService::new(repository.clone(), events.clone(), &config);
    (service, repository, events)
}

/// Registers and approves a lender, then publishes one offer on its behalf.
pub(super) fn approved_lender_with_offer(
    service: &TestService,
    lender: &LenderId,
    terms: OfferTerms,
) -> OfferId {
    service
        .register_lender(lender, lender_registration("Harbor"), now())
        .expect("lender registers");
    service
        .approve_lender(&owner(), lender)
        .expect("owner approves lender");
    service
        .create_offer(lender, terms, now())
        .expect("offer is created")
}

pub(super) fn marketplace_router_with_service(service: TestService) -> axum::Router {
    marketplace_router(Arc::new(service))
}

#[derive(Default)]
struct MemoryState {
    lenders: HashMap<LenderId, Lender>,
    borrowers: HashMap<ActorId, BorrowerProfile>,
    offers: BTreeMap<OfferId, MortgageOffer>,
    applications: HashMap<ApplicationId, MortgageApplication>,
    matches: BTreeMap<(ApplicationId, OfferId), ApplicationMatch>,
    stats: Option<PlatformStats>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub(super) fn seeded(config: &MarketplaceConfig) -> Self {
        let repository = Self::default();
        repository.lock().stats = Some(PlatformStats::from(config));
        repository
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().expect("repository mutex poisoned")
    }
}

impl MarketplaceRepository for MemoryRepository {
    fn insert_lender(&self, lender: Lender) -> Result<Lender, RepositoryError> {
        let mut guard = self.lock();
        if guard.lenders.contains_key(&lender.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.lenders.insert(lender.id.clone(), lender.clone());
        Ok(lender)
    }

    fn update_lender(&self, lender: Lender) -> Result<(), RepositoryError> {
        self.lock().lenders.insert(lender.id.clone(), lender);
        Ok(())
    }

    fn fetch_lender(&self, id: &LenderId) -> Result<Option<Lender>, RepositoryError> {
        Ok(self.lock().lenders.get(id).cloned())
    }

    fn upsert_borrower(&self, profile: BorrowerProfile) -> Result<(), RepositoryError> {
        self.lock().borrowers.insert(profile.id.clone(), profile);
        Ok(())
    }

    fn fetch_borrower(&self, id: &ActorId) -> Result<Option<BorrowerProfile>, RepositoryError> {
        Ok(self.lock().borrowers.get(id).cloned())
    }

    fn insert_offer(&self, offer: MortgageOffer) -> Result<MortgageOffer, RepositoryError> {
        let mut guard = self.lock();
        if guard.offers.contains_key(&offer.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.offers.insert(offer.id, offer.clone());
        Ok(offer)
    }

    fn update_offer(&self, offer: MortgageOffer) -> Result<(), RepositoryError> {
        self.lock().offers.insert(offer.id, offer);
        Ok(())
    }

    fn fetch_offer(&self, id: OfferId) -> Result<Option<MortgageOffer>, RepositoryError> {
        Ok(self.lock().offers.get(&id).cloned())
    }

    fn offers(&self) -> Result<Vec<MortgageOffer>, RepositoryError> {
        Ok(self.lock().offers.values().cloned().collect())
    }

    fn insert_application(
        &self,
        application: MortgageApplication,
    ) -> Result<MortgageApplication, RepositoryError> {
        let mut guard = self.lock();
        if guard.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    fn update_application(&self, application: MortgageApplication) -> Result<(), RepositoryError> {
        self.lock().applications.insert(application.id, application);
        Ok(())
    }

    fn fetch_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<MortgageApplication>, RepositoryError> {
        Ok(self.lock().applications.get(&id).cloned())
    }

    fn insert_match(&self, record: ApplicationMatch) -> Result<ApplicationMatch, RepositoryError> {
        let mut guard = self.lock();
        let key = (record.application_id, record.offer_id);
        if guard.matches.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.matches.insert(key, record.clone());
        Ok(record)
    }

    fn update_match(&self, record: ApplicationMatch) -> Result<(), RepositoryError> {
        self.lock()
            .matches
            .insert((record.application_id, record.offer_id), record);
        Ok(())
    }

    fn fetch_match(
        &self,
        application_id: ApplicationId,
        offer_id: OfferId,
    ) -> Result<Option<ApplicationMatch>, RepositoryError> {
        Ok(self.lock().matches.get(&(application_id, offer_id)).cloned())
    }

    fn matches_for(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<ApplicationMatch>, RepositoryError> {
        Ok(self
            .lock()
            .matches
            .values()
            .filter(|record| record.application_id == application_id)
            .cloned()
            .collect())
    }

    fn stats(&self) -> Result<PlatformStats, RepositoryError> {
        self.lock()
            .stats
            .clone()
            .ok_or_else(|| RepositoryError::Unavailable("stats not seeded".to_string()))
    }

    fn update_stats(&self, stats: PlatformStats) -> Result<(), RepositoryError> {
        self.lock().stats = Some(stats);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryEvents {
    events: Arc<Mutex<Vec<MarketplaceEvent>>>,
}

impl MemoryEvents {
    pub(super) fn events(&self) -> Vec<MarketplaceEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for MemoryEvents {
    fn publish(&self, event: MarketplaceEvent) -> Result<(), PublishError> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct OfflineEvents;

impl EventPublisher for OfflineEvents {
    fn publish(&self, _event: MarketplaceEvent) -> Result<(), PublishError> {
        Err(PublishError::Transport("webhook offline".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl MarketplaceRepository for UnavailableRepository {
    fn insert_lender(&self, _lender: Lender) -> Result<Lender, RepositoryError> {
        Err(offline())
    }

    fn update_lender(&self, _lender: Lender) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn fetch_lender(&self, _id: &LenderId) -> Result<Option<Lender>, RepositoryError> {
        Err(offline())
    }

    fn upsert_borrower(&self, _profile: BorrowerProfile) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn fetch_borrower(&self, _id: &ActorId) -> Result<Option<BorrowerProfile>, RepositoryError> {
        Err(offline())
    }

    fn insert_offer(&self, _offer: MortgageOffer) -> Result<MortgageOffer, RepositoryError> {
        Err(offline())
    }

    fn update_offer(&self, _offer: MortgageOffer) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn fetch_offer(&self, _id: OfferId) -> Result<Option<MortgageOffer>, RepositoryError> {
        Err(offline())
    }

    fn offers(&self) -> Result<Vec<MortgageOffer>, RepositoryError> {
        Err(offline())
    }

    fn insert_application(
        &self,
        _application: MortgageApplication,
    ) -> Result<MortgageApplication, RepositoryError> {
        Err(offline())
    }

    fn update_application(&self, _application: MortgageApplication) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn fetch_application(
        &self,
        _id: ApplicationId,
    ) -> Result<Option<MortgageApplication>, RepositoryError> {
        Err(offline())
    }

    fn insert_match(&self, _record: ApplicationMatch) -> Result<ApplicationMatch, RepositoryError> {
        Err(offline())
    }

    fn update_match(&self, _record: ApplicationMatch) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn fetch_match(
        &self,
        _application_id: ApplicationId,
        _offer_id: OfferId,
    ) -> Result<Option<ApplicationMatch>, RepositoryError> {
        Err(offline())
    }

    fn matches_for(
        &self,
        _application_id: ApplicationId,
    ) -> Result<Vec<ApplicationMatch>, RepositoryError> {
        Err(offline())
    }

    fn stats(&self) -> Result<PlatformStats, RepositoryError> {
        Err(offline())
    }

    fn update_stats(&self, _stats: PlatformStats) -> Result<(), RepositoryError> {
        Err(offline())
    }
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
