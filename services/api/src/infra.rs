use metrics_exporter_prometheus::PrometheusHandle;
use mortgage_match::config::MarketplaceConfig;
use mortgage_match::marketplace::{
    ActorId, ApplicationId, ApplicationMatch, BorrowerProfile, EventPublisher, Lender,
    MarketplaceEvent, MarketplaceRepository, MortgageApplication, MortgageOffer, OfferId,
    PlatformStats, PublishError, RepositoryError,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct Store {
    lenders: HashMap<ActorId, Lender>,
    borrowers: HashMap<ActorId, BorrowerProfile>,
    offers: BTreeMap<OfferId, MortgageOffer>,
    applications: HashMap<ApplicationId, MortgageApplication>,
    matches: BTreeMap<(ApplicationId, OfferId), ApplicationMatch>,
}

/// Process-local repository. State is lost on restart.
pub(crate) struct InMemoryMarketplaceRepository {
    store: Mutex<Store>,
    stats: Mutex<PlatformStats>,
}

impl InMemoryMarketplaceRepository {
    pub(crate) fn new(config: &MarketplaceConfig) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            stats: Mutex::new(PlatformStats::from(config)),
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, Store>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl MarketplaceRepository for InMemoryMarketplaceRepository {
    fn insert_lender(&self, lender: Lender) -> Result<Lender, RepositoryError> {
        let mut store = self.store()?;
        if store.lenders.contains_key(&lender.id) {
            return Err(RepositoryError::Conflict);
        }
        store.lenders.insert(lender.id.clone(), lender.clone());
        Ok(lender)
    }

    fn update_lender(&self, lender: Lender) -> Result<(), RepositoryError> {
        let mut store = self.store()?;
        match store.lenders.get_mut(&lender.id) {
            Some(existing) => {
                *existing = lender;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_lender(&self, id: &ActorId) -> Result<Option<Lender>, RepositoryError> {
        Ok(self.store()?.lenders.get(id).cloned())
    }

    fn upsert_borrower(&self, profile: BorrowerProfile) -> Result<(), RepositoryError> {
        self.store()?.borrowers.insert(profile.id.clone(), profile);
        Ok(())
    }

    fn fetch_borrower(&self, id: &ActorId) -> Result<Option<BorrowerProfile>, RepositoryError> {
        Ok(self.store()?.borrowers.get(id).cloned())
    }

    fn insert_offer(&self, offer: MortgageOffer) -> Result<MortgageOffer, RepositoryError> {
        let mut store = self.store()?;
        if store.offers.contains_key(&offer.id) {
            return Err(RepositoryError::Conflict);
        }
        store.offers.insert(offer.id, offer.clone());
        Ok(offer)
    }

    fn update_offer(&self, offer: MortgageOffer) -> Result<(), RepositoryError> {
        let mut store = self.store()?;
        match store.offers.get_mut(&offer.id) {
            Some(existing) => {
                *existing = offer;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_offer(&self, id: OfferId) -> Result<Option<MortgageOffer>, RepositoryError> {
        Ok(self.store()?.offers.get(&id).cloned())
    }

    fn offers(&self) -> Result<Vec<MortgageOffer>, RepositoryError> {
        Ok(self.store()?.offers.values().cloned().collect())
    }

    fn insert_application(
        &self,
        application: MortgageApplication,
    ) -> Result<MortgageApplication, RepositoryError> {
        let mut store = self.store()?;
        if store.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        store
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    fn update_application(&self, application: MortgageApplication) -> Result<(), RepositoryError> {
        let mut store = self.store()?;
        match store.applications.get_mut(&application.id) {
            Some(existing) => {
                *existing = application;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<MortgageApplication>, RepositoryError> {
        Ok(self.store()?.applications.get(&id).cloned())
    }

    fn insert_match(&self, record: ApplicationMatch) -> Result<ApplicationMatch, RepositoryError> {
        let mut store = self.store()?;
        let key = (record.application_id, record.offer_id);
        if store.matches.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        store.matches.insert(key, record.clone());
        Ok(record)
    }

    fn update_match(&self, record: ApplicationMatch) -> Result<(), RepositoryError> {
        let mut store = self.store()?;
        match store
            .matches
            .get_mut(&(record.application_id, record.offer_id))
        {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_match(
        &self,
        application_id: ApplicationId,
        offer_id: OfferId,
    ) -> Result<Option<ApplicationMatch>, RepositoryError> {
        Ok(self
            .store()?
            .matches
            .get(&(application_id, offer_id))
            .cloned())
    }

    fn matches_for(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<ApplicationMatch>, RepositoryError> {
        Ok(self
            .store()?
            .matches
            .range((application_id, OfferId(0))..=(application_id, OfferId(u64::MAX)))
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn stats(&self) -> Result<PlatformStats, RepositoryError> {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .map_err(|_| RepositoryError::Unavailable("stats mutex poisoned".to_string()))
    }

    fn update_stats(&self, stats: PlatformStats) -> Result<(), RepositoryError> {
        let mut guard = self
            .stats
            .lock()
            .map_err(|_| RepositoryError::Unavailable("stats mutex poisoned".to_string()))?;
        *guard = stats;
        Ok(())
    }
}

/// Records events and mirrors them to the log; stands in for lender and borrower webhooks.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEventPublisher {
    events: Arc<Mutex<Vec<MarketplaceEvent>>>,
}

impl EventPublisher for InMemoryEventPublisher {
    fn publish(&self, event: MarketplaceEvent) -> Result<(), PublishError> {
        info!(kind = ?event.kind, recipient = %event.recipient, "marketplace event");
        let mut guard = self
            .events
            .lock()
            .map_err(|_| PublishError::Transport("event mutex poisoned".to_string()))?;
        guard.push(event);
        Ok(())
    }
}

impl InMemoryEventPublisher {
    pub(crate) fn events(&self) -> Vec<MarketplaceEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}
