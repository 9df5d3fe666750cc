use super::catalog::CatalogService;
use super::session::Actor;
use crate::domain::ad::{AdDraft, AdPerformance, SupplierAd, rank_for_tags};
use crate::domain::ports::AdStoreRef;
use crate::domain::{ActivityId, AdId};
use crate::error::{AppError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const DEFAULT_AD_SLOTS: usize = 3;
pub const MAX_AD_SLOTS: usize = 10;

/// Supplier ads shown next to activities.
#[derive(Clone)]
pub struct AdService {
    ads: AdStoreRef,
    catalog: CatalogService,
    // Serializes read-modify-write of the impression and click counters.
    counters: Arc<Mutex<()>>,
}

impl AdService {
    pub fn new(ads: AdStoreRef, catalog: CatalogService) -> Self {
        Self {
            ads,
            catalog,
            counters: Arc::new(Mutex::new(())),
        }
    }

    pub async fn create(&self, actor: &Actor, draft: AdDraft) -> Result<SupplierAd> {
        let supplier = actor.require_user()?;
        if !actor.is_supplier && !actor.is_admin {
            return Err(AppError::forbidden("Only suppliers can create ads"));
        }
        let ad = SupplierAd::new(supplier, draft)?;
        self.ads.store(ad.clone()).await?;
        info!(ad_id = %ad.id, supplier = %supplier, "ad created");
        Ok(ad)
    }

    /// Ads matching the activity's tags. Each returned ad counts one impression.
    pub async fn serve_for_activity(&self, activity_id: ActivityId, limit: Option<usize>) -> Result<Vec<SupplierAd>> {
        let activity = self.catalog.find_approved(activity_id).await?;
        let limit = limit.unwrap_or(DEFAULT_AD_SLOTS).clamp(1, MAX_AD_SLOTS);

        let _guard = self.counters.lock().await;
        let ranked = rank_for_tags(self.ads.get_all().await?, &activity.tags, limit);
        let mut served = Vec::with_capacity(ranked.len());
        for mut ad in ranked {
            ad.impressions += 1;
            self.ads.store(ad.clone()).await?;
            served.push(ad);
        }
        debug!(activity_id = %activity_id, served = served.len(), "ads served");
        Ok(served)
    }

    pub async fn record_click(&self, ad_id: AdId) -> Result<SupplierAd> {
        let _guard = self.counters.lock().await;
        let mut ad = self.find(ad_id).await?;
        if !ad.active {
            return Err(AppError::not_found("ad", ad_id));
        }
        ad.clicks += 1;
        self.ads.store(ad.clone()).await?;
        Ok(ad)
    }

    pub async fn set_active(&self, actor: &Actor, ad_id: AdId, active: bool) -> Result<SupplierAd> {
        let user = actor.require_user()?;
        let _guard = self.counters.lock().await;
        let mut ad = self.find(ad_id).await?;
        if ad.supplier_id != user && !actor.is_admin {
            return Err(AppError::forbidden("Only the owning supplier can change this ad"));
        }
        ad.active = active;
        self.ads.store(ad.clone()).await?;
        info!(ad_id = %ad_id, active, "ad visibility changed");
        Ok(ad)
    }

    pub async fn get(&self, ad_id: AdId) -> Result<SupplierAd> {
        self.find(ad_id).await
    }

    /// Rows for the performance report, busiest ads first.
    pub async fn performance(&self) -> Result<Vec<AdPerformance>> {
        let mut ads = self.ads.get_all().await?;
        ads.sort_by(|a, b| b.impressions.cmp(&a.impressions).then_with(|| a.title.cmp(&b.title)));
        Ok(ads.iter().map(AdPerformance::from).collect())
    }

    async fn find(&self, ad_id: AdId) -> Result<SupplierAd> {
        self.ads
            .get(ad_id)
            .await?
            .ok_or_else(|| AppError::not_found("ad", ad_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messages::MessageService;
    use crate::application::session::IdentityKind;
    use crate::domain::activity::ActivityDraft;
    use crate::domain::money::{Amount, Currency};
    use crate::domain::profile::Profile;
    use crate::infrastructure::in_memory::InMemoryStore;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    async fn fixture() -> (AdService, ActivityId) {
        let store = InMemoryStore::new();
        let messages = MessageService::new(Arc::new(store.clone()));
        let catalog = CatalogService::new(Arc::new(store.clone()), messages);
        let activity = catalog
            .import(ActivityDraft {
                title: "Go scuba diving".to_string(),
                description: String::new(),
                category: "adventure".to_string(),
                tags: vec!["diving".to_string(), "ocean".to_string()],
                location: None,
            })
            .await
            .unwrap();
        (AdService::new(Arc::new(store), catalog), activity.id)
    }

    fn supplier() -> Actor {
        let mut profile = Profile::new(Uuid::new_v4());
        profile.is_supplier = true;
        Actor::from_profile(&profile, IdentityKind::Real)
    }

    fn draft(title: &str, tags: &[&str]) -> AdDraft {
        AdDraft {
            title: title.to_string(),
            description: String::new(),
            target_tags: tags.iter().map(|t| t.to_string()).collect(),
            price: Amount::new(dec!(80)).unwrap(),
            currency: Currency::new("usd").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_only_suppliers_create_ads() {
        let (ads, _) = fixture().await;
        let user = Actor::from_profile(&Profile::new(Uuid::new_v4()), IdentityKind::Real);
        assert!(matches!(
            ads.create(&user, draft("Dive school", &["diving"])).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(ads.create(&supplier(), draft("Dive school", &["diving"])).await.is_ok());
    }

    #[tokio::test]
    async fn test_serving_counts_impressions_and_clicks() {
        let (ads, activity) = fixture().await;
        let seller = supplier();
        let both = ads.create(&seller, draft("Reef tour", &["diving", "ocean"])).await.unwrap();
        let one = ads.create(&seller, draft("Dive shop", &["diving"])).await.unwrap();
        ads.create(&seller, draft("Ski pass", &["skiing"])).await.unwrap();

        let served = ads.serve_for_activity(activity, None).await.unwrap();
        let ids: Vec<AdId> = served.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![both.id, one.id]);

        ads.record_click(one.id).await.unwrap();
        let report = ads.performance().await.unwrap();
        assert_eq!(report.len(), 3);
        let row = report.iter().find(|r| r.ad_id == one.id).unwrap();
        assert_eq!((row.impressions, row.clicks), (1, 1));
        assert_eq!(row.ctr, dec!(1));
    }

    #[tokio::test]
    async fn test_inactive_ads_are_hidden() {
        let (ads, activity) = fixture().await;
        let seller = supplier();
        let ad = ads.create(&seller, draft("Reef tour", &["diving"])).await.unwrap();

        assert!(matches!(
            ads.set_active(&supplier(), ad.id, false).await,
            Err(AppError::Forbidden(_))
        ));
        ads.set_active(&seller, ad.id, false).await.unwrap();

        assert!(ads.serve_for_activity(activity, None).await.unwrap().is_empty());
        assert!(matches!(ads.record_click(ad.id).await, Err(AppError::NotFound(_))));
    }
}
