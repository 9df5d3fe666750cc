use super::activity::{Activity, Progress, Rating};
use super::ad::SupplierAd;
use super::booking::{Booking, Payment};
use super::message::Message;
use super::moderation::{Appeal, ModerationAction, Report, Suspension};
use super::money::Currency;
use super::post::Post;
use super::profile::Profile;
use super::{ActionId, ActivityId, AdId, BookingId, PostId, ReportId, UserId};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn store(&self, profile: Profile) -> Result<()>;
    async fn get(&self, id: UserId) -> Result<Option<Profile>>;
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn store(&self, activity: Activity) -> Result<()>;
    async fn get(&self, id: ActivityId) -> Result<Option<Activity>>;
    async fn get_all(&self) -> Result<Vec<Activity>>;
    async fn store_rating(&self, rating: Rating) -> Result<()>;
    async fn ratings_for(&self, activity_id: ActivityId) -> Result<Vec<Rating>>;
    async fn store_progress(&self, progress: Progress) -> Result<()>;
    async fn get_progress(&self, user_id: UserId, activity_id: ActivityId) -> Result<Option<Progress>>;
    async fn progress_for_user(&self, user_id: UserId) -> Result<Vec<Progress>>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn store(&self, post: Post) -> Result<()>;
    async fn get(&self, id: PostId) -> Result<Option<Post>>;
    async fn get_all(&self) -> Result<Vec<Post>>;
}

#[async_trait]
pub trait AdStore: Send + Sync {
    async fn store(&self, ad: SupplierAd) -> Result<()>;
    async fn get(&self, id: AdId) -> Result<Option<SupplierAd>>;
    async fn get_all(&self) -> Result<Vec<SupplierAd>>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn store_booking(&self, booking: Booking) -> Result<()>;
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>>;
    async fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>>;
    async fn store_payment(&self, payment: Payment) -> Result<()>;
    async fn payment_by_intent(&self, payment_intent_id: &str) -> Result<Option<Payment>>;
    async fn payments_for_booking(&self, booking_id: BookingId) -> Result<Vec<Payment>>;
    /// Records a processed webhook event id. Returns `false` if it was already recorded.
    async fn record_event(&self, event_id: &str) -> Result<bool>;
    /// Releases a recorded event id so a redelivery is processed again.
    async fn forget_event(&self, event_id: &str) -> Result<()>;
}

#[async_trait]
pub trait ModerationStore: Send + Sync {
    async fn store_report(&self, report: Report) -> Result<()>;
    async fn get_report(&self, id: ReportId) -> Result<Option<Report>>;
    async fn reports(&self) -> Result<Vec<Report>>;
    async fn store_action(&self, action: ModerationAction) -> Result<()>;
    async fn get_action(&self, id: ActionId) -> Result<Option<ModerationAction>>;
    async fn store_appeal(&self, appeal: Appeal) -> Result<()>;
    async fn get_appeal(&self, id: Uuid) -> Result<Option<Appeal>>;
    async fn appeals(&self) -> Result<Vec<Appeal>>;
    async fn store_suspension(&self, suspension: Suspension) -> Result<()>;
    async fn suspensions_for_user(&self, user_id: UserId) -> Result<Vec<Suspension>>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn store(&self, message: Message) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Message>>;
    async fn inbox(&self, user_id: UserId) -> Result<Vec<Message>>;
}

/// Request sent to the payment-intent creation endpoint.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IntentRequest {
    pub amount: i64,
    pub currency: Currency,
    pub booking_id: BookingId,
}

/// Intent handle returned to the client to confirm with a card element.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PaymentIntent {
    pub payment_intent_id: String,
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent>;
}

pub type ProfileStoreRef = Arc<dyn ProfileStore>;
pub type ActivityStoreRef = Arc<dyn ActivityStore>;
pub type PostStoreRef = Arc<dyn PostStore>;
pub type AdStoreRef = Arc<dyn AdStore>;
pub type BookingStoreRef = Arc<dyn BookingStore>;
pub type ModerationStoreRef = Arc<dyn ModerationStore>;
pub type MessageStoreRef = Arc<dyn MessageStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;

/// Shared handles to every store, handed to each service.
#[derive(Clone)]
pub struct Repositories {
    pub profiles: ProfileStoreRef,
    pub activities: ActivityStoreRef,
    pub posts: PostStoreRef,
    pub ads: AdStoreRef,
    pub bookings: BookingStoreRef,
    pub moderation: ModerationStoreRef,
    pub messages: MessageStoreRef,
}

impl Repositories {
    /// Builds the bundle from one backend that implements every store.
    pub fn from_backend<S>(store: S) -> Self
    where
        S: ProfileStore
            + ActivityStore
            + PostStore
            + AdStore
            + BookingStore
            + ModerationStore
            + MessageStore
            + Clone
            + 'static,
    {
        Self {
            profiles: Arc::new(store.clone()),
            activities: Arc::new(store.clone()),
            posts: Arc::new(store.clone()),
            ads: Arc::new(store.clone()),
            bookings: Arc::new(store.clone()),
            moderation: Arc::new(store.clone()),
            messages: Arc::new(store),
        }
    }
}

/// Builds a fresh store, e.g. one per test or per process.
pub type RepositoriesFactory = Box<dyn Fn() -> Repositories + Send + Sync>;
