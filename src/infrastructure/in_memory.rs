use crate::domain::activity::{Activity, Progress, Rating};
use crate::domain::ad::SupplierAd;
use crate::domain::booking::{Booking, Payment};
use crate::domain::message::Message;
use crate::domain::moderation::{Appeal, ModerationAction, Report, Suspension};
use crate::domain::ports::{
    ActivityStore, AdStore, BookingStore, MessageStore, ModerationStore, PostStore, ProfileStore,
};
use crate::domain::post::Post;
use crate::domain::profile::Profile;
use crate::domain::{ActionId, ActivityId, AdId, BookingId, PostId, ReportId, UserId};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

type Table<K, V> = Arc<RwLock<HashMap<K, V>>>;

/// A thread-safe in-memory store for every table.
///
/// Each table is an `Arc<RwLock<HashMap<..>>>`, so clones share state. Ideal
/// for tests, demos and single-process deployments where persistence is not
/// required.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    profiles: Table<UserId, Profile>,
    activities: Table<ActivityId, Activity>,
    ratings: Table<(UserId, ActivityId), Rating>,
    progress: Table<(UserId, ActivityId), Progress>,
    posts: Table<PostId, Post>,
    ads: Table<AdId, SupplierAd>,
    bookings: Table<BookingId, Booking>,
    payments: Table<String, Payment>,
    events: Arc<RwLock<HashSet<String>>>,
    reports: Table<ReportId, Report>,
    actions: Table<ActionId, ModerationAction>,
    appeals: Table<Uuid, Appeal>,
    suspensions: Table<Uuid, Suspension>,
    messages: Table<Uuid, Message>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn store(&self, profile: Profile) -> Result<()> {
        self.profiles.write().await.insert(profile.id, profile);
        Ok(())
    }

    async fn get(&self, id: UserId) -> Result<Option<Profile>> {
        Ok(self.profiles.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl ActivityStore for InMemoryStore {
    async fn store(&self, activity: Activity) -> Result<()> {
        self.activities.write().await.insert(activity.id, activity);
        Ok(())
    }

    async fn get(&self, id: ActivityId) -> Result<Option<Activity>> {
        Ok(self.activities.read().await.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Activity>> {
        Ok(self.activities.read().await.values().cloned().collect())
    }

    async fn store_rating(&self, rating: Rating) -> Result<()> {
        self.ratings
            .write()
            .await
            .insert((rating.user_id, rating.activity_id), rating);
        Ok(())
    }

    async fn ratings_for(&self, activity_id: ActivityId) -> Result<Vec<Rating>> {
        let ratings = self.ratings.read().await;
        Ok(ratings
            .values()
            .filter(|r| r.activity_id == activity_id)
            .cloned()
            .collect())
    }

    async fn store_progress(&self, progress: Progress) -> Result<()> {
        self.progress
            .write()
            .await
            .insert((progress.user_id, progress.activity_id), progress);
        Ok(())
    }

    async fn get_progress(&self, user_id: UserId, activity_id: ActivityId) -> Result<Option<Progress>> {
        Ok(self.progress.read().await.get(&(user_id, activity_id)).cloned())
    }

    async fn progress_for_user(&self, user_id: UserId) -> Result<Vec<Progress>> {
        let progress = self.progress.read().await;
        Ok(progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn store(&self, post: Post) -> Result<()> {
        self.posts.write().await.insert(post.id, post);
        Ok(())
    }

    async fn get(&self, id: PostId) -> Result<Option<Post>> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Post>> {
        Ok(self.posts.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl AdStore for InMemoryStore {
    async fn store(&self, ad: SupplierAd) -> Result<()> {
        self.ads.write().await.insert(ad.id, ad);
        Ok(())
    }

    async fn get(&self, id: AdId) -> Result<Option<SupplierAd>> {
        Ok(self.ads.read().await.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<SupplierAd>> {
        Ok(self.ads.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn store_booking(&self, booking: Booking) -> Result<()> {
        self.bookings.write().await.insert(booking.id, booking);
        Ok(())
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn store_payment(&self, payment: Payment) -> Result<()> {
        self.payments
            .write()
            .await
            .insert(payment.payment_intent_id.clone(), payment);
        Ok(())
    }

    async fn payment_by_intent(&self, payment_intent_id: &str) -> Result<Option<Payment>> {
        Ok(self.payments.read().await.get(payment_intent_id).cloned())
    }

    async fn payments_for_booking(&self, booking_id: BookingId) -> Result<Vec<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn record_event(&self, event_id: &str) -> Result<bool> {
        Ok(self.events.write().await.insert(event_id.to_string()))
    }

    async fn forget_event(&self, event_id: &str) -> Result<()> {
        self.events.write().await.remove(event_id);
        Ok(())
    }
}

#[async_trait]
impl ModerationStore for InMemoryStore {
    async fn store_report(&self, report: Report) -> Result<()> {
        self.reports.write().await.insert(report.id, report);
        Ok(())
    }

    async fn get_report(&self, id: ReportId) -> Result<Option<Report>> {
        Ok(self.reports.read().await.get(&id).cloned())
    }

    async fn reports(&self) -> Result<Vec<Report>> {
        Ok(self.reports.read().await.values().cloned().collect())
    }

    async fn store_action(&self, action: ModerationAction) -> Result<()> {
        self.actions.write().await.insert(action.id, action);
        Ok(())
    }

    async fn get_action(&self, id: ActionId) -> Result<Option<ModerationAction>> {
        Ok(self.actions.read().await.get(&id).cloned())
    }

    async fn store_appeal(&self, appeal: Appeal) -> Result<()> {
        self.appeals.write().await.insert(appeal.id, appeal);
        Ok(())
    }

    async fn get_appeal(&self, id: Uuid) -> Result<Option<Appeal>> {
        Ok(self.appeals.read().await.get(&id).cloned())
    }

    async fn appeals(&self) -> Result<Vec<Appeal>> {
        Ok(self.appeals.read().await.values().cloned().collect())
    }

    async fn store_suspension(&self, suspension: Suspension) -> Result<()> {
        self.suspensions.write().await.insert(suspension.id, suspension);
        Ok(())
    }

    async fn suspensions_for_user(&self, user_id: UserId) -> Result<Vec<Suspension>> {
        let suspensions = self.suspensions.read().await;
        Ok(suspensions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn store(&self, message: Message) -> Result<()> {
        self.messages.write().await.insert(message.id, message);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Message>> {
        Ok(self.messages.read().await.get(&id).cloned())
    }

    async fn inbox(&self, user_id: UserId) -> Result<Vec<Message>> {
        let messages = self.messages.read().await;
        Ok(messages
            .values()
            .filter(|m| m.recipient_id == user_id)
            .cloned()
            .collect())
    }
}
