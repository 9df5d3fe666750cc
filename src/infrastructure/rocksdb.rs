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
use crate::error::{AppError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const CF_PROFILES: &str = "profiles";
pub const CF_ACTIVITIES: &str = "activities";
pub const CF_RATINGS: &str = "ratings";
pub const CF_PROGRESS: &str = "progress";
pub const CF_POSTS: &str = "posts";
pub const CF_ADS: &str = "ads";
pub const CF_BOOKINGS: &str = "bookings";
pub const CF_PAYMENTS: &str = "payments";
pub const CF_WEBHOOK_EVENTS: &str = "webhook_events";
pub const CF_REPORTS: &str = "reports";
pub const CF_ACTIONS: &str = "moderation_actions";
pub const CF_APPEALS: &str = "appeals";
pub const CF_SUSPENSIONS: &str = "suspensions";
pub const CF_MESSAGES: &str = "messages";

const COLUMN_FAMILIES: [&str; 14] = [
    CF_PROFILES,
    CF_ACTIVITIES,
    CF_RATINGS,
    CF_PROGRESS,
    CF_POSTS,
    CF_ADS,
    CF_BOOKINGS,
    CF_PAYMENTS,
    CF_WEBHOOK_EVENTS,
    CF_REPORTS,
    CF_ACTIONS,
    CF_APPEALS,
    CF_SUSPENSIONS,
    CF_MESSAGES,
];

/// A persistent store implementation using RocksDB.
///
/// Every table lives in its own column family, values are JSON. Secondary
/// lookups (ratings of an activity, a user's bookings) scan the family; the
/// tables are small enough per deployment that this is fine.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    /// Serializes check-then-put on the webhook event family.
    event_lock: Arc<Mutex<()>>,
}

fn compound_key(a: Uuid, b: Uuid) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(a.as_bytes());
    key.extend_from_slice(b.as_bytes());
    key
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            event_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            AppError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn put<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(self.cf(cf)?, key, bytes)?;
        Ok(())
    }

    fn fetch<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_pinned_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    fn scan_where<T, F>(&self, cf: &str, predicate: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        Ok(self
            .scan::<T>(cf)?
            .into_iter()
            .filter(|row| predicate(row))
            .collect())
    }
}

#[async_trait]
impl ProfileStore for RocksDBStore {
    async fn store(&self, profile: Profile) -> Result<()> {
        self.put(CF_PROFILES, profile.id.as_bytes(), &profile)
    }

    async fn get(&self, id: UserId) -> Result<Option<Profile>> {
        self.fetch(CF_PROFILES, id.as_bytes())
    }
}

#[async_trait]
impl ActivityStore for RocksDBStore {
    async fn store(&self, activity: Activity) -> Result<()> {
        self.put(CF_ACTIVITIES, activity.id.as_bytes(), &activity)
    }

    async fn get(&self, id: ActivityId) -> Result<Option<Activity>> {
        self.fetch(CF_ACTIVITIES, id.as_bytes())
    }

    async fn get_all(&self) -> Result<Vec<Activity>> {
        self.scan(CF_ACTIVITIES)
    }

    async fn store_rating(&self, rating: Rating) -> Result<()> {
        self.put(CF_RATINGS, &compound_key(rating.activity_id, rating.user_id), &rating)
    }

    async fn ratings_for(&self, activity_id: ActivityId) -> Result<Vec<Rating>> {
        self.scan_where(CF_RATINGS, |r: &Rating| r.activity_id == activity_id)
    }

    async fn store_progress(&self, progress: Progress) -> Result<()> {
        self.put(CF_PROGRESS, &compound_key(progress.user_id, progress.activity_id), &progress)
    }

    async fn get_progress(&self, user_id: UserId, activity_id: ActivityId) -> Result<Option<Progress>> {
        self.fetch(CF_PROGRESS, &compound_key(user_id, activity_id))
    }

    async fn progress_for_user(&self, user_id: UserId) -> Result<Vec<Progress>> {
        self.scan_where(CF_PROGRESS, |p: &Progress| p.user_id == user_id)
    }
}

#[async_trait]
impl PostStore for RocksDBStore {
    async fn store(&self, post: Post) -> Result<()> {
        self.put(CF_POSTS, post.id.as_bytes(), &post)
    }

    async fn get(&self, id: PostId) -> Result<Option<Post>> {
        self.fetch(CF_POSTS, id.as_bytes())
    }

    async fn get_all(&self) -> Result<Vec<Post>> {
        self.scan(CF_POSTS)
    }
}

#[async_trait]
impl AdStore for RocksDBStore {
    async fn store(&self, ad: SupplierAd) -> Result<()> {
        self.put(CF_ADS, ad.id.as_bytes(), &ad)
    }

    async fn get(&self, id: AdId) -> Result<Option<SupplierAd>> {
        self.fetch(CF_ADS, id.as_bytes())
    }

    async fn get_all(&self) -> Result<Vec<SupplierAd>> {
        self.scan(CF_ADS)
    }
}

#[async_trait]
impl BookingStore for RocksDBStore {
    async fn store_booking(&self, booking: Booking) -> Result<()> {
        self.put(CF_BOOKINGS, booking.id.as_bytes(), &booking)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        self.fetch(CF_BOOKINGS, id.as_bytes())
    }

    async fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        self.scan_where(CF_BOOKINGS, |b: &Booking| b.user_id == user_id)
    }

    async fn store_payment(&self, payment: Payment) -> Result<()> {
        self.put(CF_PAYMENTS, payment.payment_intent_id.as_bytes(), &payment)
    }

    async fn payment_by_intent(&self, payment_intent_id: &str) -> Result<Option<Payment>> {
        self.fetch(CF_PAYMENTS, payment_intent_id.as_bytes())
    }

    async fn payments_for_booking(&self, booking_id: BookingId) -> Result<Vec<Payment>> {
        self.scan_where(CF_PAYMENTS, |p: &Payment| p.booking_id == booking_id)
    }

    async fn record_event(&self, event_id: &str) -> Result<bool> {
        let _guard = self
            .event_lock
            .lock()
            .map_err(|_| AppError::InternalError(Box::new(std::io::Error::other("event lock poisoned"))))?;
        let cf = self.cf(CF_WEBHOOK_EVENTS)?;
        if self.db.get_pinned_cf(cf, event_id.as_bytes())?.is_some() {
            return Ok(false);
        }
        self.db.put_cf(cf, event_id.as_bytes(), b"")?;
        Ok(true)
    }

    async fn forget_event(&self, event_id: &str) -> Result<()> {
        let _guard = self
            .event_lock
            .lock()
            .map_err(|_| AppError::InternalError(Box::new(std::io::Error::other("event lock poisoned"))))?;
        self.db.delete_cf(self.cf(CF_WEBHOOK_EVENTS)?, event_id.as_bytes())?;
        Ok(())
    }
}

#[async_trait]
impl ModerationStore for RocksDBStore {
    async fn store_report(&self, report: Report) -> Result<()> {
        self.put(CF_REPORTS, report.id.as_bytes(), &report)
    }

    async fn get_report(&self, id: ReportId) -> Result<Option<Report>> {
        self.fetch(CF_REPORTS, id.as_bytes())
    }

    async fn reports(&self) -> Result<Vec<Report>> {
        self.scan(CF_REPORTS)
    }

    async fn store_action(&self, action: ModerationAction) -> Result<()> {
        self.put(CF_ACTIONS, action.id.as_bytes(), &action)
    }

    async fn get_action(&self, id: ActionId) -> Result<Option<ModerationAction>> {
        self.fetch(CF_ACTIONS, id.as_bytes())
    }

    async fn store_appeal(&self, appeal: Appeal) -> Result<()> {
        self.put(CF_APPEALS, appeal.id.as_bytes(), &appeal)
    }

    async fn get_appeal(&self, id: Uuid) -> Result<Option<Appeal>> {
        self.fetch(CF_APPEALS, id.as_bytes())
    }

    async fn appeals(&self) -> Result<Vec<Appeal>> {
        self.scan(CF_APPEALS)
    }

    async fn store_suspension(&self, suspension: Suspension) -> Result<()> {
        self.put(CF_SUSPENSIONS, suspension.id.as_bytes(), &suspension)
    }

    async fn suspensions_for_user(&self, user_id: UserId) -> Result<Vec<Suspension>> {
        self.scan_where(CF_SUSPENSIONS, |s: &Suspension| s.user_id == user_id)
    }
}

#[async_trait]
impl MessageStore for RocksDBStore {
    async fn store(&self, message: Message) -> Result<()> {
        self.put(CF_MESSAGES, message.id.as_bytes(), &message)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Message>> {
        self.fetch(CF_MESSAGES, id.as_bytes())
    }

    async fn inbox(&self, user_id: UserId) -> Result<Vec<Message>> {
        self.scan_where(CF_MESSAGES, |m: &Message| m.recipient_id == user_id)
    }
}
