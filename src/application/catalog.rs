use super::guard::with_user;
use super::messages::MessageService;
use super::session::Actor;
use crate::domain::activity::{
    Activity, ActivityDraft, ActivityStatus, Dashboard, Progress, ProgressStatus, Rating,
};
use crate::domain::ports::ActivityStoreRef;
use crate::domain::{ActivityId, UserId};
use crate::error::{AppError, Result};
use chrono::Utc;
use serde::Deserialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Browse filters. All are optional and combine with AND.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ActivityFilter {
    pub tag: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "q")]
    pub query: Option<String>,
}

impl ActivityFilter {
    fn matches(&self, activity: &Activity) -> bool {
        if let Some(tag) = self.tag.as_deref().filter(|t| !t.trim().is_empty())
            && !activity.has_tag(tag)
        {
            return false;
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty())
            && !activity.category.eq_ignore_ascii_case(category.trim())
        {
            return false;
        }
        if let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let query = query.to_lowercase();
            return activity.title.to_lowercase().contains(&query)
                || activity.description.to_lowercase().contains(&query);
        }
        true
    }
}

/// Activity browsing, submissions, ratings and progress tracking.
#[derive(Clone)]
pub struct CatalogService {
    activities: ActivityStoreRef,
    messages: MessageService,
    // Serializes rating writes with the aggregate recomputed from them.
    ratings: Arc<Mutex<()>>,
}

impl CatalogService {
    pub fn new(activities: ActivityStoreRef, messages: MessageService) -> Self {
        Self {
            activities,
            messages,
            ratings: Arc::new(Mutex::new(())),
        }
    }

    /// Approved activities: canonical first, then best rated, then by title.
    pub async fn list(&self, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        let mut activities: Vec<Activity> = self
            .activities
            .get_all()
            .await?
            .into_iter()
            .filter(|a| a.is_approved() && filter.matches(a))
            .collect();

        activities.sort_by(|a, b| {
            b.is_canonical
                .cmp(&a.is_canonical)
                .then_with(|| {
                    b.average_rating
                        .partial_cmp(&a.average_rating)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(activities)
    }

    /// Unapproved activities are only visible to their submitter and moderators.
    pub async fn get(&self, actor: &Actor, id: ActivityId) -> Result<Activity> {
        let activity = self.find(id).await?;
        let visible = activity.is_approved()
            || actor.is_moderator
            || (actor.user_id.is_some() && activity.submitted_by == actor.user_id);
        if visible {
            Ok(activity)
        } else {
            Err(AppError::not_found("activity", id))
        }
    }

    /// Adds a canonical activity, replacing one with the same title.
    pub async fn import(&self, draft: ActivityDraft) -> Result<Activity> {
        let mut activity = Activity::canonical(draft)?;
        if let Some(existing) = self
            .activities
            .get_all()
            .await?
            .into_iter()
            .find(|a| a.is_canonical && a.title.eq_ignore_ascii_case(&activity.title))
        {
            activity.id = existing.id;
            activity.average_rating = existing.average_rating;
            activity.rating_count = existing.rating_count;
            activity.created_at = existing.created_at;
        }
        self.activities.store(activity.clone()).await?;
        Ok(activity)
    }

    pub async fn submit(&self, actor: &Actor, draft: ActivityDraft) -> Result<Activity> {
        let user_id = actor.require_user()?;
        let activity = Activity::submitted(draft, user_id)?;
        self.activities.store(activity.clone()).await?;
        info!(activity_id = %activity.id, user_id = %user_id, "activity submitted for review");
        Ok(activity)
    }

    pub async fn review(&self, actor: &Actor, id: ActivityId, approve: bool) -> Result<Activity> {
        let admin = actor.require_admin()?;
        let mut activity = self.find(id).await?;
        if activity.status != ActivityStatus::Pending {
            return Err(AppError::conflict(format!("Activity {id} is not awaiting review")));
        }
        activity.status = if approve {
            ActivityStatus::Approved
        } else {
            ActivityStatus::Rejected
        };
        self.activities.store(activity.clone()).await?;
        info!(activity_id = %id, admin = %admin, approve, "activity reviewed");

        if let Some(submitter) = activity.submitted_by {
            let verdict = if approve { "approved" } else { "not approved" };
            self.messages
                .send_system(
                    submitter,
                    "Your activity submission",
                    &format!("\"{}\" was {verdict}.", activity.title),
                )
                .await?;
        }
        Ok(activity)
    }

    pub async fn rate(&self, actor: &Actor, id: ActivityId, score: u8, review: Option<String>) -> Result<Activity> {
        let user_id = actor.require_user()?;
        let rating = Rating::new(user_id, id, score, review)?;

        let _guard = self.ratings.lock().await;
        let mut activity = self.find_approved(id).await?;
        self.activities.store_rating(rating).await?;
        let ratings = self.activities.ratings_for(id).await?;
        activity.apply_ratings(&ratings);
        self.activities.store(activity.clone()).await?;
        Ok(activity)
    }

    pub async fn set_progress(
        &self,
        actor: &Actor,
        id: ActivityId,
        status: ProgressStatus,
        percent: Option<u8>,
        notes: Option<String>,
    ) -> Result<Progress> {
        let user_id = actor.require_user()?;
        self.find_approved(id).await?;

        let mut progress = self
            .activities
            .get_progress(user_id, id)
            .await?
            .unwrap_or_else(|| Progress::new(user_id, id));
        progress.update(status, percent, Utc::now());
        if let Some(notes) = notes {
            progress.notes = Some(notes.trim().to_string()).filter(|n| !n.is_empty());
        }
        self.activities.store_progress(progress.clone()).await?;
        Ok(progress)
    }

    pub async fn progress_for(&self, user: Option<UserId>) -> Vec<Progress> {
        with_user(user, Vec::new(), |user_id| self.activities.progress_for_user(user_id)).await
    }

    pub async fn dashboard(&self, user: Option<UserId>) -> Dashboard {
        with_user(user, Dashboard::from_progress(&[]), |user_id| async move {
            let progress = self.activities.progress_for_user(user_id).await?;
            Ok(Dashboard::from_progress(&progress))
        })
        .await
    }

    async fn find(&self, id: ActivityId) -> Result<Activity> {
        self.activities
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("activity", id))
    }

    pub(crate) async fn find_approved(&self, id: ActivityId) -> Result<Activity> {
        let activity = self.find(id).await?;
        if activity.is_approved() {
            Ok(activity)
        } else {
            Err(AppError::not_found("activity", id))
        }
    }
}
