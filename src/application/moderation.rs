use super::feed::FeedService;
use super::messages::MessageService;
use super::session::Actor;
use crate::domain::moderation::{
    ActionKind, Appeal, AppealStatus, DEFAULT_SUSPENSION_DAYS, ModerationAction, Report,
    ReportReason, ReportStatus, ReportTarget, Suspension,
};
use crate::domain::ports::{ModerationStoreRef, ProfileStoreRef};
use crate::domain::{ActionId, PostId, ReportId, UserId};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// What a user is reporting, as sent by the client.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportSubject {
    Post { post_id: PostId },
    User { user_id: UserId },
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActionRequest {
    #[serde(default)]
    pub report_id: Option<ReportId>,
    #[serde(default)]
    pub target_user_id: Option<UserId>,
    #[serde(default)]
    pub post_id: Option<PostId>,
    pub kind: ActionKind,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub duration_days: Option<u32>,
}

/// The suspension currently in force for `user`, if any. Bans win over
/// temporary suspensions, otherwise the one ending last.
pub async fn active_suspension(
    store: &ModerationStoreRef,
    user: UserId,
    now: DateTime<Utc>,
) -> Result<Option<Suspension>> {
    let active = store
        .suspensions_for_user(user)
        .await?
        .into_iter()
        .filter(|s| s.is_active(now))
        .max_by_key(|s| s.ends_at.map_or(i64::MAX, |end| end.timestamp()));
    Ok(active)
}

pub(crate) async fn ensure_not_suspended(store: &ModerationStoreRef, user: UserId) -> Result<()> {
    match active_suspension(store, user, Utc::now()).await? {
        None => Ok(()),
        Some(Suspension { ends_at: None, .. }) => Err(AppError::forbidden("account is banned")),
        Some(Suspension {
            ends_at: Some(end), ..
        }) => Err(AppError::forbidden(format!(
            "account is suspended until {}",
            end.format("%Y-%m-%d %H:%M UTC")
        ))),
    }
}

/// Reports, moderator actions, suspensions and appeals.
#[derive(Clone)]
pub struct ModerationService {
    moderation: ModerationStoreRef,
    feed: FeedService,
    profiles: ProfileStoreRef,
    messages: MessageService,
}

impl ModerationService {
    pub fn new(
        moderation: ModerationStoreRef,
        feed: FeedService,
        profiles: ProfileStoreRef,
        messages: MessageService,
    ) -> Self {
        Self {
            moderation,
            feed,
            profiles,
            messages,
        }
    }

    pub async fn report(
        &self,
        actor: &Actor,
        subject: ReportSubject,
        reason: ReportReason,
        details: Option<String>,
    ) -> Result<Report> {
        let reporter = actor.require_user()?;
        let target = match subject {
            ReportSubject::Post { post_id } => {
                let post = self.feed.get(post_id).await?;
                ReportTarget::Post {
                    post_id,
                    author_id: post.user_id,
                }
            }
            ReportSubject::User { user_id } => ReportTarget::User { user_id },
        };

        let duplicate = self.moderation.reports().await?.into_iter().any(|r| {
            r.reporter_id == reporter && r.target == target && r.status == ReportStatus::Pending
        });
        if duplicate {
            return Err(AppError::conflict("You already have an open report for this"));
        }

        let report = Report::new(reporter, target, reason, details)?;
        self.moderation.store_report(report.clone()).await?;
        info!(report_id = %report.id, reporter = %reporter, "report filed");
        Ok(report)
    }

    /// Oldest first, so the queue is worked in arrival order.
    pub async fn reports(&self, actor: &Actor, status: Option<ReportStatus>) -> Result<Vec<Report>> {
        actor.require_moderator()?;
        let mut reports: Vec<Report> = self
            .moderation
            .reports()
            .await?
            .into_iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .collect();
        reports.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(reports)
    }

    pub async fn act(&self, actor: &Actor, request: ActionRequest) -> Result<ModerationAction> {
        let moderator = actor.require_moderator()?;
        let now = Utc::now();

        let mut report = match request.report_id {
            Some(id) => {
                let report = self
                    .moderation
                    .get_report(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("report", id))?;
                if report.status != ReportStatus::Pending {
                    return Err(AppError::conflict(format!("Report {id} is already closed")));
                }
                Some(report)
            }
            None => None,
        };

        let target_user = match (request.target_user_id, report.as_ref()) {
            (Some(user), Some(r)) if user != r.target.user_id() => {
                return Err(AppError::validation("Target user does not match the report"));
            }
            (Some(user), _) => user,
            (None, Some(r)) => r.target.user_id(),
            (None, None) => return Err(AppError::validation("A target user or report is required")),
        };
        let post_id = request
            .post_id
            .or_else(|| report.as_ref().and_then(|r| r.target.post_id()));

        if target_user == moderator {
            return Err(AppError::forbidden("Moderators cannot act on themselves"));
        }
        if request.kind == ActionKind::Ban && !actor.is_admin {
            return Err(AppError::forbidden("Only admins can ban users"));
        }
        if !actor.is_admin
            && let Some(profile) = self.profiles.get(target_user).await?
            && profile.can_moderate()
        {
            return Err(AppError::forbidden("Only admins can act on staff accounts"));
        }

        let reason = request.reason.trim().to_string();
        if reason.is_empty() && request.kind.notifies_target() {
            return Err(AppError::validation("A reason is required for this action"));
        }

        let action = ModerationAction {
            id: Uuid::new_v4(),
            moderator_id: moderator,
            report_id: report.as_ref().map(|r| r.id),
            target_user_id: target_user,
            post_id,
            kind: request.kind,
            reason,
            duration_days: match request.kind {
                ActionKind::Suspend => Some(request.duration_days.unwrap_or(DEFAULT_SUSPENSION_DAYS)),
                _ => None,
            },
            created_at: now,
        };

        match action.kind {
            ActionKind::Remove => {
                let post_id = post_id.ok_or_else(|| AppError::validation("A post is required for removal"))?;
                let post = self.feed.get(post_id).await?;
                if post.user_id != target_user {
                    return Err(AppError::validation("Post does not belong to the target user"));
                }
                self.feed.remove(post_id).await?;
            }
            ActionKind::Suspend => {
                let days = action.duration_days.unwrap_or(DEFAULT_SUSPENSION_DAYS);
                let suspension = Suspension::temporary(&action, days, now)?;
                self.moderation.store_suspension(suspension).await?;
            }
            ActionKind::Ban => {
                self.moderation
                    .store_suspension(Suspension::permanent(&action, now))
                    .await?;
            }
            ActionKind::Warn | ActionKind::Dismiss | ActionKind::Resolve => {}
        }

        self.moderation.store_action(action.clone()).await?;

        if let Some(report) = report.as_mut() {
            report.close(action.kind.report_outcome(), now)?;
            self.moderation.store_report(report.clone()).await?;
        }

        if action.kind.notifies_target() {
            let mut body = format!("A moderator issued a {} on your account: {}", action.kind, action.reason);
            if let Some(days) = action.duration_days {
                body.push_str(&format!(" (for {days} days)"));
            }
            body.push('.');
            if action.kind.is_appealable() {
                body.push_str(" You can appeal this decision.");
            }
            self.messages
                .send_system(target_user, "Moderation notice", &body)
                .await?;
        }

        info!(
            action_id = %action.id,
            moderator = %moderator,
            target = %target_user,
            kind = ?action.kind,
            "moderation action recorded"
        );
        Ok(action)
    }

    pub async fn appeal(&self, actor: &Actor, action_id: ActionId, message: &str) -> Result<Appeal> {
        let user_id = actor.require_user()?;
        let action = self
            .moderation
            .get_action(action_id)
            .await?
            .ok_or_else(|| AppError::not_found("moderation action", action_id))?;
        let appeal = Appeal::new(user_id, &action, message)?;

        if self
            .moderation
            .appeals()
            .await?
            .iter()
            .any(|a| a.action_id == action_id)
        {
            return Err(AppError::conflict("This action has already been appealed"));
        }

        self.moderation.store_appeal(appeal.clone()).await?;
        info!(appeal_id = %appeal.id, action_id = %action_id, "appeal submitted");
        Ok(appeal)
    }

    pub async fn appeals(&self, actor: &Actor, status: Option<AppealStatus>) -> Result<Vec<Appeal>> {
        actor.require_moderator()?;
        let mut appeals: Vec<Appeal> = self
            .moderation
            .appeals()
            .await?
            .into_iter()
            .filter(|a| status.is_none_or(|s| a.status == s))
            .collect();
        appeals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(appeals)
    }

    /// Decides an appeal. Approval reverses the original action.
    pub async fn review_appeal(
        &self,
        actor: &Actor,
        appeal_id: Uuid,
        approve: bool,
        response: Option<String>,
    ) -> Result<Appeal> {
        let reviewer = actor.require_moderator()?;
        let now = Utc::now();

        let mut appeal = self
            .moderation
            .get_appeal(appeal_id)
            .await?
            .ok_or_else(|| AppError::not_found("appeal", appeal_id))?;
        let action = self
            .moderation
            .get_action(appeal.action_id)
            .await?
            .ok_or_else(|| AppError::not_found("moderation action", appeal.action_id))?;

        if action.moderator_id == reviewer {
            return Err(AppError::forbidden("Appeals must be reviewed by a different moderator"));
        }
        if action.kind == ActionKind::Ban && !actor.is_admin {
            return Err(AppError::forbidden("Only admins can review ban appeals"));
        }

        appeal.decide(reviewer, approve, response, now)?;

        if approve {
            self.reverse(&action, now).await?;
        }
        self.moderation.store_appeal(appeal.clone()).await?;

        let mut body = if approve {
            format!("Your appeal against the {} was approved and it has been reversed.", action.kind)
        } else {
            format!("Your appeal against the {} was rejected.", action.kind)
        };
        if let Some(response) = &appeal.response {
            body.push_str(&format!(" Moderator note: {response}"));
        }
        self.messages
            .send_system(appeal.user_id, "Appeal decision", &body)
            .await?;

        info!(appeal_id = %appeal_id, reviewer = %reviewer, approve, "appeal reviewed");
        Ok(appeal)
    }

    async fn reverse(&self, action: &ModerationAction, now: DateTime<Utc>) -> Result<()> {
        match action.kind {
            ActionKind::Remove => {
                if let Some(post_id) = action.post_id {
                    self.feed.restore(post_id).await?;
                }
            }
            ActionKind::Suspend | ActionKind::Ban => {
                for mut suspension in self
                    .moderation
                    .suspensions_for_user(action.target_user_id)
                    .await?
                    .into_iter()
                    .filter(|s| s.action_id == action.id && s.lifted_at.is_none())
                {
                    suspension.lifted_at = Some(now);
                    self.moderation.store_suspension(suspension).await?;
                }
            }
            ActionKind::Warn | ActionKind::Dismiss | ActionKind::Resolve => {}
        }
        Ok(())
    }

    pub async fn active_suspension(&self, user: UserId) -> Result<Option<Suspension>> {
        active_suspension(&self.moderation, user, Utc::now()).await
    }

    pub async fn is_suspended(&self, user: UserId) -> Result<bool> {
        Ok(self.active_suspension(user).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::catalog::CatalogService;
    use crate::application::session::IdentityKind;
    use crate::domain::ports::{MessageStore, PostStore, ProfileStore};
    use crate::domain::post::{Post, PostStatus};
    use crate::domain::profile::Profile;
    use crate::infrastructure::in_memory::InMemoryStore;
    use std::sync::Arc;

    struct Fixture {
        service: ModerationService,
        store: InMemoryStore,
        moderator: Actor,
        admin: Actor,
    }

    async fn actor_with(store: &InMemoryStore, moderator: bool, admin: bool) -> Actor {
        let mut profile = Profile::new(Uuid::new_v4());
        profile.is_moderator = moderator;
        profile.is_admin = admin;
        ProfileStore::store(store, profile.clone()).await.unwrap();
        Actor::from_profile(&profile, IdentityKind::Real)
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let messages = MessageService::new(Arc::new(store.clone()));
        let catalog = CatalogService::new(Arc::new(store.clone()), messages.clone());
        let feed = FeedService::new(Arc::new(store.clone()), Arc::new(store.clone()), catalog);
        let service = ModerationService::new(Arc::new(store.clone()), feed, Arc::new(store.clone()), messages);
        Fixture {
            moderator: actor_with(&store, true, false).await,
            admin: actor_with(&store, false, true).await,
            service,
            store,
        }
    }

    async fn post_by(store: &InMemoryStore, author: &Actor) -> Post {
        let post = Post::new(author.user_id.unwrap(), Uuid::new_v4(), "Buy cheap watches", None).unwrap();
        PostStore::store(store, post.clone()).await.unwrap();
        post
    }

    fn request(kind: ActionKind, report_id: Option<ReportId>, target: Option<UserId>) -> ActionRequest {
        ActionRequest {
            report_id,
            target_user_id: target,
            post_id: None,
            kind,
            reason: "spam".to_string(),
            duration_days: None,
        }
    }

    #[tokio::test]
    async fn test_report_and_remove_post() {
        let f = fixture().await;
        let author = actor_with(&f.store, false, false).await;
        let reporter = actor_with(&f.store, false, false).await;
        let post = post_by(&f.store, &author).await;

        let report = f
            .service
            .report(&reporter, ReportSubject::Post { post_id: post.id }, ReportReason::Spam, None)
            .await
            .unwrap();
        assert_eq!(report.target.user_id(), author.user_id.unwrap());

        assert!(matches!(
            f.service
                .report(&reporter, ReportSubject::Post { post_id: post.id }, ReportReason::Spam, None)
                .await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            f.service.reports(&reporter, None).await,
            Err(AppError::Forbidden(_))
        ));

        let action = f
            .service
            .act(&f.moderator, request(ActionKind::Remove, Some(report.id), None))
            .await
            .unwrap();
        assert_eq!(action.post_id, Some(post.id));

        let stored = PostStore::get(&f.store, post.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PostStatus::Removed);

        let pending = f.service.reports(&f.moderator, Some(ReportStatus::Pending)).await.unwrap();
        assert!(pending.is_empty());
        let resolved = f.service.reports(&f.moderator, Some(ReportStatus::Resolved)).await.unwrap();
        assert_eq!(resolved.len(), 1);

        let inbox = MessageStore::inbox(&f.store, author.user_id.unwrap()).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].body.contains("post removal"));

        assert!(matches!(
            f.service
                .act(&f.moderator, request(ActionKind::Warn, Some(report.id), None))
                .await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_dismiss_sends_no_message() {
        let f = fixture().await;
        let target = actor_with(&f.store, false, false).await;
        let reporter = actor_with(&f.store, false, false).await;
        let report = f
            .service
            .report(
                &reporter,
                ReportSubject::User { user_id: target.user_id.unwrap() },
                ReportReason::Other,
                Some("looks fake".to_string()),
            )
            .await
            .unwrap();

        f.service
            .act(&f.moderator, request(ActionKind::Dismiss, Some(report.id), None))
            .await
            .unwrap();

        let reports = f.service.reports(&f.moderator, Some(ReportStatus::Dismissed)).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert!(MessageStore::inbox(&f.store, target.user_id.unwrap()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_permission_rules() {
        let f = fixture().await;
        let user = actor_with(&f.store, false, false).await;
        let other_moderator = actor_with(&f.store, true, false).await;
        let target = user.user_id;

        assert!(matches!(
            f.service.act(&user, request(ActionKind::Warn, None, target)).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.act(&f.moderator, request(ActionKind::Ban, None, target)).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            f.service
                .act(&f.moderator, request(ActionKind::Warn, None, f.moderator.user_id))
                .await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            f.service
                .act(&f.moderator, request(ActionKind::Warn, None, other_moderator.user_id))
                .await,
            Err(AppError::Forbidden(_))
        ));
        assert!(
            f.service
                .act(&f.admin, request(ActionKind::Warn, None, other_moderator.user_id))
                .await
                .is_ok()
        );
        assert!(matches!(
            f.service.act(&f.moderator, request(ActionKind::Warn, None, None)).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_suspension_and_appeal_reversal() {
        let f = fixture().await;
        let user = actor_with(&f.store, false, false).await;
        let user_id = user.user_id.unwrap();

        let mut suspend = request(ActionKind::Suspend, None, Some(user_id));
        suspend.duration_days = Some(3);
        let action = f.service.act(&f.moderator, suspend).await.unwrap();
        assert_eq!(action.duration_days, Some(3));
        assert!(f.service.is_suspended(user_id).await.unwrap());

        let appeal = f.service.appeal(&user, action.id, "I was hacked").await.unwrap();
        assert!(matches!(
            f.service.appeal(&user, action.id, "Please").await,
            Err(AppError::Conflict(_))
        ));

        assert!(matches!(
            f.service.review_appeal(&f.moderator, appeal.id, true, None).await,
            Err(AppError::Forbidden(_))
        ));

        let reviewed = f
            .service
            .review_appeal(&f.admin, appeal.id, true, Some("Sorry about that".to_string()))
            .await
            .unwrap();
        assert_eq!(reviewed.status, AppealStatus::Approved);
        assert!(!f.service.is_suspended(user_id).await.unwrap());

        let inbox = MessageStore::inbox(&f.store, user_id).await.unwrap();
        assert!(inbox.iter().any(|m| m.body.contains("approved")));
    }

    #[tokio::test]
    async fn test_ban_is_permanent_until_appealed() {
        let f = fixture().await;
        let user = actor_with(&f.store, false, false).await;
        let user_id = user.user_id.unwrap();

        let action = f
            .service
            .act(&f.admin, request(ActionKind::Ban, None, Some(user_id)))
            .await
            .unwrap();
        let suspension = f.service.active_suspension(user_id).await.unwrap().unwrap();
        assert_eq!(suspension.ends_at, None);
        assert!(matches!(
            ensure_not_suspended(&(Arc::new(f.store.clone()) as ModerationStoreRef), user_id).await,
            Err(AppError::Forbidden(_))
        ));

        let appeal = f.service.appeal(&user, action.id, "Second chance?").await.unwrap();
        assert!(matches!(
            f.service.review_appeal(&f.moderator, appeal.id, true, None).await,
            Err(AppError::Forbidden(_))
        ));
        let other_admin = actor_with(&f.store, false, true).await;
        let rejected = f
            .service
            .review_appeal(&other_admin, appeal.id, false, None)
            .await
            .unwrap();
        assert_eq!(rejected.status, AppealStatus::Rejected);
        assert!(f.service.is_suspended(user_id).await.unwrap());
    }
}
