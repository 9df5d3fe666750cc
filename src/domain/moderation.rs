use super::{ActionId, PostId, ReportId, UserId};
use crate::error::{AppError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const DEFAULT_SUSPENSION_DAYS: u32 = 7;
pub const MAX_SUSPENSION_DAYS: u32 = 365;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Spam,
    Harassment,
    Inappropriate,
    Misinformation,
    Other,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

/// What a report points at. Post reports carry the author so actions can
/// reach the user without another lookup.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportTarget {
    Post { post_id: PostId, author_id: UserId },
    User { user_id: UserId },
}

impl ReportTarget {
    pub fn user_id(&self) -> UserId {
        match self {
            ReportTarget::Post { author_id, .. } => *author_id,
            ReportTarget::User { user_id } => *user_id,
        }
    }

    pub fn post_id(&self) -> Option<PostId> {
        match self {
            ReportTarget::Post { post_id, .. } => Some(*post_id),
            ReportTarget::User { .. } => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Report {
    pub id: ReportId,
    pub reporter_id: UserId,
    pub target: ReportTarget,
    pub reason: ReportReason,
    pub details: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Report {
    pub fn new(reporter_id: UserId, target: ReportTarget, reason: ReportReason, details: Option<String>) -> Result<Self> {
        if target.user_id() == reporter_id {
            return Err(AppError::validation("You cannot report yourself"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            reporter_id,
            target,
            reason,
            details: details.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            status: ReportStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        })
    }

    pub fn close(&mut self, status: ReportStatus, now: DateTime<Utc>) -> Result<()> {
        if self.status != ReportStatus::Pending {
            return Err(AppError::conflict(format!("Report {} is already closed", self.id)));
        }
        self.status = status;
        self.resolved_at = Some(now);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Warn,
    Remove,
    Suspend,
    Ban,
    Dismiss,
    Resolve,
}

impl ActionKind {
    /// Actions that change what the target can do, and so can be appealed.
    pub fn is_appealable(self) -> bool {
        matches!(self, ActionKind::Remove | ActionKind::Suspend | ActionKind::Ban)
    }

    /// Actions the target user is told about.
    pub fn notifies_target(self) -> bool {
        matches!(
            self,
            ActionKind::Warn | ActionKind::Remove | ActionKind::Suspend | ActionKind::Ban
        )
    }

    pub fn report_outcome(self) -> ReportStatus {
        match self {
            ActionKind::Dismiss => ReportStatus::Dismissed,
            _ => ReportStatus::Resolved,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Warn => "warning",
            ActionKind::Remove => "post removal",
            ActionKind::Suspend => "suspension",
            ActionKind::Ban => "ban",
            ActionKind::Dismiss => "dismissal",
            ActionKind::Resolve => "resolution",
        };
        f.write_str(s)
    }
}

/// A moderator's recorded decision.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ModerationAction {
    pub id: ActionId,
    pub moderator_id: UserId,
    pub report_id: Option<ReportId>,
    pub target_user_id: UserId,
    pub post_id: Option<PostId>,
    pub kind: ActionKind,
    pub reason: String,
    pub duration_days: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Suspension {
    pub id: Uuid,
    pub user_id: UserId,
    pub action_id: ActionId,
    pub reason: String,
    pub starts_at: DateTime<Utc>,
    /// `None` for a permanent ban.
    pub ends_at: Option<DateTime<Utc>>,
    pub lifted_at: Option<DateTime<Utc>>,
}

impl Suspension {
    pub fn temporary(action: &ModerationAction, days: u32, now: DateTime<Utc>) -> Result<Self> {
        if !(1..=MAX_SUSPENSION_DAYS).contains(&days) {
            return Err(AppError::validation(format!(
                "Suspension must last between 1 and {MAX_SUSPENSION_DAYS} days"
            )));
        }
        Ok(Self::build(action, Some(now + Duration::days(i64::from(days))), now))
    }

    pub fn permanent(action: &ModerationAction, now: DateTime<Utc>) -> Self {
        Self::build(action, None, now)
    }

    fn build(action: &ModerationAction, ends_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: action.target_user_id,
            action_id: action.id,
            reason: action.reason.clone(),
            starts_at: now,
            ends_at,
            lifted_at: None,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.lifted_at.is_none() && self.ends_at.is_none_or(|end| end > now)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Appeal {
    pub id: Uuid,
    pub user_id: UserId,
    pub action_id: ActionId,
    pub message: String,
    pub status: AppealStatus,
    pub reviewer_id: Option<UserId>,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Appeal {
    pub fn new(user_id: UserId, action: &ModerationAction, message: &str) -> Result<Self> {
        if action.target_user_id != user_id {
            return Err(AppError::forbidden("Only the affected user can appeal this action"));
        }
        if !action.kind.is_appealable() {
            return Err(AppError::validation(format!(
                "A {} cannot be appealed",
                action.kind
            )));
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::validation("Appeal message must not be empty"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            action_id: action.id,
            message: message.to_string(),
            status: AppealStatus::Pending,
            reviewer_id: None,
            response: None,
            created_at: Utc::now(),
            reviewed_at: None,
        })
    }

    pub fn decide(&mut self, reviewer: UserId, approve: bool, response: Option<String>, now: DateTime<Utc>) -> Result<()> {
        if self.status != AppealStatus::Pending {
            return Err(AppError::conflict(format!("Appeal {} was already reviewed", self.id)));
        }
        self.status = if approve {
            AppealStatus::Approved
        } else {
            AppealStatus::Rejected
        };
        self.reviewer_id = Some(reviewer);
        self.response = response.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        self.reviewed_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(kind: ActionKind, target: UserId) -> ModerationAction {
        ModerationAction {
            id: Uuid::new_v4(),
            moderator_id: Uuid::new_v4(),
            report_id: None,
            target_user_id: target,
            post_id: None,
            kind,
            reason: "rude".to_string(),
            duration_days: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_self_report_rejected() {
        let user = Uuid::new_v4();
        let result = Report::new(user, ReportTarget::User { user_id: user }, ReportReason::Spam, None);
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_report_closes_once() {
        let mut report = Report::new(
            Uuid::new_v4(),
            ReportTarget::User { user_id: Uuid::new_v4() },
            ReportReason::Harassment,
            Some("  ".to_string()),
        )
        .unwrap();
        assert_eq!(report.details, None);

        report.close(ReportStatus::Dismissed, Utc::now()).unwrap();
        assert_eq!(report.status, ReportStatus::Dismissed);
        assert!(matches!(
            report.close(ReportStatus::Resolved, Utc::now()),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_suspension_activity_window() {
        let now = Utc::now();
        let a = action(ActionKind::Suspend, Uuid::new_v4());
        let mut suspension = Suspension::temporary(&a, 7, now).unwrap();
        assert!(suspension.is_active(now));
        assert!(!suspension.is_active(now + Duration::days(8)));

        suspension.lifted_at = Some(now);
        assert!(!suspension.is_active(now));

        let ban = Suspension::permanent(&action(ActionKind::Ban, Uuid::new_v4()), now);
        assert!(ban.is_active(now + Duration::days(10_000)));

        assert!(Suspension::temporary(&a, 0, now).is_err());
        assert!(Suspension::temporary(&a, MAX_SUSPENSION_DAYS + 1, now).is_err());
    }

    #[test]
    fn test_appeal_rules() {
        let user = Uuid::new_v4();
        assert!(matches!(
            Appeal::new(user, &action(ActionKind::Warn, user), "sorry"),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            Appeal::new(Uuid::new_v4(), &action(ActionKind::Ban, user), "sorry"),
            Err(AppError::Forbidden(_))
        ));
        assert!(Appeal::new(user, &action(ActionKind::Suspend, user), "  ").is_err());

        let mut appeal = Appeal::new(user, &action(ActionKind::Remove, user), "It was a joke").unwrap();
        appeal.decide(Uuid::new_v4(), false, None, Utc::now()).unwrap();
        assert_eq!(appeal.status, AppealStatus::Rejected);
        assert!(appeal.decide(Uuid::new_v4(), true, None, Utc::now()).is_err());
    }
}
