use super::{ActivityId, UserId};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of activities in the full list.
pub const GOAL_TOTAL: u32 = 42;

const TITLE_MIN: usize = 3;
const TITLE_MAX: usize = 120;
const DESCRIPTION_MAX: usize = 2000;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Approved,
    Pending,
    Rejected,
}

/// A "thing to do", either from the canonical list or submitted by a user.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Activity {
    pub id: ActivityId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub location: Option<String>,
    pub is_canonical: bool,
    pub submitted_by: Option<UserId>,
    pub status: ActivityStatus,
    pub average_rating: Decimal,
    pub rating_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Fields a caller provides when adding an activity.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ActivityDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl ActivityDraft {
    fn validate(&self) -> Result<()> {
        let title_len = self.title.trim().chars().count();
        if !(TITLE_MIN..=TITLE_MAX).contains(&title_len) {
            return Err(AppError::validation(format!(
                "Title must be between {TITLE_MIN} and {TITLE_MAX} characters"
            )));
        }
        if self.description.chars().count() > DESCRIPTION_MAX {
            return Err(AppError::validation(format!(
                "Description must be at most {DESCRIPTION_MAX} characters"
            )));
        }
        Ok(())
    }
}

impl Activity {
    /// Builds a canonical, already approved activity.
    pub fn canonical(draft: ActivityDraft) -> Result<Self> {
        Self::build(draft, None, ActivityStatus::Approved)
    }

    /// Builds a user submission awaiting review.
    pub fn submitted(draft: ActivityDraft, submitter: UserId) -> Result<Self> {
        Self::build(draft, Some(submitter), ActivityStatus::Pending)
    }

    fn build(draft: ActivityDraft, submitted_by: Option<UserId>, status: ActivityStatus) -> Result<Self> {
        draft.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            category: draft.category.trim().to_ascii_lowercase(),
            tags: normalize_tags(draft.tags),
            location: draft
                .location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            is_canonical: submitted_by.is_none(),
            submitted_by,
            status,
            average_rating: Decimal::ZERO,
            rating_count: 0,
            created_at: Utc::now(),
        })
    }

    pub fn is_approved(&self) -> bool {
        self.status == ActivityStatus::Approved
    }

    /// Recomputes the aggregate rating fields from the full set of scores.
    pub fn apply_ratings(&mut self, ratings: &[Rating]) {
        self.rating_count = ratings.len() as u32;
        self.average_rating = if ratings.is_empty() {
            Decimal::ZERO
        } else {
            let sum: Decimal = ratings.iter().map(|r| Decimal::from(r.score)).sum();
            (sum / Decimal::from(ratings.len()))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim().to_ascii_lowercase();
        self.tags.iter().any(|t| *t == tag)
    }
}

/// Trims, lowercases, dedups and sorts tags so targeting compares like with like.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// One user's score for one activity.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Rating {
    pub user_id: UserId,
    pub activity_id: ActivityId,
    pub score: u8,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    pub fn new(user_id: UserId, activity_id: ActivityId, score: u8, review: Option<String>) -> Result<Self> {
        if !(1..=5).contains(&score) {
            return Err(AppError::validation("Rating must be between 1 and 5"));
        }
        Ok(Self {
            user_id,
            activity_id,
            score,
            review: review.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// A user's progress towards one activity.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Progress {
    pub user_id: UserId,
    pub activity_id: ActivityId,
    pub status: ProgressStatus,
    pub percent: u8,
    pub notes: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Progress {
    pub fn new(user_id: UserId, activity_id: ActivityId) -> Self {
        Self {
            user_id,
            activity_id,
            status: ProgressStatus::NotStarted,
            percent: 0,
            notes: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Applies a progress update.
    ///
    /// `percent` is clamped to 0..=100. Reaching 100 completes the activity and
    /// completing it forces 100; leaving the completed state clears `completed_at`.
    pub fn update(&mut self, status: ProgressStatus, percent: Option<u8>, now: DateTime<Utc>) {
        let mut percent = percent.unwrap_or(self.percent).min(100);
        let mut status = status;

        if percent == 100 {
            status = ProgressStatus::Completed;
        }
        match status {
            ProgressStatus::Completed => percent = 100,
            ProgressStatus::NotStarted => percent = 0,
            ProgressStatus::InProgress => {}
        }

        if status != ProgressStatus::NotStarted && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if status == ProgressStatus::Completed {
            if self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
        } else {
            self.completed_at = None;
        }

        self.status = status;
        self.percent = percent;
    }
}

/// Summary shown on a user's dashboard.
#[derive(Debug, Serialize, PartialEq, Clone, Default)]
pub struct Dashboard {
    pub completed: u32,
    pub in_progress: u32,
    pub goal: u32,
    pub percent_of_goal: u8,
}

impl Dashboard {
    pub fn from_progress(progress: &[Progress]) -> Self {
        let completed = progress
            .iter()
            .filter(|p| p.status == ProgressStatus::Completed)
            .count() as u32;
        let in_progress = progress
            .iter()
            .filter(|p| p.status == ProgressStatus::InProgress)
            .count() as u32;
        let percent_of_goal = ((completed * 100) / GOAL_TOTAL).min(100) as u8;
        Self {
            completed,
            in_progress,
            goal: GOAL_TOTAL,
            percent_of_goal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft(title: &str, tags: &[&str]) -> ActivityDraft {
        ActivityDraft {
            title: title.to_string(),
            description: "Something worth doing".to_string(),
            category: "Outdoors".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            location: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_tags_are_normalized() {
        let activity = Activity::canonical(draft("Climb a hill", &[" Hiking", "outdoors", "hiking", ""])).unwrap();
        assert_eq!(activity.tags, vec!["hiking", "outdoors"]);
        assert_eq!(activity.category, "outdoors");
        assert_eq!(activity.location, None);
        assert!(activity.has_tag("HIKING"));
    }

    #[test]
    fn test_submission_is_pending() {
        let user = Uuid::new_v4();
        let activity = Activity::submitted(draft("Learn to juggle", &[]), user).unwrap();
        assert_eq!(activity.status, ActivityStatus::Pending);
        assert!(!activity.is_canonical);
        assert_eq!(activity.submitted_by, Some(user));
    }

    #[test]
    fn test_title_length_is_validated() {
        assert!(matches!(
            Activity::canonical(draft("ab", &[])),
            Err(AppError::ValidationError(_))
        ));
        assert!(Activity::canonical(draft(&"x".repeat(121), &[])).is_err());
    }

    #[test]
    fn test_rating_aggregates() {
        let mut activity = Activity::canonical(draft("See the northern lights", &[])).unwrap();
        let ratings: Vec<Rating> = [5, 4, 4]
            .iter()
            .map(|s| Rating::new(Uuid::new_v4(), activity.id, *s, None).unwrap())
            .collect();
        activity.apply_ratings(&ratings);
        assert_eq!(activity.rating_count, 3);
        assert_eq!(activity.average_rating, dec!(4.33));

        activity.apply_ratings(&[]);
        assert_eq!(activity.rating_count, 0);
        assert_eq!(activity.average_rating, Decimal::ZERO);
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(Uuid::new_v4(), Uuid::new_v4(), 0, None).is_err());
        assert!(Rating::new(Uuid::new_v4(), Uuid::new_v4(), 6, None).is_err());
    }

    #[test]
    fn test_progress_completion_rules() {
        let now = Utc::now();
        let mut progress = Progress::new(Uuid::new_v4(), Uuid::new_v4());

        progress.update(ProgressStatus::InProgress, Some(150), now);
        assert_eq!(progress.status, ProgressStatus::Completed);
        assert_eq!(progress.percent, 100);
        assert_eq!(progress.completed_at, Some(now));
        assert_eq!(progress.started_at, Some(now));

        progress.update(ProgressStatus::InProgress, Some(40), now);
        assert_eq!(progress.status, ProgressStatus::InProgress);
        assert_eq!(progress.percent, 40);
        assert_eq!(progress.completed_at, None);

        progress.update(ProgressStatus::Completed, None, now);
        assert_eq!(progress.percent, 100);
    }

    #[test]
    fn test_dashboard_counts() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let mut rows = Vec::new();
        for i in 0..21 {
            let mut p = Progress::new(user, Uuid::new_v4());
            let status = if i % 3 == 0 {
                ProgressStatus::InProgress
            } else {
                ProgressStatus::Completed
            };
            p.update(status, Some(50), now);
            rows.push(p);
        }
        let dashboard = Dashboard::from_progress(&rows);
        assert_eq!(dashboard.completed, 14);
        assert_eq!(dashboard.in_progress, 7);
        assert_eq!(dashboard.goal, 42);
        assert_eq!(dashboard.percent_of_goal, 33);
    }
}
