use super::activity::normalize_tags;
use super::money::{Amount, Currency};
use super::{AdId, UserId};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// A supplier's promotional listing, targeted at activities by tag.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct SupplierAd {
    pub id: AdId,
    pub supplier_id: UserId,
    pub title: String,
    pub description: String,
    pub target_tags: Vec<String>,
    pub price: Amount,
    pub currency: Currency,
    pub active: bool,
    pub impressions: u64,
    pub clicks: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub target_tags: Vec<String>,
    pub price: Amount,
    pub currency: Currency,
}

impl SupplierAd {
    pub fn new(supplier_id: UserId, draft: AdDraft) -> Result<Self> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(AppError::validation("Ad title must not be empty"));
        }
        let target_tags = normalize_tags(draft.target_tags);
        if target_tags.is_empty() {
            return Err(AppError::validation("Ad needs at least one target tag"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            supplier_id,
            title: title.to_string(),
            description: draft.description.trim().to_string(),
            target_tags,
            price: draft.price,
            currency: draft.currency,
            active: true,
            impressions: 0,
            clicks: 0,
            created_at: Utc::now(),
        })
    }

    /// Number of target tags shared with `tags`.
    pub fn relevance(&self, tags: &[String]) -> usize {
        self.target_tags.iter().filter(|t| tags.contains(t)).count()
    }

    pub fn click_through_rate(&self) -> Decimal {
        if self.impressions == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(self.clicks) / Decimal::from(self.impressions)
        }
    }
}

/// Picks the ads to show next to an activity.
///
/// Only active ads sharing at least one tag qualify. Order is relevance, then
/// click-through rate, then newest first.
pub fn rank_for_tags(ads: Vec<SupplierAd>, tags: &[String], limit: usize) -> Vec<SupplierAd> {
    let mut scored: Vec<(usize, SupplierAd)> = ads
        .into_iter()
        .filter(|ad| ad.active)
        .map(|ad| (ad.relevance(tags), ad))
        .filter(|(score, _)| *score > 0)
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.cmp(sa)
            .then_with(|| {
                b.click_through_rate()
                    .partial_cmp(&a.click_through_rate())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| b.created_at.cmp(&a.created_at))
    });

    scored.into_iter().take(limit).map(|(_, ad)| ad).collect()
}

/// Per-ad counters for the supplier report.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct AdPerformance {
    pub ad_id: AdId,
    pub title: String,
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: Decimal,
}

impl From<&SupplierAd> for AdPerformance {
    fn from(ad: &SupplierAd) -> Self {
        Self {
            ad_id: ad.id,
            title: ad.title.clone(),
            impressions: ad.impressions,
            clicks: ad.clicks,
            ctr: ad.click_through_rate().round_dp(4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn ad(title: &str, tags: &[&str]) -> SupplierAd {
        SupplierAd::new(
            Uuid::new_v4(),
            AdDraft {
                title: title.to_string(),
                description: String::new(),
                target_tags: tags.iter().map(|t| t.to_string()).collect(),
                price: Amount::new(dec!(40)).unwrap(),
                currency: Currency::new("usd").unwrap(),
            },
        )
        .unwrap()
    }

    fn tags(t: &[&str]) -> Vec<String> {
        t.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ad_requires_tags() {
        let result = SupplierAd::new(
            Uuid::new_v4(),
            AdDraft {
                title: "Kayak hire".to_string(),
                description: String::new(),
                target_tags: vec!["  ".to_string()],
                price: Amount::new(dec!(10)).unwrap(),
                currency: Currency::new("usd").unwrap(),
            },
        );
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_click_through_rate() {
        let mut a = ad("Kayak hire", &["water"]);
        assert_eq!(a.click_through_rate(), Decimal::ZERO);
        a.impressions = 8;
        a.clicks = 2;
        assert_eq!(a.click_through_rate(), dec!(0.25));
    }

    #[test]
    fn test_ranking_prefers_relevance_then_ctr() {
        let mut low_ctr = ad("Two tags, low ctr", &["water", "outdoors"]);
        low_ctr.impressions = 100;
        low_ctr.clicks = 1;
        let mut high_ctr = ad("Two tags, high ctr", &["water", "outdoors"]);
        high_ctr.impressions = 10;
        high_ctr.clicks = 5;
        let one_tag = ad("One tag", &["water"]);
        let unrelated = ad("Unrelated", &["music"]);
        let mut inactive = ad("Inactive", &["water", "outdoors"]);
        inactive.active = false;

        let ranked = rank_for_tags(
            vec![one_tag, unrelated, low_ctr, inactive, high_ctr],
            &tags(&["outdoors", "water"]),
            3,
        );
        let titles: Vec<&str> = ranked.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Two tags, high ctr", "Two tags, low ctr", "One tag"]);
    }

    #[test]
    fn test_ranking_breaks_ties_by_newest() {
        let mut older = ad("Older", &["water"]);
        older.created_at -= Duration::days(1);
        let newer = ad("Newer", &["water"]);

        let ranked = rank_for_tags(vec![older, newer], &tags(&["water"]), 1);
        assert_eq!(ranked[0].title, "Newer");
    }
}
