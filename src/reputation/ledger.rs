//! Reputation Ledger
//!
//! Owns the arithmetic applied to a user's reputation fields. The swap
//! lifecycle and the review aggregator are its only callers; the store runs
//! the ledger's rules inside its own atomic unit so a participant is never
//! left half-credited.

use std::sync::Arc;
use tracing::{debug, info};

use crate::database::SwapStore;
use crate::error::{StoreError, SwapError, SwapResult};
use crate::models::{Reputation, Review, UserId};
use crate::reputation::{RewardSchedule, BADGE_TABLE};

pub struct ReputationLedger {
    store: Arc<dyn SwapStore>,
    schedule: RewardSchedule,
}

impl ReputationLedger {
    pub fn new(store: Arc<dyn SwapStore>, schedule: RewardSchedule) -> Self {
        Self { store, schedule }
    }

    /// Pay one completed swap into `reputation` and award any badge the
    /// updated counter now qualifies for. Returns the newly awarded badges.
    ///
    /// Callers guarantee this runs at most once per (swap, participant).
    pub fn credit_completion(&self, user_id: UserId, reputation: &mut Reputation) -> Vec<&'static str> {
        reputation.skill_points += self.schedule.points_per_swap;
        reputation.credits += self.schedule.credits_per_swap;
        reputation.completed_swaps += 1;

        let mut awarded = Vec::new();
        for (milestone, badge) in BADGE_TABLE {
            if self
                .schedule
                .badge_policy
                .qualifies(reputation.completed_swaps, milestone)
                && !reputation.has_badge(badge)
            {
                reputation.badges.push(badge.to_string());
                awarded.push(badge);
            }
        }

        info!(
            user_id = %user_id,
            skill_points = reputation.skill_points,
            credits = reputation.credits,
            completed_swaps = reputation.completed_swaps,
            "Credited swap completion"
        );
        for badge in &awarded {
            info!(user_id = %user_id, badge = %badge, "Badge awarded");
        }

        awarded
    }

    /// Replace the rating fields with the mean and count of `ratings`
    pub fn apply_ratings(user_id: UserId, reputation: &mut Reputation, ratings: &[u8]) {
        reputation.total_ratings = ratings.len() as u32;
        reputation.average_rating = if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64
        };

        debug!(
            user_id = %user_id,
            average_rating = reputation.average_rating,
            total_ratings = reputation.total_ratings,
            "Recomputed rating"
        );
    }

    /// Persist `review` and rebuild the reviewed user's rating in one unit
    pub async fn record_review(&self, review: &Review) -> SwapResult<Reputation> {
        self.store
            .insert_review(review, &Self::apply_ratings)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate { .. } => {
                    SwapError::conflict("review already exists for this swap")
                }
                other => other.into(),
            })
    }

    /// Recompute a user's rating from every persisted review they received
    pub async fn recompute_rating(&self, user_id: UserId) -> SwapResult<Reputation> {
        let reputation = self
            .store
            .recompute_rating(user_id, &Self::apply_ratings)
            .await?;
        Ok(reputation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::reputation::BadgePolicy;
    use uuid::Uuid;

    fn ledger(policy: BadgePolicy) -> ReputationLedger {
        let schedule = RewardSchedule {
            badge_policy: policy,
            ..RewardSchedule::default()
        };
        ReputationLedger::new(Arc::new(MemoryStore::new()), schedule)
    }

    #[test]
    fn test_credit_completion_amounts() {
        let ledger = ledger(BadgePolicy::Threshold);
        let mut rep = Reputation::new(10);

        let awarded = ledger.credit_completion(Uuid::new_v4(), &mut rep);

        assert_eq!(rep.skill_points, 10);
        assert_eq!(rep.credits, 15);
        assert_eq!(rep.completed_swaps, 1);
        assert_eq!(awarded, vec!["First Swap"]);
        assert_eq!(rep.badges, vec!["First Swap".to_string()]);
    }

    #[test]
    fn test_badges_awarded_once_through_ten_swaps() {
        let ledger = ledger(BadgePolicy::Threshold);
        let mut rep = Reputation::new(0);
        let user = Uuid::new_v4();

        for _ in 0..12 {
            ledger.credit_completion(user, &mut rep);
        }

        assert_eq!(
            rep.badges,
            vec!["First Swap", "Skill Swapper", "Master Exchanger"]
        );
        assert_eq!(rep.skill_points, 120);
        assert_eq!(rep.credits, 60);
    }

    #[test]
    fn test_threshold_policy_catches_up_skipped_milestones() {
        let ledger = ledger(BadgePolicy::Threshold);
        let mut rep = Reputation::new(0);
        rep.completed_swaps = 6;

        let awarded = ledger.credit_completion(Uuid::new_v4(), &mut rep);

        assert_eq!(awarded, vec!["First Swap", "Skill Swapper"]);
    }

    #[test]
    fn test_exact_policy_skips_passed_milestones() {
        let ledger = ledger(BadgePolicy::Exact);
        let mut rep = Reputation::new(0);
        rep.completed_swaps = 6;

        let awarded = ledger.credit_completion(Uuid::new_v4(), &mut rep);

        assert!(awarded.is_empty());
        assert!(rep.badges.is_empty());
    }

    #[test]
    fn test_apply_ratings_mean() {
        let mut rep = Reputation::new(0);
        ReputationLedger::apply_ratings(Uuid::new_v4(), &mut rep, &[5, 3, 4]);
        assert_eq!(rep.total_ratings, 3);
        assert!((rep.average_rating - 4.0).abs() < f64::EPSILON);

        ReputationLedger::apply_ratings(Uuid::new_v4(), &mut rep, &[]);
        assert_eq!(rep.total_ratings, 0);
        assert_eq!(rep.average_rating, 0.0);
    }

    #[tokio::test]
    async fn test_recompute_rating_rebuilds_from_stored_reviews() {
        use crate::models::{Availability, User};
        use chrono::Utc;
        use std::collections::BTreeSet;

        let store = Arc::new(MemoryStore::new());
        let ledger = ReputationLedger::new(store.clone(), RewardSchedule::default());
        let user = User {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            skills_offered: BTreeSet::new(),
            skills_wanted: BTreeSet::new(),
            availability: Availability::Flexible,
            bio: String::new(),
            reputation: Reputation::new(10),
            created_at: Utc::now(),
        };
        store.insert_user(&user).await.unwrap();

        // Persist reviews without touching the cached rating fields
        let skip = |_: UserId, _: &mut Reputation, _: &[u8]| {};
        for rating in [2u8, 5] {
            let review = Review {
                id: Uuid::new_v4(),
                reviewer: Uuid::new_v4(),
                reviewed: user.id,
                swap_id: Uuid::new_v4(),
                rating,
                comment: None,
                created_at: Utc::now(),
            };
            store.insert_review(&review, &skip).await.unwrap();
        }
        let stored = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.reputation.total_ratings, 0);

        let rep = ledger.recompute_rating(user.id).await.unwrap();
        assert_eq!(rep.total_ratings, 2);
        assert!((rep.average_rating - 3.5).abs() < f64::EPSILON);
        assert_eq!(store.get_user(user.id).await.unwrap().unwrap().reputation, rep);
    }
}
