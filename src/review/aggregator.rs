//! Review Aggregator
//!
//! Reviews are written once per (reviewer, swap), only after the swap has
//! completed, and only by one of its two participants. Each accepted review
//! triggers a full rating recompute for the reviewed user.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::SwapStore;
use crate::error::{SwapError, SwapResult};
use crate::models::{Review, SwapId, SwapStatus, UserId};
use crate::reputation::ReputationLedger;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

pub struct ReviewAggregator {
    store: Arc<dyn SwapStore>,
    ledger: Arc<ReputationLedger>,
}

impl ReviewAggregator {
    pub fn new(store: Arc<dyn SwapStore>, ledger: Arc<ReputationLedger>) -> Self {
        Self { store, ledger }
    }

    pub async fn submit(
        &self,
        reviewer_id: UserId,
        swap_id: SwapId,
        rating: i64,
        comment: Option<String>,
    ) -> SwapResult<Review> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(SwapError::invalid_input(format!(
                "rating must be an integer between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }

        let swap = self
            .store
            .get_swap(swap_id)
            .await?
            .ok_or_else(|| SwapError::not_found("swap", swap_id))?;

        if swap.status != SwapStatus::Completed {
            return Err(SwapError::invalid_state(format!(
                "can only review completed swaps, swap is {}",
                swap.status
            )));
        }

        let reviewed_id = swap
            .counterpart(reviewer_id)
            .ok_or_else(|| SwapError::forbidden("only a participant may review this swap"))?;

        let review = Review {
            id: Uuid::new_v4(),
            reviewer: reviewer_id,
            reviewed: reviewed_id,
            swap_id,
            rating: rating as u8,
            comment: comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            created_at: Utc::now(),
        };

        let reputation = self.ledger.record_review(&review).await?;

        info!(
            review_id = %review.id,
            swap_id = %swap_id,
            reviewer = %reviewer_id,
            reviewed = %reviewed_id,
            rating = review.rating,
            average_rating = reputation.average_rating,
            "Review submitted"
        );
        Ok(review)
    }

    /// Reviews the user received, newest first
    pub async fn list_received_by(&self, user_id: UserId) -> SwapResult<Vec<Review>> {
        let reviews = self.store.reviews_received(user_id).await?;
        debug!(user_id = %user_id, count = reviews.len(), "Listed received reviews");
        Ok(reviews)
    }

    /// Reviews the user wrote, newest first
    pub async fn list_given_by(&self, user_id: UserId) -> SwapResult<Vec<Review>> {
        let reviews = self.store.reviews_given(user_id).await?;
        debug!(user_id = %user_id, count = reviews.len(), "Listed given reviews");
        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::directory::UserDirectory;
    use crate::models::{NewUser, SwapRequest};
    use crate::reputation::RewardSchedule;
    use crate::swap::SwapLifecycle;

    struct Fixture {
        reviews: ReviewAggregator,
        lifecycle: SwapLifecycle,
        directory: UserDirectory,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn SwapStore> = Arc::new(MemoryStore::new());
        let ledger = Arc::new(ReputationLedger::new(store.clone(), RewardSchedule::default()));
        Fixture {
            reviews: ReviewAggregator::new(store.clone(), ledger.clone()),
            lifecycle: SwapLifecycle::new(store.clone(), ledger),
            directory: UserDirectory::new(store, RewardSchedule::default()),
        }
    }

    async fn user(f: &Fixture, name: &str) -> UserId {
        f.directory
            .register(NewUser {
                username: name.to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap()
            .id
    }

    async fn swap(f: &Fixture, requester: UserId, recipient: UserId, complete: bool) -> SwapId {
        let swap = f
            .lifecycle
            .create_request(
                requester,
                SwapRequest {
                    recipient_id: recipient,
                    requester_skill: "Knitting".to_string(),
                    recipient_skill: "Welding".to_string(),
                    message: None,
                },
            )
            .await
            .unwrap();
        if complete {
            f.lifecycle.accept(swap.id, recipient).await.unwrap();
            f.lifecycle.complete(swap.id, requester).await.unwrap();
        }
        swap.id
    }

    #[tokio::test]
    async fn test_submit_sets_reviewed_to_counterpart() {
        let f = fixture();
        let (a, b) = (user(&f, "a").await, user(&f, "b").await);
        let swap_id = swap(&f, a, b, true).await;

        let review = f
            .reviews
            .submit(b, swap_id, 4, Some("  patient and clear ".to_string()))
            .await
            .unwrap();

        assert_eq!(review.reviewer, b);
        assert_eq!(review.reviewed, a);
        assert_eq!(review.comment.as_deref(), Some("patient and clear"));

        let rep = f.directory.get_profile(a).await.unwrap().reputation;
        assert_eq!(rep.total_ratings, 1);
        assert_eq!(rep.average_rating, 4.0);
    }

    #[tokio::test]
    async fn test_rating_out_of_range() {
        let f = fixture();
        for rating in [0, 6, -1] {
            let err = f
                .reviews
                .submit(Uuid::new_v4(), Uuid::new_v4(), rating, None)
                .await
                .unwrap_err();
            assert!(matches!(err, SwapError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn test_review_requires_completed_swap() {
        let f = fixture();
        let (a, b) = (user(&f, "a").await, user(&f, "b").await);
        let swap_id = swap(&f, a, b, false).await;

        let err = f.reviews.submit(a, swap_id, 5, None).await.unwrap_err();
        assert!(matches!(err, SwapError::InvalidState(_)));

        let err = f.reviews.submit(a, Uuid::new_v4(), 5, None).await.unwrap_err();
        assert!(matches!(err, SwapError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_outsider_cannot_review() {
        let f = fixture();
        let (a, b, c) = (user(&f, "a").await, user(&f, "b").await, user(&f, "c").await);
        let swap_id = swap(&f, a, b, true).await;

        let err = f.reviews.submit(c, swap_id, 5, None).await.unwrap_err();
        assert!(matches!(err, SwapError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_duplicate_review_conflicts_without_side_effects() {
        let f = fixture();
        let (a, b) = (user(&f, "a").await, user(&f, "b").await);
        let swap_id = swap(&f, a, b, true).await;

        f.reviews.submit(a, swap_id, 5, None).await.unwrap();
        let before = f.directory.get_profile(b).await.unwrap();

        let err = f.reviews.submit(a, swap_id, 1, None).await.unwrap_err();
        assert!(matches!(err, SwapError::Conflict(_)));

        let after = f.directory.get_profile(b).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(f.reviews.list_received_by(b).await.unwrap().len(), 1);

        // The other participant may still review
        f.reviews.submit(b, swap_id, 3, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_listings() {
        let f = fixture();
        let (a, b, c) = (user(&f, "a").await, user(&f, "b").await, user(&f, "c").await);
        let s1 = swap(&f, a, b, true).await;
        let s2 = swap(&f, c, b, true).await;

        let first = f.reviews.submit(a, s1, 5, None).await.unwrap();
        let second = f.reviews.submit(c, s2, 2, None).await.unwrap();
        f.reviews.submit(b, s1, 4, None).await.unwrap();

        let received: Vec<_> = f
            .reviews
            .list_received_by(b)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(received, vec![second.id, first.id]);
        assert_eq!(f.reviews.list_given_by(b).await.unwrap().len(), 1);
        assert!(f.reviews.list_given_by(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
