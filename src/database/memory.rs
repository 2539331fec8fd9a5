//! In-memory store
//!
//! All tables sit behind one `RwLock`, so every trait method runs against a
//! consistent snapshot and multi-record writes are applied under a single
//! write guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::{LedgerUpdate, RatingRecompute, SwapStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    ProfilePatch, Reputation, Review, Swap, SwapId, SwapListing, SwapStatus, User, UserId,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    user_order: Vec<UserId>,
    swaps: HashMap<SwapId, Swap>,
    swap_order: Vec<SwapId>,
    reviews: Vec<Review>,
}

impl Tables {
    fn ratings_for(&self, user_id: UserId) -> Vec<u8> {
        self.reviews
            .iter()
            .filter(|r| r.reviewed == user_id)
            .map(|r| r.rating)
            .collect()
    }

    /// Newest first. Insertion order breaks timestamp ties.
    fn swaps_where<F>(&self, pred: F) -> Vec<Swap>
    where
        F: Fn(&Swap) -> bool,
    {
        let mut swaps: Vec<Swap> = self
            .swap_order
            .iter()
            .rev()
            .filter_map(|id| self.swaps.get(id))
            .filter(|s| pred(s))
            .cloned()
            .collect();
        swaps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        swaps
    }

    fn reviews_where<F>(&self, pred: F) -> Vec<Review>
    where
        F: Fn(&Review) -> bool,
    {
        let mut reviews: Vec<Review> = self
            .reviews
            .iter()
            .rev()
            .filter(|r| pred(r))
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reviews
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SwapStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::duplicate("user", format!("username {}", user.username)));
        }
        tables.user_order.push(user.id);
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn update_profile(&self, user_id: UserId, patch: ProfilePatch) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::not_found("user", user_id))?;
        patch.apply(user);
        Ok(user.clone())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .user_order
            .iter()
            .filter_map(|id| tables.users.get(id))
            .cloned()
            .collect())
    }

    async fn top_by_skill_points(&self, limit: usize) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| {
            b.reputation
                .skill_points
                .cmp(&a.reputation.skill_points)
                .then_with(|| a.id.cmp(&b.id))
        });
        users.truncate(limit);
        Ok(users)
    }

    async fn insert_swap(&self, swap: &Swap) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let pending_exists = tables.swaps.values().any(|s| {
            s.status == SwapStatus::Pending
                && s.requester == swap.requester
                && s.recipient == swap.recipient
        });
        if pending_exists {
            return Err(StoreError::duplicate(
                "swap",
                format!("pending {} -> {}", swap.requester, swap.recipient),
            ));
        }
        tables.swap_order.push(swap.id);
        tables.swaps.insert(swap.id, swap.clone());
        Ok(())
    }

    async fn get_swap(&self, swap_id: SwapId) -> StoreResult<Option<Swap>> {
        Ok(self.tables.read().await.swaps.get(&swap_id).cloned())
    }

    async fn swaps_for_user(&self, user_id: UserId) -> StoreResult<SwapListing> {
        let tables = self.tables.read().await;
        Ok(SwapListing {
            incoming: tables.swaps_where(|s| s.recipient == user_id),
            outgoing: tables.swaps_where(|s| s.requester == user_id),
        })
    }

    async fn transition_swap(
        &self,
        swap_id: SwapId,
        from: SwapStatus,
        to: SwapStatus,
    ) -> StoreResult<Swap> {
        let mut tables = self.tables.write().await;
        let swap = tables
            .swaps
            .get_mut(&swap_id)
            .ok_or_else(|| StoreError::not_found("swap", swap_id))?;
        if swap.status != from {
            return Err(StoreError::StatusMismatch {
                expected: from,
                actual: swap.status,
            });
        }
        swap.status = to;
        debug!(swap_id = %swap_id, from = %from, to = %to, "Swap transitioned");
        Ok(swap.clone())
    }

    async fn complete_swap(
        &self,
        swap_id: SwapId,
        completed_at: DateTime<Utc>,
        credit: LedgerUpdate<'_>,
    ) -> StoreResult<Swap> {
        let mut tables = self.tables.write().await;
        let swap = tables
            .swaps
            .get(&swap_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("swap", swap_id))?;
        if swap.status != SwapStatus::Accepted {
            return Err(StoreError::StatusMismatch {
                expected: SwapStatus::Accepted,
                actual: swap.status,
            });
        }

        // Work on copies so nothing is written unless both participants resolve.
        let mut requester = tables
            .users
            .get(&swap.requester)
            .map(|u| u.reputation.clone())
            .ok_or_else(|| StoreError::not_found("user", swap.requester))?;
        let mut recipient = tables
            .users
            .get(&swap.recipient)
            .map(|u| u.reputation.clone())
            .ok_or_else(|| StoreError::not_found("user", swap.recipient))?;

        credit(swap.requester, &mut requester);
        credit(swap.recipient, &mut recipient);

        if let Some(user) = tables.users.get_mut(&swap.requester) {
            user.reputation = requester;
        }
        if let Some(user) = tables.users.get_mut(&swap.recipient) {
            user.reputation = recipient;
        }

        let stored = tables
            .swaps
            .get_mut(&swap_id)
            .ok_or_else(|| StoreError::not_found("swap", swap_id))?;
        stored.status = SwapStatus::Completed;
        stored.completed_date = Some(completed_at);
        Ok(stored.clone())
    }

    async fn insert_review(
        &self,
        review: &Review,
        recompute: RatingRecompute<'_>,
    ) -> StoreResult<Reputation> {
        let mut tables = self.tables.write().await;
        if tables
            .reviews
            .iter()
            .any(|r| r.reviewer == review.reviewer && r.swap_id == review.swap_id)
        {
            return Err(StoreError::duplicate(
                "review",
                format!("reviewer {} on swap {}", review.reviewer, review.swap_id),
            ));
        }
        if !tables.users.contains_key(&review.reviewed) {
            return Err(StoreError::not_found("user", review.reviewed));
        }

        tables.reviews.push(review.clone());
        let ratings = tables.ratings_for(review.reviewed);
        let user = tables
            .users
            .get_mut(&review.reviewed)
            .ok_or_else(|| StoreError::not_found("user", review.reviewed))?;
        recompute(review.reviewed, &mut user.reputation, &ratings);
        Ok(user.reputation.clone())
    }

    async fn recompute_rating(
        &self,
        user_id: UserId,
        recompute: RatingRecompute<'_>,
    ) -> StoreResult<Reputation> {
        let mut tables = self.tables.write().await;
        let ratings = tables.ratings_for(user_id);
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::not_found("user", user_id))?;
        recompute(user_id, &mut user.reputation, &ratings);
        Ok(user.reputation.clone())
    }

    async fn reviews_received(&self, user_id: UserId) -> StoreResult<Vec<Review>> {
        Ok(self.tables.read().await.reviews_where(|r| r.reviewed == user_id))
    }

    async fn reviews_given(&self, user_id: UserId) -> StoreResult<Vec<Review>> {
        Ok(self.tables.read().await.reviews_where(|r| r.reviewer == user_id))
    }
}
