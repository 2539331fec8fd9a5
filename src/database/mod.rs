//! Storage for users, swaps and reviews
//!
//! [`SwapStore`] is the document store the core runs against. Every method is
//! a single atomic unit: conditional swap transitions are compare-and-set, and
//! the multi-record writes (completion credits, review + rating) commit
//! all-or-nothing.
//!
//! Two implementations:
//! - [`MemoryStore`] - single-lock in-memory tables, for tests and local runs
//! - [`DatabasePool`] - PostgreSQL via sqlx

pub mod memory;
pub mod pool;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::models::{
    ProfilePatch, Reputation, Review, Swap, SwapId, SwapListing, SwapStatus, User, UserId,
};

pub use memory::MemoryStore;
pub use pool::DatabasePool;

/// Ledger rule applied to one participant's reputation during completion
pub type LedgerUpdate<'a> = &'a (dyn Fn(UserId, &mut Reputation) + Send + Sync);

/// Ledger rule that rebuilds rating fields from the full list of received ratings
pub type RatingRecompute<'a> = &'a (dyn Fn(UserId, &mut Reputation, &[u8]) + Send + Sync);

#[async_trait]
pub trait SwapStore: Send + Sync {
    // ==================== Users ====================

    /// Insert a new user. `Duplicate` if the username is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>>;

    /// Apply a profile edit. `NotFound` if the user is absent.
    async fn update_profile(&self, user_id: UserId, patch: ProfilePatch) -> StoreResult<User>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Users sorted by skill points descending, ties by id ascending
    async fn top_by_skill_points(&self, limit: usize) -> StoreResult<Vec<User>>;

    // ==================== Swaps ====================

    /// Insert a pending swap. `Duplicate` if a pending swap already exists
    /// for the same (requester, recipient) pair.
    async fn insert_swap(&self, swap: &Swap) -> StoreResult<()>;

    async fn get_swap(&self, swap_id: SwapId) -> StoreResult<Option<Swap>>;

    /// Swaps where the user is recipient (incoming) or requester (outgoing),
    /// newest first
    async fn swaps_for_user(&self, user_id: UserId) -> StoreResult<SwapListing>;

    /// Move a swap from `from` to `to` only if it is still in `from`.
    /// `StatusMismatch` otherwise; the record is left untouched.
    async fn transition_swap(
        &self,
        swap_id: SwapId,
        from: SwapStatus,
        to: SwapStatus,
    ) -> StoreResult<Swap>;

    /// accepted → completed, stamp `completed_date`, and apply `credit` to
    /// both participants, as one unit.
    async fn complete_swap(
        &self,
        swap_id: SwapId,
        completed_at: DateTime<Utc>,
        credit: LedgerUpdate<'_>,
    ) -> StoreResult<Swap>;

    // ==================== Reviews ====================

    /// Persist a review and rebuild the reviewed user's rating, as one unit.
    /// `Duplicate` if the reviewer already reviewed this swap.
    async fn insert_review(&self, review: &Review, recompute: RatingRecompute<'_>)
        -> StoreResult<Reputation>;

    /// Rebuild a user's rating from their persisted reviews
    async fn recompute_rating(
        &self,
        user_id: UserId,
        recompute: RatingRecompute<'_>,
    ) -> StoreResult<Reputation>;

    /// Reviews where `reviewed == user_id`, newest first
    async fn reviews_received(&self, user_id: UserId) -> StoreResult<Vec<Review>>;

    /// Reviews where `reviewer == user_id`, newest first
    async fn reviews_given(&self, user_id: UserId) -> StoreResult<Vec<Review>>;
}
