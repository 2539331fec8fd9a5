//! Read-only ranking of users by skill points

use serde::Serialize;
use std::sync::Arc;

use crate::database::SwapStore;
use crate::error::SwapResult;
use crate::models::{User, UserId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: UserId,
    pub username: String,
    pub skill_points: u64,
    pub completed_swaps: u32,
    pub badges: Vec<String>,
    pub average_rating: f64,
}

impl From<User> for LeaderboardEntry {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            skill_points: user.reputation.skill_points,
            completed_swaps: user.reputation.completed_swaps,
            badges: user.reputation.badges,
            average_rating: user.reputation.average_rating,
        }
    }
}

pub struct LeaderboardView {
    store: Arc<dyn SwapStore>,
    size: usize,
}

impl LeaderboardView {
    pub const DEFAULT_SIZE: usize = 20;

    pub fn new(store: Arc<dyn SwapStore>, size: usize) -> Self {
        Self { store, size }
    }

    /// Configured top-N
    pub async fn standings(&self) -> SwapResult<Vec<LeaderboardEntry>> {
        self.top(self.size).await
    }

    /// Skill points descending, ties broken by user id. Never more than the
    /// configured size.
    pub async fn top(&self, n: usize) -> SwapResult<Vec<LeaderboardEntry>> {
        let users = self.store.top_by_skill_points(n.min(self.size)).await?;
        Ok(users.into_iter().map(LeaderboardEntry::from).collect())
    }
}
