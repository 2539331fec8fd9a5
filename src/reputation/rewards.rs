//! Reward schedule and badge table
//!
//! Every completed swap pays both participants the same reward. Badges are
//! tied to completed-swap milestones and are never awarded twice.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Badge milestones, ascending by completed swaps
pub const BADGE_TABLE: [(u32, &str); 3] = [
    (1, "First Swap"),
    (5, "Skill Swapper"),
    (10, "Master Exchanger"),
];

/// How badge milestones are matched against the completed-swap counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgePolicy {
    /// Award once the counter is at or past the milestone
    #[default]
    Threshold,
    /// Award only when the counter equals the milestone
    Exact,
}

impl BadgePolicy {
    pub fn qualifies(&self, completed_swaps: u32, milestone: u32) -> bool {
        match self {
            BadgePolicy::Threshold => completed_swaps >= milestone,
            BadgePolicy::Exact => completed_swaps == milestone,
        }
    }
}

impl fmt::Display for BadgePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BadgePolicy::Threshold => f.write_str("threshold"),
            BadgePolicy::Exact => f.write_str("exact"),
        }
    }
}

impl FromStr for BadgePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "threshold" => Ok(BadgePolicy::Threshold),
            "exact" => Ok(BadgePolicy::Exact),
            other => Err(format!("unknown badge policy: {}", other)),
        }
    }
}

/// Amounts paid per completed swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSchedule {
    /// Skill points per completed swap
    pub points_per_swap: u64,

    /// Credits per completed swap
    pub credits_per_swap: u64,

    /// Credits a newly registered user starts with
    pub starting_credits: u64,

    pub badge_policy: BadgePolicy,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            points_per_swap: 10,
            credits_per_swap: 5,
            starting_credits: 10,
            badge_policy: BadgePolicy::Threshold,
        }
    }
}
