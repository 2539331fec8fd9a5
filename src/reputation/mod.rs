//! Reputation ledger for skill swaps
//!
//! Tracks what each user has earned by completing swaps and how they have
//! been rated by their swap partners.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐  credit_completion  ┌──────────────────┐  recompute_rating  ┌─────────────────┐
//! │ SwapLifecycle   │────────────────────►│ ReputationLedger │◄───────────────────│ ReviewAggregator│
//! └─────────────────┘                     └──────────────────┘                    └─────────────────┘
//!                                                  │
//!                                                  ▼
//!                                         ┌──────────────────┐
//!                                         │ RewardSchedule   │
//!                                         │ + badge table    │
//!                                         └──────────────────┘
//! ```
//!
//! ## Reward Model
//!
//! - Each completed swap pays both participants +10 skill points, +5 credits
//! - Badges at 1, 5 and 10 completed swaps, each awarded at most once
//! - Average rating is always recomputed from the full review set

mod ledger;
mod rewards;

pub use ledger::ReputationLedger;
pub use rewards::{BadgePolicy, RewardSchedule, BADGE_TABLE};
