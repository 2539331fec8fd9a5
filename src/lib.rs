//! SkillSwap
//!
//! Peer-to-peer skill exchange service. Users propose swaps of one skill for
//! another, move them through a small state machine, earn points, credits and
//! badges when a swap completes, and rate each other afterwards.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs          - Crate root with re-exports
//! ├── main.rs         - Server entrypoint
//! ├── config.rs       - Configuration management
//! ├── error.rs        - Domain and store error types
//! ├── models.rs       - Users, swaps, reviews
//! ├── directory.rs    - Registration, profiles, skill lookups
//! ├── leaderboard.rs  - Top users by skill points
//! ├── swap/           - Swap request state machine
//! ├── review/         - Review submission and listings
//! ├── reputation/     - Ledger of points, credits, badges and ratings
//! ├── database/       - Store trait, in-memory and PostgreSQL backends
//! └── api/            - HTTP endpoints and middleware
//! ```

pub mod api;
pub mod config;
pub mod database;
pub mod directory;
pub mod error;
pub mod leaderboard;
pub mod models;
pub mod reputation;
pub mod review;
pub mod swap;

// Re-export main types for convenience
pub use config::SwapConfig;
pub use database::{DatabasePool, MemoryStore, SwapStore};
pub use directory::UserDirectory;
pub use error::{StoreError, SwapError, SwapResult};
pub use leaderboard::{LeaderboardEntry, LeaderboardView};
pub use models::{
    Availability, NewUser, ProfilePatch, Reputation, Review, Swap, SwapListing, SwapRequest,
    SwapStatus, User,
};
pub use reputation::{BadgePolicy, ReputationLedger, RewardSchedule, BADGE_TABLE};
pub use review::ReviewAggregator;
pub use swap::SwapLifecycle;

// Re-export API types
pub use api::{create_router, AppState, SecurityMiddlewareConfig, SecurityState};
