//! HTTP API for the skill swap service
//!
//! Provides REST endpoints for:
//! - Users and profiles
//! - Skill directory
//! - Swap requests and their transitions
//! - Reviews and the leaderboard
//!
//! Handlers only translate between HTTP and the domain components; every
//! rule lives in [`SwapLifecycle`], [`ReviewAggregator`] and friends.

pub mod error;
pub mod middleware;
pub mod reviews;
pub mod swaps;
pub mod users;

use axum::{middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::database::SwapStore;
use crate::directory::UserDirectory;
use crate::leaderboard::LeaderboardView;
use crate::reputation::{ReputationLedger, RewardSchedule};
use crate::review::ReviewAggregator;
use crate::swap::SwapLifecycle;

pub use error::{ApiError, ApiResult};
pub use middleware::{
    auth_middleware, body_size_middleware, logging_middleware, rate_limit_middleware,
    security_headers_middleware, Actor, RateLimiter, SecurityMiddlewareConfig, SecurityState,
    ACTOR_HEADER,
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<UserDirectory>,
    pub lifecycle: Arc<SwapLifecycle>,
    pub reviews: Arc<ReviewAggregator>,
    pub leaderboard: Arc<LeaderboardView>,
}

impl AppState {
    /// Wire every component over one store
    pub fn new(store: Arc<dyn SwapStore>, schedule: RewardSchedule, leaderboard_size: usize) -> Self {
        let ledger = Arc::new(ReputationLedger::new(store.clone(), schedule.clone()));
        Self {
            directory: Arc::new(UserDirectory::new(store.clone(), schedule)),
            lifecycle: Arc::new(SwapLifecycle::new(store.clone(), ledger.clone())),
            reviews: Arc::new(ReviewAggregator::new(store.clone(), ledger)),
            leaderboard: Arc::new(LeaderboardView::new(store, leaderboard_size)),
        }
    }
}

/// Build the full application router with its middleware stack
pub fn create_router(state: AppState, security: SecurityState) -> Router {
    let api = Router::new()
        .nest("/users", users::create_user_router())
        .nest("/skills", users::create_skill_router())
        .nest("/swaps", swaps::create_router())
        .nest("/reviews", reviews::create_router())
        .route("/leaderboard", get(users::leaderboard));

    Router::new()
        .nest("/api", api)
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        // Layers added last wrap the ones above them
        .layer(axum_middleware::from_fn_with_state(
            security.clone(),
            body_size_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            security.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            security.clone(),
            rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            security,
            logging_middleware,
        ))
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
}
