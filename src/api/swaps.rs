//! Swap request endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::debug;

use crate::api::error::ApiResult;
use crate::api::middleware::Actor;
use crate::api::AppState;
use crate::models::{Swap, SwapId, SwapListing, SwapRequest};

/// POST /api/swaps
pub async fn create_swap(
    State(state): State<AppState>,
    Actor(actor): Actor,
    payload: Result<Json<SwapRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Swap>)> {
    let Json(request) = payload?;
    let swap = state.lifecycle.create_request(actor, request).await?;
    Ok((StatusCode::CREATED, Json(swap)))
}

/// GET /api/swaps
pub async fn list_swaps(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<Json<SwapListing>> {
    let listing = state.lifecycle.list_requests(actor).await?;
    debug!(
        actor = %actor,
        incoming = listing.incoming.len(),
        outgoing = listing.outgoing.len(),
        "Listed swaps"
    );
    Ok(Json(listing))
}

/// PUT /api/swaps/{id}/accept
pub async fn accept_swap(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(swap_id): Path<SwapId>,
) -> ApiResult<Json<Swap>> {
    Ok(Json(state.lifecycle.accept(swap_id, actor).await?))
}

/// PUT /api/swaps/{id}/reject
pub async fn reject_swap(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(swap_id): Path<SwapId>,
) -> ApiResult<Json<Swap>> {
    Ok(Json(state.lifecycle.reject(swap_id, actor).await?))
}

/// PUT /api/swaps/{id}/complete
pub async fn complete_swap(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(swap_id): Path<SwapId>,
) -> ApiResult<Json<Swap>> {
    Ok(Json(state.lifecycle.complete(swap_id, actor).await?))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_swaps).post(create_swap))
        .route("/{id}/accept", put(accept_swap))
        .route("/{id}/reject", put(reject_swap))
        .route("/{id}/complete", put(complete_swap))
}
