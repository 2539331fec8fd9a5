//! Review endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::error::ApiResult;
use crate::api::middleware::Actor;
use crate::api::AppState;
use crate::error::SwapError;
use crate::models::{Review, SwapId, UserId};
use crate::review::{MAX_RATING, MIN_RATING};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    pub swap_id: SwapId,
    /// Kept loose so fractional or oversized values reach rating validation
    pub rating: serde_json::Number,
    #[serde(default)]
    pub comment: Option<String>,
}

impl SubmitReviewRequest {
    fn rating(&self) -> Result<i64, SwapError> {
        self.rating
            .as_i64()
            .ok_or_else(|| {
                SwapError::invalid_input(format!(
                    "rating must be an integer between {} and {}",
                    MIN_RATING, MAX_RATING
                ))
            })
    }
}

/// POST /api/reviews
pub async fn submit_review(
    State(state): State<AppState>,
    Actor(actor): Actor,
    payload: Result<Json<SubmitReviewRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let Json(request) = payload?;
    let rating = request.rating()?;
    let review = state
        .reviews
        .submit(actor, request.swap_id, rating, request.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/reviews/user/{user_id}
pub async fn reviews_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(state.reviews.list_received_by(user_id).await?))
}

/// GET /api/reviews/my
pub async fn my_reviews(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(state.reviews.list_given_by(actor).await?))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_review))
        .route("/user/{user_id}", get(reviews_for_user))
        .route("/my", get(my_reviews))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_must_be_integer() {
        let parse = |body: &str| serde_json::from_str::<SubmitReviewRequest>(body).unwrap();
        let swap = uuid::Uuid::new_v4();

        let ok = parse(&format!(r#"{{"swapId":"{}","rating":4}}"#, swap));
        assert_eq!(ok.rating().unwrap(), 4);

        let fractional = parse(&format!(r#"{{"swapId":"{}","rating":4.5}}"#, swap));
        assert!(matches!(fractional.rating(), Err(SwapError::InvalidInput(_))));
    }
}
