//! User, skill directory and leaderboard endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::error::ApiResult;
use crate::api::middleware::Actor;
use crate::api::AppState;
use crate::leaderboard::LeaderboardEntry;
use crate::models::{NewUser, ProfilePatch, User, UserId};

#[derive(Debug, Deserialize)]
pub struct SkillQuery {
    pub skill: String,
}

/// POST /api/users
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(new_user) = payload?;
    let user = state.directory.register(new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<Json<User>> {
    Ok(Json(state.directory.get_profile(actor).await?))
}

/// PUT /api/users/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Actor(actor): Actor,
    payload: Result<Json<ProfilePatch>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(patch) = payload?;
    Ok(Json(state.directory.update_profile(actor, patch).await?))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.directory.get_profile(user_id).await?))
}

/// GET /api/skills/all
pub async fn all_skills(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.directory.all_skills().await?))
}

/// GET /api/skills/users
pub async fn all_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.directory.all_users().await?))
}

/// GET /api/skills/users/bySkill?skill=
pub async fn users_with_skill(
    State(state): State<AppState>,
    query: Result<Query<SkillQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<User>>> {
    let Query(query) = query?;
    Ok(Json(state.directory.users_with_skill(&query.skill).await?))
}

/// GET /api/leaderboard
pub async fn leaderboard(State(state): State<AppState>) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(state.leaderboard.standings().await?))
}

pub fn create_user_router() -> Router<AppState> {
    Router::new()
        .route("/", post(register))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/{id}", get(get_user))
}

pub fn create_skill_router() -> Router<AppState> {
    Router::new()
        .route("/all", get(all_skills))
        .route("/users", get(all_users))
        .route("/users/bySkill", get(users_with_skill))
}
