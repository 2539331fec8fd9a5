//! User directory: registration, profiles and skill lookups
//!
//! Profile edits touch only the descriptive fields. Reputation fields are
//! owned by the ledger and cannot be written from here.

use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::SwapStore;
use crate::error::{StoreError, SwapError, SwapResult};
use crate::models::{normalize_skills, NewUser, ProfilePatch, Reputation, User, UserId};
use crate::reputation::RewardSchedule;

pub struct UserDirectory {
    store: Arc<dyn SwapStore>,
    schedule: RewardSchedule,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn SwapStore>, schedule: RewardSchedule) -> Self {
        Self { store, schedule }
    }

    pub async fn register(&self, new_user: NewUser) -> SwapResult<User> {
        let username = new_user.username.trim();
        if username.is_empty() {
            return Err(SwapError::invalid_input("username is required"));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            skills_offered: normalize_skills(new_user.skills_offered),
            skills_wanted: normalize_skills(new_user.skills_wanted),
            availability: new_user.availability,
            bio: new_user.bio,
            reputation: Reputation::new(self.schedule.starting_credits),
            created_at: Utc::now(),
        };

        self.store.insert_user(&user).await.map_err(|e| match e {
            StoreError::Duplicate { .. } => {
                SwapError::conflict(format!("username {} is taken", user.username))
            }
            other => other.into(),
        })?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    pub async fn get_profile(&self, user_id: UserId) -> SwapResult<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| SwapError::not_found("user", user_id))
    }

    pub async fn update_profile(&self, user_id: UserId, patch: ProfilePatch) -> SwapResult<User> {
        let user = self.store.update_profile(user_id, patch).await?;
        debug!(user_id = %user_id, "Profile updated");
        Ok(user)
    }

    /// Every registered user, oldest first
    pub async fn all_users(&self) -> SwapResult<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    /// Sorted union of every offered and wanted skill
    pub async fn all_skills(&self) -> SwapResult<Vec<String>> {
        let skills: BTreeSet<String> = self
            .store
            .list_users()
            .await?
            .into_iter()
            .flat_map(|u| u.skills_offered.into_iter().chain(u.skills_wanted))
            .collect();
        Ok(skills.into_iter().collect())
    }

    /// Users offering or wanting `skill`
    pub async fn users_with_skill(&self, skill: &str) -> SwapResult<Vec<User>> {
        let skill = skill.trim();
        if skill.is_empty() {
            return Err(SwapError::invalid_input("skill parameter is required"));
        }

        Ok(self
            .store
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.skills_offered.contains(skill) || u.skills_wanted.contains(skill))
            .collect())
    }
}
