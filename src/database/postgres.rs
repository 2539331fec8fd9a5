//! PostgreSQL implementation of [`SwapStore`]
//!
//! Swap transitions are a single conditional `UPDATE ... WHERE status = $from`.
//! Completion and review submission run in one transaction each; participant
//! rows are locked with `FOR UPDATE` (in id order) before the ledger rule runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::Row;
use tracing::{debug, warn};

use super::{DatabasePool, LedgerUpdate, RatingRecompute, SwapStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    ProfilePatch, Reputation, Review, Swap, SwapId, SwapListing, SwapStatus, User, UserId,
};

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let availability: String = row.try_get("availability")?;
    let skills_offered: Vec<String> = row.try_get("skills_offered")?;
    let skills_wanted: Vec<String> = row.try_get("skills_wanted")?;
    let skill_points: i64 = row.try_get("skill_points")?;
    let credits: i64 = row.try_get("credits")?;
    let completed_swaps: i32 = row.try_get("completed_swaps")?;
    let total_ratings: i32 = row.try_get("total_ratings")?;

    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        skills_offered: skills_offered.into_iter().collect(),
        skills_wanted: skills_wanted.into_iter().collect(),
        availability: availability.parse().map_err(StoreError::Database)?,
        bio: row.try_get("bio")?,
        reputation: Reputation {
            skill_points: skill_points as u64,
            credits: credits as u64,
            completed_swaps: completed_swaps as u32,
            badges: row.try_get("badges")?,
            average_rating: row.try_get("average_rating")?,
            total_ratings: total_ratings as u32,
        },
        created_at: row.try_get("created_at")?,
    })
}

fn swap_from_row(row: &PgRow) -> StoreResult<Swap> {
    let status: String = row.try_get("status")?;
    Ok(Swap {
        id: row.try_get("id")?,
        requester: row.try_get("requester")?,
        recipient: row.try_get("recipient")?,
        requester_skill: row.try_get("requester_skill")?,
        recipient_skill: row.try_get("recipient_skill")?,
        status: status.parse().map_err(StoreError::Database)?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
        completed_date: row.try_get("completed_date")?,
    })
}

fn review_from_row(row: &PgRow) -> StoreResult<Review> {
    let rating: i16 = row.try_get("rating")?;
    Ok(Review {
        id: row.try_get("id")?,
        reviewer: row.try_get("reviewer")?,
        reviewed: row.try_get("reviewed")?,
        swap_id: row.try_get("swap_id")?,
        rating: rating as u8,
        comment: row.try_get("comment")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn lock_user(conn: &mut PgConnection, user_id: UserId) -> StoreResult<User> {
    let row = sqlx::query("SELECT * FROM skillswap.users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| StoreError::not_found("user", user_id))?;
    user_from_row(&row)
}

async fn write_reputation(
    conn: &mut PgConnection,
    user_id: UserId,
    reputation: &Reputation,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE skillswap.users SET
            skill_points = $2,
            credits = $3,
            completed_swaps = $4,
            badges = $5,
            average_rating = $6,
            total_ratings = $7
        WHERE id = $1
    "#,
    )
    .bind(user_id)
    .bind(reputation.skill_points as i64)
    .bind(reputation.credits as i64)
    .bind(reputation.completed_swaps as i32)
    .bind(&reputation.badges)
    .bind(reputation.average_rating)
    .bind(reputation.total_ratings as i32)
    .execute(conn)
    .await?;
    Ok(())
}

async fn ratings_for(conn: &mut PgConnection, user_id: UserId) -> StoreResult<Vec<u8>> {
    let ratings: Vec<i16> =
        sqlx::query_scalar("SELECT rating FROM skillswap.reviews WHERE reviewed = $1")
            .bind(user_id)
            .fetch_all(conn)
            .await?;
    Ok(ratings.into_iter().map(|r| r as u8).collect())
}

impl DatabasePool {
    /// Explain why a conditional swap update matched no row
    async fn swap_mismatch(&self, swap_id: SwapId, expected: SwapStatus) -> StoreError {
        let status: Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar("SELECT status FROM skillswap.swaps WHERE id = $1")
                .bind(swap_id)
                .fetch_optional(self.pool())
                .await;

        match status {
            Ok(None) => StoreError::not_found("swap", swap_id),
            Ok(Some(actual)) => match actual.parse() {
                Ok(actual) => StoreError::StatusMismatch { expected, actual },
                Err(e) => StoreError::Database(e),
            },
            Err(e) => e.into(),
        }
    }
}

#[async_trait]
impl SwapStore for DatabasePool {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let offered: Vec<String> = user.skills_offered.iter().cloned().collect();
        let wanted: Vec<String> = user.skills_wanted.iter().cloned().collect();

        sqlx::query(
            r#"
            INSERT INTO skillswap.users
                (id, username, skills_offered, skills_wanted, availability, bio,
                 skill_points, credits, completed_swaps, badges, average_rating,
                 total_ratings, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(offered)
        .bind(wanted)
        .bind(user.availability.as_str())
        .bind(&user.bio)
        .bind(user.reputation.skill_points as i64)
        .bind(user.reputation.credits as i64)
        .bind(user.reputation.completed_swaps as i32)
        .bind(&user.reputation.badges)
        .bind(user.reputation.average_rating)
        .bind(user.reputation.total_ratings as i32)
        .bind(user.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Duplicate { .. } => {
                StoreError::duplicate("user", format!("username {}", user.username))
            }
            other => other,
        })?;

        debug!(user_id = %user.id, "User inserted");
        Ok(())
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM skillswap.users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_profile(&self, user_id: UserId, patch: ProfilePatch) -> StoreResult<User> {
        let mut tx = self.pool().begin().await?;
        let mut user = lock_user(&mut tx, user_id).await?;
        patch.apply(&mut user);

        let offered: Vec<String> = user.skills_offered.iter().cloned().collect();
        let wanted: Vec<String> = user.skills_wanted.iter().cloned().collect();
        sqlx::query(
            r#"
            UPDATE skillswap.users SET
                skills_offered = $2, skills_wanted = $3, availability = $4, bio = $5
            WHERE id = $1
        "#,
        )
        .bind(user_id)
        .bind(offered)
        .bind(wanted)
        .bind(user.availability.as_str())
        .bind(&user.bio)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM skillswap.users ORDER BY created_at ASC, id ASC")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn top_by_skill_points(&self, limit: usize) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT * FROM skillswap.users ORDER BY skill_points DESC, id ASC LIMIT $1",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn insert_swap(&self, swap: &Swap) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO skillswap.swaps
                (id, requester, recipient, requester_skill, recipient_skill,
                 status, message, created_at, completed_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
        )
        .bind(swap.id)
        .bind(swap.requester)
        .bind(swap.recipient)
        .bind(&swap.requester_skill)
        .bind(&swap.recipient_skill)
        .bind(swap.status.as_str())
        .bind(&swap.message)
        .bind(swap.created_at)
        .bind(swap.completed_date)
        .execute(self.pool())
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Duplicate { .. } => StoreError::duplicate(
                "swap",
                format!("pending {} -> {}", swap.requester, swap.recipient),
            ),
            other => other,
        })?;

        debug!(swap_id = %swap.id, "Swap inserted");
        Ok(())
    }

    async fn get_swap(&self, swap_id: SwapId) -> StoreResult<Option<Swap>> {
        let row = sqlx::query("SELECT * FROM skillswap.swaps WHERE id = $1")
            .bind(swap_id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(swap_from_row).transpose()
    }

    async fn swaps_for_user(&self, user_id: UserId) -> StoreResult<SwapListing> {
        let incoming = sqlx::query(
            "SELECT * FROM skillswap.swaps WHERE recipient = $1 ORDER BY created_at DESC, seq DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        let outgoing = sqlx::query(
            "SELECT * FROM skillswap.swaps WHERE requester = $1 ORDER BY created_at DESC, seq DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(SwapListing {
            incoming: incoming.iter().map(swap_from_row).collect::<StoreResult<_>>()?,
            outgoing: outgoing.iter().map(swap_from_row).collect::<StoreResult<_>>()?,
        })
    }

    async fn transition_swap(
        &self,
        swap_id: SwapId,
        from: SwapStatus,
        to: SwapStatus,
    ) -> StoreResult<Swap> {
        let row = sqlx::query(
            "UPDATE skillswap.swaps SET status = $3 WHERE id = $1 AND status = $2 RETURNING *",
        )
        .bind(swap_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => swap_from_row(&row),
            None => Err(self.swap_mismatch(swap_id, from).await),
        }
    }

    async fn complete_swap(
        &self,
        swap_id: SwapId,
        completed_at: DateTime<Utc>,
        credit: LedgerUpdate<'_>,
    ) -> StoreResult<Swap> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query(
            r#"
            UPDATE skillswap.swaps
            SET status = 'completed', completed_date = $2
            WHERE id = $1 AND status = 'accepted'
            RETURNING *
        "#,
        )
        .bind(swap_id)
        .bind(completed_at)
        .fetch_optional(&mut *tx)
        .await?;

        let swap = match row {
            Some(row) => swap_from_row(&row)?,
            None => {
                tx.rollback().await?;
                return Err(self.swap_mismatch(swap_id, SwapStatus::Accepted).await);
            }
        };

        let mut participants = [swap.requester, swap.recipient];
        participants.sort();
        for user_id in participants {
            let mut user = lock_user(&mut tx, user_id).await?;
            credit(user_id, &mut user.reputation);
            write_reputation(&mut tx, user_id, &user.reputation).await?;
        }

        tx.commit().await.map_err(|e| {
            warn!(swap_id = %swap_id, error = %e, "Completion transaction failed to commit");
            StoreError::from(e)
        })?;
        Ok(swap)
    }

    async fn insert_review(
        &self,
        review: &Review,
        recompute: RatingRecompute<'_>,
    ) -> StoreResult<Reputation> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"
            INSERT INTO skillswap.reviews
                (id, reviewer, reviewed, swap_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
        )
        .bind(review.id)
        .bind(review.reviewer)
        .bind(review.reviewed)
        .bind(review.swap_id)
        .bind(review.rating as i16)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Duplicate { .. } => StoreError::duplicate(
                "review",
                format!("reviewer {} on swap {}", review.reviewer, review.swap_id),
            ),
            other => other,
        })?;

        // Lock before reading ratings so concurrent reviews serialize here.
        let mut user = lock_user(&mut tx, review.reviewed).await?;
        let ratings = ratings_for(&mut tx, review.reviewed).await?;
        recompute(review.reviewed, &mut user.reputation, &ratings);
        write_reputation(&mut tx, review.reviewed, &user.reputation).await?;

        tx.commit().await?;
        Ok(user.reputation)
    }

    async fn recompute_rating(
        &self,
        user_id: UserId,
        recompute: RatingRecompute<'_>,
    ) -> StoreResult<Reputation> {
        let mut tx = self.pool().begin().await?;
        let mut user = lock_user(&mut tx, user_id).await?;
        let ratings = ratings_for(&mut tx, user_id).await?;
        recompute(user_id, &mut user.reputation, &ratings);
        write_reputation(&mut tx, user_id, &user.reputation).await?;
        tx.commit().await?;
        Ok(user.reputation)
    }

    async fn reviews_received(&self, user_id: UserId) -> StoreResult<Vec<Review>> {
        let rows = sqlx::query(
            "SELECT * FROM skillswap.reviews WHERE reviewed = $1 ORDER BY created_at DESC, seq DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(review_from_row).collect()
    }

    async fn reviews_given(&self, user_id: UserId) -> StoreResult<Vec<Review>> {
        let rows = sqlx::query(
            "SELECT * FROM skillswap.reviews WHERE reviewer = $1 ORDER BY created_at DESC, seq DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(review_from_row).collect()
    }
}
