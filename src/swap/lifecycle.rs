//! Swap Lifecycle
//!
//! ```text
//!            accept            complete
//! pending ──────────► accepted ─────────► completed
//!    │
//!    └──── reject ──► rejected
//! ```
//!
//! Authorization is checked against the stored participants, which never
//! change after creation. The status change itself is always a conditional
//! store update, so two racing callers cannot both leave the same source state.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::SwapStore;
use crate::error::{StoreError, SwapError, SwapResult};
use crate::models::{Reputation, Swap, SwapId, SwapListing, SwapRequest, SwapStatus, UserId};
use crate::reputation::ReputationLedger;

/// Which participant may drive a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Recipient,
    Participant,
}

pub struct SwapLifecycle {
    store: Arc<dyn SwapStore>,
    ledger: Arc<ReputationLedger>,
}

impl SwapLifecycle {
    pub fn new(store: Arc<dyn SwapStore>, ledger: Arc<ReputationLedger>) -> Self {
        Self { store, ledger }
    }

    /// Open a pending swap from `requester_id` to the request's recipient
    pub async fn create_request(&self, requester_id: UserId, request: SwapRequest) -> SwapResult<Swap> {
        let requester_skill = request.requester_skill.trim();
        let recipient_skill = request.recipient_skill.trim();
        if requester_skill.is_empty() || recipient_skill.is_empty() {
            return Err(SwapError::invalid_input(
                "requesterSkill and recipientSkill are required",
            ));
        }
        if requester_id == request.recipient_id {
            return Err(SwapError::invalid_input("cannot request a swap with yourself"));
        }

        if self.store.get_user(requester_id).await?.is_none() {
            return Err(SwapError::not_found("user", requester_id));
        }
        if self.store.get_user(request.recipient_id).await?.is_none() {
            return Err(SwapError::not_found("recipient", request.recipient_id));
        }

        let swap = Swap {
            id: Uuid::new_v4(),
            requester: requester_id,
            recipient: request.recipient_id,
            requester_skill: requester_skill.to_string(),
            recipient_skill: recipient_skill.to_string(),
            status: SwapStatus::Pending,
            message: request
                .message
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            created_at: Utc::now(),
            completed_date: None,
        };

        self.store.insert_swap(&swap).await.map_err(|e| match e {
            StoreError::Duplicate { .. } => {
                SwapError::conflict("a pending swap request already exists")
            }
            other => other.into(),
        })?;

        info!(
            swap_id = %swap.id,
            requester = %swap.requester,
            recipient = %swap.recipient,
            "Swap requested"
        );
        Ok(swap)
    }

    pub async fn get_swap(&self, swap_id: SwapId) -> SwapResult<Swap> {
        self.store
            .get_swap(swap_id)
            .await?
            .ok_or_else(|| SwapError::not_found("swap", swap_id))
    }

    /// Incoming and outgoing requests for `user_id`, newest first
    pub async fn list_requests(&self, user_id: UserId) -> SwapResult<SwapListing> {
        let listing = self.store.swaps_for_user(user_id).await?;
        debug!(
            user_id = %user_id,
            incoming = listing.incoming.len(),
            outgoing = listing.outgoing.len(),
            "Listed swap requests"
        );
        Ok(listing)
    }

    pub async fn accept(&self, swap_id: SwapId, actor_id: UserId) -> SwapResult<Swap> {
        self.respond(swap_id, actor_id, SwapStatus::Accepted).await
    }

    pub async fn reject(&self, swap_id: SwapId, actor_id: UserId) -> SwapResult<Swap> {
        self.respond(swap_id, actor_id, SwapStatus::Rejected).await
    }

    /// accepted → completed, crediting both participants in the same unit
    pub async fn complete(&self, swap_id: SwapId, actor_id: UserId) -> SwapResult<Swap> {
        self.authorize(swap_id, actor_id, Role::Participant, SwapStatus::Completed)
            .await?;

        let ledger = &self.ledger;
        let credit = |user_id: UserId, reputation: &mut Reputation| {
            ledger.credit_completion(user_id, reputation);
        };

        let swap = self
            .store
            .complete_swap(swap_id, Utc::now(), &credit)
            .await
            .map_err(|e| Self::lost_race(swap_id, SwapStatus::Completed, e))?;

        info!(
            swap_id = %swap.id,
            actor = %actor_id,
            requester = %swap.requester,
            recipient = %swap.recipient,
            "Swap completed"
        );
        Ok(swap)
    }

    /// pending → accepted | rejected, recipient only
    async fn respond(&self, swap_id: SwapId, actor_id: UserId, to: SwapStatus) -> SwapResult<Swap> {
        self.authorize(swap_id, actor_id, Role::Recipient, to).await?;

        let swap = self
            .store
            .transition_swap(swap_id, SwapStatus::Pending, to)
            .await
            .map_err(|e| Self::lost_race(swap_id, to, e))?;

        info!(swap_id = %swap.id, actor = %actor_id, status = %swap.status, "Swap transitioned");
        Ok(swap)
    }

    /// NotFound, then Forbidden, then InvalidState. Read-only.
    async fn authorize(
        &self,
        swap_id: SwapId,
        actor_id: UserId,
        role: Role,
        to: SwapStatus,
    ) -> SwapResult<Swap> {
        let swap = self.get_swap(swap_id).await?;

        let allowed = match role {
            Role::Recipient => swap.recipient == actor_id,
            Role::Participant => swap.is_participant(actor_id),
        };
        if !allowed {
            warn!(swap_id = %swap_id, actor = %actor_id, to = %to, "Unauthorized swap transition");
            return Err(match role {
                Role::Recipient => SwapError::forbidden(format!("only the recipient may {} this swap", verb(to))),
                Role::Participant => SwapError::forbidden(format!("only a participant may {} this swap", verb(to))),
            });
        }

        if !swap.status.can_transition_to(to) {
            return Err(SwapError::invalid_state(format!(
                "cannot {} a swap that is {}",
                verb(to),
                swap.status
            )));
        }

        Ok(swap)
    }

    fn lost_race(swap_id: SwapId, to: SwapStatus, e: StoreError) -> SwapError {
        if let StoreError::StatusMismatch { actual, .. } = &e {
            warn!(swap_id = %swap_id, to = %to, actual = %actual, "Swap changed state concurrently");
        }
        e.into()
    }
}

fn verb(to: SwapStatus) -> &'static str {
    match to {
        SwapStatus::Accepted => "accept",
        SwapStatus::Rejected => "reject",
        SwapStatus::Completed => "complete",
        SwapStatus::Pending => "reopen",
    }
}
