//! Persisted record shapes: users, swaps and reviews

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type UserId = Uuid;
pub type SwapId = Uuid;
pub type ReviewId = Uuid;

/// When a user is available to swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Availability {
    Weekdays,
    Weekends,
    #[default]
    Flexible,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Weekdays => "Weekdays",
            Availability::Weekends => "Weekends",
            Availability::Flexible => "Flexible",
        }
    }
}

impl FromStr for Availability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Weekdays" => Ok(Availability::Weekdays),
            "Weekends" => Ok(Availability::Weekends),
            "Flexible" => Ok(Availability::Flexible),
            other => Err(format!("unknown availability: {}", other)),
        }
    }
}

/// Reputation fields of a user. Mutated only through the reputation ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reputation {
    pub skill_points: u64,
    pub credits: u64,
    pub completed_swaps: u32,
    /// Append-only, each name at most once
    pub badges: Vec<String>,
    /// Mean of received ratings, 0 when none
    pub average_rating: f64,
    pub total_ratings: u32,
}

impl Reputation {
    pub fn new(starting_credits: u64) -> Self {
        Self {
            skill_points: 0,
            credits: starting_credits,
            completed_swaps: 0,
            badges: Vec::new(),
            average_rating: 0.0,
            total_ratings: 0,
        }
    }

    pub fn has_badge(&self, name: &str) -> bool {
        self.badges.iter().any(|b| b == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub skills_offered: BTreeSet<String>,
    pub skills_wanted: BTreeSet<String>,
    pub availability: Availability,
    pub bio: String,
    #[serde(flatten)]
    pub reputation: Reputation,
    pub created_at: DateTime<Utc>,
}

/// Registration payload. Credentials are handled by the identity layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub skills_offered: Vec<String>,
    #[serde(default)]
    pub skills_wanted: Vec<String>,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub bio: String,
}

/// Profile edit. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub skills_offered: Option<Vec<String>>,
    pub skills_wanted: Option<Vec<String>>,
    pub availability: Option<Availability>,
    pub bio: Option<String>,
}

impl ProfilePatch {
    pub fn apply(self, user: &mut User) {
        if let Some(offered) = self.skills_offered {
            user.skills_offered = normalize_skills(offered);
        }
        if let Some(wanted) = self.skills_wanted {
            user.skills_wanted = normalize_skills(wanted);
        }
        if let Some(availability) = self.availability {
            user.availability = availability;
        }
        if let Some(bio) = self.bio {
            user.bio = bio;
        }
    }
}

/// Trim skill names, drop empties, collapse duplicates
pub fn normalize_skills<I, S>(skills: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    skills
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl SwapStatus {
    pub const ALL: [SwapStatus; 4] = [
        SwapStatus::Pending,
        SwapStatus::Accepted,
        SwapStatus::Rejected,
        SwapStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Accepted => "accepted",
            SwapStatus::Rejected => "rejected",
            SwapStatus::Completed => "completed",
        }
    }

    /// The only legal edges: pending→accepted, pending→rejected, accepted→completed
    pub fn can_transition_to(&self, next: SwapStatus) -> bool {
        matches!(
            (self, next),
            (SwapStatus::Pending, SwapStatus::Accepted)
                | (SwapStatus::Pending, SwapStatus::Rejected)
                | (SwapStatus::Accepted, SwapStatus::Completed)
        )
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwapStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SwapStatus::Pending),
            "accepted" => Ok(SwapStatus::Accepted),
            "rejected" => Ok(SwapStatus::Rejected),
            "completed" => Ok(SwapStatus::Completed),
            other => Err(format!("unknown swap status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swap {
    pub id: SwapId,
    pub requester: UserId,
    pub recipient: UserId,
    pub requester_skill: String,
    pub recipient_skill: String,
    pub status: SwapStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set once, on completion
    pub completed_date: Option<DateTime<Utc>>,
}

impl Swap {
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.requester == user_id || self.recipient == user_id
    }

    /// The participant who is not `user_id`
    pub fn counterpart(&self, user_id: UserId) -> Option<UserId> {
        if self.requester == user_id {
            Some(self.recipient)
        } else if self.recipient == user_id {
            Some(self.requester)
        } else {
            None
        }
    }
}

/// Parameters of a new swap request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub recipient_id: UserId,
    pub requester_skill: String,
    pub recipient_skill: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Incoming and outgoing swaps of one user, newest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwapListing {
    pub incoming: Vec<Swap>,
    pub outgoing: Vec<Swap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub reviewer: UserId,
    pub reviewed: UserId,
    #[serde(rename = "swap")]
    pub swap_id: SwapId,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        let legal: Vec<_> = SwapStatus::ALL
            .iter()
            .flat_map(|from| SwapStatus::ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();
        assert_eq!(
            legal,
            vec![
                (SwapStatus::Pending, SwapStatus::Accepted),
                (SwapStatus::Pending, SwapStatus::Rejected),
                (SwapStatus::Accepted, SwapStatus::Completed),
            ]
        );
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in SwapStatus::ALL {
            assert_eq!(status.as_str().parse::<SwapStatus>().unwrap(), status);
        }
        assert!("archived".parse::<SwapStatus>().is_err());
    }

    #[test]
    fn test_normalize_skills_collapses_duplicates() {
        let skills = normalize_skills(vec![" Rust ", "Rust", "", "Guitar"]);
        assert_eq!(skills.len(), 2);
        assert!(skills.contains("Rust"));
        assert!(skills.contains("Guitar"));
    }

    #[test]
    fn test_counterpart() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let swap = Swap {
            id: Uuid::new_v4(),
            requester: a,
            recipient: b,
            requester_skill: "Cooking".to_string(),
            recipient_skill: "Spanish".to_string(),
            status: SwapStatus::Completed,
            message: None,
            created_at: Utc::now(),
            completed_date: Some(Utc::now()),
        };
        assert_eq!(swap.counterpart(a), Some(b));
        assert_eq!(swap.counterpart(b), Some(a));
        assert_eq!(swap.counterpart(Uuid::new_v4()), None);
    }

    #[test]
    fn test_user_json_is_flat_camel_case() {
        let user = User {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            skills_offered: normalize_skills(["Math"]),
            skills_wanted: BTreeSet::new(),
            availability: Availability::Weekends,
            bio: String::new(),
            reputation: Reputation::new(10),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["skillPoints"], 0);
        assert_eq!(json["credits"], 10);
        assert_eq!(json["availability"], "Weekends");
    }
}
