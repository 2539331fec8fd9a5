use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::warn;

use crate::leaderboard::LeaderboardView;
use crate::reputation::{BadgePolicy, RewardSchedule, BADGE_TABLE};

/// Configuration for the skill swap service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Reward and leaderboard configuration
    pub rewards: RewardsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Require an API key from the fronting gateway
    pub enable_auth: bool,
    /// Accepted API keys
    pub api_keys: Vec<String>,
    /// Rate limit per minute per IP
    pub rate_limit_per_minute: u32,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub postgres_url: String,
    /// Use PostgreSQL (if false, uses the in-memory store)
    pub postgres_enabled: bool,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Emit span open/close events
    pub log_requests: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    pub points_per_swap: u64,
    pub credits_per_swap: u64,
    pub starting_credits: u64,
    pub badge_policy: BadgePolicy,
    pub leaderboard_size: usize,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        let schedule = RewardSchedule::default();
        Self {
            points_per_swap: schedule.points_per_swap,
            credits_per_swap: schedule.credits_per_swap,
            starting_credits: schedule.starting_credits,
            badge_policy: schedule.badge_policy,
            leaderboard_size: LeaderboardView::DEFAULT_SIZE,
        }
    }
}

impl RewardsConfig {
    /// Convert to the schedule used by the ledger
    pub fn to_schedule(&self) -> RewardSchedule {
        RewardSchedule {
            points_per_swap: self.points_per_swap,
            credits_per_swap: self.credits_per_swap,
            starting_credits: self.starting_credits,
            badge_policy: self.badge_policy,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: "postgresql://localhost:5432/skillswap".to_string(),
            postgres_enabled: false,
            max_connections: 10,
        }
    }
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            security: SecurityConfig {
                enable_auth: false,
                api_keys: Vec::new(),
                rate_limit_per_minute: 120,
                max_request_size: 64 * 1024,
            },
            database: DatabaseConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                log_requests: false,
            },
            rewards: RewardsConfig::default(),
        }
    }
}

fn parse_var<T>(name: &str, value: String) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("Invalid {} value", name))
}

impl SwapConfig {
    /// Load configuration from environment variables and validate it
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Server configuration
        if let Some(host) = lookup("SKILLSWAP_HOST") {
            config.server.host = host;
        }
        if let Some(port) = lookup("SKILLSWAP_PORT") {
            config.server.port = parse_var("SKILLSWAP_PORT", port)?;
        }

        // Security configuration
        if let Some(enable_auth) = lookup("SKILLSWAP_ENABLE_AUTH") {
            config.security.enable_auth = parse_var("SKILLSWAP_ENABLE_AUTH", enable_auth)?;
        }
        if let Some(key) = lookup("SKILLSWAP_API_KEY") {
            if !key.trim().is_empty() {
                config.security.api_keys.push(key.trim().to_string());
            }
        }
        if let Some(keys) = lookup("SKILLSWAP_API_KEYS") {
            config.security.api_keys.extend(
                keys.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string),
            );
        }
        if let Some(rate_limit) = lookup("SKILLSWAP_RATE_LIMIT_PER_MINUTE") {
            config.security.rate_limit_per_minute =
                parse_var("SKILLSWAP_RATE_LIMIT_PER_MINUTE", rate_limit)?;
        }
        if let Some(size) = lookup("SKILLSWAP_MAX_REQUEST_SIZE") {
            config.security.max_request_size = parse_var("SKILLSWAP_MAX_REQUEST_SIZE", size)?;
        }

        // Database configuration
        if let Some(url) = lookup("SKILLSWAP_POSTGRES_URL") {
            config.database.postgres_url = url;
        }
        if let Some(enabled) = lookup("SKILLSWAP_POSTGRES_ENABLED") {
            config.database.postgres_enabled = parse_var("SKILLSWAP_POSTGRES_ENABLED", enabled)?;
        }
        if let Some(max) = lookup("SKILLSWAP_POSTGRES_MAX_CONNECTIONS") {
            config.database.max_connections = parse_var("SKILLSWAP_POSTGRES_MAX_CONNECTIONS", max)?;
        }

        // Logging configuration
        if let Some(level) = lookup("SKILLSWAP_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(log_requests) = lookup("SKILLSWAP_LOG_REQUESTS") {
            config.logging.log_requests = parse_var("SKILLSWAP_LOG_REQUESTS", log_requests)?;
        }

        // Rewards configuration
        if let Some(points) = lookup("SKILLSWAP_POINTS_PER_SWAP") {
            config.rewards.points_per_swap = parse_var("SKILLSWAP_POINTS_PER_SWAP", points)?;
        }
        if let Some(credits) = lookup("SKILLSWAP_CREDITS_PER_SWAP") {
            config.rewards.credits_per_swap = parse_var("SKILLSWAP_CREDITS_PER_SWAP", credits)?;
        }
        if let Some(credits) = lookup("SKILLSWAP_STARTING_CREDITS") {
            config.rewards.starting_credits = parse_var("SKILLSWAP_STARTING_CREDITS", credits)?;
        }
        if let Some(policy) = lookup("SKILLSWAP_BADGE_POLICY") {
            config.rewards.badge_policy = parse_var("SKILLSWAP_BADGE_POLICY", policy)?;
        }
        if let Some(size) = lookup("SKILLSWAP_LEADERBOARD_SIZE") {
            config.rewards.leaderboard_size = parse_var("SKILLSWAP_LEADERBOARD_SIZE", size)?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }

        if self.security.rate_limit_per_minute == 0 {
            return Err(anyhow::anyhow!("Rate limit must be non-zero"));
        }

        if self.security.enable_auth && self.security.api_keys.is_empty() {
            warn!("Authentication enabled but no API keys configured - every request will be rejected");
        }

        if self.database.postgres_enabled {
            if self.database.postgres_url.is_empty() {
                return Err(anyhow::anyhow!("PostgreSQL enabled but SKILLSWAP_POSTGRES_URL is empty"));
            }
            if self.database.max_connections == 0 {
                return Err(anyhow::anyhow!("PostgreSQL max connections must be non-zero"));
            }
        }

        if self.rewards.leaderboard_size == 0 {
            return Err(anyhow::anyhow!("Leaderboard size must be non-zero"));
        }

        if BADGE_TABLE.is_empty() || BADGE_TABLE.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(anyhow::anyhow!("Badge milestones must be non-empty and ascending"));
        }

        Ok(())
    }
}

/// Mask the password of a connection URL for logging
pub fn sanitize_for_logging(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<SwapConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SwapConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server.port, 5000);
        assert!(!config.database.postgres_enabled);
        assert_eq!(config.rewards.to_schedule(), RewardSchedule::default());
        assert_eq!(config.rewards.leaderboard_size, 20);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SKILLSWAP_PORT", "8080"),
            ("SKILLSWAP_ENABLE_AUTH", "true"),
            ("SKILLSWAP_API_KEY", "primary"),
            ("SKILLSWAP_API_KEYS", "second, third,,"),
            ("SKILLSWAP_BADGE_POLICY", "exact"),
            ("SKILLSWAP_POINTS_PER_SWAP", "25"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(config.security.enable_auth);
        assert_eq!(config.security.api_keys, vec!["primary", "second", "third"]);
        assert_eq!(config.rewards.badge_policy, BadgePolicy::Exact);
        assert_eq!(config.rewards.points_per_swap, 25);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(load(&[("SKILLSWAP_PORT", "http")]).is_err());
        assert!(load(&[("SKILLSWAP_PORT", "0")]).is_err());
        assert!(load(&[("SKILLSWAP_BADGE_POLICY", "sometimes")]).is_err());
        assert!(load(&[("SKILLSWAP_LEADERBOARD_SIZE", "0")]).is_err());
    }

    #[test]
    fn test_sanitize_for_logging() {
        assert_eq!(
            sanitize_for_logging("postgresql://swap:hunter2@db:5432/skillswap"),
            "postgresql://swap:***@db:5432/skillswap"
        );
        assert_eq!(
            sanitize_for_logging("postgresql://localhost:5432/skillswap"),
            "postgresql://localhost:5432/skillswap"
        );
    }
}
