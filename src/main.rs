use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

use skillswap::{
    api::{create_router, AppState, SecurityMiddlewareConfig, SecurityState},
    config::{sanitize_for_logging, SwapConfig},
    DatabasePool, MemoryStore, SwapStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = SwapConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {:#}", e);
        eprintln!("Please check SKILLSWAP_* environment variables.");
        e
    })?;

    init_logging(&config)?;

    info!("Starting SkillSwap server");

    let store = open_store(&config).await?;

    let schedule = config.rewards.to_schedule();
    info!(
        points_per_swap = schedule.points_per_swap,
        credits_per_swap = schedule.credits_per_swap,
        starting_credits = schedule.starting_credits,
        badge_policy = %schedule.badge_policy,
        "Reward schedule loaded"
    );
    let state = AppState::new(store, schedule, config.rewards.leaderboard_size);

    let security_state = SecurityState::new(SecurityMiddlewareConfig::from(&config));
    spawn_rate_limit_cleanup(&security_state);

    let app = create_router(state, security_state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("SkillSwap server listening on {}", bind_addr);
    info!(
        "Security middleware: Auth={}, Rate limit={}/min, Max body={}KB",
        config.security.enable_auth,
        config.security.rate_limit_per_minute,
        config.security.max_request_size / 1024
    );

    // Connect info feeds per-IP rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_logging(config: &SwapConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

async fn open_store(config: &SwapConfig) -> Result<Arc<dyn SwapStore>> {
    if !config.database.postgres_enabled {
        info!("PostgreSQL disabled, using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    info!(
        url = %sanitize_for_logging(&config.database.postgres_url),
        max_connections = config.database.max_connections,
        "Connecting to PostgreSQL"
    );
    let pool = DatabasePool::new(
        &config.database.postgres_url,
        config.database.max_connections,
    )
    .await
    .context("Failed to connect to PostgreSQL")?;

    pool.init_schema()
        .await
        .context("Failed to initialize database schema")?;
    info!("Database schema ready");

    Ok(Arc::new(pool))
}

fn spawn_rate_limit_cleanup(security: &SecurityState) {
    let limiter = security.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(120));
        loop {
            interval.tick().await;
            limiter.cleanup();
            debug!(clients = limiter.tracked_clients(), "Rate limit windows pruned");
        }
    });
}
