//! Turnstile auth server backed by Postgres, with Redis for guard counters
//! when `REDIS_URL` is set.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use turnstile::api::axum::{AppState, cors_layer, router};
use turnstile::config::{StoreFailurePolicy, TurnstileConfig};
use turnstile::crypto::Argon2Hasher;
use turnstile::events::listeners::{LoggingListener, TracingListener};
use turnstile::events::register_event_listeners;
use turnstile::jwt::{JwtConfig, JwtService};
use turnstile::postgres::create_repositories;
use turnstile::store::{CounterStore, RedisCounterStore};

/// How often expired counter rows are deleted from Postgres. Redis expires
/// keys on its own.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum FailurePolicy {
    Open,
    Closed,
    Unavailable,
}

impl From<FailurePolicy> for StoreFailurePolicy {
    fn from(policy: FailurePolicy) -> Self {
        match policy {
            FailurePolicy::Open => Self::FailOpen,
            FailurePolicy::Closed => Self::FailClosed,
            FailurePolicy::Unavailable => Self::Unavailable,
        }
    }
}

/// Login abuse mitigation and JWT auth over HTTP
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "TURNSTILE_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Keep guard counters in Redis instead of Postgres
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// HMAC secret for access tokens, at least 32 bytes
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Honor X-Forwarded-For, X-Real-IP and CF-Connecting-IP
    #[arg(long, env = "TRUST_PROXY_HEADERS")]
    trust_proxy_headers: bool,

    /// What the login guard does when its counter store is down
    #[arg(long, env = "STORE_FAILURE_POLICY", value_enum, default_value = "open")]
    on_store_failure: FailurePolicy,

    /// Allowed CORS origins, comma separated. Empty allows any origin.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Use the lenient development presets
    #[arg(long)]
    development: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = if cli.development {
        TurnstileConfig::development()
    } else {
        TurnstileConfig::new()
    };
    config.trust_proxy_headers = cli.trust_proxy_headers;
    config.guard.on_store_failure = cli.on_store_failure.into();

    let jwt = JwtService::new(JwtConfig::from_token_config(cli.jwt_secret, &config.tokens)?);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cli.database_url)
        .await?;
    let (user_repo, role_repo, pg_store) = create_repositories(pool);

    let store: Arc<dyn CounterStore> = match &cli.redis_url {
        Some(url) => Arc::new(RedisCounterStore::connect(url).await?),
        None => {
            pg_store.spawn_cleanup(CLEANUP_INTERVAL);
            Arc::new(pg_store)
        }
    };

    register_event_listeners(|registry| {
        registry.listen(LoggingListener::new());
        registry.listen(TracingListener);
    });

    let state = AppState::new(user_repo, role_repo, jwt, store, config)
        .with_hasher(Arc::new(Argon2Hasher::production()));
    let app = router(state).layer(cors_layer(&cli.cors_origins));

    let listener = TcpListener::bind(cli.bind).await?;
    tracing::info!(addr = %cli.bind, "turnstile listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
