//! Configuration for the abuse guard, token issuance and the API throttle.
//!
//! # Example
//!
//! ```rust
//! use turnstile::config::{GuardConfig, StoreFailurePolicy, TurnstileConfig};
//! use chrono::Duration;
//!
//! let config = TurnstileConfig {
//!     guard: GuardConfig {
//!         short_term_limit: 5,
//!         temp_block: Duration::minutes(10),
//!         on_store_failure: StoreFailurePolicy::Unavailable,
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert_eq!(config.guard.daily_limit, 6);
//! ```

use chrono::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default)]
pub struct TurnstileConfig {
    /// Login attempt limits and block durations.
    pub guard: GuardConfig,

    /// Access token lifetime and claims.
    pub tokens: TokenConfig,

    /// Per-IP request throttle applied to every route.
    pub throttle: ThrottleConfig,

    /// Resolve the client IP from `X-Forwarded-For`, `X-Real-IP` and
    /// `CF-Connecting-IP` before falling back to the peer address.
    ///
    /// Only enable this behind a reverse proxy that overwrites those headers,
    /// otherwise clients can pick their own IP and dodge the guard.
    ///
    /// Default: false
    pub trust_proxy_headers: bool,
}

impl TurnstileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lenient settings for local development.
    ///
    /// Limits stay the same so the guard can be exercised by hand, but blocks
    /// are short and tokens live a day.
    pub fn development() -> Self {
        Self {
            guard: GuardConfig {
                daily_block: Duration::minutes(10),
                temp_block: Duration::seconds(30),
                ..Default::default()
            },
            tokens: TokenConfig {
                access_token_expiry: Duration::hours(24),
                ..Default::default()
            },
            throttle: ThrottleConfig {
                max_requests: 600,
                ..Default::default()
            },
            trust_proxy_headers: false,
        }
    }

    /// Stricter settings: admission is refused when the counter store is down
    /// and tokens are short-lived.
    pub fn strict() -> Self {
        Self {
            guard: GuardConfig {
                on_store_failure: StoreFailurePolicy::FailClosed,
                ..Default::default()
            },
            tokens: TokenConfig {
                access_token_expiry: Duration::minutes(15),
                ..Default::default()
            },
            throttle: ThrottleConfig {
                max_requests: 30,
                ..Default::default()
            },
            trust_proxy_headers: false,
        }
    }
}

/// What the guard does when the counter store errors or times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreFailurePolicy {
    /// Log and admit the request.
    #[default]
    FailOpen,
    /// Log and answer with a temporary block.
    FailClosed,
    /// Return `AuthError::StoreUnavailable` (HTTP 503).
    Unavailable,
}

/// Login abuse limits.
///
/// An IP is daily-blocked once its attempt count within the daily window
/// exceeds `daily_limit`, and temp-blocked once its count within the sliding
/// short-term window exceeds `short_term_limit`.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Default: 6
    pub daily_limit: u64,

    /// Default: 3
    pub short_term_limit: u64,

    /// Lifetime of the daily counter, fixed from its first hit.
    ///
    /// Default: 24 hours
    pub daily_window: Duration,

    /// Lifetime of the short-term counter, refreshed on every hit.
    ///
    /// Default: 5 minutes
    pub short_term_window: Duration,

    /// Default: 24 hours
    pub daily_block: Duration,

    /// Default: 5 minutes
    pub temp_block: Duration,

    /// Count login requests that arrive while the IP is already blocked.
    ///
    /// Default: true
    pub count_blocked_attempts: bool,

    /// Default: [`StoreFailurePolicy::FailOpen`]
    pub on_store_failure: StoreFailurePolicy,

    /// Upper bound on a single counter store call.
    ///
    /// Default: 2 seconds
    pub store_timeout: std::time::Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            daily_limit: 6,
            short_term_limit: 3,
            daily_window: Duration::hours(24),
            short_term_window: Duration::minutes(5),
            daily_block: Duration::hours(24),
            temp_block: Duration::minutes(5),
            count_blocked_attempts: true,
            on_store_failure: StoreFailurePolicy::FailOpen,
            store_timeout: std::time::Duration::from_secs(2),
        }
    }
}

/// Access token settings.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Default: 60 minutes
    pub access_token_expiry: Duration,

    /// `iss` claim written into and required from tokens.
    ///
    /// Default: `Some("turnstile")`
    pub issuer: Option<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_expiry: Duration::minutes(60),
            issuer: Some("turnstile".to_owned()),
        }
    }
}

/// Generic per-IP request throttle.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Default: 60
    pub max_requests: u64,

    /// Default: 1 minute
    pub window: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::minutes(1),
        }
    }
}
