use chrono::{DateTime, Utc};

use crate::guard::BlockKind;

/// Events emitted by the guard and the actions.
///
/// Dispatch is a no-op until listeners are registered with
/// [`register_event_listeners`](crate::events::register_event_listeners).
#[derive(Debug, Clone)]
pub enum AuthEvent {
    // accounts
    UserRegistered {
        user_id: i64,
        email: String,
        at: DateTime<Utc>,
    },
    ProfileUpdated {
        user_id: i64,
        at: DateTime<Utc>,
    },

    // login
    LoginSuccess {
        user_id: i64,
        email: String,
        ip: String,
        at: DateTime<Utc>,
    },
    LoginFailed {
        account: String,
        ip: String,
        /// Short-term attempt count at the time of the failure.
        attempts: u64,
        at: DateTime<Utc>,
    },
    /// A login request was refused because a block was already active.
    LoginBlocked {
        ip: String,
        kind: BlockKind,
        blocked_until: DateTime<Utc>,
        at: DateTime<Utc>,
    },

    // guard
    /// A threshold was crossed and a new block was written.
    IpBlocked {
        ip: String,
        kind: BlockKind,
        attempts: u64,
        blocked_until: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    GuardStoreFailure {
        ip: String,
        error: String,
        at: DateTime<Utc>,
    },
}

impl AuthEvent {
    /// Dot-separated name for log and trace output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserRegistered { .. } => "user.registered",
            Self::ProfileUpdated { .. } => "user.profile_updated",
            Self::LoginSuccess { .. } => "auth.login.success",
            Self::LoginFailed { .. } => "auth.login.failed",
            Self::LoginBlocked { .. } => "auth.login.blocked",
            Self::IpBlocked {
                kind: BlockKind::Daily,
                ..
            } => "guard.ip.daily_blocked",
            Self::IpBlocked {
                kind: BlockKind::Temp,
                ..
            } => "guard.ip.temp_blocked",
            Self::GuardStoreFailure { .. } => "guard.store.failure",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::UserRegistered { at, .. }
            | Self::ProfileUpdated { at, .. }
            | Self::LoginSuccess { at, .. }
            | Self::LoginFailed { at, .. }
            | Self::LoginBlocked { at, .. }
            | Self::IpBlocked { at, .. }
            | Self::GuardStoreFailure { at, .. } => *at,
        }
    }

    /// Client IP for login and guard events.
    pub fn ip(&self) -> Option<&str> {
        match self {
            Self::LoginSuccess { ip, .. }
            | Self::LoginFailed { ip, .. }
            | Self::LoginBlocked { ip, .. }
            | Self::IpBlocked { ip, .. }
            | Self::GuardStoreFailure { ip, .. } => Some(ip),
            Self::UserRegistered { .. } | Self::ProfileUpdated { .. } => None,
        }
    }
}
