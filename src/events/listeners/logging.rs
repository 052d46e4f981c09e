use async_trait::async_trait;

use crate::events::{AuthEvent, Listener};

/// Writes events through the `log` crate.
///
/// Block and failure events are logged at `Warn`, everything else at the
/// configured level.
pub struct LoggingListener {
    level: log::Level,
}

impl LoggingListener {
    pub fn new() -> Self {
        Self {
            level: log::Level::Info,
        }
    }

    pub fn with_level(level: log::Level) -> Self {
        Self { level }
    }

    fn level_for(&self, event: &AuthEvent) -> log::Level {
        match event {
            AuthEvent::IpBlocked { .. }
            | AuthEvent::LoginBlocked { .. }
            | AuthEvent::LoginFailed { .. }
            | AuthEvent::GuardStoreFailure { .. } => log::Level::Warn.min(self.level),
            _ => self.level,
        }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Listener for LoggingListener {
    async fn handle(&self, event: &AuthEvent) {
        log::log!(
            target: "turnstile::events",
            self.level_for(event),
            "event={} ip={} {:?}",
            event.name(),
            event.ip().unwrap_or("-"),
            event
        );
    }
}
