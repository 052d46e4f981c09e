use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Daily,
    Temp,
}

/// An active block on an IP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub blocked_until: DateTime<Utc>,
    /// Seconds left until `blocked_until`.
    pub retry_after: u64,
    /// Full configured duration of this kind of block, in seconds.
    pub block_secs: u64,
    /// True when this request crossed the threshold and created the block.
    pub newly_triggered: bool,
    /// Daily attempt count, reported when this request created a daily block.
    pub daily_attempts: Option<u64>,
    pub message: String,
}

impl Block {
    pub(crate) fn new(
        kind: BlockKind,
        blocked_until: DateTime<Utc>,
        block: Duration,
        now: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            blocked_until,
            retry_after: seconds_until(blocked_until, now),
            block_secs: u64::try_from(block.num_seconds()).unwrap_or(0),
            newly_triggered: false,
            daily_attempts: None,
            message: message.into(),
        }
    }

    pub(crate) fn triggered(mut self, daily_attempts: Option<u64>) -> Self {
        self.newly_triggered = true;
        self.daily_attempts = daily_attempts;
        self
    }
}

/// Outcome of the admission stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitDecision {
    Admitted,
    Blocked(Block),
}

impl AdmitDecision {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }

    pub fn block(&self) -> Option<&Block> {
        match self {
            Self::Blocked(block) => Some(block),
            Self::Admitted => None,
        }
    }
}

/// Counter values after [`record_attempt`](super::AbuseGuard::record_attempt).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptCounts {
    pub daily: u64,
    pub short_term: u64,
}

pub(crate) fn seconds_until(until: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((until - now).num_seconds()).unwrap_or(0)
}

/// "5 minutes", "1 minute", "30 seconds", "24 hours".
pub(crate) fn humanize(duration: Duration) -> String {
    let (n, unit) = if duration.num_hours() > 0 && duration.num_minutes() % 60 == 0 {
        (duration.num_hours(), "hour")
    } else if duration.num_minutes() > 0 && duration.num_seconds() % 60 == 0 {
        (duration.num_minutes(), "minute")
    } else {
        (duration.num_seconds(), "second")
    };

    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}
