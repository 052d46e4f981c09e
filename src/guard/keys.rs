//! Store key layout.
//!
//! ```text
//! daily_login_attempts:{ip}:{date}   daily counter, fixed 24h TTL from first hit
//! login_attempts:{ip}                short-term counter, sliding 5m TTL
//! daily_blocked_ip:{ip}:{date}       daily block, value is blocked_until (RFC 3339)
//! temp_blocked_ip:{ip}               temp block, value is blocked_until (RFC 3339)
//! ```
//!
//! Dates are UTC `YYYY-MM-DD`.

use chrono::NaiveDate;

pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn daily_attempts(ip: &str, date: NaiveDate) -> String {
    format!("daily_login_attempts:{ip}:{}", date_stamp(date))
}

pub fn short_term_attempts(ip: &str) -> String {
    format!("login_attempts:{ip}")
}

pub fn daily_block(ip: &str, date: NaiveDate) -> String {
    format!("daily_blocked_ip:{ip}:{}", date_stamp(date))
}

pub fn temp_block(ip: &str) -> String {
    format!("temp_blocked_ip:{ip}")
}

/// Request throttle counter for one IP, shared by every route.
pub fn throttle(ip: &str) -> String {
    format!("throttle:{ip}")
}
