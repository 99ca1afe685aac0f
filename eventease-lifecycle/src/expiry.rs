//! Response window: how long after creation an organizer may still quote.

use chrono::{DateTime, Duration, Utc};
use eventease_core::Inquiry;

pub fn window_closes_at(inquiry: &Inquiry, window: Duration) -> DateTime<Utc> {
    inquiry.created_at + window
}

/// Time left to quote, or `None` when no window applies (disabled, or the
/// inquiry is past `new`). Never negative.
pub fn time_remaining(inquiry: &Inquiry, now: DateTime<Utc>, window: Option<Duration>) -> Option<Duration> {
    let window = window?;
    if inquiry.status != eventease_core::InquiryStatus::New {
        return None;
    }
    let left = window_closes_at(inquiry, window) - now;
    Some(left.max(Duration::zero()))
}

pub fn is_expired(inquiry: &Inquiry, now: DateTime<Utc>, window: Option<Duration>) -> bool {
    match window {
        Some(window) => now >= window_closes_at(inquiry, window),
        None => false,
    }
}

/// "5h 12m", "0h 3m" or "Expired"
pub fn countdown_label(remaining: Duration) -> String {
    if remaining <= Duration::zero() {
        return "Expired".to_string();
    }
    let minutes = remaining.num_minutes();
    format!("{}h {}m", minutes / 60, minutes % 60)
}
