//! Imminence predicates and the listing order built on them.

use jiff::{SignedDuration, Timestamp};

use crate::models::{Performance, Title};

pub const DEFAULT_WINDOW: SignedDuration = SignedDuration::from_hours(3);

/// Starts within `[now, now + window)`.
pub fn is_imminent(performance: &Performance, now: Timestamp, window: SignedDuration) -> bool {
    let until_start = performance.start.timestamp().duration_since(now);
    until_start >= SignedDuration::ZERO && until_start < window
}

/// Started within `(now - window, now]`, i.e. probably still running.
pub fn is_showing(performance: &Performance, now: Timestamp, window: SignedDuration) -> bool {
    let since_start = now.duration_since(performance.start.timestamp());
    since_start >= SignedDuration::ZERO && since_start < window
}

pub fn has_imminent(title: &Title, now: Timestamp, window: SignedDuration) -> bool {
    title.performances.iter().any(|p| is_imminent(p, now, window))
}

/// Stable partition: titles with an imminent performance first, everything
/// else after, relative order kept inside both groups.
pub fn classify(titles: Vec<Title>, now: Timestamp, window: SignedDuration) -> Vec<Title> {
    let (mut soon, later): (Vec<_>, Vec<_>) =
        titles.into_iter().partition(|t| has_imminent(t, now, window));
    soon.extend(later);
    soon
}
