//! Millisecond timestamps for request signing.

use std::sync::atomic::{AtomicI64, Ordering};

static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Wall-clock milliseconds since the epoch, strictly increasing within the
/// process even if the system clock stalls or steps backwards.
pub fn next_timestamp_millis() -> i64 {
    advance(&LAST_MILLIS, chrono::Utc::now().timestamp_millis())
}

fn advance(last: &AtomicI64, now: i64) -> i64 {
    let previous = last
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
            Some(now.max(prev + 1))
        })
        .unwrap_or_else(|prev| prev);
    now.max(previous + 1)
}
