//! Fixed-window quota math. Windows roll lazily on access; no background
//! timer resets anything.

use time::{Duration, OffsetDateTime};

#[derive(Clone, Copy, Debug)]
pub struct QuotaBucket {
	pub window_start: OffsetDateTime,
	pub count: u32,
}
impl QuotaBucket {
	pub fn new(now: OffsetDateTime) -> Self {
		Self { window_start: now, count: 0 }
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuotaDecision {
	Admitted,
	Rejected,
}

/// Counts one request against the bucket, rolling the window first if it
/// has elapsed. The `limit + 1`th request inside one window is rejected
/// and does not advance the counter.
pub fn check_and_record(
	bucket: &mut QuotaBucket,
	limit: u32,
	window: Duration,
	now: OffsetDateTime,
) -> QuotaDecision {
	roll_window(bucket, window, now);

	if bucket.count >= limit {
		return QuotaDecision::Rejected;
	}

	bucket.count += 1;

	QuotaDecision::Admitted
}

/// Advances `window_start` by whole window lengths until `now` falls inside
/// the current window, clearing the counter when it moves. Keeping the
/// start aligned to window multiples makes the boundary independent of
/// request timing.
fn roll_window(bucket: &mut QuotaBucket, window: Duration, now: OffsetDateTime) {
	if window <= Duration::ZERO {
		return;
	}

	let elapsed = now - bucket.window_start;

	if elapsed < window {
		return;
	}

	let window_ns = window.whole_nanoseconds();
	let windows_passed = elapsed.whole_nanoseconds() / window_ns;

	bucket.window_start += Duration::nanoseconds((window_ns * windows_passed) as i64);
	bucket.count = 0;
}
