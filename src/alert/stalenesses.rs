/// Snapshot staleness detection.
///
/// The UBA feed publishes hourly values, usually with a delay of one to two
/// hours. When the newest snapshot inside the query window is much older
/// than that, the station is probably offline and the report describes old
/// air. The pipeline logs a warning in that case.
///
/// # Clock injection
/// All functions accept a `now: DateTime<Utc>` parameter rather than calling
/// `Utc::now()` internally. This makes staleness purely deterministic in
/// tests without mocking or time manipulation.

use chrono::{DateTime, Utc};

use crate::model::StationSnapshot;

// ---------------------------------------------------------------------------
// Staleness check
// ---------------------------------------------------------------------------

/// Age of the snapshot in whole minutes relative to `now`. Negative if the
/// snapshot lies in the future.
pub fn age_minutes_at(snapshot: &StationSnapshot, now: DateTime<Utc>) -> i64 {
    (now - snapshot.timestamp).num_minutes()
}

/// Returns `true` if the snapshot is older than `max_age_minutes` relative
/// to `now`.
///
/// Staleness is defined as strictly greater than the threshold:
///   age > max_age_minutes  →  stale
///   age == max_age_minutes →  not stale
pub fn is_stale_at(snapshot: &StationSnapshot, max_age_minutes: u64, now: DateTime<Utc>) -> bool {
    let age = age_minutes_at(snapshot, now);
    age > 0 && age as u64 > max_age_minutes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
