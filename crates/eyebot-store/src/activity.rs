//! Per-user activity log and rolling active-user windows.
//!
//! The log maps a user id to every time that user interacted with the bot.
//! Entries are only ever appended; [`ActivityTracker::compact`] is the one
//! way to shrink it.
//!
//! ```text
//! {
//!   "42": ["2026-10-01T09:30:00Z", "2026-10-03T18:02:11.512Z"],
//!   "7":  ["2026-09-20T12:00:00Z"]
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::store::{JsonFileStore, Store};

/// Length of the short rolling window, in days.
pub const WEEKLY_WINDOW_DAYS: i64 = 7;

/// Length of the long rolling window, in days.
pub const MONTHLY_WINDOW_DAYS: i64 = 30;

/// Opaque user identifier, persisted as a string key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Distinct active users in the two rolling windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCounts {
    pub last_7_days: usize,
    pub last_30_days: usize,
}

/// Every recorded interaction, grouped by user.
///
/// Timestamps per user are kept in insertion order and treated as a
/// multiset: the same instant recorded twice is two entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ActivityLog {
    users: BTreeMap<UserId, Vec<DateTime<Utc>>>,
}

impl ActivityLog {
    /// Appends one interaction for `user`.
    pub fn record(&mut self, user: UserId, at: DateTime<Utc>) {
        self.users.entry(user).or_default().push(at);
    }

    /// Recorded interactions for one user.
    pub fn events(&self, user: &UserId) -> &[DateTime<Utc>] {
        self.users.get(user).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of distinct users ever recorded.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Total number of recorded interactions.
    pub fn event_count(&self) -> usize {
        self.users.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Counts users with at least one interaction in `(now - window, now]`.
    ///
    /// The cutoff is exclusive: an interaction exactly `window` ago does not
    /// count. Interactions stamped after `now` do not count either.
    pub fn active_within(&self, now: DateTime<Utc>, window: Duration) -> usize {
        let cutoff = now - window;
        self.users
            .values()
            .filter(|visits| visits.iter().any(|t| *t > cutoff && *t <= now))
            .count()
    }

    /// Active users over the last 7 and 30 days.
    pub fn active_counts(&self, now: DateTime<Utc>) -> ActiveCounts {
        ActiveCounts {
            last_7_days: self.active_within(now, Duration::days(WEEKLY_WINDOW_DAYS)),
            last_30_days: self.active_within(now, Duration::days(MONTHLY_WINDOW_DAYS)),
        }
    }

    /// Drops interactions at or before `older_than` and users left with none.
    ///
    /// Returns how many interactions were removed.
    pub fn compact(&mut self, older_than: DateTime<Utc>) -> usize {
        let before = self.event_count();
        for visits in self.users.values_mut() {
            visits.retain(|t| *t > older_than);
        }
        self.users.retain(|_, visits| !visits.is_empty());
        before - self.event_count()
    }
}

impl<'de> Deserialize<'de> for ActivityLog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Older files held one last-seen string per user instead of a list.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StoredVisits {
            Many(Vec<String>),
            One(String),
        }

        let raw = BTreeMap::<UserId, StoredVisits>::deserialize(deserializer)?;
        let mut users = BTreeMap::new();
        for (user, visits) in raw {
            let stamps = match visits {
                StoredVisits::Many(list) => list,
                StoredVisits::One(single) => vec![single],
            };
            let parsed = stamps
                .iter()
                .map(|s| parse_timestamp(s).map_err(serde::de::Error::custom))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            users.insert(user, parsed);
        }
        Ok(Self { users })
    }
}

/// Parses an RFC 3339 timestamp, or an ISO-8601 one without offset taken as UTC.
fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp {s:?}: {e}"))
}

/// Records interactions and answers rolling-window questions against a store.
///
/// Every call reloads the log, so a tracker never serves stale data from a
/// previous call.
#[derive(Debug)]
pub struct ActivityTracker<S = JsonFileStore<ActivityLog>> {
    store: S,
}

impl ActivityTracker {
    /// Opens a tracker backed by a JSON file.
    pub fn open(path: impl Into<PathBuf>, locking: bool) -> Self {
        Self::new(JsonFileStore::new(path).with_locking(locking))
    }
}

impl<S: Store<ActivityLog>> ActivityTracker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Records an interaction for `user` at the current time.
    pub fn record(&self, user: impl Into<UserId>) -> Result<()> {
        self.record_at(user, Utc::now())
    }

    /// Records an interaction for `user` at `at`.
    pub fn record_at(&self, user: impl Into<UserId>, at: DateTime<Utc>) -> Result<()> {
        let user = user.into();
        debug!(user = %user, at = %at, "Recording activity");
        self.store.update(|log| log.record(user, at))
    }

    /// Active users over the last 7 and 30 days as of now.
    pub fn active_counts(&self) -> Result<ActiveCounts> {
        self.active_counts_at(Utc::now())
    }

    /// Active users over the last 7 and 30 days as of `now`.
    pub fn active_counts_at(&self, now: DateTime<Utc>) -> Result<ActiveCounts> {
        Ok(self.store.load()?.active_counts(now))
    }

    /// Number of distinct users ever recorded.
    pub fn distinct_users(&self) -> Result<usize> {
        Ok(self.store.load()?.user_count())
    }

    /// Removes interactions at or before `older_than`.
    pub fn compact(&self, older_than: DateTime<Utc>) -> Result<usize> {
        let removed = self.store.update(|log| log.compact(older_than))?;
        debug!(removed, older_than = %older_than, "Compacted activity log");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    fn memory_tracker() -> ActivityTracker<MemoryStore<ActivityLog>> {
        ActivityTracker::new(MemoryStore::default())
    }

    #[test]
    fn test_same_user_counted_once() {
        let tracker = memory_tracker();
        tracker.record_at(42i64, t0()).unwrap();
        tracker.record_at(42i64, t0() - Duration::days(3)).unwrap();

        let counts = tracker.active_counts_at(t0()).unwrap();
        assert_eq!(counts, ActiveCounts { last_7_days: 1, last_30_days: 1 });
    }

    #[test]
    fn test_ten_days_ago_only_in_monthly() {
        let tracker = memory_tracker();
        tracker.record_at(7i64, t0() - Duration::days(10)).unwrap();

        let counts = tracker.active_counts_at(t0()).unwrap();
        assert_eq!(counts, ActiveCounts { last_7_days: 0, last_30_days: 1 });
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let mut log = ActivityLog::default();
        log.record(UserId::from(1i64), t0() - Duration::days(7));
        log.record(UserId::from(2i64), t0() - Duration::days(7) + Duration::seconds(1));
        log.record(UserId::from(3i64), t0() - Duration::days(30));

        let counts = log.active_counts(t0());
        assert_eq!(counts.last_7_days, 1);
        assert_eq!(counts.last_30_days, 2);
    }

    #[test]
    fn test_future_timestamps_not_counted() {
        let mut log = ActivityLog::default();
        log.record(UserId::from("later"), t0() + Duration::hours(1));

        assert_eq!(log.active_counts(t0()), ActiveCounts::default());
    }

    #[test]
    fn test_duplicate_instants_are_kept() {
        let tracker = memory_tracker();
        tracker.record_at("u", t0()).unwrap();
        tracker.record_at("u", t0()).unwrap();

        let log = tracker.store().load().unwrap();
        assert_eq!(log.events(&UserId::from("u")).len(), 2);
        assert_eq!(log.user_count(), 1);
    }

    #[test]
    fn test_monthly_never_below_weekly() {
        let mut log = ActivityLog::default();
        for i in 0..60i64 {
            let at = t0() - Duration::hours(i * 11);
            log.record(UserId::from(i % 17), at);
        }
        let counts = log.active_counts(t0());
        assert!(counts.last_30_days >= counts.last_7_days);
    }

    #[test]
    fn test_compact_drops_old_events_and_empty_users() {
        let tracker = memory_tracker();
        tracker.record_at(1i64, t0() - Duration::days(40)).unwrap();
        tracker.record_at(2i64, t0() - Duration::days(40)).unwrap();
        tracker.record_at(2i64, t0() - Duration::days(1)).unwrap();

        let removed = tracker.compact(t0() - Duration::days(30)).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(tracker.distinct_users().unwrap(), 1);
        assert_eq!(
            tracker.active_counts_at(t0()).unwrap(),
            ActiveCounts { last_7_days: 1, last_30_days: 1 }
        );
    }

    #[test]
    fn test_serialized_shape() {
        let mut log = ActivityLog::default();
        log.record(UserId::from(42i64), t0());

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json, serde_json::json!({ "42": ["2026-10-16T12:00:00Z"] }));
    }

    #[test]
    fn test_reads_single_timestamp_entries() {
        let json = r#"{
            "42": "2026-10-15T08:00:00.123456",
            "7": ["2026-10-01T00:00:00+00:00", "2026-10-14T00:00:00Z"]
        }"#;
        let log: ActivityLog = serde_json::from_str(json).unwrap();

        assert_eq!(log.events(&UserId::from(42i64)).len(), 1);
        assert_eq!(log.events(&UserId::from(7i64)).len(), 2);
        assert_eq!(log.active_counts(t0()).last_7_days, 2);
    }

    #[test]
    fn test_rejects_garbage_timestamps() {
        let result: std::result::Result<ActivityLog, _> =
            serde_json::from_str(r#"{"1": ["yesterday"]}"#);
        assert!(result.is_err());
    }
}
