//! In-memory reading storage.
//!
//! A bounded, time-ascending store of readings. Constructed explicitly
//! and shared via `Arc` rather than held in a process-wide instance, so
//! tests and multi-sensor setups can hold independent stores.

use chrono::{DateTime, Datelike, Days, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use parking_lot::RwLock;
use std::collections::VecDeque;
use tracing::debug;

use super::reading::Reading;
use super::stats::ReadingStats;

/// Default maximum number of retained readings.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default retention window for [`ReadingStore::purge_older_than`], in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Bounded in-memory store of readings, oldest first.
///
/// Once the capacity is reached, inserting evicts the oldest reading.
pub struct ReadingStore {
    readings: RwLock<VecDeque<Reading>>,
    capacity: usize,
}

impl ReadingStore {
    /// Create a store with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store holding at most `capacity` readings.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            readings: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Record a reading stamped with the current time.
    pub fn record(&self, temperature: f64, humidity: f64) -> Reading {
        let reading = Reading::new(temperature, humidity);
        self.insert(reading.clone());
        reading
    }

    /// Append a reading, evicting the oldest once the cap is reached.
    pub fn insert(&self, reading: Reading) {
        let mut readings = self.readings.write();
        if readings.len() >= self.capacity {
            readings.pop_front();
        }
        readings.push_back(reading);
    }

    /// The most recent reading, if any.
    pub fn latest(&self) -> Option<Reading> {
        self.readings.read().back().cloned()
    }

    /// Number of retained readings.
    pub fn len(&self) -> usize {
        self.readings.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.readings.read().is_empty()
    }

    /// Maximum number of retained readings.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All retained readings, ascending by time.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.readings.read().iter().cloned().collect()
    }

    /// Up to `limit` most recent readings, ascending by time.
    pub fn recent(&self, limit: usize) -> Vec<Reading> {
        let readings = self.readings.read();
        let skip = readings.len().saturating_sub(limit);
        readings.iter().skip(skip).cloned().collect()
    }

    /// Readings with `from <= timestamp <= to`, ascending by time.
    pub fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Reading> {
        self.readings
            .read()
            .iter()
            .filter(|reading| reading.timestamp >= from && reading.timestamp <= to)
            .cloned()
            .collect()
    }

    /// Readings from the current local calendar day.
    pub fn today(&self) -> Vec<Reading> {
        let today = Local::now().date_naive();
        let from = local_day_start(today);
        let to = local_day_start(next_day(today));
        self.between(from, to)
    }

    /// Readings from the current local calendar week (starting Monday).
    pub fn this_week(&self) -> Vec<Reading> {
        let week = Local::now().date_naive().week(Weekday::Mon);
        let from = local_day_start(week.first_day());
        let to = local_day_start(next_day(week.last_day()));
        self.between(from, to)
    }

    /// Readings from the current local calendar month.
    pub fn this_month(&self) -> Vec<Reading> {
        let today = Local::now().date_naive();
        let first = today.with_day(1).unwrap_or(today);
        let from = local_day_start(first);
        let to = local_day_start(next_month_start(today));
        self.between(from, to)
    }

    /// Drop readings older than `days` days. Returns how many were removed.
    pub fn purge_older_than(&self, days: i64) -> usize {
        let cutoff = Utc::now() - Duration::days(days);
        let mut readings = self.readings.write();
        let before = readings.len();
        readings.retain(|reading| reading.timestamp >= cutoff);
        let removed = before - readings.len();
        if removed > 0 {
            debug!(removed, "Purged old readings");
        }
        removed
    }

    /// Statistics over all retained readings.
    pub fn stats(&self) -> ReadingStats {
        ReadingStats::from_readings(&self.snapshot())
    }
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Local midnight of `date` as a UTC instant.
///
/// DST transitions can make local midnight ambiguous or nonexistent;
/// the earliest valid interpretation wins.
fn local_day_start(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match midnight.and_local_timezone(Local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&midnight),
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

fn next_month_start(date: NaiveDate) -> NaiveDate {
    let (year, month) = (date.year(), date.month());
    let first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first.unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn reading_at(temperature: f64, age: Duration) -> Reading {
        Reading::at(temperature, 45.0, Utc::now() - age)
    }

    #[test]
    fn test_record_appends_in_order() {
        let store = ReadingStore::new();

        store.record(20.0, 45.0);
        store.record(21.0, 45.0);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].temperature, 20.0);
        assert_eq!(snapshot[1].temperature, 21.0);
        assert!(snapshot[0].timestamp <= snapshot[1].timestamp);
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let store = ReadingStore::with_capacity(3);

        for i in 0..5 {
            store.insert(reading_at(f64::from(i), Duration::seconds(5 - i64::from(i))));
        }

        assert_eq!(store.len(), 3);
        let snapshot = store.snapshot();
        assert_eq!(snapshot[0].temperature, 2.0);
        assert_eq!(snapshot[2].temperature, 4.0);
    }

    #[test]
    fn test_insert_at_default_capacity_evicts_exactly_one() {
        let store = ReadingStore::new();

        for i in 0..(DEFAULT_CAPACITY + 1) {
            store.insert(Reading::at(
                i as f64,
                45.0,
                Utc::now() + Duration::milliseconds(i as i64),
            ));
        }

        assert_eq!(store.len(), DEFAULT_CAPACITY);
        let snapshot = store.snapshot();
        // The single oldest reading was evicted, order preserved
        assert_eq!(snapshot[0].temperature, 1.0);
        assert_eq!(
            snapshot[DEFAULT_CAPACITY - 1].temperature,
            DEFAULT_CAPACITY as f64
        );
        assert!(snapshot
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn test_latest() {
        let store = ReadingStore::new();
        assert!(store.latest().is_none());

        store.record(19.0, 45.0);
        store.record(23.5, 45.0);
        assert_eq!(store.latest().map(|r| r.temperature), Some(23.5));
    }

    #[test]
    fn test_recent_returns_trailing_slice() {
        let store = ReadingStore::new();
        for i in 0..10 {
            store.insert(reading_at(f64::from(i), Duration::seconds(10 - i64::from(i))));
        }

        let recent = store.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].temperature, 7.0);
        assert_eq!(recent[2].temperature, 9.0);

        // Asking for more than stored returns everything
        assert_eq!(store.recent(100).len(), 10);
    }

    #[test]
    fn test_between_filters_inclusive_range() {
        let store = ReadingStore::new();
        let now = Utc::now();
        for hours in [1, 2, 3, 4] {
            store.insert(Reading::at(20.0, 45.0, now - Duration::hours(hours)));
        }

        let hits = store.between(now - Duration::hours(3), now - Duration::hours(2));
        assert_eq!(hits.len(), 2);
        assert!(hits[0].timestamp <= hits[1].timestamp);
    }

    #[test]
    fn test_today_excludes_older_days() {
        let store = ReadingStore::new();
        store.insert(reading_at(20.0, Duration::days(3)));
        store.insert(reading_at(21.0, Duration::seconds(10)));
        store.insert(reading_at(22.0, Duration::seconds(5)));

        let today = store.today();
        assert_eq!(today.len(), 2);
        assert_eq!(today[0].temperature, 21.0);
        assert_eq!(today[1].temperature, 22.0);
        assert!(today[0].timestamp <= today[1].timestamp);
    }

    #[test]
    fn test_week_and_month_include_fresh_readings() {
        let store = ReadingStore::new();
        store.insert(reading_at(20.0, Duration::days(40)));
        store.insert(reading_at(21.0, Duration::seconds(1)));

        assert_eq!(store.this_week().len(), 1);
        assert_eq!(store.this_month().len(), 1);
    }

    #[test]
    fn test_purge_older_than() {
        let store = ReadingStore::new();
        store.insert(reading_at(20.0, Duration::days(40)));
        store.insert(reading_at(21.0, Duration::days(10)));
        store.insert(reading_at(22.0, Duration::seconds(1)));

        let removed = store.purge_older_than(DEFAULT_RETENTION_DAYS);
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.purge_older_than(DEFAULT_RETENTION_DAYS), 0);
    }

    #[test]
    fn test_stats_over_store() {
        let store = ReadingStore::new();
        store.insert(reading_at(20.0, Duration::minutes(2)));
        store.insert(reading_at(24.0, Duration::minutes(1)));

        let stats = store.stats();
        assert_eq!(stats.current, 24.0);
        assert_eq!(stats.min, 20.0);
        assert_eq!(stats.max, 24.0);
    }

    #[test]
    fn test_next_month_start_wraps_year() {
        let december = NaiveDate::from_ymd_opt(2025, 12, 15).expect("valid date");
        assert_eq!(
            next_month_start(december),
            NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date")
        );

        let june = NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date");
        assert_eq!(
            next_month_start(june),
            NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date")
        );
    }
}
