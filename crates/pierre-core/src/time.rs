// ABOUTME: Clock abstraction used to compute the local-day aggregate window
// ABOUTME: SystemClock follows the host timezone, FixedClock pins time for tests and demos
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveTime, Offset, TimeZone, Utc};

/// Source of "now" and of local calendar-day boundaries
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Start of the local calendar day containing `now`
    fn start_of_day(&self, now: DateTime<Utc>) -> DateTime<Utc>;
}

/// Start of the calendar day containing `now` in timezone `tz`
///
/// Falls back to the earliest valid local time when midnight does not exist
/// (DST gaps), and to `now` itself if the day has no representable start.
fn local_midnight<Tz: TimeZone>(tz: &Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    let local_date = now.with_timezone(tz).date_naive();
    let midnight = local_date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .map_or(now, |start| start.with_timezone(&Utc))
}

/// Wall clock in the host's local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn start_of_day(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        local_midnight(&Local, now)
    }
}

/// Manually controlled clock with a fixed UTC offset
///
/// Clones share the same instant, so a test can advance time while the
/// engine holds its own handle.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<RwLock<DateTime<Utc>>>,
    offset: FixedOffset,
}

impl FixedClock {
    /// Clock pinned at `now` in UTC
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_offset(now, Utc.fix())
    }

    /// Clock pinned at `now` whose local day is computed in `offset`
    #[must_use]
    pub fn with_offset(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
            offset,
        }
    }

    /// Move the clock to `now`
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move the clock forward by `delta`
    pub fn advance(&self, delta: Duration) {
        let mut guard = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *guard += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_of_day(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        local_midnight(&self.offset, now)
    }
}
