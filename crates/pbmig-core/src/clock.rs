//! Timestamp sources for rendering.
//!
//! File names sort by their unix-seconds prefix, so the renderer reads time
//! through a [`Clock`] that never goes backwards within one process. Two
//! processes (or two renders within the same second) can still produce the
//! same prefix; serializing writes is up to the caller.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Makes rendered output byte-stable.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn from_unix(seconds: i64) -> Self {
        Self(DateTime::from_timestamp(seconds, 0).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Clamps readings of `inner` to the highest value handed out so far.
#[derive(Debug)]
pub struct MonotonicClock<C = SystemClock> {
    inner: C,
    high_water_ms: AtomicI64,
}

impl<C: Clock> MonotonicClock<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            high_water_ms: AtomicI64::new(i64::MIN),
        }
    }
}

impl<C: Clock> Clock for MonotonicClock<C> {
    fn now(&self) -> DateTime<Utc> {
        let reading = self.inner.now();
        let ms = reading.timestamp_millis();
        let previous = self.high_water_ms.fetch_max(ms, Ordering::SeqCst);
        if previous > ms {
            log::debug!("clock went backwards by {} ms, clamping", previous - ms);
            DateTime::from_timestamp_millis(previous).unwrap_or(reading)
        } else {
            reading
        }
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Scripted(Cell<i64>, i64);

    impl Clock for Scripted {
        fn now(&self) -> DateTime<Utc> {
            let v = self.0.get();
            self.0.set(v + self.1);
            DateTime::from_timestamp(v, 0).unwrap()
        }
    }

    #[test]
    fn monotonic_clamps_backwards_readings() {
        let clock = MonotonicClock::new(Scripted(Cell::new(1_000), -10));
        let first = clock.now();
        let second = clock.now();
        let third = clock.now();
        assert_eq!(first.timestamp(), 1_000);
        assert_eq!(second, first);
        assert_eq!(third, first);
    }

    #[test]
    fn monotonic_passes_forward_readings() {
        let clock = MonotonicClock::new(Scripted(Cell::new(1_000), 5));
        assert_eq!(clock.now().timestamp(), 1_000);
        assert_eq!(clock.now().timestamp(), 1_005);
    }

    #[test]
    fn fixed_clock_from_unix() {
        assert_eq!(FixedClock::from_unix(1_700_000_000).now().timestamp(), 1_700_000_000);
    }
}
