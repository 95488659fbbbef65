use core::time::Duration;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::{
    error::{Error, Result},
    time::{DEFAULT_EPOCH, TimeSource},
};

/// A monotonic time source that returns elapsed time since construction,
/// offset from a user-defined epoch.
///
/// This avoids wall-clock adjustments (e.g., NTP steps or VM migration) made
/// after construction while still aligning timestamps to a fixed origin.
///
/// Internally, the clock captures `Instant::now()` at construction together
/// with the wall-clock distance to the epoch (computed from `SystemTime::now()`
/// at the same moment). Every reading is that fixed anchor plus the monotonic
/// time elapsed since. A wall clock that was already wrong at construction is
/// baked into the anchor and is not corrected later.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
    epoch: Duration,
    epoch_offset: u64, // in milliseconds
}

impl MonotonicClock {
    /// Constructs a monotonic clock aligned to [`DEFAULT_EPOCH`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockBeforeEpoch`] if the system time is earlier than
    /// the epoch.
    pub fn try_default() -> Result<Self> {
        Self::with_epoch(DEFAULT_EPOCH)
    }

    /// Constructs a monotonic clock using a custom epoch as the origin (t = 0),
    /// specified as a [`Duration`] since 1970-01-01 UTC.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockBeforeEpoch`] if the system time is earlier than
    /// the given epoch.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use nodeflake::{DEFAULT_EPOCH, MonotonicClock, TimeSource};
    ///
    /// let clock = MonotonicClock::with_epoch(DEFAULT_EPOCH).unwrap();
    /// let before = clock.current_millis();
    /// std::thread::sleep(Duration::from_millis(2));
    /// assert!(clock.current_millis() >= before + 2);
    /// ```
    pub fn with_epoch(epoch: Duration) -> Result<Self> {
        let start = Instant::now();
        let since_unix = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since_unix) => since_unix,
            Err(e) => {
                return Err(Error::ClockBeforeEpoch {
                    behind_millis: epoch.saturating_add(e.duration()).as_millis() as u64,
                });
            }
        };
        let offset = since_unix
            .checked_sub(epoch)
            .ok_or_else(|| Error::ClockBeforeEpoch {
                behind_millis: (epoch - since_unix).as_millis() as u64,
            })?;

        Ok(Self {
            start,
            epoch,
            epoch_offset: offset.as_millis() as u64,
        })
    }

    /// The epoch this clock counts from.
    pub const fn epoch(&self) -> Duration {
        self.epoch
    }
}

impl TimeSource for MonotonicClock {
    /// Returns the number of milliseconds since the configured epoch, based on
    /// the elapsed monotonic time since construction.
    fn current_millis(&self) -> u64 {
        self.epoch_offset + self.start.elapsed().as_millis() as u64
    }
}
