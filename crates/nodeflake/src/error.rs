use thiserror::Error;

/// A result type defaulting to the crate [`enum@Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `nodeflake` can emit.
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Error {
    /// A construction parameter fell outside its valid range.
    ///
    /// Raised for a datacenter or worker ID that does not fit its 5-bit field,
    /// and for a rollback tolerance that does not fit the timestamp field.
    #[error("{field} must be between 0 and {max}, got {value}")]
    InvalidParameter {
        /// Name of the offending parameter.
        field: &'static str,
        /// The rejected value.
        value: u64,
        /// Largest accepted value (inclusive).
        max: u64,
    },

    /// The clock moved backwards further than the configured tolerance, or a
    /// tolerated rollback did not resolve after waiting.
    ///
    /// No ID was issued. The generator state is unchanged, so the call may be
    /// retried once the clock has caught up with `last_timestamp`.
    #[error(
        "clock moved backwards, refusing to generate id for {by_millis} milliseconds \
         (last timestamp {last_timestamp}, now {now})"
    )]
    ClockMovedBackwards {
        /// Timestamp embedded in the most recently issued ID.
        last_timestamp: u64,
        /// The offending clock reading.
        now: u64,
        /// `last_timestamp - now`.
        by_millis: u64,
    },

    /// The wall clock reads earlier than the configured epoch, so no
    /// non-negative elapsed time can be derived from it.
    #[error("system clock is {behind_millis} milliseconds before the configured epoch")]
    ClockBeforeEpoch {
        /// How far the wall clock is behind the epoch.
        behind_millis: u64,
    },

    /// The elapsed time since the epoch no longer fits the 41-bit timestamp
    /// field.
    #[error("timestamp {timestamp} exceeds the maximum representable value {max}")]
    TimestampOverflow {
        /// The clock reading that could not be encoded.
        timestamp: u64,
        /// Largest encodable timestamp.
        max: u64,
    },

    /// A raw integer could not be interpreted as an ID because its sign bit is
    /// set.
    #[error("{raw} is not a valid snowflake id")]
    InvalidId {
        /// The rejected raw value.
        raw: i64,
    },

    /// The operation failed because the lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do **not** poison, so this
    /// variant is never produced.
    #[error("generator lock poisoned")]
    LockPoisoned,
}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};

#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
