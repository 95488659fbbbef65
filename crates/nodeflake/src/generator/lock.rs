use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    config::GeneratorConfig,
    error::Result,
    generator::{Mutex, SnowflakeGenerator, state::GeneratorState},
    id::SnowflakeId,
    time::{MonotonicClock, TimeSource},
};

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// This generator wraps its state in an [`Arc<Mutex<_>>`], allowing safe
/// shared use across threads. Clones share the same state, so they behave as
/// handles to a single generator rather than independent ones.
///
/// The lock is held for the entire [`next_id`] call, including a tolerated
/// rollback wait or an exhausted-sequence wait. Those waits therefore stall
/// every concurrent caller of the same instance, and no two callers can ever
/// observe the same `(timestamp, sequence)` pair.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Strictly increasing IDs across all callers
///
/// ## Recommended When
/// - Many threads share one node identity
///
/// ## See Also
/// - [`BasicSnowflakeGenerator`]
///
/// [`next_id`]: LockSnowflakeGenerator::next_id
/// [`BasicSnowflakeGenerator`]: crate::generator::BasicSnowflakeGenerator
pub struct LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: Arc<crossbeam_utils::CachePadded<Mutex<GeneratorState>>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Arc<Mutex<GeneratorState>>,
    config: GeneratorConfig,
    time: T,
}

impl LockSnowflakeGenerator<MonotonicClock> {
    /// Creates a generator for the given node identity using the default
    /// epoch and policy, backed by a [`MonotonicClock`] anchored now.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] if `datacenter_id` or `worker_id` is
    ///   outside `[0, 31]`. No generator is created.
    /// - [`Error::ClockBeforeEpoch`] if the wall clock reads earlier than the
    ///   epoch.
    ///
    /// # Example
    /// ```
    /// use nodeflake::{LockSnowflakeGenerator, decode};
    ///
    /// let generator = LockSnowflakeGenerator::new(3, 7).unwrap();
    /// let id = generator.next_id().unwrap();
    /// assert_eq!(decode(id.to_i64()), (3, 7));
    ///
    /// assert!(LockSnowflakeGenerator::new(32, 0).is_err());
    /// ```
    ///
    /// [`Error::InvalidParameter`]: crate::Error::InvalidParameter
    /// [`Error::ClockBeforeEpoch`]: crate::Error::ClockBeforeEpoch
    pub fn new(datacenter_id: u64, worker_id: u64) -> Result<Self> {
        Self::from_config(GeneratorConfig::new(datacenter_id, worker_id))
    }

    /// Creates a generator from `config`, anchoring a [`MonotonicClock`] to
    /// `config.epoch`.
    ///
    /// # Errors
    ///
    /// Same as [`LockSnowflakeGenerator::new`].
    pub fn from_config(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let clock = MonotonicClock::with_epoch(config.epoch)?;
        Self::with_config(config, clock)
    }
}

impl<T> LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator with an explicit configuration and time source.
    ///
    /// The time source must count milliseconds from `config.epoch`; the
    /// generator does not convert between epochs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if a field of `config` is out of
    /// range.
    ///
    /// [`Error::InvalidParameter`]: crate::Error::InvalidParameter
    pub fn with_config(config: GeneratorConfig, time: T) -> Result<Self> {
        Self::from_components(config, 0, 0, time)
    }

    /// Creates a generator preloaded with a last-issued timestamp and
    /// sequence.
    ///
    /// This constructor is primarily useful for tests and benchmarks that need
    /// to start from a specific point, such as the last sequence of a
    /// millisecond.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if a field of `config` is out of
    /// range.
    ///
    /// [`Error::InvalidParameter`]: crate::Error::InvalidParameter
    pub fn from_components(
        config: GeneratorConfig,
        last_timestamp: u64,
        sequence: u64,
        time: T,
    ) -> Result<Self> {
        config.validate()?;
        let state = GeneratorState::new(last_timestamp, sequence & SnowflakeId::SEQUENCE_MASK);
        Ok(Self {
            #[cfg(feature = "cache-padded")]
            state: Arc::new(crossbeam_utils::CachePadded::new(Mutex::new(state))),
            #[cfg(not(feature = "cache-padded"))]
            state: Arc::new(Mutex::new(state)),
            config,
            time,
        })
    }

    /// Generates the next ID.
    ///
    /// Returns a new, time-ordered, unique ID. Blocks while a tolerated clock
    /// rollback is waited out, or while an exhausted sequence waits for the
    /// next millisecond.
    ///
    /// # Errors
    /// - [`Error::ClockMovedBackwards`] if the clock moved back further than
    ///   the tolerance, or did not recover while waiting (with
    ///   [`RollbackPolicy::Fail`]). The generator remains usable.
    /// - [`Error::TimestampOverflow`] once the epoch-relative time no longer
    ///   fits 41 bits.
    /// - [`Error::LockPoisoned`] if another caller panicked while holding the
    ///   lock (std mutex only).
    ///
    /// # Panics
    ///
    /// Panics on an unrecoverable rollback when configured with
    /// [`RollbackPolicy::Panic`].
    ///
    /// # Example
    /// ```
    /// use nodeflake::LockSnowflakeGenerator;
    ///
    /// let generator = LockSnowflakeGenerator::new(0, 1).unwrap();
    /// let a = generator.next_id().unwrap();
    /// let b = generator.next_id().unwrap();
    /// assert!(a < b);
    /// ```
    ///
    /// [`Error::ClockMovedBackwards`]: crate::Error::ClockMovedBackwards
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    /// [`RollbackPolicy::Fail`]: crate::RollbackPolicy::Fail
    /// [`RollbackPolicy::Panic`]: crate::RollbackPolicy::Panic
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        let mut state = {
            #[cfg(feature = "parking-lot")]
            {
                self.state.lock()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.state.lock()?
            }
        };

        state.advance(&self.config, &self.time)
    }

    /// Datacenter ID encoded into every ID.
    pub const fn datacenter_id(&self) -> u64 {
        self.config.datacenter_id
    }

    /// Worker ID encoded into every ID.
    pub const fn worker_id(&self) -> u64 {
        self.config.worker_id
    }

    /// The configuration this generator was built with.
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl<T> Clone for LockSnowflakeGenerator<T>
where
    T: TimeSource + Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: self.config,
            time: self.time.clone(),
        }
    }
}

impl<T> SnowflakeGenerator<T> for LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    fn with_config(config: GeneratorConfig, time: T) -> Result<Self> {
        Self::with_config(config, time)
    }

    fn next_id(&self) -> Result<SnowflakeId> {
        self.next_id()
    }

    fn config(&self) -> &GeneratorConfig {
        self.config()
    }
}
