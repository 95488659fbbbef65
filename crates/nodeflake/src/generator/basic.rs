use core::cell::Cell;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    config::GeneratorConfig,
    error::Result,
    generator::{SnowflakeGenerator, state::GeneratorState},
    id::SnowflakeId,
    time::TimeSource,
};

/// A non-concurrent Snowflake ID generator suitable for single-threaded
/// environments.
///
/// This generator is lightweight and fast, but **not thread-safe**. It fits a
/// single owner, such as one worker thread or an actor serving ID requests
/// over a channel, where calls are already serialized.
///
/// ## Features
/// - ❌ Not thread-safe
/// - ✅ Same rollback and exhaustion handling as [`LockSnowflakeGenerator`]
///
/// ## Recommended When
/// - You're in a single-threaded environment (no shared access)
/// - You want the fastest generator
///
/// ## See Also
/// - [`LockSnowflakeGenerator`]
///
/// [`LockSnowflakeGenerator`]: crate::generator::LockSnowflakeGenerator
pub struct BasicSnowflakeGenerator<T>
where
    T: TimeSource,
{
    state: Cell<GeneratorState>,
    config: GeneratorConfig,
    time: T,
}

impl<T> BasicSnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator with an explicit configuration and time source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if a field of `config` is out of
    /// range.
    ///
    /// # Example
    /// ```
    /// use nodeflake::{BasicSnowflakeGenerator, GeneratorConfig, MonotonicClock};
    ///
    /// let config = GeneratorConfig::new(2, 9);
    /// let clock = MonotonicClock::with_epoch(config.epoch).unwrap();
    /// let generator = BasicSnowflakeGenerator::with_config(config, clock).unwrap();
    ///
    /// let id = generator.next_id().unwrap();
    /// assert_eq!(id.worker_id(), 9);
    /// ```
    ///
    /// [`Error::InvalidParameter`]: crate::Error::InvalidParameter
    pub fn with_config(config: GeneratorConfig, time: T) -> Result<Self> {
        Self::from_components(config, 0, 0, time)
    }

    /// Creates a generator preloaded with a last-issued timestamp and
    /// sequence.
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
        Ok(Self {
            state: Cell::new(GeneratorState::new(
                last_timestamp,
                sequence & SnowflakeId::SEQUENCE_MASK,
            )),
            config,
            time,
        })
    }

    /// Generates the next ID.
    ///
    /// # Errors
    ///
    /// Same as [`LockSnowflakeGenerator::next_id`], minus lock poisoning.
    ///
    /// [`LockSnowflakeGenerator::next_id`]: crate::generator::LockSnowflakeGenerator::next_id
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        let mut state = self.state.get();
        let id = state.advance(&self.config, &self.time)?;
        self.state.set(state);
        Ok(id)
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

impl<T> SnowflakeGenerator<T> for BasicSnowflakeGenerator<T>
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
