use crate::{
    config::GeneratorConfig,
    error::Result,
    id::SnowflakeId,
    time::TimeSource,
};

/// A minimal interface for generating Snowflake IDs.
pub trait SnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new generator after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if a node identity or policy field
    /// is out of range.
    ///
    /// [`Error::InvalidParameter`]: crate::Error::InvalidParameter
    fn with_config(config: GeneratorConfig, time: T) -> Result<Self>
    where
        Self: Sized;

    /// Generates the next ID, blocking for a tolerated clock rollback or an
    /// exhausted sequence.
    ///
    /// # Errors
    ///
    /// May return [`Error::ClockMovedBackwards`], [`Error::TimestampOverflow`]
    /// or, for a poisoned lock, [`Error::LockPoisoned`].
    ///
    /// [`Error::ClockMovedBackwards`]: crate::Error::ClockMovedBackwards
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    fn next_id(&self) -> Result<SnowflakeId>;

    /// The configuration this generator was built with.
    fn config(&self) -> &GeneratorConfig;
}
