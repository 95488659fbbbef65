use core::time::Duration;

use crate::{
    error::{Error, Result},
    id::SnowflakeId,
    time::DEFAULT_EPOCH,
};

/// Default tolerance, in milliseconds, for a backward clock jump that is
/// waited out instead of failing.
pub const DEFAULT_MAX_BACKWARD_MS: u64 = 3;

/// Default factor applied to a tolerated rollback to get the wait duration.
pub const DEFAULT_BACKWARD_WAIT_MULTIPLIER: u64 = 2;

/// What a generator does when the clock has moved backwards beyond what it is
/// willing to wait out.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum RollbackPolicy {
    /// Return [`Error::ClockMovedBackwards`] from the offending call. The
    /// generator stays usable and succeeds again once the clock catches up.
    #[default]
    Fail,
    /// Panic with the rollback details, halting the calling thread while it
    /// still holds the generator lock.
    ///
    /// Issuance only stops for good with the std `Mutex`, which the panic
    /// poisons. With the `parking-lot` feature, or with a
    /// [`BasicSnowflakeGenerator`], a caught panic leaves the state untouched
    /// and later calls succeed once the clock catches up.
    ///
    /// [`BasicSnowflakeGenerator`]: crate::BasicSnowflakeGenerator
    Panic,
}

/// How a generator waits for the next millisecond once all sequence values
/// of the current one are spent.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExhaustionStrategy {
    /// Busy re-sample the clock with a spin-loop hint between polls.
    #[default]
    Spin,
    /// Yield the thread to the scheduler between polls.
    Yield,
}

impl ExhaustionStrategy {
    pub(crate) fn pause(self) {
        match self {
            Self::Spin => core::hint::spin_loop(),
            Self::Yield => std::thread::yield_now(),
        }
    }
}

/// Node identity and clock policy for one generator instance.
///
/// # Example
///
/// ```
/// use nodeflake::{GeneratorConfig, RollbackPolicy};
///
/// let config = GeneratorConfig::new(1, 2)
///     .with_max_backward_ms(5)
///     .with_rollback_policy(RollbackPolicy::Panic);
/// assert!(config.validate().is_ok());
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GeneratorConfig {
    /// Datacenter ID in `[0, 31]`.
    pub datacenter_id: u64,
    /// Worker ID in `[0, 31]`.
    pub worker_id: u64,
    /// Origin of the timestamp field, as a duration since the Unix epoch.
    #[cfg_attr(feature = "serde", serde(with = "epoch_millis"))]
    pub epoch: Duration,
    /// Largest backward clock jump, in milliseconds, that is waited out.
    pub max_backward_ms: u64,
    /// A tolerated rollback of `n` ms sleeps for `n * backward_wait_multiplier`
    /// ms before re-sampling the clock.
    pub backward_wait_multiplier: u64,
    /// Behavior when a rollback cannot be waited out.
    pub rollback_policy: RollbackPolicy,
    /// Behavior when the sequence is exhausted within one millisecond.
    pub exhaustion_strategy: ExhaustionStrategy,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            datacenter_id: 0,
            worker_id: 0,
            epoch: DEFAULT_EPOCH,
            max_backward_ms: DEFAULT_MAX_BACKWARD_MS,
            backward_wait_multiplier: DEFAULT_BACKWARD_WAIT_MULTIPLIER,
            rollback_policy: RollbackPolicy::default(),
            exhaustion_strategy: ExhaustionStrategy::default(),
        }
    }
}

impl GeneratorConfig {
    /// A default configuration for the given node identity.
    pub fn new(datacenter_id: u64, worker_id: u64) -> Self {
        Self {
            datacenter_id,
            worker_id,
            ..Self::default()
        }
    }

    /// Sets the epoch, as a duration since the Unix epoch.
    #[must_use]
    pub fn with_epoch(mut self, epoch: Duration) -> Self {
        self.epoch = epoch;
        self
    }

    /// Sets the largest backward clock jump that is waited out.
    #[must_use]
    pub fn with_max_backward_ms(mut self, max_backward_ms: u64) -> Self {
        self.max_backward_ms = max_backward_ms;
        self
    }

    /// Sets the factor applied to a tolerated rollback to get the wait.
    #[must_use]
    pub fn with_backward_wait_multiplier(mut self, multiplier: u64) -> Self {
        self.backward_wait_multiplier = multiplier;
        self
    }

    /// Sets the behavior for a rollback that cannot be waited out.
    #[must_use]
    pub fn with_rollback_policy(mut self, policy: RollbackPolicy) -> Self {
        self.rollback_policy = policy;
        self
    }

    /// Sets how to wait once the sequence of a millisecond is spent.
    #[must_use]
    pub fn with_exhaustion_strategy(mut self, strategy: ExhaustionStrategy) -> Self {
        self.exhaustion_strategy = strategy;
        self
    }

    /// Checks every field against the bit layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] naming the first field out of range.
    pub fn validate(&self) -> Result<()> {
        check("datacenter_id", self.datacenter_id, SnowflakeId::max_datacenter_id())?;
        check("worker_id", self.worker_id, SnowflakeId::max_worker_id())?;
        check("max_backward_ms", self.max_backward_ms, SnowflakeId::max_timestamp())?;
        // Keeps the wait `max_backward_ms * multiplier` from overflowing.
        check("backward_wait_multiplier", self.backward_wait_multiplier, 1 << 16)
    }
}

fn check(field: &'static str, value: u64, max: u64) -> Result<()> {
    if value > max {
        return Err(Error::InvalidParameter { field, value, max });
    }
    Ok(())
}

#[cfg(feature = "serde")]
mod epoch_millis {
    use core::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer, ser::Error};

    pub fn serialize<S: Serializer>(epoch: &Duration, s: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(epoch.as_millis()).map_err(S::Error::custom)?;
        s.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
