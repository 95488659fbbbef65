use core::time::Duration;

use crate::{
    config::{GeneratorConfig, RollbackPolicy},
    error::{Error, Result},
    id::SnowflakeId,
    time::TimeSource,
};

/// Mutable generator state: the timestamp of the last issued ID and the
/// sequence used within it.
///
/// Every transition goes through [`GeneratorState::advance`], which only
/// writes back on success. A failed call leaves the state exactly as it was.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct GeneratorState {
    pub(crate) last_timestamp: u64,
    pub(crate) sequence: u64,
}

impl GeneratorState {
    pub(crate) const fn new(last_timestamp: u64, sequence: u64) -> Self {
        Self {
            last_timestamp,
            sequence,
        }
    }

    /// Issues the next ID. The caller must hold exclusive access to `self`
    /// for the whole call, waits included.
    pub(crate) fn advance<T>(&mut self, config: &GeneratorConfig, time: &T) -> Result<SnowflakeId>
    where
        T: TimeSource + ?Sized,
    {
        let mut now = time.current_millis();

        if now < self.last_timestamp {
            now = self.cold_clock_behind(now, config, time)?;
        }

        let sequence = if now == self.last_timestamp {
            let sequence = (self.sequence + 1) & SnowflakeId::SEQUENCE_MASK;
            if sequence == 0 {
                now = self.wait_next_millis(config, time);
            }
            sequence
        } else {
            0
        };

        if now > SnowflakeId::max_timestamp() {
            return Err(Error::TimestampOverflow {
                timestamp: now,
                max: SnowflakeId::max_timestamp(),
            });
        }

        self.last_timestamp = now;
        self.sequence = sequence;

        Ok(SnowflakeId::from_components(
            now,
            config.datacenter_id,
            config.worker_id,
            sequence,
        ))
    }

    /// Handles a clock reading behind `last_timestamp`. Small rollbacks are
    /// slept out and re-sampled; anything else goes to the rollback policy.
    #[cold]
    #[inline(never)]
    fn cold_clock_behind<T>(&self, now: u64, config: &GeneratorConfig, time: &T) -> Result<u64>
    where
        T: TimeSource + ?Sized,
    {
        let offset = self.last_timestamp - now;
        if offset > config.max_backward_ms {
            return self.rollback_failed(now, config);
        }

        let wait = Duration::from_millis(offset * config.backward_wait_multiplier);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            offset_ms = offset,
            wait_ms = wait.as_millis() as u64,
            last_timestamp = self.last_timestamp,
            "clock moved backwards within tolerance, waiting"
        );
        std::thread::sleep(wait);

        let now = time.current_millis();
        if now < self.last_timestamp {
            return self.rollback_failed(now, config);
        }
        Ok(now)
    }

    #[cold]
    fn rollback_failed(&self, now: u64, config: &GeneratorConfig) -> Result<u64> {
        let err = Error::ClockMovedBackwards {
            last_timestamp: self.last_timestamp,
            now,
            by_millis: self.last_timestamp - now,
        };
        #[cfg(feature = "tracing")]
        tracing::error!(
            datacenter_id = config.datacenter_id,
            worker_id = config.worker_id,
            policy = ?config.rollback_policy,
            "{err}"
        );
        match config.rollback_policy {
            RollbackPolicy::Fail => Err(err),
            RollbackPolicy::Panic => panic!("{err}"),
        }
    }

    /// Spends the rest of an exhausted millisecond re-sampling the clock until
    /// it passes `last_timestamp`.
    fn wait_next_millis<T>(&self, config: &GeneratorConfig, time: &T) -> u64
    where
        T: TimeSource + ?Sized,
    {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            last_timestamp = self.last_timestamp,
            "sequence exhausted, waiting for next millisecond"
        );
        let mut now = time.current_millis();
        while now <= self.last_timestamp {
            config.exhaustion_strategy.pause();
            now = time.current_millis();
        }
        now
    }
}
