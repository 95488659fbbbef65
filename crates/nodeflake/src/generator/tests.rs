use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::scope;
use std::time::{Duration, Instant};

use crate::{
    BasicSnowflakeGenerator, Error, ExhaustionStrategy, GeneratorConfig, LockSnowflakeGenerator,
    MonotonicClock, RollbackPolicy, SnowflakeGenerator, SnowflakeId, TimeSource, decode,
};

struct FixedTime {
    millis: u64,
}

impl TimeSource for FixedTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

/// Replays scripted readings in order, repeating the last one once the script
/// runs out.
struct StepTime {
    values: Vec<u64>,
    index: AtomicUsize,
}

impl StepTime {
    fn new(values: Vec<u64>) -> Arc<Self> {
        Arc::new(Self {
            values,
            index: AtomicUsize::new(0),
        })
    }

    fn reads(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }
}

impl TimeSource for StepTime {
    fn current_millis(&self) -> u64 {
        let i = self.index.fetch_add(1, Ordering::Relaxed);
        self.values[i.min(self.values.len() - 1)]
    }
}

fn lock_generator<T: TimeSource>(config: GeneratorConfig, time: T) -> LockSnowflakeGenerator<T> {
    LockSnowflakeGenerator::with_config(config, time).unwrap()
}

fn basic_generator<T: TimeSource>(config: GeneratorConfig, time: T) -> BasicSnowflakeGenerator<T> {
    BasicSnowflakeGenerator::with_config(config, time).unwrap()
}

fn run_id_sequence_increments_within_same_tick<G, T>(generator: &G)
where
    G: SnowflakeGenerator<T>,
    T: TimeSource,
{
    let id1 = generator.next_id().unwrap();
    let id2 = generator.next_id().unwrap();
    let id3 = generator.next_id().unwrap();

    assert_eq!(id1.timestamp(), 42);
    assert_eq!(id2.timestamp(), 42);
    assert_eq!(id3.timestamp(), 42);
    assert_eq!(id1.sequence(), 0);
    assert_eq!(id2.sequence(), 1);
    assert_eq!(id3.sequence(), 2);
    assert!(id1 < id2 && id2 < id3);
}

fn run_generator_handles_rollover<G, T>(generator: &G)
where
    G: SnowflakeGenerator<T>,
    T: TimeSource,
{
    let mut last = None;
    for i in 0..=SnowflakeId::max_sequence() {
        let id = generator.next_id().unwrap();
        assert_eq!(id.sequence(), i);
        assert_eq!(id.timestamp(), 42);
        assert!(last < Some(id));
        last = Some(id);
    }

    // The 4097th ID waits for the next millisecond and restarts the sequence.
    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.sequence(), 0);
    assert!(last < Some(id));
}

fn run_generator_tolerates_small_rollback<G, T>(generator: &G)
where
    G: SnowflakeGenerator<T>,
    T: TimeSource,
{
    let first = generator.next_id().unwrap();
    assert_eq!(first.timestamp(), 10);

    let start = Instant::now();
    let second = generator.next_id().unwrap();
    // A 2 ms rollback sleeps for 4 ms before re-sampling.
    assert!(start.elapsed() >= Duration::from_millis(4));
    assert!(second > first);
}

fn run_generator_rejects_large_rollback<G, T>(generator: &G)
where
    G: SnowflakeGenerator<T>,
    T: TimeSource,
{
    let first = generator.next_id().unwrap();
    assert_eq!(first.timestamp(), 20);

    assert_eq!(
        generator.next_id(),
        Err(Error::ClockMovedBackwards {
            last_timestamp: 20,
            now: 10,
            by_millis: 10,
        })
    );

    // The failed call left the state alone, so the clock catching up resumes
    // issuance right after `first`.
    let next = generator.next_id().unwrap();
    assert_eq!(next.timestamp(), 20);
    assert_eq!(next.sequence(), first.sequence() + 1);
    assert!(next > first);
}

fn run_generator_monotonic<G, T>(generator: &G)
where
    G: SnowflakeGenerator<T>,
    T: TimeSource,
{
    const TOTAL_IDS: usize = 4096 * 64;

    let mut seen = HashSet::with_capacity(TOTAL_IDS);
    let mut last: Option<SnowflakeId> = None;
    for _ in 0..TOTAL_IDS {
        let id = generator.next_id().unwrap();
        if let Some(prev) = last {
            assert!(id > prev, "{id} not after {prev}");
            if id.timestamp() > prev.timestamp() {
                assert_eq!(id.sequence(), 0);
            } else {
                assert_eq!(id.sequence(), prev.sequence() + 1);
            }
        }
        assert!(id.to_i64() >= 0);
        assert!(id.is_valid());
        assert_eq!(id.datacenter_id(), generator.config().datacenter_id);
        assert_eq!(id.worker_id(), generator.config().worker_id);
        assert!(seen.insert(id));
        last = Some(id);
    }
}

#[test]
fn lock_generator_sequence_test() {
    let generator = lock_generator(GeneratorConfig::new(1, 2), FixedTime { millis: 42 });
    run_id_sequence_increments_within_same_tick(&generator);
}

#[test]
fn basic_generator_sequence_test() {
    let generator = basic_generator(GeneratorConfig::new(1, 2), FixedTime { millis: 42 });
    run_id_sequence_increments_within_same_tick(&generator);
}

#[test]
fn lock_generator_rollover_test() {
    let mut values = vec![42; 4097];
    values.push(43);
    let time = StepTime::new(values);
    let generator = lock_generator(GeneratorConfig::new(3, 4), Arc::clone(&time));
    run_generator_handles_rollover(&generator);
    assert_eq!(time.reads(), 4098);
}

#[test]
fn basic_generator_rollover_test() {
    let mut values = vec![42; 4097];
    values.push(43);
    let generator = basic_generator(GeneratorConfig::new(3, 4), StepTime::new(values));
    run_generator_handles_rollover(&generator);
}

#[test]
fn rollover_with_yield_strategy_polls_until_next_millisecond() {
    let time = StepTime::new(vec![42, 42, 42, 42, 43]);
    let config =
        GeneratorConfig::new(0, 0).with_exhaustion_strategy(ExhaustionStrategy::Yield);
    let generator = LockSnowflakeGenerator::from_components(
        config,
        42,
        SnowflakeId::max_sequence(),
        Arc::clone(&time),
    )
    .unwrap();

    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.sequence(), 0);
    assert_eq!(time.reads(), 5);
}

#[test]
fn lock_generator_tolerated_rollback_test() {
    let generator = lock_generator(GeneratorConfig::new(0, 1), StepTime::new(vec![10, 8, 10]));
    run_generator_tolerates_small_rollback(&generator);
}

#[test]
fn basic_generator_tolerated_rollback_test() {
    let generator = basic_generator(GeneratorConfig::new(0, 1), StepTime::new(vec![10, 8, 11]));
    run_generator_tolerates_small_rollback(&generator);
}

#[test]
fn tolerated_rollback_resolving_to_same_millisecond_increments_sequence() {
    let generator = lock_generator(GeneratorConfig::default(), StepTime::new(vec![10, 7, 10]));
    let first = generator.next_id().unwrap();
    let second = generator.next_id().unwrap();
    assert_eq!(second.timestamp(), 10);
    assert_eq!(second.sequence(), first.sequence() + 1);
}

#[test]
fn unresolved_tolerated_rollback_fails() {
    let time = StepTime::new(vec![20, 18, 19, 21]);
    let generator = lock_generator(GeneratorConfig::default(), Arc::clone(&time));
    generator.next_id().unwrap();

    assert_eq!(
        generator.next_id(),
        Err(Error::ClockMovedBackwards {
            last_timestamp: 20,
            now: 19,
            by_millis: 1,
        })
    );
    // Sampled once, then once more after the wait.
    assert_eq!(time.reads(), 3);

    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 21);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn lock_generator_fatal_rollback_test() {
    let generator = lock_generator(GeneratorConfig::default(), StepTime::new(vec![20, 10, 20]));
    run_generator_rejects_large_rollback(&generator);
}

#[test]
fn basic_generator_fatal_rollback_test() {
    let generator = basic_generator(GeneratorConfig::default(), StepTime::new(vec![20, 10, 20]));
    run_generator_rejects_large_rollback(&generator);
}

#[test]
fn rollback_beyond_tolerance_does_not_wait() {
    let generator = lock_generator(
        GeneratorConfig::default().with_max_backward_ms(0),
        StepTime::new(vec![20, 19]),
    );
    generator.next_id().unwrap();
    let start = Instant::now();
    assert!(matches!(
        generator.next_id(),
        Err(Error::ClockMovedBackwards { by_millis: 1, .. })
    ));
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
#[should_panic(expected = "clock moved backwards")]
fn panic_policy_panics_on_fatal_rollback() {
    let config = GeneratorConfig::default().with_rollback_policy(RollbackPolicy::Panic);
    let generator = lock_generator(config, StepTime::new(vec![20, 10]));
    generator.next_id().unwrap();
    let _ = generator.next_id();
}

#[cfg(not(feature = "parking-lot"))]
#[test]
fn panic_policy_poisons_the_lock() {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    let config = GeneratorConfig::default().with_rollback_policy(RollbackPolicy::Panic);
    let generator = lock_generator(config, StepTime::new(vec![20, 10, 30]));
    generator.next_id().unwrap();

    let result = catch_unwind(AssertUnwindSafe(|| generator.next_id()));
    assert!(result.is_err());
    assert_eq!(generator.next_id(), Err(Error::LockPoisoned));
}

#[cfg(feature = "parking-lot")]
#[test]
fn panic_policy_leaves_parking_lot_generator_usable() {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    let config = GeneratorConfig::default().with_rollback_policy(RollbackPolicy::Panic);
    let generator = lock_generator(config, StepTime::new(vec![20, 10, 30]));
    let first = generator.next_id().unwrap();

    let result = catch_unwind(AssertUnwindSafe(|| generator.next_id()));
    assert!(result.is_err());

    let next = generator.next_id().unwrap();
    assert_eq!(next.timestamp(), 30);
    assert!(next > first);
}

#[test]
fn panic_policy_leaves_basic_generator_usable() {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    let config = GeneratorConfig::default().with_rollback_policy(RollbackPolicy::Panic);
    let generator = basic_generator(config, StepTime::new(vec![20, 10, 20]));
    let first = generator.next_id().unwrap();

    let result = catch_unwind(AssertUnwindSafe(|| generator.next_id()));
    assert!(result.is_err());

    // The state was not written back, so issuance resumes after `first`.
    let next = generator.next_id().unwrap();
    assert_eq!(next.timestamp(), 20);
    assert_eq!(next.sequence(), first.sequence() + 1);
}

#[test]
fn timestamp_overflow_is_rejected_without_issuing() {
    let max = SnowflakeId::max_timestamp();
    let generator = lock_generator(GeneratorConfig::default(), FixedTime { millis: max + 1 });
    assert_eq!(
        generator.next_id(),
        Err(Error::TimestampOverflow {
            timestamp: max + 1,
            max,
        })
    );

    let generator = lock_generator(GeneratorConfig::default(), FixedTime { millis: max });
    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), max);
    assert!(id.to_i64() > 0);
}

#[test]
fn zero_elapsed_time_is_accepted() {
    let generator = lock_generator(GeneratorConfig::default(), FixedTime { millis: 0 });
    let a = generator.next_id().unwrap();
    let b = generator.next_id().unwrap();
    assert_eq!(a.timestamp(), 0);
    assert!(a < b);
}

#[test]
fn construction_bounds() {
    assert_eq!(
        LockSnowflakeGenerator::new(32, 0).err(),
        Some(Error::InvalidParameter {
            field: "datacenter_id",
            value: 32,
            max: 31,
        })
    );
    assert_eq!(
        LockSnowflakeGenerator::new(0, 32).err(),
        Some(Error::InvalidParameter {
            field: "worker_id",
            value: 32,
            max: 31,
        })
    );
    let generator = LockSnowflakeGenerator::new(31, 31).unwrap();
    assert_eq!(generator.datacenter_id(), 31);
    assert_eq!(generator.worker_id(), 31);

    assert!(BasicSnowflakeGenerator::with_config(GeneratorConfig::new(40, 0), FixedTime { millis: 0 }).is_err());
}

#[test]
fn every_node_identity_round_trips() {
    let clock = MonotonicClock::try_default().unwrap();
    for dc in 0..=SnowflakeId::max_datacenter_id() {
        for wk in 0..=SnowflakeId::max_worker_id() {
            let generator = lock_generator(GeneratorConfig::new(dc, wk), clock);
            let id = generator.next_id().unwrap();
            assert_eq!(decode(id.to_i64()), (dc, wk));
        }
    }
}

#[test]
fn lock_generator_monotonic_clock_sequence_increments() {
    let clock = MonotonicClock::try_default().unwrap();
    let generator = lock_generator(GeneratorConfig::new(1, 1), clock);
    run_generator_monotonic(&generator);
}

#[test]
fn basic_generator_monotonic_clock_sequence_increments() {
    let clock = MonotonicClock::try_default().unwrap();
    let generator = basic_generator(GeneratorConfig::new(2, 5), clock);
    run_generator_monotonic(&generator);
}

#[test]
fn lock_generator_threaded_unique() {
    const THREADS: usize = 8;
    const IDS_PER_THREAD: usize = 4096 * 16;

    let generator = LockSnowflakeGenerator::new(7, 9).unwrap();

    let per_thread: Vec<Vec<SnowflakeId>> = scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let generator = generator.clone();
                s.spawn(move || {
                    (0..IDS_PER_THREAD)
                        .map(|_| generator.next_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut seen = HashSet::with_capacity(THREADS * IDS_PER_THREAD);
    for ids in &per_thread {
        // Each thread observes a strictly increasing series.
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for id in ids {
            assert_eq!(decode(id.to_i64()), (7, 9));
            assert!(seen.insert((id.timestamp(), id.sequence())));
        }
    }
    assert_eq!(seen.len(), THREADS * IDS_PER_THREAD);
}

#[test]
fn clones_share_state() {
    let generator = lock_generator(GeneratorConfig::default(), Arc::new(FixedTime { millis: 5 }));
    let other = generator.clone();
    let a = generator.next_id().unwrap();
    let b = other.next_id().unwrap();
    assert_eq!(a.sequence() + 1, b.sequence());
}

#[test]
fn independent_instances_do_not_collide() {
    let time = Arc::new(FixedTime { millis: 77 });
    let a = lock_generator(GeneratorConfig::new(0, 1), Arc::clone(&time));
    let b = lock_generator(GeneratorConfig::new(0, 2), Arc::clone(&time));

    let mut seen = HashSet::new();
    for _ in 0..1000 {
        assert!(seen.insert(a.next_id().unwrap()));
        assert!(seen.insert(b.next_id().unwrap()));
    }
}
