use core::time::Duration;
use std::sync::Arc;

/// Default epoch: Wednesday, January 1, 2020 00:00:00 UTC
pub const DEFAULT_EPOCH: Duration = Duration::from_millis(1_577_836_800_000);

/// A trait for time sources that return milliseconds elapsed since an epoch.
///
/// This abstraction allows you to plug in a monotonic clock, or a mocked time
/// source in tests that replays clock rollbacks and same-millisecond bursts.
///
/// # Example
///
/// ```
/// use nodeflake::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the configured epoch.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}
