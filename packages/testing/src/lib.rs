#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing the variant_bench harness.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Default timeout of [`with_watchdog()`].
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs a test with a timeout to prevent infinite hangs.
///
/// Multi-rank tests synchronize on barriers. A rank that never reaches a barrier leaves the
/// others blocked forever, so such tests run under a watchdog that fails the test instead.
///
/// The timeout is [`DEFAULT_WATCHDOG_TIMEOUT`] under normal conditions and six times that
/// under Miri, where thread synchronization primitives are significantly slower.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the watchdog
/// is disabled and the test function is executed directly. This allows mutation
/// testing to properly detect hanging mutations.
///
/// # Panics
///
/// Panics if the test exceeds the timeout (when not in mutation testing mode) and propagates
/// any panic from the test itself.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// with_watchdog(|| {
///     assert_eq!(2 + 2, 4);
/// });
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let timeout = if cfg!(miri) {
        DEFAULT_WATCHDOG_TIMEOUT.saturating_mul(6)
    } else {
        DEFAULT_WATCHDOG_TIMEOUT
    };

    with_watchdog_timeout(timeout, test_fn)
}

/// Like [`with_watchdog()`] but with an explicit timeout, for tests that sleep on purpose.
///
/// # Panics
///
/// Panics if the test exceeds `timeout` (when not in mutation testing mode) and propagates
/// any panic from the test itself.
pub fn with_watchdog_timeout<F, R>(timeout: Duration, test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        let result = test_fn();
        // If this fails, the receiver has already timed out.
        drop(tx.send(result));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_handle.join().expect("test thread should not panic after sending");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded {timeout:?} timeout");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread disconnected unexpectedly"),
            Err(e) => std::panic::resume_unwind(e),
        },
    }
}

/// Whether `actual` is within `tolerance` (a fraction, e.g. 0.5 for ±50%) of `expected`.
///
/// Timing tests on shared machines are noisy; the tolerance should be generous.
#[must_use]
pub fn duration_within(actual: Duration, expected: Duration, tolerance: f64) -> bool {
    let actual = actual.as_secs_f64();
    let expected = expected.as_secs_f64();

    (actual - expected).abs() <= expected * tolerance
}
