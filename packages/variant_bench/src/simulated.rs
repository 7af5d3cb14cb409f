//! An in-process distributed runtime: one OS thread per rank.

use std::num::NonZero;
use std::panic;
use std::sync::atomic::{self, AtomicU64};
use std::sync::{Barrier, Mutex, PoisonError};
use std::thread;

use crate::DistributedRuntime;

/// Runs the same closure on a fixed number of simulated ranks, each on its own thread.
///
/// This stands in for launching a program under a distributed launcher with `N` processes.
/// Every rank sees an active [`DistributedRuntime`] whose barrier and collectives are shared
/// with the other ranks of the same run. Nothing else is shared: each rank builds its own
/// task data and tasks.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use variant_bench::{DistributedRuntime, SimulatedRanks};
///
/// let ranks = SimulatedRanks::new(NonZero::new(4).unwrap());
///
/// let totals = ranks.run(|runtime| runtime.all_reduce_sum(runtime.rank() as i64));
///
/// assert_eq!(&*totals, &[6, 6, 6, 6]);
/// ```
#[derive(Debug)]
pub struct SimulatedRanks {
    size: NonZero<usize>,
}

impl SimulatedRanks {
    /// Creates a runner for `size` ranks.
    #[must_use]
    pub fn new(size: NonZero<usize>) -> Self {
        Self { size }
    }

    /// The number of ranks.
    #[must_use]
    pub fn size(&self) -> NonZero<usize> {
        self.size
    }

    /// Executes `f` once on every rank and returns the results in rank order.
    ///
    /// # Panics
    ///
    /// If any rank panics, the panic is propagated to the caller once all ranks have finished.
    /// A rank that panics while the others wait in a barrier or collective leaves them blocked,
    /// as a crashed process would under a real launcher.
    pub fn run<F, R>(&self, f: F) -> Box<[R]>
    where
        F: Fn(&SimulatedRank<'_>) -> R + Sync,
        R: Send,
    {
        let shared = Shared {
            barrier: Barrier::new(self.size.get()),
            reduction: Mutex::new(0),
        };

        let f = &f;
        let shared = &shared;
        let size = self.size;

        thread::scope(|scope| {
            let handles = (0..size.get())
                .map(|rank| {
                    scope.spawn(move || {
                        let runtime = SimulatedRank {
                            rank,
                            size,
                            shared,
                            barriers_passed: AtomicU64::new(0),
                        };

                        f(&runtime)
                    })
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload))
                })
                .collect()
        })
    }
}

#[derive(Debug)]
struct Shared {
    barrier: Barrier,
    reduction: Mutex<i64>,
}

/// The view one simulated rank has of the runtime.
#[derive(Debug)]
pub struct SimulatedRank<'s> {
    rank: usize,
    size: NonZero<usize>,
    shared: &'s Shared,
    barriers_passed: AtomicU64,
}

impl SimulatedRank<'_> {
    /// How many times this rank has passed [`barrier()`][DistributedRuntime::barrier].
    ///
    /// Barriers used internally by collectives are not counted.
    #[must_use]
    pub fn barriers_passed(&self) -> u64 {
        self.barriers_passed.load(atomic::Ordering::Relaxed)
    }
}

impl DistributedRuntime for SimulatedRank<'_> {
    fn is_active(&self) -> bool {
        true
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> NonZero<usize> {
        self.size
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
        self.barriers_passed.fetch_add(1, atomic::Ordering::Relaxed);
    }

    fn all_reduce_sum(&self, value: i64) -> i64 {
        let reduction = &self.shared.reduction;

        {
            let mut sum = reduction.lock().unwrap_or_else(PoisonError::into_inner);
            *sum = sum.wrapping_add(value);
        }

        // Every rank has contributed.
        self.shared.barrier.wait();

        let total = *reduction.lock().unwrap_or_else(PoisonError::into_inner);

        // Every rank has read the total, so the slot can be cleared for the next reduction.
        if self.shared.barrier.wait().is_leader() {
            *reduction.lock().unwrap_or_else(PoisonError::into_inner) = 0;
        }

        self.shared.barrier.wait();

        total
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use new_zealand::nz;
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(SimulatedRank<'static>: DistributedRuntime, Send, Sync);

    #[test]
    fn results_are_in_rank_order() {
        testing::with_watchdog(|| {
            let ranks = SimulatedRanks::new(nz!(3));
            let results = ranks.run(|runtime| (runtime.rank(), runtime.size().get()));

            assert_eq!(&*results, &[(0, 3), (1, 3), (2, 3)]);
        });
    }

    #[test]
    fn barrier_waits_for_all_ranks() {
        testing::with_watchdog(|| {
            let arrived = AtomicUsize::new(0);
            let ranks = SimulatedRanks::new(nz!(4));

            let observed = ranks.run(|runtime| {
                if runtime.rank() == 0 {
                    thread::sleep(Duration::from_millis(10));
                }

                arrived.fetch_add(1, atomic::Ordering::SeqCst);
                runtime.barrier();
                let seen = arrived.load(atomic::Ordering::SeqCst);
                (seen, runtime.barriers_passed())
            });

            assert!(observed.iter().all(|&(seen, passed)| seen == 4 && passed == 1));
        });
    }

    #[test]
    fn consecutive_reductions_do_not_mix() {
        testing::with_watchdog(|| {
            let ranks = SimulatedRanks::new(nz!(4));

            let totals = ranks.run(|runtime| {
                let rank = i64::try_from(runtime.rank()).unwrap();
                let first = runtime.all_reduce_sum(rank);
                let second = runtime.all_reduce_sum(10);
                (first, second, runtime.barriers_passed())
            });

            assert!(totals.iter().all(|t| *t == (6, 40, 0)));
        });
    }

    #[test]
    fn single_rank_is_active() {
        let ranks = SimulatedRanks::new(nz!(1));
        let results = ranks.run(|runtime| {
            runtime.barrier();
            (runtime.is_active(), runtime.all_reduce_sum(5))
        });

        assert_eq!(&*results, &[(true, 5)]);
    }

    #[test]
    #[should_panic(expected = "rank 1 failed")]
    fn rank_panic_propagates() {
        let ranks = SimulatedRanks::new(nz!(2));

        ranks.run(|runtime| {
            assert!(runtime.rank() != 1, "rank 1 failed");
        });
    }
}
