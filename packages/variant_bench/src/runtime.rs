use std::num::NonZero;

use new_zealand::nz;

/// The distributed runtime a process participates in, as seen by the harness.
///
/// The rank context (rank id, size, whether the runtime is active) is established before the
/// harness sees the runtime and never changes afterwards.
///
/// Task bodies of kind [`DistributedProcess`][crate::VariantKind::DistributedProcess] receive
/// the runtime through their [`VariantContext`][crate::VariantContext] and use the collectives
/// to combine per-rank results.
#[cfg_attr(test, mockall::automock)]
pub trait DistributedRuntime: Send + Sync {
    /// Whether a multi-process runtime is running. When `false`, distributed variants are not
    /// applicable and no barriers are entered.
    fn is_active(&self) -> bool;

    /// The id of this process within the runtime. The primary rank is 0.
    fn rank(&self) -> usize;

    /// The number of ranks.
    fn size(&self) -> NonZero<usize>;

    /// Blocks until every rank has entered the barrier.
    fn barrier(&self);

    /// Sums `value` over all ranks and returns the total to every rank.
    ///
    /// Every rank must call this the same number of times.
    fn all_reduce_sum(&self, value: i64) -> i64;
}

/// The runtime of a process that was not launched under a distributed launcher.
///
/// It is never active, is always rank 0 of 1 and its collectives are identity operations.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleProcess;

impl DistributedRuntime for SingleProcess {
    fn is_active(&self) -> bool {
        false
    }

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> NonZero<usize> {
        nz!(1)
    }

    fn barrier(&self) {}

    fn all_reduce_sum(&self, value: i64) -> i64 {
        value
    }
}
