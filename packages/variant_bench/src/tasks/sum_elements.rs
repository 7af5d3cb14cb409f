//! Sum of all elements of an `i64` vector.

use std::num::NonZero;

use rayon::ThreadPool;
use rayon::prelude::*;

use crate::tasks::{partition, write_single};
use crate::{DistributedRuntime, ElementType, TaskBody, TaskData, VariantKind};

pub(crate) mod perf;

/// Number of independent accumulators of the vectorized variant.
const LANES: usize = 8;

#[derive(Clone, Copy)]
enum Strategy<'r> {
    Sequential,
    ThreadPool(&'r ThreadPool),
    Vectorized(&'r ThreadPool),
    CompilerParallel(&'r ThreadPool),
    Distributed(&'r dyn DistributedRuntime),
}

/// Sums the elements of input 0 (`i64`) into output 0 (one `i64`). Sums wrap on overflow.
#[derive(derive_more::Debug)]
pub struct SumElements<'r> {
    #[debug(ignore)]
    strategy: Strategy<'r>,
    input: Vec<i64>,
    sum: i64,
}

impl<'r> SumElements<'r> {
    fn new(strategy: Strategy<'r>) -> Self {
        Self {
            strategy,
            input: Vec::new(),
            sum: 0,
        }
    }

    /// A single-threaded body.
    #[must_use]
    pub fn sequential() -> Self {
        Self::new(Strategy::Sequential)
    }

    /// A body that gives each worker thread of `pool` one contiguous share of the input.
    #[must_use]
    pub fn thread_pool(pool: &'r ThreadPool) -> Self {
        Self::new(Strategy::ThreadPool(pool))
    }

    /// Like [`thread_pool()`][Self::thread_pool], but each worker sums its share in lanes.
    #[must_use]
    pub fn vectorized(pool: &'r ThreadPool) -> Self {
        Self::new(Strategy::Vectorized(pool))
    }

    /// A body that leaves the splitting of the input to rayon, within `pool`.
    #[must_use]
    pub fn compiler_parallel(pool: &'r ThreadPool) -> Self {
        Self::new(Strategy::CompilerParallel(pool))
    }

    /// A body that sums its rank's share of the input and combines the shares over `runtime`.
    #[must_use]
    pub fn distributed(runtime: &'r dyn DistributedRuntime) -> Self {
        Self::new(Strategy::Distributed(runtime))
    }
}

impl TaskBody for SumElements<'_> {
    fn kind(&self) -> VariantKind {
        match self.strategy {
            Strategy::Sequential => VariantKind::Sequential,
            Strategy::ThreadPool(_) => VariantKind::ThreadPool,
            Strategy::Vectorized(_) => VariantKind::VectorizedThreads,
            Strategy::CompilerParallel(_) => VariantKind::CompilerParallel,
            Strategy::Distributed(_) => VariantKind::DistributedProcess,
        }
    }

    fn validate(&mut self, data: &TaskData) -> bool {
        data.has_input(0, ElementType::I64) && data.has_output(0, ElementType::I64, 1)
    }

    fn pre_process(&mut self, data: &TaskData) -> bool {
        let Ok(input) = data.input::<i64>(0) else {
            return false;
        };

        input.clone_into(&mut self.input);
        self.sum = 0;
        true
    }

    fn run(&mut self) -> bool {
        self.sum = match self.strategy {
            Strategy::Sequential => wrapping_sum(&self.input),
            Strategy::ThreadPool(pool) => split_sum(&self.input, pool, wrapping_sum),
            Strategy::Vectorized(pool) => split_sum(&self.input, pool, lane_sum),
            Strategy::CompilerParallel(pool) => pool.install(|| {
                self.input
                    .par_iter()
                    .copied()
                    .reduce(|| 0_i64, i64::wrapping_add)
            }),
            Strategy::Distributed(runtime) => {
                let share = partition(self.input.len(), runtime.size(), runtime.rank());
                let local = self.input.get(share).map_or(0, wrapping_sum);
                runtime.all_reduce_sum(local)
            }
        };

        true
    }

    fn post_process(&mut self, data: &mut TaskData) -> bool {
        write_single(data, 0, self.sum)
    }
}

fn wrapping_sum(values: &[i64]) -> i64 {
    values.iter().fold(0_i64, |acc, v| acc.wrapping_add(*v))
}

fn lane_sum(values: &[i64]) -> i64 {
    let mut lanes = [0_i64; LANES];

    let chunks = values.chunks_exact(LANES);
    let tail = wrapping_sum(chunks.remainder());

    for chunk in chunks {
        for (lane, value) in lanes.iter_mut().zip(chunk) {
            *lane = lane.wrapping_add(*value);
        }
    }

    wrapping_sum(&lanes).wrapping_add(tail)
}

/// Every worker of `pool` sums the share of `values` matching its index.
fn split_sum(values: &[i64], pool: &ThreadPool, sum: fn(&[i64]) -> i64) -> i64 {
    pool.broadcast(|worker| {
        NonZero::new(worker.num_threads())
            .and_then(|workers| values.get(partition(values.len(), workers, worker.index())))
            .map_or(0, sum)
    })
    .into_iter()
    .fold(0_i64, i64::wrapping_add)
}
