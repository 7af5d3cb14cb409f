//! Maximum element of an `i32` vector and the index of its first occurrence.

use std::num::NonZero;

use rayon::ThreadPool;

use crate::tasks::{partition, write_single};
use crate::{ElementType, TaskBody, TaskData, VariantKind};

pub(crate) mod perf;

/// Finds the maximum of input 0 (`i32`). Writes the value to output 0 (one `i32`) and the
/// index of its first occurrence to output 1 (one `i64`).
///
/// An empty input fails validation.
#[derive(Debug)]
pub struct MaxElement<'r> {
    pool: Option<&'r ThreadPool>,
    input: Vec<i32>,
    found: Option<(i32, usize)>,
}

impl<'r> MaxElement<'r> {
    /// A single-threaded body.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            pool: None,
            input: Vec::new(),
            found: None,
        }
    }

    /// A body in which every worker thread of `pool` searches one slice of the input.
    #[must_use]
    pub fn thread_pool(pool: &'r ThreadPool) -> Self {
        Self {
            pool: Some(pool),
            ..Self::sequential()
        }
    }
}

impl TaskBody for MaxElement<'_> {
    fn kind(&self) -> VariantKind {
        if self.pool.is_some() {
            VariantKind::ThreadPool
        } else {
            VariantKind::Sequential
        }
    }

    fn validate(&mut self, data: &TaskData) -> bool {
        data.input::<i32>(0).is_ok_and(|input| !input.is_empty())
            && data.has_output(0, ElementType::I32, 1)
            && data.has_output(1, ElementType::I64, 1)
    }

    fn pre_process(&mut self, data: &TaskData) -> bool {
        let Ok(input) = data.input::<i32>(0) else {
            return false;
        };

        input.clone_into(&mut self.input);
        self.found = None;
        true
    }

    fn run(&mut self) -> bool {
        self.found = match self.pool {
            None => first_max(&self.input, 0),
            Some(pool) => parallel_first_max(&self.input, pool),
        };

        self.found.is_some()
    }

    fn post_process(&mut self, data: &mut TaskData) -> bool {
        let Some((value, index)) = self.found else {
            return false;
        };

        let Ok(index) = i64::try_from(index) else {
            return false;
        };

        write_single(data, 0, value) && write_single(data, 1, index)
    }
}

/// The maximum of `values` and its first index, offset by `offset`.
fn first_max(values: &[i32], offset: usize) -> Option<(i32, usize)> {
    values
        .iter()
        .enumerate()
        .fold(None, |best, (i, &value)| match best {
            Some((max, _)) if max >= value => best,
            _ => Some((value, offset.saturating_add(i))),
        })
}

fn parallel_first_max(values: &[i32], pool: &ThreadPool) -> Option<(i32, usize)> {
    let candidates = pool.broadcast(|worker| {
        let workers = NonZero::new(worker.num_threads())?;
        let range = partition(values.len(), workers, worker.index());
        first_max(values.get(range.clone())?, range.start)
    });

    // Candidates are in worker index order, which is share order, so keeping the earlier one
    // on ties keeps the first index.
    candidates
        .into_iter()
        .flatten()
        .fold(None, |best, candidate| match best {
            Some((max, _)) if max >= candidate.0 => best,
            _ => Some(candidate),
        })
}
