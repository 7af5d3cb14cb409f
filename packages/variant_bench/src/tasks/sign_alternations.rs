//! Number of sign changes between neighboring elements of an `i32` vector.

use rayon::ThreadPool;
use rayon::prelude::*;

use crate::tasks::write_single;
use crate::{ElementType, TaskBody, TaskData, VariantKind};

pub(crate) mod perf;

/// Counts the adjacent pairs of input 0 (`i32`) whose signs are strictly opposite and writes
/// the count to output 0 (one `i64`). Zero has no sign, so pairs with a zero never count.
#[derive(Debug)]
pub struct SignAlternations<'r> {
    pool: Option<&'r ThreadPool>,
    input: Vec<i32>,
    count: usize,
}

impl<'r> SignAlternations<'r> {
    /// A single-threaded body.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            pool: None,
            input: Vec::new(),
            count: 0,
        }
    }

    /// A body that leaves the splitting of the input to rayon, within `pool`.
    #[must_use]
    pub fn compiler_parallel(pool: &'r ThreadPool) -> Self {
        Self {
            pool: Some(pool),
            ..Self::sequential()
        }
    }
}

impl TaskBody for SignAlternations<'_> {
    fn kind(&self) -> VariantKind {
        if self.pool.is_some() {
            VariantKind::CompilerParallel
        } else {
            VariantKind::Sequential
        }
    }

    fn validate(&mut self, data: &TaskData) -> bool {
        data.has_input(0, ElementType::I32) && data.has_output(0, ElementType::I64, 1)
    }

    fn pre_process(&mut self, data: &TaskData) -> bool {
        let Ok(input) = data.input::<i32>(0) else {
            return false;
        };

        input.clone_into(&mut self.input);
        self.count = 0;
        true
    }

    fn run(&mut self) -> bool {
        self.count = match self.pool {
            Some(pool) => pool.install(|| {
                self.input
                    .par_windows(2)
                    .filter(|pair| alternates(pair))
                    .count()
            }),
            None => self.input.windows(2).filter(|pair| alternates(pair)).count(),
        };

        true
    }

    fn post_process(&mut self, data: &mut TaskData) -> bool {
        i64::try_from(self.count).is_ok_and(|count| write_single(data, 0, count))
    }
}

fn alternates(pair: &[i32]) -> bool {
    match pair {
        [a, b] => a.signum() * b.signum() < 0,
        _ => false,
    }
}
