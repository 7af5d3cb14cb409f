//! Example tasks, each with several interchangeable variants.
//!
//! Every task lives in its own module next to a `perf` submodule that declares its variants
//! and the input they are measured on.

use std::num::NonZero;
use std::ops::Range;

use crate::{Element, TaskData, VariantRegistry};

mod max_element;
mod sign_alternations;
mod sum_elements;

pub use max_element::MaxElement;
pub use sign_alternations::SignAlternations;
pub use sum_elements::SumElements;

/// The variant registries of every example task.
#[must_use]
pub fn catalog() -> Vec<VariantRegistry> {
    vec![
        sum_elements::perf::registry(),
        max_element::perf::registry(),
        sign_alternations::perf::registry(),
    ]
}

/// The `index`-th of `parts` contiguous ranges that together cover `0..len`.
///
/// Range lengths differ by at most one; the first `len % parts` ranges are the longer ones.
pub(crate) fn partition(len: usize, parts: NonZero<usize>, index: usize) -> Range<usize> {
    let base = len / parts;
    let longer = len % parts;

    let start = index
        .saturating_mul(base)
        .saturating_add(index.min(longer))
        .min(len);
    let end = start
        .saturating_add(base)
        .saturating_add(usize::from(index < longer))
        .min(len);

    start..end
}

/// Writes `value` into output `index` if it holds exactly one `T`.
pub(crate) fn write_single<T: Element>(data: &mut TaskData, index: usize, value: T) -> bool {
    match data.output_mut::<T>(index) {
        Ok([slot]) => {
            *slot = value;
            true
        }
        _ => false,
    }
}
