//! Measurement of many registries in one go, as done by the command line tool.

use crate::{
    ExecutionContext, HarnessConfig, MeasureError, MeasureOutcome, PerfAttr, PerfMode,
    PerformanceRunner, VariantRegistry,
};

/// What a batch of measurements amounted to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchSummary {
    measured: usize,
    skipped: usize,
    failures: Vec<(String, MeasureError)>,
}

impl BatchSummary {
    /// How many measurements were taken.
    #[must_use]
    pub fn measured(&self) -> usize {
        self.measured
    }

    /// How many eligible variants were skipped by the runner.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The identifiers and errors of failed measurements, in the order they happened.
    #[must_use]
    pub fn failures(&self) -> &[(String, MeasureError)] {
        &self.failures
    }

    /// Whether every measurement succeeded or was skipped.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Combines the summaries of the ranks of one distributed run, given in rank order.
    ///
    /// All ranks make the same measurements, so the counts are those of the primary rank.
    /// Failures are collected from every rank, primary rank first: a rank can exceed its time
    /// budget while the primary rank, the only one that reports, stays within its own.
    #[must_use]
    pub fn combine_ranks(summaries: impl IntoIterator<Item = Self>) -> Self {
        let mut ranks = summaries.into_iter();

        let Some(mut combined) = ranks.next() else {
            return Self::default();
        };

        for rank in ranks {
            combined.failures.extend(rank.failures);
        }

        combined
    }
}

/// Measures every eligible variant of every registry once per mode in `modes`.
///
/// A failed measurement does not stop the batch. Every rank of a distributed run must make the
/// same sequence of measurements, so stopping early on one rank would leave the others waiting
/// in a barrier.
pub fn run_batch(
    registries: &[VariantRegistry],
    runner: &PerformanceRunner<'_>,
    config: &HarnessConfig,
    modes: &[PerfMode],
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for registry in registries {
        for &mode in modes {
            let attr = PerfAttr::new(config.repetitions(), mode);

            for variant in registry.measure_eligible(runner, config, attr) {
                match variant.result {
                    Ok(MeasureOutcome::Measured(_)) => summary.measured += 1,
                    Ok(MeasureOutcome::Skipped(_)) => summary.skipped += 1,
                    Err(e) => summary.failures.push((variant.identifier, e)),
                }
            }
        }
    }

    tracing::info!(
        measured = summary.measured,
        skipped = summary.skipped,
        failed = summary.failures.len(),
        "batch complete"
    );

    summary
}

/// The benchmark names of the variants eligible in `context`, registry by registry.
#[must_use]
pub fn eligible_benchmark_names(
    registries: &[VariantRegistry],
    context: ExecutionContext,
) -> Vec<String> {
    registries
        .iter()
        .flat_map(|registry| {
            registry
                .eligible(context)
                .map(|variant| registry.benchmark_name(variant, context.tasks_type()))
        })
        .collect()
}
