use std::time::Duration;

use crate::error::Result;
use crate::timer::Timer;
use crate::{
    DistributedCoordinator, DistributedRuntime, HarnessConfig, LifecycleOperation, MeasureError,
    PerfAttr, PerfMeasurement, PerfMode, Reporter, SkipReason, Task, TaskBody, VariantKind,
};

/// What became of one measurement request.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum MeasureOutcome {
    /// The task was measured within the time budget.
    Measured(PerfMeasurement),

    /// The task is not applicable to this environment and was not run.
    Skipped(SkipReason),
}

impl MeasureOutcome {
    /// The measurement, if one was taken.
    #[must_use]
    pub fn measurement(&self) -> Option<&PerfMeasurement> {
        match self {
            Self::Measured(m) => Some(m),
            Self::Skipped(_) => None,
        }
    }
}

/// Drives tasks through timed repetitions and produces one measurement per task.
///
/// The runner owns the timing policy:
///
/// * In [`PerfMode::Pipeline`], each repetition is a whole episode (validate, pre-process, run,
///   post-process, reset) and all repetitions are timed together.
/// * In [`PerfMode::TaskRun`], validation and pre-processing happen once before the timed
///   region, the run phase is repeated inside it and post-processing happens once after it.
///
/// The elapsed time is the total over all repetitions. A total above the configured maximum is
/// an error, not a result.
///
/// For distributed variants under an active runtime, every rank enters a barrier right before
/// the clock starts and right after it stops, and only the primary rank reports.
#[derive(derive_more::Debug)]
pub struct PerformanceRunner<'a> {
    max_time: Duration,
    coordinator: DistributedCoordinator<'a>,
    #[debug(ignore)]
    reporter: &'a dyn Reporter,
    timer: Timer,
}

impl<'a> PerformanceRunner<'a> {
    /// Creates a runner that enforces the limits of `config`, synchronizes through `runtime`
    /// and reports to `reporter`.
    #[must_use]
    pub fn new(
        config: &HarnessConfig,
        runtime: &'a dyn DistributedRuntime,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self::with_timer(config, runtime, reporter, Timer::new())
    }

    pub(crate) fn with_timer(
        config: &HarnessConfig,
        runtime: &'a dyn DistributedRuntime,
        reporter: &'a dyn Reporter,
        timer: Timer,
    ) -> Self {
        Self {
            max_time: config.max_time(),
            coordinator: DistributedCoordinator::new(runtime),
            reporter,
            timer,
        }
    }

    /// The coordinator this runner synchronizes through.
    #[must_use]
    pub fn coordinator(&self) -> DistributedCoordinator<'a> {
        self.coordinator
    }

    /// Measures `task` according to `attr` without reporting.
    ///
    /// The task must not have started an episode. On success it is back in
    /// [`LifecyclePhase::Created`][crate::LifecyclePhase::Created] and its outputs hold the
    /// results of the last repetition.
    ///
    /// # Errors
    ///
    /// Returns an error if the task rejects its data or a phase fails, if the mode cannot be
    /// measured or if the measured time exceeds the maximum.
    ///
    /// # Panics
    ///
    /// Panics with the lifecycle order violation marker if the task is mid-episode.
    pub fn measure<B: TaskBody>(
        &self,
        task: &mut Task<'_, B>,
        attr: PerfAttr,
    ) -> Result<MeasureOutcome> {
        let kind = task.kind();

        if let Err(reason) = self.coordinator.applicability(kind) {
            tracing::info!(%kind, %reason, "skipping measurement");
            return Ok(MeasureOutcome::Skipped(reason));
        }

        let elapsed = match attr.mode() {
            PerfMode::Pipeline => self.measure_pipeline(task, attr)?,
            PerfMode::TaskRun => self.measure_task_run(task, attr)?,
            PerfMode::None => return Err(MeasureError::UnsupportedMode(attr.mode())),
        };

        if elapsed > self.max_time {
            return Err(MeasureError::TimeBudgetExceeded {
                elapsed,
                max: self.max_time,
            });
        }

        let measurement = PerfMeasurement::new(attr.mode(), elapsed, attr.repetitions());

        tracing::debug!(
            %kind,
            mode = %measurement.mode(),
            repetitions = measurement.repetitions().get(),
            elapsed_secs = measurement.elapsed_secs(),
            "measured"
        );

        Ok(MeasureOutcome::Measured(measurement))
    }

    /// Measures `task` and reports the outcome under `identifier`.
    ///
    /// Measurements go to [`Reporter::report()`], errors to [`Reporter::report_error()`],
    /// skips nowhere. Only the primary rank reports; the outcome is returned on every rank.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`measure()`][Self::measure], after reporting them.
    pub fn measure_and_report<B: TaskBody>(
        &self,
        task: &mut Task<'_, B>,
        attr: PerfAttr,
        identifier: &str,
    ) -> Result<MeasureOutcome> {
        let result = self.measure(task, attr);

        if let Err(e) = &result {
            tracing::error!(identifier, error = %e, "measurement failed");
        }

        if self.coordinator.is_primary() {
            match &result {
                Ok(MeasureOutcome::Measured(measurement)) => {
                    self.reporter.report(identifier, measurement);
                }
                Ok(MeasureOutcome::Skipped(_)) => {}
                Err(e) => self.reporter.report_error(identifier, e),
            }
        }

        result
    }

    fn measure_pipeline<B: TaskBody>(
        &self,
        task: &mut Task<'_, B>,
        attr: PerfAttr,
    ) -> Result<Duration> {
        let (elapsed, result) = self.timed(task.kind(), || {
            (0..attr.repetitions().get()).try_for_each(|_| run_episode(task))
        });

        result.map(|()| elapsed)
    }

    fn measure_task_run<B: TaskBody>(
        &self,
        task: &mut Task<'_, B>,
        attr: PerfAttr,
    ) -> Result<Duration> {
        if !task.validate() {
            conclude_rejected(task);
            return Err(MeasureError::ValidationFailed);
        }

        let pre_processed = task.pre_process();

        task.allow_repeated_run(true);

        let (elapsed, ran) = self.timed(task.kind(), || {
            // Non-short-circuiting: every repetition runs even after a failure.
            (0..attr.repetitions().get()).fold(true, |ok, _| task.run() & ok)
        });

        task.allow_repeated_run(false);

        let post_processed = task.post_process();
        task.reset();

        first_failure([
            (LifecycleOperation::PreProcess, pre_processed),
            (LifecycleOperation::Run, ran),
            (LifecycleOperation::PostProcess, post_processed),
        ])?;

        Ok(elapsed)
    }

    /// Times `region`, bracketed by barriers when the coordinator is engaged for `kind`.
    ///
    /// Both barriers are entered even if `region` fails, so that no rank is left waiting.
    fn timed<R>(&self, kind: VariantKind, region: impl FnOnce() -> R) -> (Duration, R) {
        self.coordinator.sync(kind);

        let stopwatch = self.timer.start();
        let result = region();
        let elapsed = stopwatch.stop();

        self.coordinator.sync(kind);

        (elapsed, result)
    }
}

/// One complete episode. Phases after a failure still run so the episode ends in order.
fn run_episode<B: TaskBody>(task: &mut Task<'_, B>) -> Result<()> {
    if !task.validate() {
        conclude_rejected(task);
        return Err(MeasureError::ValidationFailed);
    }

    let pre_processed = task.pre_process();
    let ran = task.run();
    let post_processed = task.post_process();
    task.reset();

    first_failure([
        (LifecycleOperation::PreProcess, pre_processed),
        (LifecycleOperation::Run, ran),
        (LifecycleOperation::PostProcess, post_processed),
    ])
}

/// Walks a task whose data was rejected through the rest of its episode and back to
/// [`LifecyclePhase::Created`][crate::LifecyclePhase::Created]. Phase results are irrelevant.
fn conclude_rejected<B: TaskBody>(task: &mut Task<'_, B>) {
    task.pre_process();
    task.run();
    task.post_process();
    task.reset();
}

fn first_failure(phases: [(LifecycleOperation, bool); 3]) -> Result<()> {
    match phases.into_iter().find(|(_, ok)| !ok) {
        Some((phase, _)) => Err(MeasureError::PhaseFailed { phase }),
        None => Ok(()),
    }
}
