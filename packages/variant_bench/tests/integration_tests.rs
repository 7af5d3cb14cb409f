//! Integration tests of the lifecycle contract and the timing policy through the public API.

use std::num::NonZero;
use std::thread;
use std::time::Duration;

use new_zealand::nz;
use variant_bench::tasks::{self, SumElements};
use variant_bench::{
    CollectingReporter, ElementType, ExecutionContext, HarnessConfig, MeasureError,
    MeasureOutcome, PerfAttr, PerfMode, PerformanceRunner, SingleProcess, Task, TaskBody,
    TaskData, TasksType, VariantKind, worker_pool,
};

/// Sleeps during setup and during the run phase.
struct Sleepy {
    setup: Duration,
    run: Duration,
}

impl TaskBody for Sleepy {
    fn kind(&self) -> VariantKind {
        VariantKind::Sequential
    }

    fn validate(&mut self, data: &TaskData) -> bool {
        data.has_output(0, ElementType::U8, 1)
    }

    fn pre_process(&mut self, _data: &TaskData) -> bool {
        thread::sleep(self.setup);
        true
    }

    fn run(&mut self) -> bool {
        thread::sleep(self.run);
        true
    }

    fn post_process(&mut self, data: &mut TaskData) -> bool {
        data.output_mut::<u8>(0).map(|out| out[0] = 1).is_ok()
    }
}

fn sleepy_data() -> TaskData {
    TaskData::new().with_output(ElementType::U8, 1)
}

fn measure(
    body: Sleepy,
    attr: PerfAttr,
    config: &HarnessConfig,
) -> Result<MeasureOutcome, MeasureError> {
    let reporter = CollectingReporter::new();
    let runner = PerformanceRunner::new(config, &SingleProcess, &reporter);

    let mut data = sleepy_data();
    let mut task = Task::new(body, &mut data);
    runner.measure(&mut task, attr)
}

fn elapsed(outcome: Result<MeasureOutcome, MeasureError>) -> Duration {
    outcome.unwrap().measurement().unwrap().elapsed()
}

fn sum_data() -> TaskData {
    TaskData::new()
        .with_input(vec![2_i64; 20])
        .with_output(ElementType::I64, 1)
}

#[test]
fn in_order_lifecycle_succeeds() {
    let mut data = sum_data();
    let mut task = Task::new(SumElements::sequential(), &mut data);

    assert!(task.validate());
    assert!(task.pre_process());
    assert!(task.run());
    assert!(task.post_process());
    drop(task);

    assert_eq!(data.output::<i64>(0).unwrap(), &[40]);
}

#[test]
#[should_panic(expected = "ORDER OF FUNCTIONS IS NOT RIGHT")]
fn post_process_right_after_validate_panics() {
    let mut data = sum_data();
    let mut task = Task::new(SumElements::sequential(), &mut data);

    task.validate();
    task.post_process();
}

#[test]
#[should_panic(expected = "ORDER OF FUNCTIONS IS NOT RIGHT")]
fn run_before_validate_panics() {
    let mut data = sum_data();
    let pool = worker_pool(nz!(2)).unwrap();
    let mut task = Task::new(SumElements::compiler_parallel(&pool), &mut data);

    task.run();
}

#[test]
fn task_run_excludes_setup_cost() {
    let config = HarnessConfig::default();
    let body = || Sleepy {
        setup: Duration::from_millis(15),
        run: Duration::from_millis(10),
    };

    let pipeline = elapsed(measure(
        body(),
        PerfAttr::new(nz!(3), PerfMode::Pipeline),
        &config,
    ));
    let task_run = elapsed(measure(
        body(),
        PerfAttr::new(nz!(3), PerfMode::TaskRun),
        &config,
    ));

    assert!(
        task_run < pipeline,
        "task_run {task_run:?} should be below pipeline {pipeline:?}"
    );
}

#[test]
fn pipeline_elapsed_is_total_over_repetitions() {
    let config = HarnessConfig::default();
    let run = Duration::from_millis(20);
    let repetitions: NonZero<u32> = nz!(5);

    let total = elapsed(measure(
        Sleepy {
            setup: Duration::ZERO,
            run,
        },
        PerfAttr::new(repetitions, PerfMode::Pipeline),
        &config,
    ));

    let expected = run * repetitions.get();
    assert!(total >= expected, "{total:?} is less than {expected:?}");
    assert!(
        testing::duration_within(total, expected, 0.5),
        "{total:?} is not close to {expected:?}"
    );
}

#[test]
fn overrun_is_error_and_not_a_result() {
    let config = HarnessConfig::default().with_max_time(Duration::from_millis(20));
    let reporter = CollectingReporter::new();
    let runner = PerformanceRunner::new(&config, &SingleProcess, &reporter);

    let mut data = sleepy_data();
    let mut task = Task::new(
        Sleepy {
            setup: Duration::ZERO,
            run: Duration::from_millis(40),
        },
        &mut data,
    );

    let result = runner.measure_and_report(&mut task, PerfAttr::default(), "sleepy/seq");

    assert!(matches!(
        result,
        Err(MeasureError::TimeBudgetExceeded { max, .. }) if max == Duration::from_millis(20)
    ));
    assert!(reporter.measurements().is_empty());
    assert_eq!(reporter.errors().len(), 1);
}

#[test]
fn measurement_carries_requested_mode() {
    let config = HarnessConfig::default();

    for mode in PerfMode::MEASURABLE {
        let outcome = measure(
            Sleepy {
                setup: Duration::ZERO,
                run: Duration::ZERO,
            },
            PerfAttr::new(nz!(2), mode),
            &config,
        )
        .unwrap();

        let measurement = outcome.measurement().unwrap();
        assert_eq!(measurement.mode(), mode);
        assert_eq!(measurement.repetitions().get(), 2);
    }
}

#[test]
fn every_catalog_variant_is_measured() {
    let config = HarnessConfig::default().with_worker_threads(nz!(3));
    let reporter = CollectingReporter::new();
    let runner = PerformanceRunner::new(&config, &SingleProcess, &reporter);

    for registry in tasks::catalog() {
        let results = registry.measure_eligible(&runner, &config, PerfAttr::default());

        assert!(results.len() >= 2, "{}", registry.task_name());
        for result in &results {
            assert!(
                matches!(result.result, Ok(MeasureOutcome::Measured(_))),
                "{}: {:?}",
                result.identifier,
                result.result
            );
        }
    }

    let identifiers = reporter
        .measurements()
        .into_iter()
        .map(|(id, _)| id)
        .collect::<Vec<_>>();
    assert!(identifiers.contains(&"sum_elements/vectorized".to_owned()));
    assert!(identifiers.contains(&"sign_alternations/compiler_parallel".to_owned()));
}

#[test]
fn catalog_filtering_by_tasks_type() {
    let catalog = tasks::catalog();

    let kinds = |context: ExecutionContext| {
        catalog
            .iter()
            .flat_map(|registry| registry.eligible(context).map(|v| v.kind()))
            .collect::<Vec<_>>()
    };

    let processes = kinds(ExecutionContext::new(false, TasksType::Processes));
    assert!(processes.iter().all(|k| *k == VariantKind::Sequential));
    assert_eq!(processes.len(), catalog.len());

    let threads = kinds(ExecutionContext::new(true, TasksType::Threads));
    assert!(!threads.contains(&VariantKind::DistributedProcess));
    assert!(threads.contains(&VariantKind::ThreadPool));

    let unrestricted = kinds(ExecutionContext::new(false, TasksType::Unrestricted));
    assert!(!unrestricted.contains(&VariantKind::DistributedProcess));
    assert!(unrestricted.contains(&VariantKind::CompilerParallel));
}
