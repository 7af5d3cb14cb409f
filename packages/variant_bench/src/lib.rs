#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Lifecycle-checked execution and comparable timing of interchangeable task implementations.
//!
//! A logical task (say, "sum the elements of a vector") usually has several implementations:
//! a sequential one, one that splits work across threads, one that runs as several cooperating
//! processes. This package executes such variants under one contract and times them under the
//! same conditions, so their measurements can be compared.
//!
//! The core functionality includes:
//! - [`Task`] - Wraps a [`TaskBody`] and enforces the validate → pre-process → run →
//!   post-process call order, panicking with [`ORDER_VIOLATION_MARKER`] on misuse
//! - [`TaskData`] - Typed input and output buffers a task reads from and writes to
//! - [`PerformanceRunner`] - Times a task in [`PerfMode::Pipeline`] or [`PerfMode::TaskRun`]
//!   mode and enforces the maximum measured time
//! - [`DistributedCoordinator`] - Barriers around the timed region and primary-rank reporting
//!   when a [`DistributedRuntime`] is active
//! - [`VariantRegistry`] - Declares the variants of a task and selects the ones eligible for
//!   the execution environment
//! - [`SimulatedRanks`] - An in-process distributed runtime with one thread per rank
//!
//! # Timing modes
//!
//! In pipeline mode, every repetition is a whole episode and the clock covers all of them.
//! In task-run mode, only the run phase is repeated and timed. The difference between the two
//! is the cost of setting up and tearing down the task.
//!
//! # Example
//!
//! ```
//! use std::num::NonZero;
//!
//! use variant_bench::tasks::SumElements;
//! use variant_bench::{
//!     CollectingReporter, ElementType, HarnessConfig, PerfAttr, PerfMode, PerformanceRunner,
//!     SingleProcess, Task, TaskData,
//! };
//!
//! let config = HarnessConfig::default();
//! let reporter = CollectingReporter::new();
//! let runner = PerformanceRunner::new(&config, &SingleProcess, &reporter);
//!
//! let mut data = TaskData::new()
//!     .with_input((0..1000_i64).collect::<Vec<_>>())
//!     .with_output(ElementType::I64, 1);
//! let mut task = Task::new(SumElements::sequential(), &mut data);
//!
//! let attr = PerfAttr::new(NonZero::new(5).unwrap(), PerfMode::TaskRun);
//! runner.measure_and_report(&mut task, attr, "sum/seq").unwrap();
//!
//! let (identifier, measurement) = &reporter.measurements()[0];
//! assert_eq!(identifier, "sum/seq");
//! assert_eq!(measurement.mode(), PerfMode::TaskRun);
//! ```

mod batch;
mod config;
mod coordinator;
mod error;
mod kind;
mod lifecycle;
mod measurement;
mod pal;
mod registry;
mod report;
mod runner;
mod runtime;
mod simulated;
mod task;
mod task_data;
mod timer;

pub mod tasks;

pub use batch::{BatchSummary, eligible_benchmark_names, run_batch};
pub use config::{ConfigError, HarnessConfig, MAX_TIME_ENV, NUM_THREADS_ENV, TasksType};
pub use coordinator::DistributedCoordinator;
pub use error::{MeasureError, SkipReason};
pub use kind::VariantKind;
pub use lifecycle::{LifecycleOperation, LifecyclePhase, ORDER_VIOLATION_MARKER};
pub use measurement::{PerfAttr, PerfMeasurement, PerfMode};
pub use registry::{
    BodyFactory, ExecutionContext, Variant, VariantContext, VariantRegistry, VariantResult,
    worker_pool,
};
pub use report::{CollectingReporter, LineReporter, ReportEntry, Reporter, derive_identifier};
pub use runner::{MeasureOutcome, PerformanceRunner};
#[cfg(test)]
pub(crate) use runtime::MockDistributedRuntime;
pub use runtime::{DistributedRuntime, SingleProcess};
pub use simulated::{SimulatedRank, SimulatedRanks};
pub use task::{Task, TaskBody};
pub use task_data::{Buffer, Direction, Element, ElementType, TaskData, TaskDataError};
