#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point of the variant_bench tool.
//!
//! Measures the example task catalog and prints one `identifier:mode:seconds` line per
//! measurement to stdout. Diagnostics go to stderr.
//!
//! This module is excluded from mutation testing because testing process entry/exit behavior
//! is impractical - it requires spawning subprocesses and checking exit codes.

use std::io;
use std::num::NonZero;
use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use tracing_subscriber::EnvFilter;
use variant_bench::{
    BatchSummary, ExecutionContext, HarnessConfig, LineReporter, PerfMode, PerformanceRunner,
    SimulatedRanks, SingleProcess, VariantRegistry, eligible_benchmark_names, run_batch, tasks,
};

/// Measures the interchangeable variants of the example tasks.
#[derive(FromArgs)]
struct Args {
    /// path to a TOML settings file carrying `tasks_type`; a missing file means no restriction
    #[argh(option)]
    settings: Option<PathBuf>,

    /// how many times the timed phases are repeated (overrides the settings file)
    #[argh(option)]
    repetitions: Option<NonZero<u32>>,

    /// measure only in this mode (pipeline, task_run); both by default
    #[argh(option)]
    mode: Option<PerfMode>,

    /// emulate a distributed launch with this many in-process ranks
    #[argh(option)]
    ranks: Option<NonZero<usize>>,

    /// only measure this task (repeatable)
    #[argh(option)]
    task: Vec<String>,

    /// list the eligible benchmarks instead of measuring them
    #[argh(switch)]
    list: bool,

    /// log measurements and skips to stderr
    #[argh(switch, short = 'v')]
    verbose: bool,
}

// Binary entry point - mutations would require subprocess testing which is impractical.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let default_filter = if args.verbose {
        "variant_bench=debug"
    } else {
        "variant_bench=warn"
    };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = match HarnessConfig::load(args.settings.as_deref())
        .and_then(HarnessConfig::apply_process_env)
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = match args.repetitions {
        Some(repetitions) => config.with_repetitions(repetitions),
        None => config,
    };

    let registries = match select_tasks(tasks::catalog(), &args.task) {
        Ok(registries) => registries,
        Err(unknown) => {
            eprintln!("Error: unknown task '{unknown}'");
            return ExitCode::FAILURE;
        }
    };

    if args.list {
        let context = ExecutionContext::new(args.ranks.is_some(), config.tasks_type());

        for name in eligible_benchmark_names(&registries, context) {
            println!("{name}");
        }

        return ExitCode::SUCCESS;
    }

    let modes = match args.mode {
        Some(mode) => vec![mode],
        None => PerfMode::MEASURABLE.to_vec(),
    };

    let reporter = LineReporter::stdio();

    let summary = match args.ranks {
        None => {
            let runner = PerformanceRunner::new(&config, &SingleProcess, &reporter);
            run_batch(&registries, &runner, &config, &modes)
        }
        Some(ranks) => {
            let summaries = SimulatedRanks::new(ranks).run(|runtime| {
                let runner = PerformanceRunner::new(&config, runtime, &reporter);
                run_batch(&registries, &runner, &config, &modes)
            });

            BatchSummary::combine_ranks(summaries)
        }
    };

    exit_code(&summary)
}

/// Keeps the registries named in `names`, or all of them if `names` is empty.
///
/// Returns the first name that matches no registry as the error.
fn select_tasks(
    registries: Vec<VariantRegistry>,
    names: &[String],
) -> Result<Vec<VariantRegistry>, String> {
    if let Some(unknown) = names
        .iter()
        .find(|name| registries.iter().all(|r| r.task_name() != name.as_str()))
    {
        return Err(unknown.clone());
    }

    Ok(registries
        .into_iter()
        .filter(|r| names.is_empty() || names.iter().any(|name| name == r.task_name()))
        .collect())
}

fn exit_code(summary: &BatchSummary) -> ExitCode {
    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        eprintln!("{} measurement(s) failed", summary.failures().len());
        ExitCode::FAILURE
    }
}
