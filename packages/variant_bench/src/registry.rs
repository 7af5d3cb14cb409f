//! Declaration of the variants of a logical task and selection of the eligible ones.

use std::num::NonZero;

use new_zealand::nz;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    DistributedRuntime, HarnessConfig, MeasureError, MeasureOutcome, PerfAttr, PerformanceRunner,
    Task, TaskBody, TaskData, TasksType, VariantKind, derive_identifier,
};

/// What the execution environment can host.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExecutionContext {
    distributed_active: bool,
    tasks_type: TasksType,
}

impl ExecutionContext {
    /// Creates a context.
    #[must_use]
    pub fn new(distributed_active: bool, tasks_type: TasksType) -> Self {
        Self {
            distributed_active,
            tasks_type,
        }
    }

    /// Whether a distributed runtime is active.
    #[must_use]
    pub fn distributed_active(&self) -> bool {
        self.distributed_active
    }

    /// The configured tasks type.
    #[must_use]
    pub fn tasks_type(&self) -> TasksType {
        self.tasks_type
    }
}

/// What a task body gets to work with when it is created.
#[derive(Clone, Copy)]
pub struct VariantContext<'r> {
    runtime: &'r dyn DistributedRuntime,
    pool: &'r ThreadPool,
}

impl<'r> VariantContext<'r> {
    /// Creates a context whose parallel variants run on `pool`.
    #[must_use]
    pub fn new(runtime: &'r dyn DistributedRuntime, pool: &'r ThreadPool) -> Self {
        Self { runtime, pool }
    }

    /// The distributed runtime of this process.
    #[must_use]
    pub fn runtime(&self) -> &'r dyn DistributedRuntime {
        self.runtime
    }

    /// The worker threads shared by the parallel variants.
    #[must_use]
    pub fn pool(&self) -> &'r ThreadPool {
        self.pool
    }

    /// How many worker threads parallel variants use.
    #[must_use]
    pub fn threads(&self) -> NonZero<usize> {
        NonZero::new(self.pool.current_num_threads()).unwrap_or(nz!(1))
    }
}

impl std::fmt::Debug for VariantContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariantContext")
            .field("rank", &self.runtime.rank())
            .field("threads", &self.threads())
            .finish()
    }
}

/// Starts the worker threads that parallel variants run on.
///
/// # Errors
///
/// Returns [`MeasureError::WorkerPoolUnavailable`] if the threads cannot be started.
pub fn worker_pool(threads: NonZero<usize>) -> Result<ThreadPool, MeasureError> {
    ThreadPoolBuilder::new()
        .num_threads(threads.get())
        .thread_name(|index| format!("variant-worker-{index}"))
        .build()
        .map_err(|e| MeasureError::WorkerPoolUnavailable {
            threads: threads.get(),
            reason: e.to_string(),
        })
}

/// Creates a fresh body of one variant.
pub type BodyFactory = for<'r> fn(VariantContext<'r>) -> Box<dyn TaskBody + 'r>;

/// One implementation of a logical task.
#[derive(Clone, Copy, derive_more::Debug)]
pub struct Variant {
    name: &'static str,
    kind: VariantKind,
    #[debug(ignore)]
    factory: BodyFactory,
}

impl Variant {
    /// The name of the variant, unique within its registry.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The implementation strategy.
    #[must_use]
    pub fn kind(&self) -> VariantKind {
        self.kind
    }

    /// Whether the variant may run in `context`.
    ///
    /// * Distributed variants need an active runtime and a tasks type other than `threads`.
    /// * Under `processes`, the only non-distributed variant kept is the sequential one.
    /// * Variants whose name contains `disabled` never run.
    #[must_use]
    pub fn is_eligible(&self, context: ExecutionContext) -> bool {
        if self.name.contains("disabled") {
            return false;
        }

        if self.kind.is_distributed() {
            return context.distributed_active && context.tasks_type != TasksType::Threads;
        }

        context.tasks_type != TasksType::Processes || self.kind == VariantKind::Sequential
    }

    /// Creates a body of this variant.
    #[must_use]
    pub fn create_body<'r>(&self, context: VariantContext<'r>) -> Box<dyn TaskBody + 'r> {
        (self.factory)(context)
    }
}

/// The result of measuring one variant.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct VariantResult {
    /// The variant name.
    pub name: &'static str,

    /// The identifier the outcome was reported under.
    pub identifier: String,

    /// The outcome.
    pub result: Result<MeasureOutcome, MeasureError>,
}

/// The variants of one logical task, together with the input they are measured on.
///
/// # Examples
///
/// ```
/// use variant_bench::{
///     ElementType, ExecutionContext, TaskBody, TaskData, TasksType, VariantContext,
///     VariantKind, VariantRegistry,
/// };
///
/// struct Noop;
///
/// impl TaskBody for Noop {
///     fn kind(&self) -> VariantKind {
///         VariantKind::Sequential
///     }
///     fn validate(&mut self, _: &TaskData) -> bool {
///         true
///     }
///     fn pre_process(&mut self, _: &TaskData) -> bool {
///         true
///     }
///     fn run(&mut self) -> bool {
///         true
///     }
///     fn post_process(&mut self, _: &mut TaskData) -> bool {
///         true
///     }
/// }
///
/// fn noop<'r>(_: VariantContext<'r>) -> Box<dyn TaskBody + 'r> {
///     Box::new(Noop)
/// }
///
/// let registry = VariantRegistry::new("noop", file!(), TaskData::new)
///     .variant("seq", VariantKind::Sequential, noop)
///     .variant("distributed", VariantKind::DistributedProcess, noop);
///
/// let eligible = registry
///     .eligible(ExecutionContext::new(false, TasksType::Unrestricted))
///     .map(|v| v.name())
///     .collect::<Vec<_>>();
///
/// assert_eq!(eligible, ["seq"]);
/// ```
#[derive(derive_more::Debug)]
pub struct VariantRegistry {
    task_name: &'static str,
    source: &'static str,
    #[debug(ignore)]
    inputs: Box<dyn Fn() -> TaskData + Send + Sync>,
    variants: Vec<Variant>,
}

impl VariantRegistry {
    /// Creates a registry for the task `task_name` declared in the source file `source`
    /// (normally `file!()`), measured on the task data produced by `inputs`.
    #[must_use]
    pub fn new(
        task_name: &'static str,
        source: &'static str,
        inputs: impl Fn() -> TaskData + Send + Sync + 'static,
    ) -> Self {
        Self {
            task_name,
            source,
            inputs: Box::new(inputs),
            variants: Vec::new(),
        }
    }

    /// Declares a variant.
    ///
    /// # Panics
    ///
    /// Panics if a variant with the same name is already declared.
    #[must_use]
    pub fn variant(mut self, name: &'static str, kind: VariantKind, factory: BodyFactory) -> Self {
        assert!(
            self.variants.iter().all(|v| v.name != name),
            "variant '{name}' of task '{}' is declared twice",
            self.task_name
        );

        self.variants.push(Variant {
            name,
            kind,
            factory,
        });
        self
    }

    /// The name of the logical task.
    #[must_use]
    pub fn task_name(&self) -> &'static str {
        self.task_name
    }

    /// The source file the registry was declared in.
    #[must_use]
    pub fn source(&self) -> &'static str {
        self.source
    }

    /// All declared variants, in declaration order.
    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// A fresh copy of the input task data.
    #[must_use]
    pub fn task_data(&self) -> TaskData {
        (self.inputs)()
    }

    /// The variants that may run in `context`, in declaration order.
    pub fn eligible(&self, context: ExecutionContext) -> impl Iterator<Item = &Variant> {
        self.variants.iter().filter(move |v| v.is_eligible(context))
    }

    /// The identifier measurements of `variant` are reported under: the part of the source
    /// path between the configured markers, followed by the variant name.
    #[must_use]
    pub fn identifier(&self, variant: &Variant, config: &HarnessConfig) -> String {
        let prefix = derive_identifier(self.source, config.root_marker(), config.perf_marker());
        format!("{prefix}/{}", variant.name)
    }

    /// `<tasks type or "unknown">:<task>:<kind>`, the name a benchmark framework lists the
    /// variant under.
    #[must_use]
    pub fn benchmark_name(&self, variant: &Variant, tasks_type: TasksType) -> String {
        format!(
            "{}:{}:{}",
            tasks_type.as_setting().unwrap_or("unknown"),
            self.task_name,
            variant.kind
        )
    }

    /// Measures every variant that is eligible for the runner's runtime and `config`, each
    /// on a fresh copy of the input, and reports the outcomes.
    ///
    /// Every eligible variant is measured even if an earlier one failed. The parallel variants
    /// share one pool of [`HarnessConfig::worker_threads()`] threads. If that pool cannot be
    /// started, no variant is measured and every eligible one fails with the same error.
    pub fn measure_eligible(
        &self,
        runner: &PerformanceRunner<'_>,
        config: &HarnessConfig,
        attr: PerfAttr,
    ) -> Vec<VariantResult> {
        let runtime = runner.coordinator().runtime();
        let context = ExecutionContext::new(runtime.is_active(), config.tasks_type());

        let pool = match worker_pool(config.worker_threads()) {
            Ok(pool) => pool,
            Err(e) => {
                tracing::error!(task = self.task_name, error = %e, "no worker pool");

                return self
                    .eligible(context)
                    .map(|variant| VariantResult {
                        name: variant.name,
                        identifier: self.identifier(variant, config),
                        result: Err(e.clone()),
                    })
                    .collect();
            }
        };

        let variant_context = VariantContext::new(runtime, &pool);

        self.eligible(context)
            .map(|variant| {
                let identifier = self.identifier(variant, config);

                let mut data = self.task_data();
                let mut task = Task::new(variant.create_body(variant_context), &mut data);

                debug_assert_eq!(
                    task.kind(),
                    variant.kind,
                    "variant '{}' of task '{}' created a body of another kind",
                    variant.name,
                    self.task_name
                );

                let result = runner.measure_and_report(&mut task, attr, &identifier);

                VariantResult {
                    name: variant.name,
                    identifier,
                    result,
                }
            })
            .collect()
    }
}
