use std::fmt;

/// Marker carried by every lifecycle order violation panic.
///
/// Automated checks (e.g. `#[should_panic(expected = ...)]`) can match on this substring.
pub const ORDER_VIOLATION_MARKER: &str = "ORDER OF FUNCTIONS IS NOT RIGHT";

/// Where a task is in its validate → pre-process → run → post-process episode.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum LifecyclePhase {
    /// No phase of the current episode has been called yet.
    Created,
    /// Validation has been called.
    Validated,
    /// Pre-processing has been called.
    PreProcessed,
    /// The run phase has been called at least once.
    Ran,
    /// Post-processing has been called; the episode is complete.
    PostProcessed,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Validated => "validated",
            Self::PreProcessed => "pre-processed",
            Self::Ran => "ran",
            Self::PostProcessed => "post-processed",
        })
    }
}

/// An operation that moves a task between lifecycle phases.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum LifecycleOperation {
    /// `validate()`
    Validate,
    /// `pre_process()`
    PreProcess,
    /// `run()`
    Run,
    /// `post_process()`
    PostProcess,
    /// `reset()`
    Reset,
}

impl fmt::Display for LifecycleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validate => "validate",
            Self::PreProcess => "pre_process",
            Self::Run => "run",
            Self::PostProcess => "post_process",
            Self::Reset => "reset",
        })
    }
}

/// State machine that enforces the order of lifecycle operations.
///
/// Any operation that does not follow from the current phase is a usage error and panics with
/// [`ORDER_VIOLATION_MARKER`]. The guard only checks order: whether the caller should proceed
/// after a validation that returned `false` is not its concern.
///
/// When repeated runs are allowed (used for run-only timing), `run` may follow `run` within
/// one episode. Otherwise every phase happens exactly once per episode.
#[derive(Debug)]
pub(crate) struct LifecycleGuard {
    phase: LifecyclePhase,
    repeated_run: bool,
}

impl LifecycleGuard {
    pub(crate) fn new() -> Self {
        Self {
            phase: LifecyclePhase::Created,
            repeated_run: false,
        }
    }

    pub(crate) fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub(crate) fn set_repeated_run(&mut self, allowed: bool) {
        self.repeated_run = allowed;
    }

    /// Whether an episode has started (validation was called) but has not been post-processed
    /// yet. Abandoning the task in this state is a usage error.
    pub(crate) fn is_mid_episode(&self) -> bool {
        matches!(
            self.phase,
            LifecyclePhase::Validated | LifecyclePhase::PreProcessed | LifecyclePhase::Ran
        )
    }

    /// Applies `operation`, panicking if it is not permitted in the current phase.
    pub(crate) fn advance(&mut self, operation: LifecycleOperation) {
        self.phase = self
            .next_phase(operation)
            .unwrap_or_else(|| order_violation(operation, self.phase));
    }

    fn next_phase(&self, operation: LifecycleOperation) -> Option<LifecyclePhase> {
        use LifecycleOperation as Op;
        use LifecyclePhase as Phase;

        match (self.phase, operation) {
            (Phase::Created, Op::Validate) => Some(Phase::Validated),
            (Phase::Validated, Op::PreProcess) => Some(Phase::PreProcessed),
            (Phase::PreProcessed, Op::Run) => Some(Phase::Ran),
            (Phase::Ran, Op::Run) if self.repeated_run => Some(Phase::Ran),
            (Phase::Ran, Op::PostProcess) => Some(Phase::PostProcessed),
            (Phase::PostProcessed | Phase::Created, Op::Reset) => Some(Phase::Created),
            _ => None,
        }
    }
}

#[track_caller]
pub(crate) fn order_violation(operation: LifecycleOperation, phase: LifecyclePhase) -> ! {
    panic!("{ORDER_VIOLATION_MARKER}: `{operation}` is not permitted when the task is {phase}");
}

#[track_caller]
pub(crate) fn abandoned_mid_episode(phase: LifecyclePhase) -> ! {
    panic!("{ORDER_VIOLATION_MARKER}: task dropped when it is {phase}, before `post_process`");
}
