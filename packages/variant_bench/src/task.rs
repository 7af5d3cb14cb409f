use std::thread;

use crate::lifecycle::{LifecycleGuard, LifecycleOperation, abandoned_mid_episode};
use crate::{LifecyclePhase, TaskData, VariantKind};

/// The algorithm-specific part of a task, implemented by task authors.
///
/// A body never deals with call order. It is wrapped in a [`Task`], which checks the order of
/// the phases and hands the body the [`TaskData`] it is bound to.
///
/// Each phase returns whether it succeeded. A `false` from [`validate()`][Self::validate]
/// means the task data has the wrong shape for this body (for example, a different output
/// count than the body produces) and is not a crash.
pub trait TaskBody {
    /// The implementation strategy of this body.
    fn kind(&self) -> VariantKind;

    /// Checks that `data` has the shape this body expects.
    fn validate(&mut self, data: &TaskData) -> bool;

    /// Copies the inputs into working buffers owned by the body.
    ///
    /// Working buffers from a previous episode are replaced.
    fn pre_process(&mut self, data: &TaskData) -> bool;

    /// Performs the computation on the working buffers.
    fn run(&mut self) -> bool;

    /// Writes the results into the outputs of `data`.
    fn post_process(&mut self, data: &mut TaskData) -> bool;
}

impl<B: TaskBody + ?Sized> TaskBody for Box<B> {
    fn kind(&self) -> VariantKind {
        (**self).kind()
    }

    fn validate(&mut self, data: &TaskData) -> bool {
        (**self).validate(data)
    }

    fn pre_process(&mut self, data: &TaskData) -> bool {
        (**self).pre_process(data)
    }

    fn run(&mut self) -> bool {
        (**self).run()
    }

    fn post_process(&mut self, data: &mut TaskData) -> bool {
        (**self).post_process(data)
    }
}

/// A unit of work with an enforced four-phase lifecycle.
///
/// The phases must be called in the order [`validate()`][Self::validate] →
/// [`pre_process()`][Self::pre_process] → [`run()`][Self::run] →
/// [`post_process()`][Self::post_process], once each per episode. A new episode may only start
/// after [`reset()`][Self::reset].
///
/// # Panics
///
/// Calling a phase out of order panics with a message containing
/// [`ORDER_VIOLATION_MARKER`][crate::ORDER_VIOLATION_MARKER]. So does dropping the task after
/// pre-processing has started but before post-processing has finished. These are programming
/// errors, not conditions to recover from.
///
/// # Examples
///
/// ```
/// use variant_bench::{ElementType, Task, TaskBody, TaskData, VariantKind};
///
/// struct Count {
///     len: usize,
/// }
///
/// impl TaskBody for Count {
///     fn kind(&self) -> VariantKind {
///         VariantKind::Sequential
///     }
///
///     fn validate(&mut self, data: &TaskData) -> bool {
///         data.has_output(0, ElementType::I64, 1)
///     }
///
///     fn pre_process(&mut self, data: &TaskData) -> bool {
///         self.len = data.inputs().first().map_or(0, |b| b.len());
///         true
///     }
///
///     fn run(&mut self) -> bool {
///         true
///     }
///
///     fn post_process(&mut self, data: &mut TaskData) -> bool {
///         match data.output_mut::<i64>(0) {
///             Ok(out) => {
///                 out[0] = self.len as i64;
///                 true
///             }
///             Err(_) => false,
///         }
///     }
/// }
///
/// let mut data = TaskData::new()
///     .with_input(vec![1_u8; 20])
///     .with_output(ElementType::I64, 1);
///
/// let mut task = Task::new(Count { len: 0 }, &mut data);
/// assert!(task.validate());
/// assert!(task.pre_process());
/// assert!(task.run());
/// assert!(task.post_process());
/// drop(task);
///
/// assert_eq!(data.output::<i64>(0).unwrap(), &[20]);
/// ```
#[derive(derive_more::Debug)]
pub struct Task<'d, B: TaskBody> {
    #[debug(ignore)]
    body: B,

    data: &'d mut TaskData,

    guard: LifecycleGuard,
}

impl<'d, B: TaskBody> Task<'d, B> {
    /// Binds `body` to `data`. The task starts in [`LifecyclePhase::Created`].
    #[must_use]
    pub fn new(body: B, data: &'d mut TaskData) -> Self {
        Self {
            body,
            data,
            guard: LifecycleGuard::new(),
        }
    }

    /// The implementation strategy of the wrapped body.
    #[must_use]
    pub fn kind(&self) -> VariantKind {
        self.body.kind()
    }

    /// The current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.guard.phase()
    }

    /// The task data this task is bound to.
    #[must_use]
    pub fn data(&self) -> &TaskData {
        self.data
    }

    /// The wrapped body.
    #[must_use]
    pub fn body(&self) -> &B {
        &self.body
    }

    /// Checks the task data. Returns `false` if it has the wrong shape for this body.
    ///
    /// # Panics
    ///
    /// Panics unless the task is in [`LifecyclePhase::Created`].
    pub fn validate(&mut self) -> bool {
        self.guard.advance(LifecycleOperation::Validate);
        self.body.validate(self.data)
    }

    /// Prepares working buffers from the task data.
    ///
    /// # Panics
    ///
    /// Panics unless the task is in [`LifecyclePhase::Validated`].
    pub fn pre_process(&mut self) -> bool {
        self.guard.advance(LifecycleOperation::PreProcess);
        self.body.pre_process(self.data)
    }

    /// Performs the computation.
    ///
    /// # Panics
    ///
    /// Panics unless the task is in [`LifecyclePhase::PreProcessed`], or in
    /// [`LifecyclePhase::Ran`] with repeated runs allowed.
    pub fn run(&mut self) -> bool {
        self.guard.advance(LifecycleOperation::Run);
        self.body.run()
    }

    /// Writes the results into the task data.
    ///
    /// # Panics
    ///
    /// Panics unless the task is in [`LifecyclePhase::Ran`].
    pub fn post_process(&mut self) -> bool {
        self.guard.advance(LifecycleOperation::PostProcess);
        self.body.post_process(self.data)
    }

    /// Starts a new episode.
    ///
    /// # Panics
    ///
    /// Panics unless the episode is complete ([`LifecyclePhase::PostProcessed`]) or has not
    /// started ([`LifecyclePhase::Created`]).
    pub fn reset(&mut self) {
        self.guard.advance(LifecycleOperation::Reset);
    }

    /// Allows `run` to be called several times in a row within one episode.
    ///
    /// The performance runner uses this to time the run phase in isolation.
    pub fn allow_repeated_run(&mut self, allowed: bool) {
        self.guard.set_repeated_run(allowed);
    }
}

impl<B: TaskBody> Drop for Task<'_, B> {
    #[cfg_attr(test, mutants::skip)] // Mutations lead to double panics that abort the test binary.
    fn drop(&mut self) {
        if thread::panicking() {
            // The episode was already interrupted by a panic (possibly an order violation).
            // Panicking again would abort and hide the original message.
            return;
        }

        if self.guard.is_mid_episode() {
            abandoned_mid_episode(self.guard.phase());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{ElementType, ORDER_VIOLATION_MARKER};

    /// Counts its input elements and records the phases it sees.
    struct Recorder {
        events: Arc<Mutex<Vec<&'static str>>>,
        count: usize,
    }

    impl Recorder {
        fn new() -> (Self, Arc<Mutex<Vec<&'static str>>>) {
            let events = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    events: Arc::clone(&events),
                    count: 0,
                },
                events,
            )
        }

        fn record(&self, event: &'static str) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl TaskBody for Recorder {
        fn kind(&self) -> VariantKind {
            VariantKind::Sequential
        }

        fn validate(&mut self, data: &TaskData) -> bool {
            self.record("validate");
            data.has_output(0, ElementType::I64, 1)
        }

        fn pre_process(&mut self, data: &TaskData) -> bool {
            self.record("pre_process");
            self.count = data.inputs().first().map_or(0, |b| b.len());
            true
        }

        fn run(&mut self) -> bool {
            self.record("run");
            true
        }

        fn post_process(&mut self, data: &mut TaskData) -> bool {
            self.record("post_process");
            data.output_mut::<i64>(0)
                .map(|out| out[0] = i64::try_from(self.count).unwrap())
                .is_ok()
        }
    }

    fn sample_data<T: crate::Element>(value: T) -> TaskData
    where
        crate::Buffer: From<Vec<T>>,
    {
        TaskData::new()
            .with_input(vec![value; 20])
            .with_output(ElementType::I64, 1)
    }

    #[test]
    fn in_order_episode_succeeds_for_every_element_type() {
        fn check(mut data: TaskData) {
            let (body, events) = Recorder::new();

            let mut task = Task::new(body, &mut data);
            assert!(task.validate());
            assert!(task.pre_process());
            assert!(task.run());
            assert!(task.post_process());
            assert_eq!(task.phase(), LifecyclePhase::PostProcessed);
            drop(task);

            assert_eq!(data.output::<i64>(0).unwrap(), &[20]);
            assert_eq!(
                *events.lock().unwrap(),
                ["validate", "pre_process", "run", "post_process"]
            );
        }

        check(sample_data(1_u8));
        check(sample_data(1_i32));
        check(sample_data(1_i64));
        check(sample_data(1.0_f32));
        check(sample_data(1.0_f64));
    }

    #[test]
    fn validation_rejects_wrong_output_count() {
        let mut data = TaskData::new()
            .with_input(vec![1_i32; 3])
            .with_output(ElementType::I64, 2);

        let (body, _) = Recorder::new();
        let mut task = Task::new(body, &mut data);

        assert!(!task.validate());
        task.pre_process();
        task.run();
        task.post_process();
    }

    #[test]
    fn invalid_task_may_still_complete_its_episode() {
        let mut data = TaskData::new();
        let (body, _) = Recorder::new();
        let mut task = Task::new(body, &mut data);

        assert!(!task.validate());
        task.pre_process();
        task.run();
        task.post_process();
    }

    #[test]
    fn reset_allows_second_episode() {
        let mut data = sample_data(1_i32);
        let (body, events) = Recorder::new();
        let mut task = Task::new(body, &mut data);

        for _ in 0..2 {
            assert!(task.validate());
            assert!(task.pre_process());
            assert!(task.run());
            assert!(task.post_process());
            task.reset();
        }

        assert_eq!(events.lock().unwrap().len(), 8);
    }

    #[test]
    fn repeated_run_when_allowed() {
        let mut data = sample_data(1_i32);
        let (body, events) = Recorder::new();
        let mut task = Task::new(body, &mut data);
        task.allow_repeated_run(true);

        task.validate();
        task.pre_process();
        task.run();
        task.run();
        task.run();
        task.post_process();

        let runs = events.lock().unwrap().iter().filter(|e| **e == "run").count();
        assert_eq!(runs, 3);
    }

    #[test]
    #[should_panic(expected = "ORDER OF FUNCTIONS IS NOT RIGHT")]
    fn post_process_after_validate_without_run_panics() {
        let mut data = sample_data(1.0_f32);
        let (body, _) = Recorder::new();
        let mut task = Task::new(body, &mut data);

        assert!(task.validate());
        task.pre_process();
        task.post_process();
    }

    #[test]
    #[should_panic(expected = "ORDER OF FUNCTIONS IS NOT RIGHT")]
    fn post_process_without_any_phase_panics() {
        let mut data = sample_data(1.0_f32);
        let (body, _) = Recorder::new();
        let mut task = Task::new(body, &mut data);

        task.post_process();
    }

    #[test]
    #[should_panic(expected = "ORDER OF FUNCTIONS IS NOT RIGHT")]
    fn pre_process_twice_panics() {
        let mut data = sample_data(1_i32);
        let (body, _) = Recorder::new();
        let mut task = Task::new(body, &mut data);

        task.validate();
        task.pre_process();
        task.pre_process();
    }

    #[test]
    #[should_panic(expected = "ORDER OF FUNCTIONS IS NOT RIGHT")]
    fn run_without_pre_process_panics() {
        let mut data = sample_data(1_i32);
        let (body, _) = Recorder::new();
        let mut task = Task::new(body, &mut data);

        task.validate();
        task.run();
    }

    #[test]
    #[should_panic(expected = "ORDER OF FUNCTIONS IS NOT RIGHT")]
    fn second_episode_without_reset_panics() {
        let mut data = sample_data(1_i32);
        let (body, _) = Recorder::new();
        let mut task = Task::new(body, &mut data);

        task.validate();
        task.pre_process();
        task.run();
        task.post_process();
        task.validate();
    }

    #[test]
    #[should_panic(expected = "ORDER OF FUNCTIONS IS NOT RIGHT")]
    fn drop_mid_episode_panics() {
        let mut data = sample_data(1_i32);
        let (body, _) = Recorder::new();
        let mut task = Task::new(body, &mut data);

        task.validate();
        task.pre_process();
        task.run();
    }

    #[test]
    fn drop_before_episode_starts_is_fine() {
        let mut data = sample_data(1_i32);
        let (body, _) = Recorder::new();
        let _task = Task::new(body, &mut data);
    }

    #[test]
    #[should_panic(expected = "ORDER OF FUNCTIONS IS NOT RIGHT")]
    fn drop_after_validate_panics() {
        let mut data = sample_data(1_i32);
        let (body, _) = Recorder::new();
        let mut task = Task::new(body, &mut data);

        assert!(task.validate());
    }

    #[test]
    #[should_panic(expected = "ORDER OF FUNCTIONS IS NOT RIGHT")]
    fn drop_after_failed_validate_panics() {
        let mut data = TaskData::new();
        let (body, _) = Recorder::new();
        let mut task = Task::new(body, &mut data);

        assert!(!task.validate());
    }

    #[test]
    fn reset_after_full_episode_allows_drop() {
        let mut data = sample_data(1_i32);
        let (body, _) = Recorder::new();
        let mut task = Task::new(body, &mut data);

        assert!(task.validate());
        assert!(task.pre_process());
        assert!(task.run());
        assert!(task.post_process());
        task.reset();
        assert_eq!(task.phase(), LifecyclePhase::Created);
    }

    #[test]
    fn violation_does_not_double_panic_on_drop() {
        let result = std::panic::catch_unwind(|| {
            let mut data = sample_data(1_i32);
            let (body, _) = Recorder::new();
            let mut task = Task::new(body, &mut data);

            task.validate();
            task.pre_process();
            // Violation while mid-episode; the unwinding drop must not panic again.
            task.validate();
        });

        let payload = result.unwrap_err();
        let message = payload.downcast_ref::<String>().unwrap();
        assert!(message.contains(ORDER_VIOLATION_MARKER));
        assert!(message.contains("`validate`"));
    }

    #[test]
    fn boxed_body_delegates() {
        let mut data = sample_data(1_u8);
        let (body, events) = Recorder::new();
        let body: Box<dyn TaskBody> = Box::new(body);

        let mut task = Task::new(body, &mut data);
        assert_eq!(task.kind(), VariantKind::Sequential);
        task.validate();
        task.pre_process();
        task.run();
        task.post_process();

        assert_eq!(events.lock().unwrap().len(), 4);
    }
}
