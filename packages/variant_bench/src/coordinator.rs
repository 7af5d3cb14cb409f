use crate::{DistributedRuntime, SkipReason, VariantKind};

/// Applies the distributed runtime to one measurement: barriers around the timed region,
/// reporting from the primary rank only and skipping of pairs the runtime cannot host.
#[derive(Clone, Copy)]
pub struct DistributedCoordinator<'r> {
    runtime: &'r dyn DistributedRuntime,
}

impl<'r> DistributedCoordinator<'r> {
    /// Creates a coordinator for `runtime`.
    #[must_use]
    pub fn new(runtime: &'r dyn DistributedRuntime) -> Self {
        Self { runtime }
    }

    /// The runtime this coordinator works with.
    #[must_use]
    pub fn runtime(&self) -> &'r dyn DistributedRuntime {
        self.runtime
    }

    /// Whether the coordinator synchronizes measurements of variants of `kind`.
    #[must_use]
    pub fn engaged(&self, kind: VariantKind) -> bool {
        kind.is_distributed() && self.runtime.is_active()
    }

    /// Whether a variant of `kind` can be measured at all.
    ///
    /// # Errors
    ///
    /// Returns the reason to skip the variant if it needs a runtime that is not active.
    pub fn applicability(&self, kind: VariantKind) -> Result<(), SkipReason> {
        if kind.is_distributed() && !self.runtime.is_active() {
            return Err(SkipReason::DistributedRuntimeInactive);
        }

        Ok(())
    }

    /// Enters a barrier if the coordinator is engaged for `kind`; otherwise does nothing.
    pub fn sync(&self, kind: VariantKind) {
        if self.engaged(kind) {
            self.runtime.barrier();
        }
    }

    /// Whether this process is the one that reports.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.runtime.rank() == 0
    }
}

impl std::fmt::Debug for DistributedCoordinator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedCoordinator")
            .field("active", &self.runtime.is_active())
            .field("rank", &self.runtime.rank())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockDistributedRuntime;
    use crate::runtime::SingleProcess;

    #[test]
    fn engaged_only_for_distributed_kind_with_active_runtime() {
        let mut runtime = MockDistributedRuntime::new();
        runtime.expect_is_active().return_const(true);
        let coordinator = DistributedCoordinator::new(&runtime);

        for kind in VariantKind::ALL {
            assert_eq!(coordinator.engaged(kind), kind.is_distributed());
        }

        let inactive = SingleProcess;
        let coordinator = DistributedCoordinator::new(&inactive);

        assert!(!coordinator.engaged(VariantKind::DistributedProcess));
    }

    #[test]
    fn sync_enters_barrier_only_when_engaged() {
        let mut runtime = MockDistributedRuntime::new();
        runtime.expect_is_active().return_const(true);
        runtime.expect_barrier().times(1).return_const(());
        let coordinator = DistributedCoordinator::new(&runtime);

        coordinator.sync(VariantKind::Sequential);
        coordinator.sync(VariantKind::DistributedProcess);
    }

    #[test]
    fn distributed_variant_without_runtime_is_skipped() {
        let runtime = SingleProcess;
        let coordinator = DistributedCoordinator::new(&runtime);

        assert_eq!(
            coordinator.applicability(VariantKind::DistributedProcess),
            Err(SkipReason::DistributedRuntimeInactive)
        );
        assert_eq!(coordinator.applicability(VariantKind::ThreadPool), Ok(()));
    }

    #[test]
    fn only_rank_zero_is_primary() {
        let mut runtime = MockDistributedRuntime::new();
        runtime.expect_rank().return_const(2_usize);

        assert!(!DistributedCoordinator::new(&runtime).is_primary());
        assert!(DistributedCoordinator::new(&SingleProcess).is_primary());
    }
}
