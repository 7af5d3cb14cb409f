use std::fmt;

/// The implementation strategy of a task variant.
///
/// Every variant of a logical task declares exactly one kind. The kind decides which execution
/// environments the variant is applicable to (see [`VariantRegistry`][crate::VariantRegistry])
/// and whether its timed region is synchronized across ranks
/// (see [`DistributedCoordinator`][crate::DistributedCoordinator]).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum VariantKind {
    /// Plain single-threaded implementation.
    Sequential,

    /// Work split across a set of explicitly managed worker threads.
    ThreadPool,

    /// Worker threads that each process their share in fixed-width lanes.
    VectorizedThreads,

    /// Parallelism managed by a data-parallel runtime rather than by the task itself.
    CompilerParallel,

    /// One process (rank) per participant, combined through a distributed runtime.
    DistributedProcess,
}

impl VariantKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Sequential,
        Self::ThreadPool,
        Self::VectorizedThreads,
        Self::CompilerParallel,
        Self::DistributedProcess,
    ];

    /// Whether variants of this kind need an active distributed runtime.
    #[must_use]
    pub fn is_distributed(self) -> bool {
        matches!(self, Self::DistributedProcess)
    }

    /// Short stable name used in benchmark names and report identifiers.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sequential => "seq",
            Self::ThreadPool => "thread_pool",
            Self::VectorizedThreads => "vectorized",
            Self::CompilerParallel => "compiler_parallel",
            Self::DistributedProcess => "distributed",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
