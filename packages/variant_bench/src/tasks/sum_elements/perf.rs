use crate::tasks::SumElements;
use crate::{ElementType, TaskBody, TaskData, VariantContext, VariantKind, VariantRegistry};

const COUNT: i64 = 2_000_000;

fn input() -> TaskData {
    TaskData::new()
        .with_input((0..COUNT).map(|i| i % 7 - 3).collect::<Vec<_>>())
        .with_output(ElementType::I64, 1)
}

fn seq<'r>(_: VariantContext<'r>) -> Box<dyn TaskBody + 'r> {
    Box::new(SumElements::sequential())
}

fn thread_pool<'r>(context: VariantContext<'r>) -> Box<dyn TaskBody + 'r> {
    Box::new(SumElements::thread_pool(context.pool()))
}

fn vectorized<'r>(context: VariantContext<'r>) -> Box<dyn TaskBody + 'r> {
    Box::new(SumElements::vectorized(context.pool()))
}

fn compiler_parallel<'r>(context: VariantContext<'r>) -> Box<dyn TaskBody + 'r> {
    Box::new(SumElements::compiler_parallel(context.pool()))
}

fn distributed<'r>(context: VariantContext<'r>) -> Box<dyn TaskBody + 'r> {
    Box::new(SumElements::distributed(context.runtime()))
}

pub(crate) fn registry() -> VariantRegistry {
    VariantRegistry::new("sum_elements", file!(), input)
        .variant("seq", VariantKind::Sequential, seq)
        .variant("thread_pool", VariantKind::ThreadPool, thread_pool)
        .variant("vectorized", VariantKind::VectorizedThreads, vectorized)
        .variant("compiler_parallel", VariantKind::CompilerParallel, compiler_parallel)
        .variant("distributed", VariantKind::DistributedProcess, distributed)
}
