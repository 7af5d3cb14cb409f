use crate::tasks::SignAlternations;
use crate::{ElementType, TaskBody, TaskData, VariantContext, VariantKind, VariantRegistry};

const COUNT: i32 = 2_000_000;

fn input() -> TaskData {
    let values = (0..COUNT)
        .map(|i| if i % 3 == 0 { -i } else { i })
        .collect::<Vec<_>>();

    TaskData::new()
        .with_input(values)
        .with_output(ElementType::I64, 1)
}

fn seq<'r>(_: VariantContext<'r>) -> Box<dyn TaskBody + 'r> {
    Box::new(SignAlternations::sequential())
}

fn compiler_parallel<'r>(context: VariantContext<'r>) -> Box<dyn TaskBody + 'r> {
    Box::new(SignAlternations::compiler_parallel(context.pool()))
}

pub(crate) fn registry() -> VariantRegistry {
    VariantRegistry::new("sign_alternations", file!(), input)
        .variant("seq", VariantKind::Sequential, seq)
        .variant("compiler_parallel", VariantKind::CompilerParallel, compiler_parallel)
}
