use crate::tasks::MaxElement;
use crate::{ElementType, TaskBody, TaskData, VariantContext, VariantKind, VariantRegistry};

const COUNT: i32 = 2_000_000;

fn input() -> TaskData {
    // A saw-tooth with its peak in the middle.
    let values = (0..COUNT)
        .map(|i| (i % 1_000) - (i - COUNT / 2).abs() / 1_000)
        .collect::<Vec<_>>();

    TaskData::new()
        .with_input(values)
        .with_output(ElementType::I32, 1)
        .with_output(ElementType::I64, 1)
}

fn seq<'r>(_: VariantContext<'r>) -> Box<dyn TaskBody + 'r> {
    Box::new(MaxElement::sequential())
}

fn thread_pool<'r>(context: VariantContext<'r>) -> Box<dyn TaskBody + 'r> {
    Box::new(MaxElement::thread_pool(context.pool()))
}

pub(crate) fn registry() -> VariantRegistry {
    VariantRegistry::new("max_element", file!(), input)
        .variant("seq", VariantKind::Sequential, seq)
        .variant("thread_pool", VariantKind::ThreadPool, thread_pool)
}
