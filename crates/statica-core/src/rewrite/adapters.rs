use crate::ast::BinaryOp;
use crate::types::{MethodId, TypeTable};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

static ADAPTER_NAMES: Lazy<FxHashMap<BinaryOp, &'static str>> = Lazy::new(|| {
    [
        (BinaryOp::Equal, "compareEqual"),
        (BinaryOp::NotEqual, "compareNotEqual"),
        (BinaryOp::LessThan, "compareLessThan"),
        (BinaryOp::LessThanEqual, "compareLessThanEqual"),
        (BinaryOp::GreaterThan, "compareGreaterThan"),
        (BinaryOp::GreaterThanEqual, "compareGreaterThanEqual"),
        (BinaryOp::Compare, "compareTo"),
    ]
    .into_iter()
    .collect()
});

/// Comparison operators mapped to the canonical routines of the bytecode
/// adapter type.
///
/// Built once per type table and only read afterwards, so one instance can be
/// shared by every unit, including units rewritten on other threads.
#[derive(Debug, Clone, Default)]
pub struct ComparisonAdapters {
    by_operator: FxHashMap<BinaryOp, MethodId>,
}

impl ComparisonAdapters {
    pub fn from_types(types: &TypeTable) -> Self {
        let adapter_type = types.well_known().bytecode_adapter;
        let by_operator = ADAPTER_NAMES
            .iter()
            .filter_map(|(&op, name)| {
                types
                    .find_method(adapter_type, name)
                    .map(|method| (op, method))
            })
            .collect();
        Self { by_operator }
    }

    /// A table with no adapters; comparisons then keep their resolved method.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, op: BinaryOp) -> Option<MethodId> {
        self.by_operator.get(&op).copied()
    }

    pub fn len(&self) -> usize {
        self.by_operator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_operator.is_empty()
    }
}
