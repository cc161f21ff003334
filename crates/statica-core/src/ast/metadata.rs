//! Per-node resolution metadata.
//!
//! The resolver attaches these facts before the rewrite runs. The pass reads
//! them, and copies them onto nodes it synthesizes as substitutes; it never
//! edits the metadata of a node it did not create.

use crate::types::{MethodId, TypeId};

/// What a call node will invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallTarget {
    Method(MethodId),
    Constructor(MethodId),
    /// Zero-argument constructor of the type. The only identity the pass
    /// creates itself, for keyword-argument constructor desugaring.
    DefaultConstructor(TypeId),
    /// `call()` on a closure taking no arguments
    ClosureCallNoArg,
}

/// Resolution of an operator to an overloaded method, e.g. `a + b` to
/// `a.plus(b)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryOperatorTarget {
    pub method: MethodId,
    pub name: String,
}

impl BinaryOperatorTarget {
    pub fn new(method: MethodId, name: impl Into<String>) -> Self {
        Self {
            method,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    ResolvedCallTarget,
    InferredType,
    BinaryOperatorTarget,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMetadata {
    pub call_target: Option<CallTarget>,
    pub inferred_type: Option<TypeId>,
    pub binary_target: Option<BinaryOperatorTarget>,
}

impl NodeMetadata {
    pub fn with_call_target(target: CallTarget) -> Self {
        Self {
            call_target: Some(target),
            ..Self::default()
        }
    }

    pub fn with_inferred_type(ty: TypeId) -> Self {
        Self {
            inferred_type: Some(ty),
            ..Self::default()
        }
    }

    pub fn contains(&self, key: MetadataKey) -> bool {
        match key {
            MetadataKey::ResolvedCallTarget => self.call_target.is_some(),
            MetadataKey::InferredType => self.inferred_type.is_some(),
            MetadataKey::BinaryOperatorTarget => self.binary_target.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.call_target.is_none() && self.inferred_type.is_none() && self.binary_target.is_none()
    }

    /// Resolved method id, if the call target is a plain method.
    pub fn target_method(&self) -> Option<MethodId> {
        match self.call_target {
            Some(CallTarget::Method(id)) => Some(id),
            _ => None,
        }
    }

    pub fn target_constructor(&self) -> Option<MethodId> {
        match self.call_target {
            Some(CallTarget::Constructor(id)) => Some(id),
            _ => None,
        }
    }
}
