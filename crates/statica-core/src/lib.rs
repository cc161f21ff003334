//! Statica: the static-dispatch rewrite pass.
//!
//! Takes a type-annotated tree of a unit marked for static compilation and
//! lowers dynamic-dispatch sugar (safe navigation, operator overloading,
//! array `getAt`/`putAt`, static-call nodes, keyword-argument constructors)
//! into forms a direct code generator can emit.

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod rewrite;
pub mod scope;
pub mod types;

pub use ast::{AnnotatedNode, Expression, ExpressionKind, NodeMetadata, Span, Statement};
pub use config::{RewriteConfig, Rules, SafeNavigationTemps};
pub use diagnostics::{CollectingDiagnosticHandler, Diagnostic, DiagnosticHandler, DiagnosticLevel};
pub use errors::{ConfigError, RewriteError};
pub use rewrite::{
    rewrite_units, ClassContext, ComparisonAdapters, RewriteStats, StaticCompileRewriter,
    UnitOutcome,
};
pub use scope::{ScopeRegistrar, VariableScopeCollector};
pub use types::{TypeChooser, TypeId, TypeTable};
