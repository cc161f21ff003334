//! One-call rewrite helpers for tests.

use statica_core::ast::{AnnotatedNode, Expression, VariableScope};
use statica_core::config::RewriteConfig;
use statica_core::diagnostics::{CollectingDiagnosticHandler, Diagnostic, DiagnosticHandler};
use statica_core::errors::RewriteError;
use statica_core::rewrite::{ClassContext, ComparisonAdapters, RewriteStats, StaticCompileRewriter};
use statica_core::scope::VariableScopeCollector;
use statica_core::types::{TypeId, TypeTable};
use std::sync::Arc;

/// Everything a rewrite produced besides the tree.
#[derive(Debug)]
pub struct RewriteRun<T> {
    pub output: T,
    pub stats: RewriteStats,
    pub diagnostics: Vec<Diagnostic>,
    pub closure_scopes: Vec<VariableScope>,
}

/// Rewrite an expression inside the body of `class` with default config.
pub fn rewrite_expression(types: &TypeTable, class: TypeId, expr: Expression) -> Expression {
    rewrite_expression_with(types, &RewriteConfig::default(), class, expr).output
}

pub fn rewrite_expression_with(
    types: &TypeTable,
    config: &RewriteConfig,
    class: TypeId,
    expr: Expression,
) -> RewriteRun<Expression> {
    let adapters = ComparisonAdapters::from_types(types);
    let handler = Arc::new(CollectingDiagnosticHandler::new());
    let mut scopes = VariableScopeCollector::new();
    let (output, stats) = {
        let mut rewriter =
            StaticCompileRewriter::new(types, &adapters, config, handler.as_ref(), &mut scopes);
        let output = rewriter.rewrite_expression(expr, ClassContext { class });
        (output, rewriter.stats())
    };
    RewriteRun {
        output,
        stats,
        diagnostics: handler.get_diagnostics(),
        closure_scopes: scopes.registered().to_vec(),
    }
}

/// Run the pass over a whole unit with default config.
pub fn rewrite_node(
    types: &TypeTable,
    node: AnnotatedNode,
) -> RewriteRun<Result<AnnotatedNode, RewriteError>> {
    let adapters = ComparisonAdapters::from_types(types);
    let config = RewriteConfig::default();
    let handler = Arc::new(CollectingDiagnosticHandler::new());
    let mut scopes = VariableScopeCollector::new();
    let (output, stats) = {
        let mut rewriter =
            StaticCompileRewriter::new(types, &adapters, &config, handler.as_ref(), &mut scopes);
        let output = rewriter.run(node);
        (output, rewriter.stats())
    };
    RewriteRun {
        output,
        stats,
        diagnostics: handler.get_diagnostics(),
        closure_scopes: scopes.registered().to_vec(),
    }
}
