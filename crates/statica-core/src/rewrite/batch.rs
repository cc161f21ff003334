use super::{ComparisonAdapters, RewriteStats, StaticCompileRewriter};
use crate::ast::{AnnotatedNode, VariableScope};
use crate::config::RewriteConfig;
use crate::diagnostics::DiagnosticHandler;
use crate::errors::RewriteError;
use crate::scope::VariableScopeCollector;
use crate::types::TypeTable;
use rayon::prelude::*;
use tracing::info;

/// Result of rewriting one unit in a batch.
#[derive(Debug)]
pub struct UnitOutcome {
    pub result: Result<AnnotatedNode, RewriteError>,
    pub stats: RewriteStats,
    /// Scopes of the closures synthesized while rewriting this unit
    pub closure_scopes: Vec<VariableScope>,
}

/// Rewrite independent units in parallel.
///
/// Each unit gets its own rewriter and scope collector, so synthetic names
/// restart at zero per unit and outcomes are returned in input order.
pub fn rewrite_units(
    units: Vec<AnnotatedNode>,
    types: &TypeTable,
    adapters: &ComparisonAdapters,
    config: &RewriteConfig,
    diagnostics: &dyn DiagnosticHandler,
) -> Vec<UnitOutcome> {
    let unit_count = units.len();
    let outcomes: Vec<UnitOutcome> = units
        .into_par_iter()
        .map(|unit| {
            let mut scopes = VariableScopeCollector::new();
            let (result, stats) = {
                let mut rewriter =
                    StaticCompileRewriter::new(types, adapters, config, diagnostics, &mut scopes);
                let result = rewriter.run(unit);
                (result, rewriter.stats())
            };
            UnitOutcome {
                result,
                stats,
                closure_scopes: scopes.registered().to_vec(),
            }
        })
        .collect();

    let mut totals = RewriteStats::default();
    for outcome in &outcomes {
        totals += outcome.stats;
    }
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(
        "Rewrote {} unit(s), {} failed, {} rewrite(s) in total",
        unit_count,
        failed,
        totals.total()
    );
    outcomes
}
