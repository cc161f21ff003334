use super::StaticCompileRewriter;
use crate::ast::{
    BinaryOp, Block, CallTarget, ClosureExpr, ConstructorCall, Expression, ExpressionKind,
    MapEntry, Span, Statement,
};
use crate::types::{MethodId, TypeId};
use tracing::{debug, trace};

impl StaticCompileRewriter<'_> {
    /// `new T(a: 1, b: 2)` through the resolver's map constructor becomes
    ///
    /// ```text
    /// { -> T obj$0 = new T(); obj$0.a = 1; obj$0.b = 2; return obj$0 }.call()
    /// ```
    ///
    /// Constructors the programmer wrote are never bypassed.
    pub(super) fn rewrite_named_constructor(&mut self, expr: Expression) -> Expression {
        let Some(ctor) = self.map_constructor_target(&expr) else {
            return expr;
        };
        let owner = self.types.method(ctor).owner;

        let Expression { kind, span, meta } = expr;
        let entries = match kind {
            ExpressionKind::ConstructorCall(ConstructorCall { args, .. }) => args
                .into_iter()
                .flat_map(|arg| match arg.kind {
                    ExpressionKind::Map(entries) => entries,
                    _ => Vec::new(),
                })
                .collect::<Vec<_>>(),
            other => {
                return Expression {
                    kind: other,
                    span,
                    meta,
                }
            }
        };

        let config = self.config;
        let local = self.fresh_name(&config.synthetic_local_prefix);
        debug!(
            "Desugaring keyword constructor of {} at {}:{} into {} property assignment(s) on {}",
            self.types.name(owner),
            span.line,
            span.column,
            entries.len(),
            local
        );
        self.stats.named_constructors += 1;

        let mut closure = ClosureExpr {
            params: Vec::new(),
            body: build_initializer_body(owner, &local, entries, span),
            scope: None,
        };
        self.scopes.register_closure_body(&mut closure);

        let inferred_type = meta.inferred_type.unwrap_or(owner);
        let closure_expr = Expression::new(ExpressionKind::Closure(closure), span)
            .with_inferred_type(self.types.well_known().closure);
        Expression::method_call(closure_expr, "call", Vec::new(), span)
            .with_call_target(CallTarget::ClosureCallNoArg)
            .with_inferred_type(inferred_type)
    }

    /// The constructor to bypass, when the call passes a single map literal
    /// with string keys to a resolver-synthesized `T(Map)` constructor.
    fn map_constructor_target(&self, expr: &Expression) -> Option<MethodId> {
        let ExpressionKind::ConstructorCall(call) = &expr.kind else {
            return None;
        };
        let ctor = expr.meta.target_constructor()?;
        let method = self.types.method(ctor);

        let [param] = method.params.as_slice() else {
            return None;
        };
        if !self
            .types
            .implements_or_subclass(param.ty, self.types.well_known().map)
        {
            return None;
        }

        let [arg] = call.args.as_slice() else {
            return None;
        };
        let ExpressionKind::Map(entries) = &arg.kind else {
            return None;
        };
        if entries.iter().any(|entry| entry.key.as_string_literal().is_none()) {
            trace!("Keyword constructor of {} has a non-string key", self.types.name(call.ty));
            return None;
        }

        if self.types.is_declared_constructor(ctor) {
            trace!(
                "{} declares its own map constructor; leaving call alone",
                self.types.name(method.owner)
            );
            return None;
        }
        Some(ctor)
    }
}

/// `T obj = new T(); obj.k = v; ...; return obj`
fn build_initializer_body(owner: TypeId, local: &str, entries: Vec<MapEntry>, span: Span) -> Block {
    let blank = Expression::new(
        ExpressionKind::ConstructorCall(ConstructorCall {
            ty: owner,
            args: Vec::new(),
        }),
        span,
    )
    .with_call_target(CallTarget::DefaultConstructor(owner))
    .with_inferred_type(owner);

    let mut statements = Vec::with_capacity(entries.len() + 2);
    statements.push(Statement::Expression(Expression::declaration(
        local,
        Some(owner),
        blank,
        span,
    )));

    for MapEntry { key, value, span } in entries {
        let Some(property) = key.as_string_literal() else {
            continue;
        };
        let target = Expression::property(Expression::variable(local, Some(owner), span), property, span);
        let mut assignment = Expression::binary(BinaryOp::Assign, target, value, span);
        assignment.span = span;
        statements.push(Statement::Expression(assignment));
    }

    statements.push(Statement::Return(
        Some(Expression::variable(local, Some(owner), span)),
        span,
    ));
    Block::new(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::pretty::print_expression;
    use crate::ast::Literal;
    use crate::config::RewriteConfig;
    use crate::diagnostics::CollectingDiagnosticHandler;
    use crate::rewrite::{ClassContext, ComparisonAdapters};
    use crate::scope::VariableScopeCollector;
    use crate::types::{ParamInfo, TypeTable};

    fn entry(key: &str, value: i64) -> MapEntry {
        let span = Span::new(9, 15);
        MapEntry {
            key: Expression::new(ExpressionKind::Literal(Literal::String(key.into())), span),
            value: Expression::new(ExpressionKind::Literal(Literal::Integer(value)), span),
            span,
        }
    }

    fn keyword_new(ty: TypeId, ctor: MethodId, entries: Vec<MapEntry>) -> Expression {
        let span = Span::new(9, 5);
        Expression::new(
            ExpressionKind::ConstructorCall(ConstructorCall {
                ty,
                args: vec![Expression::new(ExpressionKind::Map(entries), span)],
            }),
            span,
        )
        .with_call_target(CallTarget::Constructor(ctor))
    }

    fn rewrite(types: &TypeTable, expr: Expression) -> (Expression, VariableScopeCollector) {
        let adapters = ComparisonAdapters::from_types(types);
        let config = RewriteConfig::default();
        let diagnostics = CollectingDiagnosticHandler::new();
        let mut scopes = VariableScopeCollector::new();
        let out = {
            let mut rewriter =
                StaticCompileRewriter::new(types, &adapters, &config, &diagnostics, &mut scopes);
            let cx = ClassContext {
                class: types.well_known().object,
            };
            rewriter.rewrite_expression(expr, cx)
        };
        (out, scopes)
    }

    #[test]
    fn test_synthesized_map_constructor_is_desugared() {
        let mut types = TypeTable::new();
        let point = types.declare_class("Point");
        let ctor = types.synthesize_map_constructor(point);
        let expr = keyword_new(point, ctor, vec![entry("x", 1), entry("y", 2)]);

        let (out, scopes) = rewrite(&types, expr);
        assert_eq!(
            print_expression(&out, &types),
            "{ -> Point obj$0 = new Point(); obj$0.x = 1; obj$0.y = 2; return obj$0 }.call()"
        );
        assert_eq!(out.meta.call_target, Some(CallTarget::ClosureCallNoArg));
        assert_eq!(out.meta.inferred_type, Some(point));
        assert_eq!(scopes.registered().len(), 1);
        assert_eq!(scopes.registered()[0].declared, vec!["obj$0".to_string()]);
    }

    #[test]
    fn test_declared_map_constructor_is_kept() {
        let mut types = TypeTable::new();
        let point = types.declare_class("Point");
        let map = types.well_known().map;
        let ctor = types.declare_constructor(point, vec![ParamInfo::new("args", map)]);
        let expr = keyword_new(point, ctor, vec![entry("x", 1)]);

        let (out, scopes) = rewrite(&types, expr.clone());
        assert_eq!(out, expr);
        assert!(scopes.registered().is_empty());
    }

    #[test]
    fn test_non_string_key_is_kept() {
        let mut types = TypeTable::new();
        let point = types.declare_class("Point");
        let ctor = types.synthesize_map_constructor(point);
        let span = Span::new(9, 15);
        let bad = MapEntry {
            key: Expression::variable("k", None, span),
            value: Expression::null(span),
            span,
        };
        let expr = keyword_new(point, ctor, vec![bad]);

        let (out, _) = rewrite(&types, expr.clone());
        assert_eq!(out, expr);
    }
}
