use super::StaticCompileRewriter;
use crate::ast::{Expression, ExpressionKind, MethodCall, StaticCall};
use tracing::debug;

impl StaticCompileRewriter<'_> {
    /// `Owner::name(args)` with a resolved target becomes the ordinary call
    /// `Owner.name(args)` on a class reference. Metadata is carried over.
    pub(super) fn rewrite_static_call(&mut self, expr: Expression) -> Expression {
        if expr.meta.call_target.is_none() {
            return expr;
        }
        let Expression { kind, span, meta } = expr;
        let StaticCall { owner, name, args } = match kind {
            ExpressionKind::StaticCall(call) => call,
            other => {
                return Expression {
                    kind: other,
                    span,
                    meta,
                }
            }
        };

        debug!(
            "Static call {}::{} at {}:{} becomes class-receiver call",
            self.types.name(owner),
            name,
            span.line,
            span.column
        );
        self.stats.static_calls += 1;

        Expression {
            kind: ExpressionKind::MethodCall(MethodCall {
                receiver: Box::new(Expression::new(ExpressionKind::ClassRef(owner), span)),
                name,
                args,
                safe: false,
                spread_safe: false,
            }),
            span,
            meta,
        }
    }
}
