use super::{ClassContext, StaticCompileRewriter};
use crate::ast::{BinaryOp, Expression, ExpressionKind, MethodCall};
use crate::config::SafeNavigationTemps;
use tracing::debug;

impl StaticCompileRewriter<'_> {
    /// `recv?.m(args)` becomes `(recv != null) ? recv.m(args) : null`.
    ///
    /// A receiver that could have side effects is evaluated once, into a
    /// temporary declared inside the null check:
    /// `((T tmp$0 = recv) != null) ? tmp$0.m(args) : null`.
    pub(super) fn rewrite_safe_navigation(
        &mut self,
        expr: Expression,
        cx: ClassContext,
    ) -> Expression {
        let Expression { kind, span, meta } = expr;
        let call = match kind {
            ExpressionKind::MethodCall(call) if call.safe => call,
            other => {
                return Expression {
                    kind: other,
                    span,
                    meta,
                }
            }
        };
        let MethodCall {
            receiver,
            name,
            args,
            spread_safe,
            ..
        } = call;

        let receiver_span = receiver.span;
        let needs_temporary = match self.config.safe_navigation_temps {
            SafeNavigationTemps::Always => true,
            SafeNavigationTemps::WhenImpure => !receiver.is_side_effect_free(),
        };

        let (checked, call_receiver) = if needs_temporary {
            let config = self.config;
            let ty = self.chooser().resolve_type(&receiver, cx.class);
            let temp = self.fresh_name(&config.temporary_prefix);
            let decl = Expression::declaration(temp.clone(), ty, *receiver, receiver_span);
            (decl, Expression::variable(temp, ty, receiver_span))
        } else {
            ((*receiver).clone(), *receiver)
        };

        debug!(
            "Desugaring safe call {}() at {}:{}{}",
            name,
            span.line,
            span.column,
            if needs_temporary { " with temporary" } else { "" }
        );
        self.stats.safe_navigation += 1;

        let inferred_type = meta.inferred_type;
        let plain_call = Expression {
            kind: ExpressionKind::MethodCall(MethodCall {
                receiver: Box::new(call_receiver),
                name,
                args,
                safe: false,
                spread_safe,
            }),
            span,
            meta,
        };
        // the plain call may itself be array sugar
        let then_branch = self.rewrite_method_call(plain_call, cx);

        let condition = Expression::binary(
            BinaryOp::NotEqual,
            checked,
            Expression::null(receiver_span),
            receiver_span,
        );
        let ternary = Expression::new(
            ExpressionKind::Ternary(
                Box::new(condition),
                Box::new(then_branch),
                Box::new(Expression::null(span)),
            ),
            span,
        );
        match inferred_type {
            Some(ty) => ternary.with_inferred_type(ty),
            None => ternary,
        }
    }
}
