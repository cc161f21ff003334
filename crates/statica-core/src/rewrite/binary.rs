use super::{ClassContext, StaticCompileRewriter};
use crate::ast::{
    BinaryExpr, BinaryOp, BinaryOperatorTarget, Block, CallTarget, Expression, ExpressionKind,
    MethodCall, NodeMetadata, Span, Statement,
};
use crate::types::{MethodId, TypeId};
use tracing::debug;

impl StaticCompileRewriter<'_> {
    /// Operators resolved to a method become calls to that method.
    ///
    /// Comparisons go through the bytecode adapter when it has a routine for
    /// the operator. Assignments carrying an operator (`a += b`, or a plain
    /// `=` the resolver tagged) become `a = a.plus(b)`.
    pub(super) fn rewrite_binary_operator(
        &mut self,
        expr: Expression,
        cx: ClassContext,
    ) -> Expression {
        let Expression { kind, span, meta } = expr;
        let (bin, target) = match (kind, meta.binary_target.clone()) {
            (ExpressionKind::Binary(bin), Some(target)) => (bin, target),
            (other, _) => {
                return Expression {
                    kind: other,
                    span,
                    meta,
                }
            }
        };
        let BinaryExpr {
            op,
            op_span,
            left,
            right,
        } = bin;
        let inferred_type = meta.inferred_type;

        if op.is_comparison() {
            if let Some(adapter) = self.adapters.get(op) {
                debug!(
                    "Routing {} at {}:{} through {}",
                    op.symbol(),
                    span.line,
                    span.column,
                    self.types.method(adapter).name
                );
                self.stats.comparisons += 1;
                return self.adapter_call(adapter, *left, *right, span, inferred_type);
            }
        }

        if op.is_assignment() {
            return self.rewrite_operator_assignment(
                *left,
                *right,
                &target,
                op_span,
                span,
                inferred_type,
                cx,
            );
        }

        debug!(
            "Operator {} at {}:{} becomes call to {}",
            op.symbol(),
            span.line,
            span.column,
            target.name
        );
        self.stats.operator_calls += 1;
        operator_call(*left, *right, &target, span, inferred_type)
    }

    /// `BytecodeAdapter.compareX(left, right)`
    fn adapter_call(
        &self,
        adapter: MethodId,
        left: Expression,
        right: Expression,
        span: Span,
        inferred_type: Option<TypeId>,
    ) -> Expression {
        let method = self.types.method(adapter);
        Expression {
            kind: ExpressionKind::MethodCall(MethodCall {
                receiver: Box::new(Expression::new(ExpressionKind::ClassRef(method.owner), span)),
                name: method.name.clone(),
                args: vec![left, right],
                safe: false,
                spread_safe: false,
            }),
            span,
            meta: NodeMetadata {
                call_target: Some(CallTarget::Method(adapter)),
                inferred_type,
                binary_target: None,
            },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn rewrite_operator_assignment(
        &mut self,
        left: Expression,
        right: Expression,
        target: &BinaryOperatorTarget,
        op_span: Span,
        span: Span,
        inferred_type: Option<TypeId>,
        cx: ClassContext,
    ) -> Expression {
        let mut prelude = Vec::new();
        let lvalue = self.stabilize_lvalue(left, &mut prelude, cx);
        let value = operator_call(lvalue.clone(), right, target, span, inferred_type);
        let mut assignment = Expression::binary(BinaryOp::Assign, lvalue, value, op_span);
        assignment.meta.inferred_type = inferred_type;

        debug!(
            "Operator assignment at {}:{} becomes assignment of {}(){}",
            span.line,
            span.column,
            target.name,
            if prelude.is_empty() { "" } else { " with temporaries" }
        );
        self.stats.compound_assignments += 1;

        if prelude.is_empty() {
            return assignment;
        }
        prelude.push(Statement::Expression(assignment));
        let block = Expression::new(ExpressionKind::Block(Block::new(prelude)), span);
        match inferred_type {
            Some(ty) => block.with_inferred_type(ty),
            None => block,
        }
    }

    /// Bind the parts of an assignment target that could have side effects to
    /// temporaries, so the target can be read and written without evaluating
    /// them twice.
    fn stabilize_lvalue(
        &mut self,
        lvalue: Expression,
        prelude: &mut Vec<Statement>,
        cx: ClassContext,
    ) -> Expression {
        let Expression { kind, span, meta } = lvalue;
        let kind = match kind {
            ExpressionKind::Property(receiver, name) if !receiver.is_side_effect_free() => {
                let receiver = self.bind_temporary(*receiver, prelude, cx);
                ExpressionKind::Property(Box::new(receiver), name)
            }
            ExpressionKind::Binary(bin) if bin.op == BinaryOp::Index => {
                let BinaryExpr {
                    op,
                    op_span,
                    left,
                    right,
                } = bin;
                let left = self.stable_operand(*left, prelude, cx);
                let right = self.stable_operand(*right, prelude, cx);
                ExpressionKind::Binary(BinaryExpr {
                    op,
                    op_span,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            other => other,
        };
        Expression { kind, span, meta }
    }

    fn stable_operand(
        &mut self,
        expr: Expression,
        prelude: &mut Vec<Statement>,
        cx: ClassContext,
    ) -> Expression {
        if expr.is_side_effect_free() {
            expr
        } else {
            self.bind_temporary(expr, prelude, cx)
        }
    }
}

/// `left.name(right)` bound to the operator's resolved method.
fn operator_call(
    left: Expression,
    right: Expression,
    target: &BinaryOperatorTarget,
    span: Span,
    inferred_type: Option<TypeId>,
) -> Expression {
    Expression {
        kind: ExpressionKind::MethodCall(MethodCall {
            receiver: Box::new(left),
            name: target.name.clone(),
            args: vec![right],
            safe: false,
            spread_safe: false,
        }),
        span,
        meta: NodeMetadata {
            call_target: Some(CallTarget::Method(target.method)),
            inferred_type,
            binary_target: None,
        },
    }
}
