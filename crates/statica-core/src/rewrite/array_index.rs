use super::{ClassContext, StaticCompileRewriter};
use crate::ast::{BinaryOp, Expression, ExpressionKind, MethodCall};
use crate::types::TypeId;
use tracing::{debug, trace};

impl StaticCompileRewriter<'_> {
    /// `arr.getAt(i)` becomes `arr[i]` and `arr.putAt(i, v)` becomes
    /// `arr[i] = v` when `arr` is statically an array and `i` is integral.
    /// Anything else is left as a call.
    pub(super) fn rewrite_array_access(&mut self, expr: Expression, cx: ClassContext) -> Expression {
        let Some(component) = self.array_sugar_component(&expr, cx) else {
            return expr;
        };
        let Expression { kind, span, meta } = expr;
        let call = match kind {
            ExpressionKind::MethodCall(call) => call,
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
            mut args,
            safe,
            spread_safe,
        } = call;

        // arity was checked above, so the pops always succeed
        let value = if name == "putAt" { args.pop() } else { None };
        let Some(index) = args.pop() else {
            let call = MethodCall {
                receiver,
                name,
                args,
                safe,
                spread_safe,
            };
            return Expression::new(ExpressionKind::MethodCall(call), span).with_meta(meta);
        };

        debug!(
            "Array sugar {}() at {}:{} becomes direct indexing",
            name, span.line, span.column
        );
        self.stats.array_accesses += 1;

        let index_span = index.span;
        let mut element = Expression::binary(BinaryOp::Index, *receiver, index, index_span);
        element.span = span;
        element.meta.inferred_type = Some(component);

        match value {
            None => element,
            Some(value) => {
                let value_span = value.span;
                let mut assignment = Expression::binary(BinaryOp::Assign, element, value, value_span);
                assignment.span = span;
                assignment
            }
        }
    }

    /// Component type of the receiver when `expr` is `getAt`/`putAt` sugar
    /// that can become direct indexing.
    fn array_sugar_component(&self, expr: &Expression, cx: ClassContext) -> Option<TypeId> {
        let ExpressionKind::MethodCall(call) = &expr.kind else {
            return None;
        };
        let expected_args = match call.name.as_str() {
            "getAt" => 1,
            "putAt" => 2,
            _ => return None,
        };

        let chooser = self.chooser();
        let receiver_type = chooser.resolve_type(&call.receiver, cx.class)?;
        let component = self.types.component_type(receiver_type)?;

        if call.args.len() != expected_args {
            trace!(
                "{}() on {} with {} argument(s) left as a call",
                call.name,
                self.types.name(receiver_type),
                call.args.len()
            );
            return None;
        }

        let index_type = chooser.resolve_type(&call.args[0], cx.class)?;
        let wk = self.types.well_known();
        let wrapper = self.types.wrapper(index_type);
        // enum `next()` produces a Number index
        let integral = wrapper == wk.integer
            || (expected_args == 1 && self.types.is_enum(component) && wrapper == wk.number);
        if !integral {
            trace!(
                "{}() index of type {} is not integral",
                call.name,
                self.types.name(index_type)
            );
            return None;
        }
        Some(component)
    }
}
