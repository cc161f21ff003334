use super::{PrimitiveKind, TypeId, TypeTable};
use crate::ast::{BinaryOp, CallTarget, Expression, ExpressionKind, Literal, UnaryOp};

/// Re-derives the static type of an expression.
///
/// An explicit `InferredType` wins; otherwise the type follows from the
/// expression's shape (declared variable types, field types, resolved method
/// return types). Rules call this on nodes they have just rewritten, so the
/// answer never depends on a value cached before the rewrite.
pub struct TypeChooser<'a> {
    types: &'a TypeTable,
}

impl<'a> TypeChooser<'a> {
    pub fn new(types: &'a TypeTable) -> Self {
        Self { types }
    }

    /// Static type of `expr` inside the body of `current_class`, if known.
    pub fn resolve_type(&self, expr: &Expression, current_class: TypeId) -> Option<TypeId> {
        let wk = self.types.well_known();
        if let ExpressionKind::ClassRef(_) = expr.kind {
            return Some(wk.class);
        }
        if let Some(ty) = expr.meta.inferred_type {
            return Some(ty);
        }

        match &expr.kind {
            ExpressionKind::Literal(literal) => Some(match literal {
                Literal::Null => wk.object,
                Literal::Boolean(_) => wk.boolean,
                Literal::Integer(_) => wk.int,
                Literal::Decimal(_) => self.types.primitive(PrimitiveKind::Double),
                Literal::String(_) => wk.string,
            }),
            ExpressionKind::Variable(var) => var.declared_type,
            ExpressionKind::This => Some(current_class),
            ExpressionKind::ClassRef(_) => Some(wk.class),
            ExpressionKind::Property(receiver, name) => {
                let owner = self.resolve_type(receiver, current_class)?;
                if self.types.is_array(owner) && name == "length" {
                    return Some(wk.int);
                }
                self.types.field_type(owner, name)
            }
            ExpressionKind::MethodCall(_) | ExpressionKind::StaticCall(_) => {
                match expr.meta.call_target? {
                    CallTarget::Method(id) => Some(self.types.method(id).return_type),
                    CallTarget::Constructor(id) => Some(self.types.method(id).owner),
                    CallTarget::DefaultConstructor(ty) => Some(ty),
                    CallTarget::ClosureCallNoArg => None,
                }
            }
            ExpressionKind::ConstructorCall(call) => Some(call.ty),
            ExpressionKind::Binary(bin) => match bin.op {
                BinaryOp::Index => {
                    let receiver = self.resolve_type(&bin.left, current_class)?;
                    self.types.component_type(receiver)
                }
                BinaryOp::Assign => self.resolve_type(&bin.right, current_class),
                BinaryOp::And | BinaryOp::Or => Some(wk.boolean),
                op if op.is_comparison() && op != BinaryOp::Compare => Some(wk.boolean),
                BinaryOp::Compare => Some(wk.int),
                _ => None,
            },
            ExpressionKind::Ternary(_, then_expr, else_expr) => {
                let then_ty = self.resolve_type(then_expr, current_class)?;
                let else_ty = self.resolve_type(else_expr, current_class)?;
                (then_ty == else_ty).then_some(then_ty)
            }
            ExpressionKind::Declaration(decl) => decl
                .declared_type
                .or_else(|| self.resolve_type(&decl.initializer, current_class)),
            ExpressionKind::Cast(ty, _) => Some(*ty),
            ExpressionKind::Closure(_) => Some(wk.closure),
            ExpressionKind::Map(_) => Some(wk.linked_hash_map),
            ExpressionKind::List(_) => Some(wk.list),
            ExpressionKind::Unary(UnaryOp::Not, _) => Some(wk.boolean),
            ExpressionKind::Unary(UnaryOp::Negate, operand) => {
                self.resolve_type(operand, current_class)
            }
            ExpressionKind::Block(_) => None,
        }
    }
}
