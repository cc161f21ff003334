//! Shorthand constructors for annotated trees and common type fixtures.
//!
//! Builders place nodes at line 1, column 1 unless a span is given; use
//! [`at`] to move a node when a test asserts on positions.

use statica_core::ast::{
    BinaryOp, BinaryOperatorTarget, Block, CallTarget, ConstructorCall, Expression,
    ExpressionKind, Literal, MapEntry, MethodNode, Span, Statement, StaticCall,
};
use statica_core::types::{MethodId, ParamInfo, PrimitiveKind, TypeId, TypeTable};

pub fn span() -> Span {
    Span::new(1, 1)
}

/// Move `expr` to `line:column`.
pub fn at(mut expr: Expression, line: u32, column: u32) -> Expression {
    expr.span = Span::new(line, column);
    expr
}

pub fn int(value: i64) -> Expression {
    Expression::new(ExpressionKind::Literal(Literal::Integer(value)), span())
}

pub fn string(value: &str) -> Expression {
    Expression::new(ExpressionKind::Literal(Literal::String(value.to_string())), span())
}

pub fn boolean(value: bool) -> Expression {
    Expression::new(ExpressionKind::Literal(Literal::Boolean(value)), span())
}

pub fn null() -> Expression {
    Expression::null(span())
}

pub fn var(name: &str, ty: Option<TypeId>) -> Expression {
    Expression::variable(name, ty, span())
}

pub fn this() -> Expression {
    Expression::new(ExpressionKind::This, span())
}

pub fn class_ref(ty: TypeId) -> Expression {
    Expression::new(ExpressionKind::ClassRef(ty), span())
}

pub fn property(receiver: Expression, name: &str) -> Expression {
    let span = receiver.span;
    Expression::property(receiver, name, span)
}

pub fn call(receiver: Expression, name: &str, args: Vec<Expression>) -> Expression {
    let span = receiver.span;
    Expression::method_call(receiver, name, args, span)
}

/// `receiver?.name(args)`
pub fn safe_call(receiver: Expression, name: &str, args: Vec<Expression>) -> Expression {
    let mut expr = call(receiver, name, args);
    if let ExpressionKind::MethodCall(call) = &mut expr.kind {
        call.safe = true;
    }
    expr
}

pub fn static_call(owner: TypeId, name: &str, args: Vec<Expression>) -> Expression {
    Expression::new(
        ExpressionKind::StaticCall(StaticCall {
            owner,
            name: name.to_string(),
            args,
        }),
        span(),
    )
}

pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    let op_span = left.span;
    Expression::binary(op, left, right, op_span)
}

/// Binary node whose operator was resolved to `method`.
pub fn operator(
    op: BinaryOp,
    left: Expression,
    right: Expression,
    method: MethodId,
    name: &str,
) -> Expression {
    let mut expr = binary(op, left, right);
    expr.meta.binary_target = Some(BinaryOperatorTarget::new(method, name));
    expr
}

pub fn assign(target: Expression, value: Expression) -> Expression {
    binary(BinaryOp::Assign, target, value)
}

pub fn index(receiver: Expression, index: Expression) -> Expression {
    binary(BinaryOp::Index, receiver, index)
}

pub fn declare(name: &str, ty: Option<TypeId>, init: Expression) -> Expression {
    let span = init.span;
    Expression::declaration(name, ty, init, span)
}

pub fn map_literal(entries: Vec<(&str, Expression)>) -> Expression {
    let entries = entries
        .into_iter()
        .map(|(key, value)| MapEntry {
            span: value.span,
            key: string(key),
            value,
        })
        .collect();
    Expression::new(ExpressionKind::Map(entries), span())
}

/// `new ty(key: value, ...)` resolved to the constructor `ctor`.
pub fn keyword_new(ty: TypeId, ctor: MethodId, entries: Vec<(&str, Expression)>) -> Expression {
    Expression::new(
        ExpressionKind::ConstructorCall(ConstructorCall {
            ty,
            args: vec![map_literal(entries)],
        }),
        span(),
    )
    .with_call_target(CallTarget::Constructor(ctor))
}

pub fn expr_stmt(expr: Expression) -> Statement {
    Statement::Expression(expr)
}

pub fn ret(value: Expression) -> Statement {
    let span = value.span;
    Statement::Return(Some(value), span)
}

pub fn block(statements: Vec<Statement>) -> Block {
    Block::new(statements)
}

pub fn method(name: &str, declaring_type: TypeId, statements: Vec<Statement>) -> MethodNode {
    MethodNode {
        id: None,
        name: name.to_string(),
        declaring_type,
        params: Vec::new(),
        body: Block::new(statements),
        span: span(),
    }
}

// =============================================================================
// Type fixtures
// =============================================================================

/// `class Point { int x; int y }` with the resolver's map constructor.
#[derive(Debug, Clone, Copy)]
pub struct PointType {
    pub ty: TypeId,
    pub map_constructor: MethodId,
}

pub fn point_type(types: &mut TypeTable) -> PointType {
    let int = types.primitive(PrimitiveKind::Int);
    let ty = types.declare_class("Point");
    types.declare_field(ty, "x", int);
    types.declare_field(ty, "y", int);
    let map_constructor = types.synthesize_map_constructor(ty);
    PointType {
        ty,
        map_constructor,
    }
}

/// A value type with overloaded arithmetic and ordering.
#[derive(Debug, Clone, Copy)]
pub struct MoneyType {
    pub ty: TypeId,
    pub plus: MethodId,
    pub minus: MethodId,
    pub compare_to: MethodId,
    pub equals: MethodId,
}

pub fn money_type(types: &mut TypeTable) -> MoneyType {
    let wk = *types.well_known();
    let ty = types.declare_class("Money");
    types.declare_field(ty, "cents", wk.int);
    let param = || vec![ParamInfo::new("other", ty)];
    let plus = types.declare_method(ty, "plus", param(), ty, false);
    let minus = types.declare_method(ty, "minus", param(), ty, false);
    let compare_to = types.declare_method(ty, "compareTo", param(), wk.int, false);
    let equals = types.declare_method(ty, "equals", param(), wk.boolean, false);
    MoneyType {
        ty,
        plus,
        minus,
        compare_to,
        equals,
    }
}
