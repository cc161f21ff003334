//! Annotated tree model.
//!
//! Expressions own their children. Every expression carries a source position
//! and the resolver's [`NodeMetadata`].

pub mod metadata;
pub mod pretty;

pub use metadata::{BinaryOperatorTarget, CallTarget, MetadataKey, NodeMetadata};

use crate::types::{MethodId, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn dummy() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Assign,
    PlusAssign,
    MinusAssign,
    MultiplyAssign,
    DivideAssign,
    ModAssign,
    PowerAssign,
    LeftShiftAssign,
    RightShiftAssign,
    UnsignedRightShiftAssign,
    BitAndAssign,
    BitOrAssign,
    XorAssign,
    Plus,
    Minus,
    Multiply,
    Divide,
    Mod,
    Power,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    BitAnd,
    BitOr,
    Xor,
    And,
    Or,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    /// Three-way compare, `<=>`
    Compare,
    /// Subscript, `a[i]`
    Index,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Assign => "=",
            BinaryOp::PlusAssign => "+=",
            BinaryOp::MinusAssign => "-=",
            BinaryOp::MultiplyAssign => "*=",
            BinaryOp::DivideAssign => "/=",
            BinaryOp::ModAssign => "%=",
            BinaryOp::PowerAssign => "**=",
            BinaryOp::LeftShiftAssign => "<<=",
            BinaryOp::RightShiftAssign => ">>=",
            BinaryOp::UnsignedRightShiftAssign => ">>>=",
            BinaryOp::BitAndAssign => "&=",
            BinaryOp::BitOrAssign => "|=",
            BinaryOp::XorAssign => "^=",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Power => "**",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::UnsignedRightShift => ">>>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::Xor => "^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanEqual => ">=",
            BinaryOp::Compare => "<=>",
            BinaryOp::Index => "[",
        }
    }

    /// `+=`, `<<=`, ... but not plain `=`.
    pub fn is_compound_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::PlusAssign
                | BinaryOp::MinusAssign
                | BinaryOp::MultiplyAssign
                | BinaryOp::DivideAssign
                | BinaryOp::ModAssign
                | BinaryOp::PowerAssign
                | BinaryOp::LeftShiftAssign
                | BinaryOp::RightShiftAssign
                | BinaryOp::UnsignedRightShiftAssign
                | BinaryOp::BitAndAssign
                | BinaryOp::BitOrAssign
                | BinaryOp::XorAssign
        )
    }

    pub fn is_assignment(self) -> bool {
        self == BinaryOp::Assign || self.is_compound_assignment()
    }

    /// Relational, equality, and three-way comparison operators.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanEqual
                | BinaryOp::Compare
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableRef {
    pub name: String,
    pub declared_type: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub receiver: Box<Expression>,
    pub name: String,
    pub args: Vec<Expression>,
    /// `receiver?.name(...)`
    pub safe: bool,
    /// `receiver*.name(...)`
    pub spread_safe: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticCall {
    pub owner: TypeId,
    pub name: String,
    pub args: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorCall {
    pub ty: TypeId,
    pub args: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    /// Position of the operator token
    pub op_span: Span,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: Option<TypeId>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Option<TypeId>) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Variables a closure body declares and the ones it captures from the
/// enclosing scope, as computed by a scope registrar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableScope {
    pub declared: Vec<String>,
    pub captured: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosureExpr {
    pub params: Vec<Parameter>,
    pub body: Block,
    pub scope: Option<VariableScope>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: Expression,
    pub value: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub declared_type: Option<TypeId>,
    pub initializer: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Literal(Literal),
    Variable(VariableRef),
    This,
    ClassRef(TypeId),
    Property(Box<Expression>, String),
    MethodCall(MethodCall),
    StaticCall(StaticCall),
    ConstructorCall(ConstructorCall),
    Binary(BinaryExpr),
    Ternary(Box<Expression>, Box<Expression>, Box<Expression>),
    Closure(ClosureExpr),
    /// Statements evaluated in order; the value is the last expression
    /// statement's value.
    Block(Block),
    Map(Vec<MapEntry>),
    List(Vec<Expression>),
    Declaration(Declaration),
    Cast(TypeId, Box<Expression>),
    Unary(UnaryOp, Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
    pub meta: NodeMetadata,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        Self {
            kind,
            span,
            meta: NodeMetadata::default(),
        }
    }

    pub fn with_meta(mut self, meta: NodeMetadata) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_inferred_type(mut self, ty: TypeId) -> Self {
        self.meta.inferred_type = Some(ty);
        self
    }

    pub fn with_call_target(mut self, target: CallTarget) -> Self {
        self.meta.call_target = Some(target);
        self
    }

    pub fn null(span: Span) -> Self {
        Self::new(ExpressionKind::Literal(Literal::Null), span)
    }

    pub fn variable(name: impl Into<String>, declared_type: Option<TypeId>, span: Span) -> Self {
        Self::new(
            ExpressionKind::Variable(VariableRef {
                name: name.into(),
                declared_type,
            }),
            span,
        )
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression, op_span: Span) -> Self {
        let span = left.span;
        Self::new(
            ExpressionKind::Binary(BinaryExpr {
                op,
                op_span,
                left: Box::new(left),
                right: Box::new(right),
            }),
            span,
        )
    }

    pub fn method_call(
        receiver: Expression,
        name: impl Into<String>,
        args: Vec<Expression>,
        span: Span,
    ) -> Self {
        Self::new(
            ExpressionKind::MethodCall(MethodCall {
                receiver: Box::new(receiver),
                name: name.into(),
                args,
                safe: false,
                spread_safe: false,
            }),
            span,
        )
    }

    pub fn property(receiver: Expression, name: impl Into<String>, span: Span) -> Self {
        Self::new(
            ExpressionKind::Property(Box::new(receiver), name.into()),
            span,
        )
    }

    pub fn declaration(
        name: impl Into<String>,
        declared_type: Option<TypeId>,
        initializer: Expression,
        span: Span,
    ) -> Self {
        Self::new(
            ExpressionKind::Declaration(Declaration {
                name: name.into(),
                declared_type,
                initializer: Box::new(initializer),
            }),
            span,
        )
    }

    /// String value of a string literal.
    pub fn as_string_literal(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Literal(Literal::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Expressions that can be evaluated more than once without observable
    /// difference: variables, `this`, literals and class references.
    pub fn is_side_effect_free(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Literal(_)
                | ExpressionKind::Variable(_)
                | ExpressionKind::This
                | ExpressionKind::ClassRef(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_block: Block,
    pub else_block: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForInStatement {
    pub variable: Parameter,
    pub iterable: Expression,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(Expression),
    Block(Block),
    Return(Option<Expression>, Span),
    If(IfStatement),
    While(WhileStatement),
    ForIn(ForInStatement),
    Throw(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub name: String,
    pub ty: TypeId,
    pub initializer: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodNode {
    /// Resolved identity, absent for script-level methods the resolver did not
    /// register.
    pub id: Option<MethodId>,
    pub name: String,
    pub declaring_type: TypeId,
    pub params: Vec<Parameter>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassNode {
    pub ty: TypeId,
    pub fields: Vec<FieldNode>,
    pub constructors: Vec<MethodNode>,
    pub methods: Vec<MethodNode>,
    pub inner_classes: Vec<ClassNode>,
    pub span: Span,
}

impl ClassNode {
    pub fn new(ty: TypeId, span: Span) -> Self {
        Self {
            ty,
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            inner_classes: Vec::new(),
            span,
        }
    }
}

/// A node that carries the static-compilation marker and is handed to the
/// pass as a unit of work.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotatedNode {
    Class(ClassNode),
    Method(MethodNode),
    Field(FieldNode),
}

impl AnnotatedNode {
    pub fn span(&self) -> Span {
        match self {
            AnnotatedNode::Class(class) => class.span,
            AnnotatedNode::Method(method) => method.span,
            AnnotatedNode::Field(field) => field.span,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            AnnotatedNode::Class(_) => "class",
            AnnotatedNode::Method(_) => "method",
            AnnotatedNode::Field(_) => "field",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_assignment_classification() {
        assert!(BinaryOp::PlusAssign.is_compound_assignment());
        assert!(BinaryOp::UnsignedRightShiftAssign.is_assignment());
        assert!(!BinaryOp::Assign.is_compound_assignment());
        assert!(BinaryOp::Assign.is_assignment());
        assert!(!BinaryOp::Plus.is_assignment());
    }

    #[test]
    fn test_comparison_operators() {
        let comparisons = [
            BinaryOp::Equal,
            BinaryOp::NotEqual,
            BinaryOp::LessThan,
            BinaryOp::LessThanEqual,
            BinaryOp::GreaterThan,
            BinaryOp::GreaterThanEqual,
            BinaryOp::Compare,
        ];
        for op in comparisons {
            assert!(op.is_comparison(), "{} should be a comparison", op.symbol());
        }
        assert!(!BinaryOp::Plus.is_comparison());
        assert!(!BinaryOp::Index.is_comparison());
    }

    #[test]
    fn test_side_effect_free_expressions() {
        let span = Span::new(1, 1);
        assert!(Expression::variable("x", None, span).is_side_effect_free());
        assert!(Expression::null(span).is_side_effect_free());
        let call = Expression::method_call(Expression::variable("x", None, span), "f", vec![], span);
        assert!(!call.is_side_effect_free());
        assert!(!Expression::property(Expression::variable("x", None, span), "p", span)
            .is_side_effect_free());
    }
}
