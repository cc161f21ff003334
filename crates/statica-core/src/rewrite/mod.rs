//! Static-dispatch rewrite pass.
//!
//! Runs after type resolution on a unit marked for static compilation (a
//! class, or a single method) and replaces dispatch sugar with forms a direct
//! code generator can emit:
//!
//! - `a?.m()` becomes a null-checked ternary
//! - operators resolved to methods become calls, comparisons route through the
//!   bytecode adapter, compound assignments become plain assignments
//! - `getAt`/`putAt` on arrays become direct indexing
//! - static-call nodes become calls on a class reference
//! - `new T(k: v, ...)` through a synthesized map constructor becomes a closure
//!   that builds a blank `T` and assigns each property
//!
//! The traversal is bottom-up: children are rewritten first, then at most one
//! rule runs on the node itself. Every rule declines silently when the
//! metadata or shape it needs is missing.

mod adapters;
mod array_index;
mod batch;
mod binary;
mod named_constructor;
mod safe_navigation;
mod static_call;

pub use adapters::ComparisonAdapters;
pub use batch::{rewrite_units, UnitOutcome};

use crate::ast::{
    AnnotatedNode, BinaryExpr, Block, ClassNode, ClosureExpr, ConstructorCall, Declaration,
    Expression, ExpressionKind, FieldNode, ForInStatement, IfStatement, MapEntry, MethodCall,
    MethodNode, Statement, StaticCall, WhileStatement,
};
use crate::config::{RewriteConfig, Rules};
use crate::diagnostics::DiagnosticHandler;
use crate::errors::{RewriteError, STATIC_ERROR_PREFIX};
use crate::scope::ScopeRegistrar;
use crate::types::{TypeChooser, TypeId, TypeTable};
use std::ops::{AddAssign, Sub};
use tracing::{debug, info};

/// Innermost declaring type of the code being rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassContext {
    pub class: TypeId,
}

/// Number of rewrites applied, per rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub safe_navigation: usize,
    pub operator_calls: usize,
    pub comparisons: usize,
    pub compound_assignments: usize,
    pub array_accesses: usize,
    pub static_calls: usize,
    pub named_constructors: usize,
}

impl RewriteStats {
    pub fn total(&self) -> usize {
        self.safe_navigation
            + self.operator_calls
            + self.comparisons
            + self.compound_assignments
            + self.array_accesses
            + self.static_calls
            + self.named_constructors
    }
}

impl Sub for RewriteStats {
    type Output = Self;

    fn sub(self, earlier: Self) -> Self {
        Self {
            safe_navigation: self.safe_navigation - earlier.safe_navigation,
            operator_calls: self.operator_calls - earlier.operator_calls,
            comparisons: self.comparisons - earlier.comparisons,
            compound_assignments: self.compound_assignments - earlier.compound_assignments,
            array_accesses: self.array_accesses - earlier.array_accesses,
            static_calls: self.static_calls - earlier.static_calls,
            named_constructors: self.named_constructors - earlier.named_constructors,
        }
    }
}

impl AddAssign for RewriteStats {
    fn add_assign(&mut self, other: Self) {
        self.safe_navigation += other.safe_navigation;
        self.operator_calls += other.operator_calls;
        self.comparisons += other.comparisons;
        self.compound_assignments += other.compound_assignments;
        self.array_accesses += other.array_accesses;
        self.static_calls += other.static_calls;
        self.named_constructors += other.named_constructors;
    }
}

/// Rewrites one compilation unit.
///
/// Synthetic names come from a counter owned by the rewriter, so use one
/// rewriter per unit to get names that are stable for a given input.
pub struct StaticCompileRewriter<'a> {
    types: &'a TypeTable,
    adapters: &'a ComparisonAdapters,
    config: &'a RewriteConfig,
    diagnostics: &'a dyn DiagnosticHandler,
    scopes: &'a mut dyn ScopeRegistrar,
    next_synthetic_id: u32,
    stats: RewriteStats,
}

impl<'a> StaticCompileRewriter<'a> {
    pub fn new(
        types: &'a TypeTable,
        adapters: &'a ComparisonAdapters,
        config: &'a RewriteConfig,
        diagnostics: &'a dyn DiagnosticHandler,
        scopes: &'a mut dyn ScopeRegistrar,
    ) -> Self {
        Self {
            types,
            adapters,
            config,
            diagnostics,
            scopes,
            next_synthetic_id: 0,
            stats: RewriteStats::default(),
        }
    }

    pub fn stats(&self) -> RewriteStats {
        self.stats
    }

    /// Rewrite a unit. Classes and single methods are supported; any other
    /// node is reported once and rejected.
    pub fn run(&mut self, node: AnnotatedNode) -> Result<AnnotatedNode, RewriteError> {
        let before = self.stats;
        let result = match node {
            AnnotatedNode::Class(class) => AnnotatedNode::Class(self.rewrite_class(class)),
            AnnotatedNode::Method(method) => {
                let cx = ClassContext {
                    class: method.declaring_type,
                };
                AnnotatedNode::Method(self.rewrite_method(method, cx))
            }
            other => {
                let span = other.span();
                self.diagnostics.error(
                    span,
                    &format!("{}Unimplemented node type", STATIC_ERROR_PREFIX),
                );
                return Err(RewriteError::UnsupportedNode {
                    kind: other.kind_name(),
                    line: span.line,
                    column: span.column,
                });
            }
        };

        let applied = self.stats - before;
        info!(
            "Static rewrite of {} finished: {} rewrite(s) ({:?})",
            result.kind_name(),
            applied.total(),
            applied
        );
        Ok(result)
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn rewrite_class(&mut self, class: ClassNode) -> ClassNode {
        let cx = ClassContext { class: class.ty };
        debug!("Rewriting class {}", self.types.name(class.ty));

        let ClassNode {
            ty,
            fields,
            constructors,
            methods,
            inner_classes,
            span,
        } = class;

        let fields = fields
            .into_iter()
            .map(|field| self.rewrite_field(field, cx))
            .collect();
        let constructors = constructors
            .into_iter()
            .map(|ctor| self.rewrite_method(ctor, cx))
            .collect();
        let methods = methods
            .into_iter()
            .map(|method| self.rewrite_method(method, cx))
            .collect();
        // inner classes get their own context
        let inner_classes = inner_classes
            .into_iter()
            .map(|inner| self.rewrite_class(inner))
            .collect();

        ClassNode {
            ty,
            fields,
            constructors,
            methods,
            inner_classes,
            span,
        }
    }

    fn rewrite_field(&mut self, field: FieldNode, cx: ClassContext) -> FieldNode {
        FieldNode {
            initializer: field
                .initializer
                .map(|init| self.rewrite_expression(init, cx)),
            ..field
        }
    }

    fn rewrite_method(&mut self, method: MethodNode, cx: ClassContext) -> MethodNode {
        let body = self.rewrite_block(method.body, cx);
        MethodNode { body, ..method }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn rewrite_block(&mut self, block: Block, cx: ClassContext) -> Block {
        Block {
            statements: block
                .statements
                .into_iter()
                .map(|stmt| self.rewrite_statement(stmt, cx))
                .collect(),
        }
    }

    fn rewrite_statement(&mut self, stmt: Statement, cx: ClassContext) -> Statement {
        match stmt {
            Statement::Expression(expr) => Statement::Expression(self.rewrite_expression(expr, cx)),
            Statement::Block(block) => Statement::Block(self.rewrite_block(block, cx)),
            Statement::Return(value, span) => {
                Statement::Return(value.map(|v| self.rewrite_expression(v, cx)), span)
            }
            Statement::If(if_stmt) => Statement::If(IfStatement {
                condition: self.rewrite_expression(if_stmt.condition, cx),
                then_block: self.rewrite_block(if_stmt.then_block, cx),
                else_block: if_stmt.else_block.map(|b| self.rewrite_block(b, cx)),
            }),
            Statement::While(while_stmt) => Statement::While(WhileStatement {
                condition: self.rewrite_expression(while_stmt.condition, cx),
                body: self.rewrite_block(while_stmt.body, cx),
            }),
            Statement::ForIn(for_stmt) => Statement::ForIn(ForInStatement {
                variable: for_stmt.variable,
                iterable: self.rewrite_expression(for_stmt.iterable, cx),
                body: self.rewrite_block(for_stmt.body, cx),
            }),
            Statement::Throw(expr) => Statement::Throw(self.rewrite_expression(expr, cx)),
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Rewrite an expression and everything below it.
    pub fn rewrite_expression(&mut self, expr: Expression, cx: ClassContext) -> Expression {
        let expr = self.rewrite_children(expr, cx);
        self.apply_rules(expr, cx)
    }

    fn rewrite_boxed(&mut self, expr: Box<Expression>, cx: ClassContext) -> Box<Expression> {
        Box::new(self.rewrite_expression(*expr, cx))
    }

    fn rewrite_all(&mut self, exprs: Vec<Expression>, cx: ClassContext) -> Vec<Expression> {
        exprs
            .into_iter()
            .map(|expr| self.rewrite_expression(expr, cx))
            .collect()
    }

    fn rewrite_children(&mut self, expr: Expression, cx: ClassContext) -> Expression {
        let Expression { kind, span, meta } = expr;
        let kind = match kind {
            ExpressionKind::Literal(_)
            | ExpressionKind::Variable(_)
            | ExpressionKind::This
            | ExpressionKind::ClassRef(_) => kind,
            ExpressionKind::Property(receiver, name) => {
                ExpressionKind::Property(self.rewrite_boxed(receiver, cx), name)
            }
            ExpressionKind::MethodCall(call) => ExpressionKind::MethodCall(MethodCall {
                receiver: self.rewrite_boxed(call.receiver, cx),
                args: self.rewrite_all(call.args, cx),
                ..call
            }),
            ExpressionKind::StaticCall(call) => ExpressionKind::StaticCall(StaticCall {
                args: self.rewrite_all(call.args, cx),
                ..call
            }),
            ExpressionKind::ConstructorCall(call) => {
                ExpressionKind::ConstructorCall(ConstructorCall {
                    args: self.rewrite_all(call.args, cx),
                    ..call
                })
            }
            ExpressionKind::Binary(bin) => ExpressionKind::Binary(BinaryExpr {
                left: self.rewrite_boxed(bin.left, cx),
                right: self.rewrite_boxed(bin.right, cx),
                ..bin
            }),
            ExpressionKind::Ternary(condition, then_expr, else_expr) => ExpressionKind::Ternary(
                self.rewrite_boxed(condition, cx),
                self.rewrite_boxed(then_expr, cx),
                self.rewrite_boxed(else_expr, cx),
            ),
            ExpressionKind::Closure(closure) => {
                ExpressionKind::Closure(self.rewrite_closure(closure, cx))
            }
            ExpressionKind::Block(block) => ExpressionKind::Block(self.rewrite_block(block, cx)),
            ExpressionKind::Map(entries) => ExpressionKind::Map(
                entries
                    .into_iter()
                    .map(|entry| MapEntry {
                        key: self.rewrite_expression(entry.key, cx),
                        value: self.rewrite_expression(entry.value, cx),
                        span: entry.span,
                    })
                    .collect(),
            ),
            ExpressionKind::List(items) => ExpressionKind::List(self.rewrite_all(items, cx)),
            ExpressionKind::Declaration(decl) => ExpressionKind::Declaration(Declaration {
                initializer: self.rewrite_boxed(decl.initializer, cx),
                ..decl
            }),
            ExpressionKind::Cast(ty, inner) => ExpressionKind::Cast(ty, self.rewrite_boxed(inner, cx)),
            ExpressionKind::Unary(op, operand) => {
                ExpressionKind::Unary(op, self.rewrite_boxed(operand, cx))
            }
        };
        Expression { kind, span, meta }
    }

    /// Rewrite a closure body. When the rules introduced locals inside it,
    /// the closure's recorded scope is stale and is registered again.
    fn rewrite_closure(&mut self, closure: ClosureExpr, cx: ClassContext) -> ClosureExpr {
        let names_before = self.next_synthetic_id;
        let mut closure = ClosureExpr {
            body: self.rewrite_block(closure.body, cx),
            ..closure
        };
        if self.next_synthetic_id != names_before {
            debug!("Closure body gained synthetic locals; registering its scope again");
            self.scopes.register_closure_body(&mut closure);
        }
        closure
    }

    /// Apply the rule for this node kind. Children are already rewritten.
    fn apply_rules(&mut self, expr: Expression, cx: ClassContext) -> Expression {
        match &expr.kind {
            ExpressionKind::MethodCall(_) => self.rewrite_method_call(expr, cx),
            ExpressionKind::Binary(_) if self.config.is_enabled(Rules::BINARY_OPERATORS) => {
                self.rewrite_binary_operator(expr, cx)
            }
            ExpressionKind::StaticCall(_) if self.config.is_enabled(Rules::STATIC_CALLS) => {
                self.rewrite_static_call(expr)
            }
            ExpressionKind::ConstructorCall(_)
                if self.config.is_enabled(Rules::NAMED_CONSTRUCTORS) =>
            {
                self.rewrite_named_constructor(expr)
            }
            _ => expr,
        }
    }

    /// Method calls: safe calls desugar, everything else may be array sugar.
    fn rewrite_method_call(&mut self, expr: Expression, cx: ClassContext) -> Expression {
        let safe = matches!(&expr.kind, ExpressionKind::MethodCall(call) if call.safe);
        if safe {
            if self.config.is_enabled(Rules::SAFE_NAVIGATION) {
                return self.rewrite_safe_navigation(expr, cx);
            }
            return expr;
        }
        if self.config.is_enabled(Rules::ARRAY_INDEX) {
            return self.rewrite_array_access(expr, cx);
        }
        expr
    }

    // =========================================================================
    // Shared helpers for rules
    // =========================================================================

    fn chooser(&self) -> TypeChooser<'a> {
        TypeChooser::new(self.types)
    }

    /// `<prefix>$<n>`, unique within this rewriter.
    fn fresh_name(&mut self, prefix: &str) -> String {
        let id = self.next_synthetic_id;
        self.next_synthetic_id += 1;
        format!("{}${}", prefix, id)
    }

    /// Bind `value` to a fresh temporary declared in `prelude` and return a
    /// reference to it.
    fn bind_temporary(
        &mut self,
        value: Expression,
        prelude: &mut Vec<Statement>,
        cx: ClassContext,
    ) -> Expression {
        let config = self.config;
        let ty = self.chooser().resolve_type(&value, cx.class);
        let name = self.fresh_name(&config.temporary_prefix);
        let span = value.span;
        prelude.push(Statement::Expression(Expression::declaration(
            name.clone(),
            ty,
            value,
            span,
        )));
        Expression::variable(name, ty, span)
    }
}
