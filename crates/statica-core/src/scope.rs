//! Scope registration for closures synthesized by the rewrite.
//!
//! Source-written closures get their variable scope from the resolver. The
//! closures this pass invents must go through the same bookkeeping, so they
//! are handed to a [`ScopeRegistrar`] as soon as they are built.

use crate::ast::{Block, ClosureExpr, Expression, ExpressionKind, Statement, VariableScope};
use indexmap::IndexSet;
use tracing::debug;

pub trait ScopeRegistrar {
    /// Compute the closure's variable scope and record it on the node.
    fn register_closure_body(&mut self, closure: &mut ClosureExpr);
}

/// Default registrar: computes declared and captured variable names by
/// walking the closure body, and remembers every scope it produced.
#[derive(Debug, Default)]
pub struct VariableScopeCollector {
    registered: Vec<VariableScope>,
}

impl VariableScopeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered(&self) -> &[VariableScope] {
        &self.registered
    }

    pub fn compute(closure: &ClosureExpr) -> VariableScope {
        let mut walker = ScopeWalker::default();
        for param in &closure.params {
            walker.declared.insert(param.name.clone());
        }
        walker.block(&closure.body);
        VariableScope {
            declared: walker.declared.into_iter().collect(),
            captured: walker.captured.into_iter().collect(),
        }
    }
}

impl ScopeRegistrar for VariableScopeCollector {
    fn register_closure_body(&mut self, closure: &mut ClosureExpr) {
        let scope = Self::compute(closure);
        debug!(
            "Registered closure scope: {} declared, {} captured",
            scope.declared.len(),
            scope.captured.len()
        );
        closure.scope = Some(scope.clone());
        self.registered.push(scope);
    }
}

#[derive(Default)]
struct ScopeWalker {
    declared: IndexSet<String>,
    captured: IndexSet<String>,
}

impl ScopeWalker {
    fn block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.statement(stmt);
        }
    }

    fn statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Expression(expr) | Statement::Throw(expr) => self.expression(expr),
            Statement::Block(block) => self.block(block),
            Statement::Return(value, _) => {
                if let Some(value) = value {
                    self.expression(value);
                }
            }
            Statement::If(if_stmt) => {
                self.expression(&if_stmt.condition);
                self.block(&if_stmt.then_block);
                if let Some(else_block) = &if_stmt.else_block {
                    self.block(else_block);
                }
            }
            Statement::While(while_stmt) => {
                self.expression(&while_stmt.condition);
                self.block(&while_stmt.body);
            }
            Statement::ForIn(for_stmt) => {
                self.expression(&for_stmt.iterable);
                self.declared.insert(for_stmt.variable.name.clone());
                self.block(&for_stmt.body);
            }
        }
    }

    fn reference(&mut self, name: &str) {
        if !self.declared.contains(name) {
            self.captured.insert(name.to_string());
        }
    }

    fn expression(&mut self, expr: &Expression) {
        match &expr.kind {
            ExpressionKind::Variable(var) => self.reference(&var.name),
            ExpressionKind::Literal(_) | ExpressionKind::This | ExpressionKind::ClassRef(_) => {}
            ExpressionKind::Property(receiver, _) => self.expression(receiver),
            ExpressionKind::MethodCall(call) => {
                self.expression(&call.receiver);
                self.expressions(&call.args);
            }
            ExpressionKind::StaticCall(call) => self.expressions(&call.args),
            ExpressionKind::ConstructorCall(call) => self.expressions(&call.args),
            ExpressionKind::Binary(bin) => {
                self.expression(&bin.left);
                self.expression(&bin.right);
            }
            ExpressionKind::Ternary(condition, then_expr, else_expr) => {
                self.expression(condition);
                self.expression(then_expr);
                self.expression(else_expr);
            }
            ExpressionKind::Closure(inner) => {
                let nested = VariableScopeCollector::compute(inner);
                for name in &nested.captured {
                    self.reference(name);
                }
            }
            ExpressionKind::Block(block) => self.block(block),
            ExpressionKind::Map(entries) => {
                for entry in entries {
                    self.expression(&entry.key);
                    self.expression(&entry.value);
                }
            }
            ExpressionKind::List(items) => self.expressions(items),
            ExpressionKind::Declaration(decl) => {
                self.expression(&decl.initializer);
                self.declared.insert(decl.name.clone());
            }
            ExpressionKind::Cast(_, inner) | ExpressionKind::Unary(_, inner) => {
                self.expression(inner)
            }
        }
    }

    fn expressions(&mut self, exprs: &[Expression]) {
        for expr in exprs {
            self.expression(expr);
        }
    }
}
