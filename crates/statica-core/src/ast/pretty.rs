//! Source-like rendering of trees, for logs and test assertions.
//!
//! The static-call form prints as `Owner::name(...)` so it stays visibly
//! distinct from the rewritten `Owner.name(...)` method call.

use super::{
    Block, ClosureExpr, Expression, ExpressionKind, Literal, MapEntry, MethodCall, Statement,
};
use crate::types::TypeTable;

pub fn print_expression(expr: &Expression, types: &TypeTable) -> String {
    let mut printer = Printer::new(types);
    printer.expression(expr);
    printer.finish()
}

pub fn print_statement(stmt: &Statement, types: &TypeTable) -> String {
    let mut printer = Printer::new(types);
    printer.statement(stmt);
    printer.finish()
}

pub fn print_block(block: &Block, types: &TypeTable) -> String {
    let mut printer = Printer::new(types);
    printer.block(block);
    printer.finish()
}

pub struct Printer<'a> {
    types: &'a TypeTable,
    output: String,
}

impl<'a> Printer<'a> {
    pub fn new(types: &'a TypeTable) -> Self {
        Self {
            types,
            output: String::new(),
        }
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    pub fn expression(&mut self, expr: &Expression) {
        match &expr.kind {
            ExpressionKind::Literal(literal) => self.literal(literal),
            ExpressionKind::Variable(var) => self.write(&var.name),
            ExpressionKind::This => self.write("this"),
            ExpressionKind::ClassRef(ty) => self.write(self.types.name(*ty)),
            ExpressionKind::Property(receiver, name) => {
                self.receiver(receiver);
                self.write(".");
                self.write(name);
            }
            ExpressionKind::MethodCall(call) => self.method_call(call),
            ExpressionKind::StaticCall(call) => {
                self.write(self.types.name(call.owner));
                self.write("::");
                self.write(&call.name);
                self.arguments(&call.args);
            }
            ExpressionKind::ConstructorCall(call) => {
                self.write("new ");
                self.write(self.types.name(call.ty));
                self.arguments(&call.args);
            }
            ExpressionKind::Binary(bin) => {
                if bin.op == super::BinaryOp::Index {
                    self.receiver(&bin.left);
                    self.write("[");
                    self.expression(&bin.right);
                    self.write("]");
                } else if bin.op.is_assignment() {
                    self.operand(&bin.left);
                    self.write(" ");
                    self.write(bin.op.symbol());
                    self.write(" ");
                    self.expression(&bin.right);
                } else {
                    self.write("(");
                    self.operand(&bin.left);
                    self.write(" ");
                    self.write(bin.op.symbol());
                    self.write(" ");
                    self.operand(&bin.right);
                    self.write(")");
                }
            }
            ExpressionKind::Ternary(condition, then_expr, else_expr) => {
                self.operand(condition);
                self.write(" ? ");
                self.operand(then_expr);
                self.write(" : ");
                self.operand(else_expr);
            }
            ExpressionKind::Closure(closure) => self.closure(closure),
            ExpressionKind::Block(block) => self.block(block),
            ExpressionKind::Map(entries) => self.map(entries),
            ExpressionKind::List(items) => {
                self.write("[");
                self.comma_separated(items);
                self.write("]");
            }
            ExpressionKind::Declaration(decl) => {
                match decl.declared_type {
                    Some(ty) => self.write(self.types.name(ty)),
                    None => self.write("def"),
                }
                self.write(" ");
                self.write(&decl.name);
                self.write(" = ");
                self.expression(&decl.initializer);
            }
            ExpressionKind::Cast(ty, inner) => {
                self.write("(");
                self.write(self.types.name(*ty));
                self.write(") ");
                self.operand(inner);
            }
            ExpressionKind::Unary(op, operand) => {
                self.write(op.symbol());
                self.operand(operand);
            }
        }
    }

    fn literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Null => self.write("null"),
            Literal::Boolean(b) => self.write(if *b { "true" } else { "false" }),
            Literal::Integer(n) => self.write(&n.to_string()),
            Literal::Decimal(d) => self.write(&format!("{:?}", d)),
            Literal::String(s) => self.write(&format!("{:?}", s)),
        }
    }

    fn method_call(&mut self, call: &MethodCall) {
        self.receiver(&call.receiver);
        if call.safe {
            self.write("?.");
        } else if call.spread_safe {
            self.write("*.");
        } else {
            self.write(".");
        }
        self.write(&call.name);
        self.arguments(&call.args);
    }

    fn arguments(&mut self, args: &[Expression]) {
        self.write("(");
        self.comma_separated(args);
        self.write(")");
    }

    fn comma_separated(&mut self, items: &[Expression]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expression(item);
        }
    }

    fn map(&mut self, entries: &[MapEntry]) {
        if entries.is_empty() {
            self.write("[:]");
            return;
        }
        self.write("[");
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            match entry.key.as_string_literal() {
                Some(key) => self.write(key),
                None => {
                    self.write("(");
                    self.expression(&entry.key);
                    self.write(")");
                }
            }
            self.write(": ");
            self.expression(&entry.value);
        }
        self.write("]");
    }

    fn closure(&mut self, closure: &ClosureExpr) {
        self.write("{ ");
        for (i, param) in closure.params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(&param.name);
        }
        if !closure.params.is_empty() {
            self.write(" ");
        }
        self.write("->");
        if !closure.body.statements.is_empty() {
            self.write(" ");
            self.statements(&closure.body.statements);
        }
        self.write(" }");
    }

    /// Receivers of `.`, `[` need parentheses unless they are atoms or calls.
    fn receiver(&mut self, expr: &Expression) {
        let needs_parens = match &expr.kind {
            ExpressionKind::Binary(bin) => bin.op.is_assignment(),
            ExpressionKind::Ternary(..)
            | ExpressionKind::Declaration(_)
            | ExpressionKind::Cast(..)
            | ExpressionKind::Unary(..)
            | ExpressionKind::Block(_) => true,
            _ => false,
        };
        self.parenthesized_if(needs_parens, expr);
    }

    fn operand(&mut self, expr: &Expression) {
        let needs_parens = match &expr.kind {
            ExpressionKind::Binary(bin) => bin.op.is_assignment(),
            ExpressionKind::Ternary(..) | ExpressionKind::Declaration(_) => true,
            _ => false,
        };
        self.parenthesized_if(needs_parens, expr);
    }

    fn parenthesized_if(&mut self, parens: bool, expr: &Expression) {
        if parens {
            self.write("(");
        }
        self.expression(expr);
        if parens {
            self.write(")");
        }
    }

    pub fn block(&mut self, block: &Block) {
        if block.statements.is_empty() {
            self.write("{ }");
            return;
        }
        self.write("{ ");
        self.statements(&block.statements);
        self.write(" }");
    }

    fn statements(&mut self, statements: &[Statement]) {
        for (i, stmt) in statements.iter().enumerate() {
            if i > 0 {
                self.write("; ");
            }
            self.statement(stmt);
        }
    }

    pub fn statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Expression(expr) => self.expression(expr),
            Statement::Block(block) => self.block(block),
            Statement::Return(value, _) => {
                self.write("return");
                if let Some(value) = value {
                    self.write(" ");
                    self.expression(value);
                }
            }
            Statement::If(if_stmt) => {
                self.write("if (");
                self.expression(&if_stmt.condition);
                self.write(") ");
                self.block(&if_stmt.then_block);
                if let Some(else_block) = &if_stmt.else_block {
                    self.write(" else ");
                    self.block(else_block);
                }
            }
            Statement::While(while_stmt) => {
                self.write("while (");
                self.expression(&while_stmt.condition);
                self.write(") ");
                self.block(&while_stmt.body);
            }
            Statement::ForIn(for_stmt) => {
                self.write("for (");
                self.write(&for_stmt.variable.name);
                self.write(" in ");
                self.expression(&for_stmt.iterable);
                self.write(") ");
                self.block(&for_stmt.body);
            }
            Statement::Throw(expr) => {
                self.write("throw ");
                self.expression(expr);
            }
        }
    }
}
