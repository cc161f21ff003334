//! Tree evaluator for checking that rewrites preserve behavior.
//!
//! Runs annotated trees, both before and after the rewrite pass, with dynamic
//! semantics close to the source language: safe calls short-circuit on
//! `null`, operators with a resolved method dispatch to it, comparisons
//! through the bytecode adapter order values the way the runtime does.
//! Every method invocation is recorded in a call log so tests can assert
//! that an expression was evaluated exactly once.

use anyhow::{anyhow, bail, Result};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use statica_core::ast::{
    BinaryExpr, BinaryOp, Block, ClosureExpr, Expression, ExpressionKind, Literal, MethodCall,
    MethodNode, Statement, UnaryOp,
};
use statica_core::types::{PrimitiveKind, TypeId, TypeKind, TypeTable};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Field values of an object instance.
#[derive(Debug)]
pub struct Instance {
    pub class: TypeId,
    pub fields: IndexMap<String, Value>,
}

pub struct ClosureValue {
    params: Vec<String>,
    body: Block,
    env: Env,
}

impl fmt::Debug for ClosureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Closure({} param(s))", self.params.len())
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(f64),
    Str(String),
    List(Rc<RefCell<Vec<Value>>>),
    Array(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<IndexMap<String, Value>>>),
    Object(Rc<RefCell<Instance>>),
    Closure(Rc<ClosureValue>),
    Class(TypeId),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Field of an object instance, if this is one.
    pub fn field(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(instance) => instance.borrow().fields.get(name).cloned(),
            _ => None,
        }
    }

    pub fn class_of_instance(&self) -> Option<TypeId> {
        match self {
            Value::Object(instance) => Some(instance.borrow().class),
            _ => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "Boolean",
            Value::Int(_) => "Integer",
            Value::Decimal(_) => "BigDecimal",
            Value::Str(_) => "String",
            Value::List(_) => "List",
            Value::Array(_) => "Array",
            Value::Map(_) => "Map",
            Value::Object(_) => "Object",
            Value::Closure(_) => "Closure",
            Value::Class(_) => "Class",
        }
    }

    /// Source-language truth: null, false, zero and empty values are false.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Decimal(d) => *d != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) | Value::Array(items) => !items.borrow().is_empty(),
            Value::Map(entries) => !entries.borrow().is_empty(),
            Value::Object(_) | Value::Closure(_) | Value::Class(_) => true,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) | Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "[")?;
                for (i, (key, value)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}:{}", key, value)?;
                }
                write!(f, "]")
            }
            Value::Object(instance) => write!(f, "Object#{:?}", instance.borrow().class),
            Value::Closure(closure) => write!(f, "{:?}", closure),
            Value::Class(ty) => write!(f, "Class#{:?}", ty),
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Int(a), Value::Decimal(b)) | (Value::Decimal(b), Value::Int(a)) => {
            (*a as f64) == *b
        }
        (Value::Decimal(a), Value::Decimal(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b)) | (Value::Array(a), Value::Array(b)) => {
            Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
        }
        (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
        (Value::Object(a), Value::Object(b)) => {
            if Rc::ptr_eq(a, b) {
                return true;
            }
            let (a, b) = (a.borrow(), b.borrow());
            a.class == b.class && a.fields == b.fields
        }
        (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
        (Value::Class(a), Value::Class(b)) => a == b,
        _ => false,
    }
}

type NativeMethod = Rc<dyn Fn(&Value, &[Value]) -> Result<Value>>;

#[derive(Default)]
struct Scope {
    vars: FxHashMap<String, Value>,
    parent: Option<Env>,
}

type Env = Rc<RefCell<Scope>>;

fn child_of(parent: &Env) -> Env {
    Rc::new(RefCell::new(Scope {
        vars: FxHashMap::default(),
        parent: Some(Rc::clone(parent)),
    }))
}

enum Flow {
    Normal(Option<Value>),
    Return(Value),
}

enum Place {
    Variable(String),
    Property(Value, String),
    Element(Value, Value),
}

pub struct Evaluator<'t> {
    types: &'t TypeTable,
    natives: FxHashMap<String, NativeMethod>,
    call_log: Vec<String>,
    env: Env,
    this: Value,
}

impl<'t> Evaluator<'t> {
    pub fn new(types: &'t TypeTable) -> Self {
        Self {
            types,
            natives: FxHashMap::default(),
            call_log: Vec::new(),
            env: Rc::new(RefCell::new(Scope::default())),
            this: Value::Null,
        }
    }

    /// Register a method by name. Static methods use `Owner.name`; instance
    /// methods use the bare name and apply to every receiver.
    pub fn register_native<F>(&mut self, key: &str, method: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + 'static,
    {
        self.natives.insert(key.to_string(), Rc::new(method));
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.env.borrow_mut().vars.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        lookup(&self.env, name)
    }

    pub fn set_this(&mut self, value: Value) {
        self.this = value;
    }

    /// Names of every method invoked so far, in order.
    pub fn call_log(&self) -> &[String] {
        &self.call_log
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.call_log.iter().filter(|n| n.as_str() == name).count()
    }

    pub fn clear_call_log(&mut self) {
        self.call_log.clear();
    }

    /// Fresh instance of `class` with every declared field at its default.
    pub fn instantiate(&self, class: TypeId) -> Value {
        let mut fields = IndexMap::new();
        let mut current = Some(class);
        let mut chain = Vec::new();
        while let Some(ty) = current {
            let Some(info) = self.types.class_info(ty) else {
                break;
            };
            chain.push(ty);
            current = info.superclass;
        }
        for ty in chain.into_iter().rev() {
            if let Some(info) = self.types.class_info(ty) {
                for (name, field_type) in &info.fields {
                    fields.insert(name.clone(), self.default_value(*field_type));
                }
            }
        }
        Value::Object(Rc::new(RefCell::new(Instance { class, fields })))
    }

    fn default_value(&self, ty: TypeId) -> Value {
        match self.types.get(ty).kind {
            TypeKind::Primitive(PrimitiveKind::Boolean) => Value::Bool(false),
            TypeKind::Primitive(PrimitiveKind::Float | PrimitiveKind::Double) => {
                Value::Decimal(0.0)
            }
            TypeKind::Primitive(PrimitiveKind::Void) => Value::Null,
            TypeKind::Primitive(_) => Value::Int(0),
            _ => Value::Null,
        }
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    pub fn evaluate(&mut self, expr: &Expression) -> Result<Value> {
        match &expr.kind {
            ExpressionKind::Literal(literal) => Ok(match literal {
                Literal::Null => Value::Null,
                Literal::Boolean(b) => Value::Bool(*b),
                Literal::Integer(n) => Value::Int(*n),
                Literal::Decimal(d) => Value::Decimal(*d),
                Literal::String(s) => Value::Str(s.clone()),
            }),
            ExpressionKind::Variable(var) => lookup(&self.env, &var.name)
                .ok_or_else(|| anyhow!("No such property: {}", var.name)),
            ExpressionKind::This => Ok(self.this.clone()),
            ExpressionKind::ClassRef(ty) => Ok(Value::Class(*ty)),
            ExpressionKind::Property(receiver, name) => {
                let receiver = self.evaluate(receiver)?;
                self.read_place(&Place::Property(receiver, name.clone()))
            }
            ExpressionKind::MethodCall(call) => self.method_call(call),
            ExpressionKind::StaticCall(call) => {
                let args = self.evaluate_all(&call.args)?;
                self.invoke(Value::Class(call.owner), &call.name, args)
            }
            ExpressionKind::ConstructorCall(call) => {
                let args = self.evaluate_all(&call.args)?;
                self.construct(call.ty, args)
            }
            ExpressionKind::Binary(bin) => self.binary(bin, expr),
            ExpressionKind::Ternary(condition, then_expr, else_expr) => {
                if self.evaluate(condition)?.truthy() {
                    self.evaluate(then_expr)
                } else {
                    self.evaluate(else_expr)
                }
            }
            ExpressionKind::Closure(closure) => Ok(self.closure_value(closure)),
            ExpressionKind::Block(block) => {
                let child = child_of(&self.env);
                match self.in_scope(child, |ev| ev.statements(&block.statements))? {
                    Flow::Normal(value) => Ok(value.unwrap_or(Value::Null)),
                    Flow::Return(_) => bail!("return inside a block expression"),
                }
            }
            ExpressionKind::Map(entries) => {
                let mut map = IndexMap::new();
                for entry in entries {
                    let key = self.evaluate(&entry.key)?.to_string();
                    let value = self.evaluate(&entry.value)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(Rc::new(RefCell::new(map))))
            }
            ExpressionKind::List(items) => Ok(Value::list(self.evaluate_all(items)?)),
            ExpressionKind::Declaration(decl) => {
                let value = self.evaluate(&decl.initializer)?;
                self.define(&decl.name, value.clone());
                Ok(value)
            }
            ExpressionKind::Cast(_, inner) => self.evaluate(inner),
            ExpressionKind::Unary(UnaryOp::Not, operand) => {
                Ok(Value::Bool(!self.evaluate(operand)?.truthy()))
            }
            ExpressionKind::Unary(UnaryOp::Negate, operand) => match self.evaluate(operand)? {
                Value::Int(n) => Ok(Value::Int(-n)),
                Value::Decimal(d) => Ok(Value::Decimal(-d)),
                other => self.invoke(other, "negative", Vec::new()),
            },
        }
    }

    /// Run a block in a child scope. Returns the returned value, or the value
    /// of the last expression statement.
    pub fn execute_block(&mut self, block: &Block) -> Result<Value> {
        let child = child_of(&self.env);
        match self.in_scope(child, |ev| ev.statements(&block.statements))? {
            Flow::Normal(value) => Ok(value.unwrap_or(Value::Null)),
            Flow::Return(value) => Ok(value),
        }
    }

    /// Invoke a method body with `this` bound to `receiver`.
    pub fn call_method(&mut self, method: &MethodNode, receiver: Value, args: Vec<Value>) -> Result<Value> {
        if method.params.len() != args.len() {
            bail!(
                "{}() expects {} argument(s), got {}",
                method.name,
                method.params.len(),
                args.len()
            );
        }
        let scope = child_of(&self.env);
        for (param, arg) in method.params.iter().zip(args) {
            scope.borrow_mut().vars.insert(param.name.clone(), arg);
        }
        let saved_this = std::mem::replace(&mut self.this, receiver);
        let result = self.in_scope(scope, |ev| ev.statements(&method.body.statements));
        self.this = saved_this;
        match result? {
            Flow::Normal(_) => Ok(Value::Null),
            Flow::Return(value) => Ok(value),
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn in_scope<T>(&mut self, scope: Env, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = std::mem::replace(&mut self.env, scope);
        let result = f(self);
        self.env = saved;
        result
    }

    fn statements(&mut self, statements: &[Statement]) -> Result<Flow> {
        let mut last = None;
        for stmt in statements {
            match self.statement(stmt)? {
                Flow::Normal(value) => last = value,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal(last))
    }

    fn statement(&mut self, stmt: &Statement) -> Result<Flow> {
        match stmt {
            Statement::Expression(expr) => Ok(Flow::Normal(Some(self.evaluate(expr)?))),
            Statement::Block(block) => {
                let child = child_of(&self.env);
                self.in_scope(child, |ev| ev.statements(&block.statements))
            }
            Statement::Return(value, _) => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Statement::If(if_stmt) => {
                let branch = if self.evaluate(&if_stmt.condition)?.truthy() {
                    Some(&if_stmt.then_block)
                } else {
                    if_stmt.else_block.as_ref()
                };
                match branch {
                    Some(block) => {
                        let child = child_of(&self.env);
                        self.in_scope(child, |ev| ev.statements(&block.statements))
                    }
                    None => Ok(Flow::Normal(None)),
                }
            }
            Statement::While(while_stmt) => {
                while self.evaluate(&while_stmt.condition)?.truthy() {
                    let child = child_of(&self.env);
                    if let flow @ Flow::Return(_) =
                        self.in_scope(child, |ev| ev.statements(&while_stmt.body.statements))?
                    {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal(None))
            }
            Statement::ForIn(for_stmt) => {
                let items = match self.evaluate(&for_stmt.iterable)? {
                    Value::List(items) | Value::Array(items) => items.borrow().clone(),
                    Value::Map(entries) => entries.borrow().values().cloned().collect(),
                    Value::Null => Vec::new(),
                    other => bail!("Cannot iterate over {}", other.kind_name()),
                };
                for item in items {
                    let child = child_of(&self.env);
                    child
                        .borrow_mut()
                        .vars
                        .insert(for_stmt.variable.name.clone(), item);
                    if let flow @ Flow::Return(_) =
                        self.in_scope(child, |ev| ev.statements(&for_stmt.body.statements))?
                    {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal(None))
            }
            Statement::Throw(expr) => {
                let value = self.evaluate(expr)?;
                bail!("thrown: {}", value)
            }
        }
    }

    // =========================================================================
    // Calls
    // =========================================================================

    fn evaluate_all(&mut self, exprs: &[Expression]) -> Result<Vec<Value>> {
        exprs.iter().map(|expr| self.evaluate(expr)).collect()
    }

    fn method_call(&mut self, call: &MethodCall) -> Result<Value> {
        let receiver = self.evaluate(&call.receiver)?;
        if receiver.is_null() && call.safe {
            return Ok(Value::Null);
        }
        let args = self.evaluate_all(&call.args)?;
        if call.spread_safe {
            let items = match &receiver {
                Value::List(items) | Value::Array(items) => items.borrow().clone(),
                Value::Null => return Ok(Value::Null),
                other => bail!("Cannot spread over {}", other.kind_name()),
            };
            let results = items
                .into_iter()
                .map(|item| self.invoke(item, &call.name, args.clone()))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Value::list(results));
        }
        self.invoke(receiver, &call.name, args)
    }

    fn closure_value(&self, closure: &ClosureExpr) -> Value {
        Value::Closure(Rc::new(ClosureValue {
            params: closure.params.iter().map(|p| p.name.clone()).collect(),
            body: closure.body.clone(),
            env: Rc::clone(&self.env),
        }))
    }

    fn call_closure(&mut self, closure: &ClosureValue, args: Vec<Value>) -> Result<Value> {
        let scope = child_of(&closure.env);
        if closure.params.is_empty() && args.len() <= 1 {
            // implicit `it`
            let it = args.into_iter().next().unwrap_or(Value::Null);
            scope.borrow_mut().vars.insert("it".to_string(), it);
        } else if closure.params.len() == args.len() {
            for (param, arg) in closure.params.iter().zip(args) {
                scope.borrow_mut().vars.insert(param.clone(), arg);
            }
        } else {
            bail!(
                "closure expects {} argument(s), got {}",
                closure.params.len(),
                args.len()
            );
        }
        match self.in_scope(scope, |ev| ev.statements(&closure.body.statements))? {
            Flow::Normal(value) => Ok(value.unwrap_or(Value::Null)),
            Flow::Return(value) => Ok(value),
        }
    }

    /// Dynamic method dispatch. Every invocation is logged.
    pub fn invoke(&mut self, receiver: Value, name: &str, args: Vec<Value>) -> Result<Value> {
        trace!("invoke {}() on {}", name, receiver.kind_name());
        self.call_log.push(name.to_string());

        if let Value::Class(ty) = receiver {
            if ty == self.types.well_known().bytecode_adapter {
                return self.adapter(name, &args);
            }
            let key = format!("{}.{}", self.types.name(ty), name);
            return match self.natives.get(&key).cloned() {
                Some(native) => native(&receiver, &args),
                None => bail!("No static method {}", key),
            };
        }

        if receiver.is_null() {
            bail!("Cannot invoke method {}() on null object", name);
        }

        if let Value::Closure(closure) = &receiver {
            if name == "call" {
                let closure = Rc::clone(closure);
                return self.call_closure(&closure, args);
            }
        }

        if let Some(native) = self.natives.get(name).cloned() {
            return native(&receiver, &args);
        }
        self.builtin(receiver, name, args)
    }

    fn construct(&mut self, ty: TypeId, args: Vec<Value>) -> Result<Value> {
        let key = format!("new {}", self.types.name(ty));
        if let Some(native) = self.natives.get(&key).cloned() {
            self.call_log.push(key);
            return native(&Value::Class(ty), &args);
        }
        let instance = self.instantiate(ty);
        match args.as_slice() {
            [] => Ok(instance),
            [Value::Map(entries)] => {
                for (key, value) in entries.borrow().iter() {
                    self.write_place(
                        &Place::Property(instance.clone(), key.clone()),
                        value.clone(),
                    )?;
                }
                Ok(instance)
            }
            _ => bail!("No constructor of {} for {} argument(s)", self.types.name(ty), args.len()),
        }
    }

    fn adapter(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let [left, right] = args else {
            bail!("{}() expects two arguments", name);
        };
        let result = match name {
            "compareEqual" => Value::Bool(values_equal(left, right)),
            "compareNotEqual" => Value::Bool(!values_equal(left, right)),
            "compareLessThan" => Value::Bool(self.compare(left, right)? == Ordering::Less),
            "compareLessThanEqual" => {
                Value::Bool(self.compare(left, right)? != Ordering::Greater)
            }
            "compareGreaterThan" => Value::Bool(self.compare(left, right)? == Ordering::Greater),
            "compareGreaterThanEqual" => {
                Value::Bool(self.compare(left, right)? != Ordering::Less)
            }
            "compareTo" => Value::Int(ordering_to_int(self.compare(left, right)?)),
            other => bail!("Unknown adapter method {}", other),
        };
        Ok(result)
    }

    /// Runtime ordering. `null` sorts first; objects use their `compareTo`.
    fn compare(&mut self, left: &Value, right: &Value) -> Result<Ordering> {
        match (left, right) {
            (Value::Null, Value::Null) => Ok(Ordering::Equal),
            (Value::Null, _) => Ok(Ordering::Less),
            (_, Value::Null) => Ok(Ordering::Greater),
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Int(_) | Value::Decimal(_), Value::Int(_) | Value::Decimal(_)) => {
                let (a, b) = (as_f64(left)?, as_f64(right)?);
                a.partial_cmp(&b).ok_or_else(|| anyhow!("NaN is not ordered"))
            }
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
            _ => match self.invoke(left.clone(), "compareTo", vec![right.clone()])? {
                Value::Int(n) => Ok(n.cmp(&0)),
                other => bail!("compareTo returned {}", other.kind_name()),
            },
        }
    }

    // =========================================================================
    // Operators
    // =========================================================================

    fn binary(&mut self, bin: &BinaryExpr, expr: &Expression) -> Result<Value> {
        let target_name = expr.meta.binary_target.as_ref().map(|t| t.name.clone());
        match bin.op {
            BinaryOp::Assign => {
                let place = self.place(&bin.left)?;
                let value = self.evaluate(&bin.right)?;
                self.write_place(&place, value.clone())?;
                Ok(value)
            }
            op if op.is_compound_assignment() => {
                let place = self.place(&bin.left)?;
                let current = self.read_place(&place)?;
                let rhs = self.evaluate(&bin.right)?;
                let value = match target_name {
                    Some(name) => self.invoke(current, &name, vec![rhs])?,
                    None => {
                        let base = base_operator(op)
                            .ok_or_else(|| anyhow!("no base operator for {}", op.symbol()))?;
                        self.arithmetic(base, current, rhs)?
                    }
                };
                self.write_place(&place, value.clone())?;
                Ok(value)
            }
            BinaryOp::And => {
                let left = self.evaluate(&bin.left)?;
                if !left.truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.evaluate(&bin.right)?.truthy()))
            }
            BinaryOp::Or => {
                let left = self.evaluate(&bin.left)?;
                if left.truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.evaluate(&bin.right)?.truthy()))
            }
            BinaryOp::Index => {
                let receiver = self.evaluate(&bin.left)?;
                let index = self.evaluate(&bin.right)?;
                self.read_place(&Place::Element(receiver, index))
            }
            op => {
                let left = self.evaluate(&bin.left)?;
                let right = self.evaluate(&bin.right)?;
                match target_name {
                    Some(name) => {
                        let result = self.invoke(left, &name, vec![right])?;
                        Ok(comparison_result(op, result))
                    }
                    None if op.is_comparison() => self.builtin_comparison(op, &left, &right),
                    None => self.arithmetic(op, left, right),
                }
            }
        }
    }

    fn builtin_comparison(&mut self, op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
        Ok(match op {
            BinaryOp::Equal => Value::Bool(values_equal(left, right)),
            BinaryOp::NotEqual => Value::Bool(!values_equal(left, right)),
            BinaryOp::Compare => Value::Int(ordering_to_int(self.compare(left, right)?)),
            _ => {
                let ordering = self.compare(left, right)?;
                Value::Bool(ordering_matches(op, ordering))
            }
        })
    }

    fn arithmetic(&mut self, op: BinaryOp, left: Value, right: Value) -> Result<Value> {
        let name = match op {
            BinaryOp::Plus => "plus",
            BinaryOp::Minus => "minus",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Power => "power",
            BinaryOp::LeftShift => "leftShift",
            BinaryOp::RightShift => "rightShift",
            BinaryOp::UnsignedRightShift => "rightShiftUnsigned",
            BinaryOp::BitAnd => "and",
            BinaryOp::BitOr => "or",
            BinaryOp::Xor => "xor",
            other => bail!("operator {} is not arithmetic", other.symbol()),
        };
        self.builtin(left, name, vec![right])
    }

    // =========================================================================
    // Places
    // =========================================================================

    fn place(&mut self, target: &Expression) -> Result<Place> {
        match &target.kind {
            ExpressionKind::Variable(var) => Ok(Place::Variable(var.name.clone())),
            ExpressionKind::Property(receiver, name) => {
                let receiver = self.evaluate(receiver)?;
                Ok(Place::Property(receiver, name.clone()))
            }
            ExpressionKind::Binary(bin) if bin.op == BinaryOp::Index => {
                let receiver = self.evaluate(&bin.left)?;
                let index = self.evaluate(&bin.right)?;
                Ok(Place::Element(receiver, index))
            }
            _ => bail!("expression is not assignable"),
        }
    }

    fn read_place(&mut self, place: &Place) -> Result<Value> {
        match place {
            Place::Variable(name) => {
                lookup(&self.env, name).ok_or_else(|| anyhow!("No such property: {}", name))
            }
            Place::Property(receiver, name) => match receiver {
                Value::Object(instance) => instance
                    .borrow()
                    .fields
                    .get(name)
                    .cloned()
                    .ok_or_else(|| anyhow!("No such property: {}", name)),
                Value::Map(entries) => Ok(entries.borrow().get(name).cloned().unwrap_or(Value::Null)),
                Value::Array(items) | Value::List(items) if name == "length" || name == "size" => {
                    Ok(Value::Int(items.borrow().len() as i64))
                }
                Value::Str(s) if name == "length" => Ok(Value::Int(s.chars().count() as i64)),
                Value::Null => bail!("Cannot get property '{}' on null object", name),
                other => bail!("No such property: {} for {}", name, other.kind_name()),
            },
            Place::Element(receiver, index) => match receiver {
                Value::Array(items) | Value::List(items) => {
                    let items = items.borrow();
                    let i = element_index(index, items.len())?;
                    Ok(items.get(i).cloned().unwrap_or(Value::Null))
                }
                Value::Map(entries) => Ok(entries
                    .borrow()
                    .get(&index.to_string())
                    .cloned()
                    .unwrap_or(Value::Null)),
                Value::Str(s) => {
                    let chars: Vec<char> = s.chars().collect();
                    let i = element_index(index, chars.len())?;
                    chars
                        .get(i)
                        .map(|c| Value::Str(c.to_string()))
                        .ok_or_else(|| anyhow!("String index out of range: {}", index))
                }
                Value::Null => bail!("Cannot get element of null object"),
                other => bail!("Cannot index {}", other.kind_name()),
            },
        }
    }

    fn write_place(&mut self, place: &Place, value: Value) -> Result<()> {
        match place {
            Place::Variable(name) => {
                assign(&self.env, name, value);
                Ok(())
            }
            Place::Property(receiver, name) => match receiver {
                Value::Object(instance) => {
                    let mut instance = instance.borrow_mut();
                    let class = instance.class;
                    match instance.fields.get_mut(name) {
                        Some(slot) => {
                            *slot = value;
                            Ok(())
                        }
                        None => bail!(
                            "No such property: {} for class {}",
                            name,
                            self.types.name(class)
                        ),
                    }
                }
                Value::Map(entries) => {
                    entries.borrow_mut().insert(name.clone(), value);
                    Ok(())
                }
                Value::Null => bail!("Cannot set property '{}' on null object", name),
                other => bail!("Cannot set property {} on {}", name, other.kind_name()),
            },
            Place::Element(receiver, index) => match receiver {
                Value::Array(items) => {
                    let mut items = items.borrow_mut();
                    let i = element_index(index, items.len())?;
                    match items.get_mut(i) {
                        Some(slot) => {
                            *slot = value;
                            Ok(())
                        }
                        None => bail!("Array index out of bounds: {}", index),
                    }
                }
                Value::List(items) => {
                    let mut items = items.borrow_mut();
                    let i = element_index(index, items.len())?;
                    if i >= items.len() {
                        items.resize(i + 1, Value::Null);
                    }
                    items[i] = value;
                    Ok(())
                }
                Value::Map(entries) => {
                    entries.borrow_mut().insert(index.to_string(), value);
                    Ok(())
                }
                Value::Null => bail!("Cannot set element of null object"),
                other => bail!("Cannot index {}", other.kind_name()),
            },
        }
    }

    // =========================================================================
    // Built-in methods
    // =========================================================================

    fn builtin(&mut self, receiver: Value, name: &str, args: Vec<Value>) -> Result<Value> {
        match (&receiver, name, args.as_slice()) {
            (_, "equals", [other]) => Ok(Value::Bool(values_equal(&receiver, other))),
            (_, "toString", []) => Ok(Value::Str(receiver.to_string())),
            (Value::Int(_) | Value::Decimal(_), _, [other]) => numeric(name, &receiver, other),
            (Value::Int(n), "negative", []) => Ok(Value::Int(-n)),
            (Value::Decimal(d), "negative", []) => Ok(Value::Decimal(-d)),
            (Value::Str(s), "plus", [other]) => Ok(Value::Str(format!("{}{}", s, other))),
            (Value::Str(s), "size" | "length", []) => Ok(Value::Int(s.chars().count() as i64)),
            (Value::Str(s), "trim", []) => Ok(Value::Str(s.trim().to_string())),
            (Value::Str(s), "toUpperCase", []) => Ok(Value::Str(s.to_uppercase())),
            (Value::Str(s), "compareTo", [Value::Str(other)]) => {
                Ok(Value::Int(ordering_to_int(s.as_str().cmp(other.as_str()))))
            }
            (Value::List(items) | Value::Array(items), "size", []) => {
                Ok(Value::Int(items.borrow().len() as i64))
            }
            (Value::List(items), "add", [item]) => {
                items.borrow_mut().push(item.clone());
                Ok(Value::Bool(true))
            }
            (Value::List(items), "plus", [item]) => {
                let mut copy = items.borrow().clone();
                copy.push(item.clone());
                Ok(Value::list(copy))
            }
            (Value::Map(entries), "size", []) => Ok(Value::Int(entries.borrow().len() as i64)),
            (Value::Map(entries), "containsKey", [key]) => {
                Ok(Value::Bool(entries.borrow().contains_key(&key.to_string())))
            }
            (Value::Map(_) | Value::List(_) | Value::Array(_) | Value::Str(_), "getAt" | "get", [index]) => {
                self.read_place(&Place::Element(receiver.clone(), index.clone()))
            }
            (Value::Map(_) | Value::List(_) | Value::Array(_), "putAt" | "put", [index, value]) => {
                self.write_place(&Place::Element(receiver.clone(), index.clone()), value.clone())?;
                Ok(value.clone())
            }
            _ => bail!(
                "No signature of method: {}.{}() for {} argument(s)",
                receiver.kind_name(),
                name,
                args.len()
            ),
        }
    }
}

fn numeric(name: &str, left: &Value, right: &Value) -> Result<Value> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        let (a, b) = (*a, *b);
        return Ok(match name {
            "plus" => Value::Int(a.wrapping_add(b)),
            "minus" => Value::Int(a.wrapping_sub(b)),
            "multiply" => Value::Int(a.wrapping_mul(b)),
            "div" if b == 0 => bail!("Division by zero"),
            "div" if a % b == 0 => Value::Int(a / b),
            "div" => Value::Decimal(a as f64 / b as f64),
            "mod" if b == 0 => bail!("Division by zero"),
            "mod" => Value::Int(a.rem_euclid(b)),
            "power" => match u32::try_from(b) {
                Ok(exp) => Value::Int(a.wrapping_pow(exp)),
                Err(_) => Value::Decimal((a as f64).powf(b as f64)),
            },
            "leftShift" => Value::Int(a.wrapping_shl(b as u32)),
            "rightShift" => Value::Int(a.wrapping_shr(b as u32)),
            "rightShiftUnsigned" => Value::Int(((a as u64).wrapping_shr(b as u32)) as i64),
            "and" => Value::Int(a & b),
            "or" => Value::Int(a | b),
            "xor" => Value::Int(a ^ b),
            "compareTo" => Value::Int(ordering_to_int(a.cmp(&b))),
            other => bail!("No signature of method: Integer.{}()", other),
        });
    }
    let (a, b) = (as_f64(left)?, as_f64(right)?);
    Ok(match name {
        "plus" => Value::Decimal(a + b),
        "minus" => Value::Decimal(a - b),
        "multiply" => Value::Decimal(a * b),
        "div" => Value::Decimal(a / b),
        "mod" => Value::Decimal(a % b),
        "power" => Value::Decimal(a.powf(b)),
        "compareTo" => match a.partial_cmp(&b) {
            Some(ordering) => Value::Int(ordering_to_int(ordering)),
            None => bail!("NaN is not ordered"),
        },
        other => bail!("No signature of method: BigDecimal.{}()", other),
    })
}

fn as_f64(value: &Value) -> Result<f64> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Decimal(d) => Ok(*d),
        other => bail!("{} is not a number", other.kind_name()),
    }
}

fn element_index(index: &Value, len: usize) -> Result<usize> {
    let Value::Int(i) = index else {
        bail!("index must be an integer, got {}", index.kind_name());
    };
    let i = if *i < 0 { *i + len as i64 } else { *i };
    usize::try_from(i).map_err(|_| anyhow!("index {} out of range", index))
}

fn ordering_to_int(ordering: Ordering) -> i64 {
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

fn ordering_matches(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::LessThan => ordering == Ordering::Less,
        BinaryOp::LessThanEqual => ordering != Ordering::Greater,
        BinaryOp::GreaterThan => ordering == Ordering::Greater,
        BinaryOp::GreaterThanEqual => ordering != Ordering::Less,
        BinaryOp::Equal => ordering == Ordering::Equal,
        BinaryOp::NotEqual => ordering != Ordering::Equal,
        _ => false,
    }
}

/// Value of a comparison operator whose resolved method returned `result`:
/// a `compareTo` result is turned into the operator's boolean.
fn comparison_result(op: BinaryOp, result: Value) -> Value {
    match (op, &result) {
        (BinaryOp::Compare, _) => result,
        (op, Value::Int(n)) if op.is_comparison() => Value::Bool(ordering_matches(op, n.cmp(&0))),
        _ => result,
    }
}

fn base_operator(op: BinaryOp) -> Option<BinaryOp> {
    Some(match op {
        BinaryOp::PlusAssign => BinaryOp::Plus,
        BinaryOp::MinusAssign => BinaryOp::Minus,
        BinaryOp::MultiplyAssign => BinaryOp::Multiply,
        BinaryOp::DivideAssign => BinaryOp::Divide,
        BinaryOp::ModAssign => BinaryOp::Mod,
        BinaryOp::PowerAssign => BinaryOp::Power,
        BinaryOp::LeftShiftAssign => BinaryOp::LeftShift,
        BinaryOp::RightShiftAssign => BinaryOp::RightShift,
        BinaryOp::UnsignedRightShiftAssign => BinaryOp::UnsignedRightShift,
        BinaryOp::BitAndAssign => BinaryOp::BitAnd,
        BinaryOp::BitOrAssign => BinaryOp::BitOr,
        BinaryOp::XorAssign => BinaryOp::Xor,
        _ => return None,
    })
}

fn lookup(env: &Env, name: &str) -> Option<Value> {
    let scope = env.borrow();
    match scope.vars.get(name) {
        Some(value) => Some(value.clone()),
        None => scope.parent.as_ref().and_then(|parent| lookup(parent, name)),
    }
}

/// Assign to the nearest scope that has `name`, or define it locally.
fn assign(env: &Env, name: &str, value: Value) {
    let mut current = Some(Rc::clone(env));
    while let Some(scope) = current {
        if let Some(slot) = scope.borrow_mut().vars.get_mut(name) {
            *slot = value;
            return;
        }
        current = scope.borrow().parent.clone();
    }
    env.borrow_mut().vars.insert(name.to_string(), value);
}
