//! Unit dispatch: which nodes the pass accepts, how it walks declarations
//! and statements, and what it reports for nodes it cannot handle.

use statica_core::ast::pretty::print_block;
use statica_core::ast::{
    AnnotatedNode, BinaryOp, CallTarget, ClassNode, FieldNode, ForInStatement, IfStatement,
    MethodNode, Parameter, Span, Statement, WhileStatement,
};
use statica_core::diagnostics::DiagnosticLevel;
use statica_core::errors::RewriteError;
use statica_core::types::{ParamInfo, TypeTable};
use statica_test_helpers::builders::*;
use statica_test_helpers::rewrite::rewrite_node;
use statica_test_helpers::{init_tracing, Evaluator, Value};

fn unwrap_class(output: Result<AnnotatedNode, RewriteError>) -> ClassNode {
    match output {
        Ok(AnnotatedNode::Class(class)) => class,
        other => panic!("expected rewritten class, got {:?}", other),
    }
}

fn unwrap_method(output: Result<AnnotatedNode, RewriteError>) -> MethodNode {
    match output {
        Ok(AnnotatedNode::Method(method)) => method,
        other => panic!("expected rewritten method, got {:?}", other),
    }
}

#[test]
fn test_field_unit_is_reported_once_and_rejected() {
    init_tracing();
    let types = TypeTable::new();
    let wk = *types.well_known();
    let field = FieldNode {
        name: "count".to_string(),
        ty: wk.int,
        initializer: Some(int(0)),
        span: Span::new(3, 5),
    };

    let run = rewrite_node(&types, AnnotatedNode::Field(field));
    let err = run.output.unwrap_err();
    assert!(matches!(
        err,
        RewriteError::UnsupportedNode {
            kind: "field",
            line: 3,
            column: 5
        }
    ));
    assert_eq!(
        err.to_string(),
        "[Static type checking] - Unimplemented node type: field at 3:5"
    );

    let [diagnostic] = run.diagnostics.as_slice() else {
        panic!("expected exactly one diagnostic, got {:?}", run.diagnostics);
    };
    assert_eq!(diagnostic.level, DiagnosticLevel::Error);
    assert_eq!(diagnostic.message, "[Static type checking] - Unimplemented node type");
    assert_eq!(diagnostic.span, Span::new(3, 5));
    assert_eq!(run.stats.total(), 0);
}

#[test]
fn test_class_members_are_all_rewritten() {
    let mut types = TypeTable::new();
    let wk = *types.well_known();
    let math = types.declare_class("MathUtil");
    let max = types.declare_method(
        math,
        "max",
        vec![ParamInfo::new("a", wk.int), ParamInfo::new("b", wk.int)],
        wk.int,
        true,
    );
    let service = types.declare_class("Service");
    types.declare_field(service, "limit", wk.int);

    let mut class = ClassNode::new(service, Span::new(1, 1));
    class.fields.push(FieldNode {
        name: "limit".to_string(),
        ty: wk.int,
        initializer: Some(
            static_call(math, "max", vec![int(1), int(2)]).with_call_target(CallTarget::Method(max)),
        ),
        span: Span::new(2, 5),
    });
    class.constructors.push(method(
        "<init>",
        service,
        vec![expr_stmt(safe_call(var("config", None), "load", vec![]))],
    ));
    class.methods.push(method(
        "describe",
        service,
        vec![ret(safe_call(var("name", Some(wk.string)), "trim", vec![]))],
    ));

    let run = rewrite_node(&types, AnnotatedNode::Class(class));
    let class = unwrap_class(run.output);
    assert!(run.diagnostics.is_empty());

    let init = class.fields[0].initializer.as_ref().unwrap();
    assert_eq!(
        statica_core::ast::pretty::print_expression(init, &types),
        "MathUtil.max(1, 2)"
    );
    assert_eq!(
        print_block(&class.constructors[0].body, &types),
        "{ (config != null) ? config.load() : null }"
    );
    assert_eq!(
        print_block(&class.methods[0].body, &types),
        "{ return (name != null) ? name.trim() : null }"
    );
    assert_eq!(run.stats.static_calls, 1);
    assert_eq!(run.stats.safe_navigation, 2);
}

#[test]
fn test_inner_class_uses_its_own_declaring_type() {
    let mut types = TypeTable::new();
    let wk = *types.well_known();
    let strings = types.array_of(wk.string);
    let outer = types.declare_class("Outer");
    let inner = types.declare_class("Outer$Inner");
    types.declare_field(inner, "names", strings);

    let first = || ret(call(property(this(), "names"), "getAt", vec![int(0)]));
    let mut inner_class = ClassNode::new(inner, Span::new(4, 5));
    inner_class.methods.push(method("first", inner, vec![first()]));
    let mut outer_class = ClassNode::new(outer, Span::new(1, 1));
    outer_class.methods.push(method("first", outer, vec![first()]));
    outer_class.inner_classes.push(inner_class);

    let run = rewrite_node(&types, AnnotatedNode::Class(outer_class));
    let class = unwrap_class(run.output);

    // `Outer` has no `names` field, so the receiver type is unknown there.
    assert_eq!(
        print_block(&class.methods[0].body, &types),
        "{ return this.names.getAt(0) }"
    );
    assert_eq!(
        print_block(&class.inner_classes[0].methods[0].body, &types),
        "{ return this.names[0] }"
    );
    assert_eq!(run.stats.array_accesses, 1);
}

#[test]
fn test_method_unit_walks_every_statement_kind() {
    let mut types = TypeTable::new();
    let wk = *types.well_known();
    let plus = types.declare_method(wk.integer, "plus", vec![ParamInfo::new("n", wk.int)], wk.int, false);
    let compare_to =
        types.declare_method(wk.integer, "compareTo", vec![ParamInfo::new("n", wk.int)], wk.int, false);
    let math = types.declare_class("MathUtil");
    let fail = types.declare_method(math, "fail", vec![ParamInfo::new("x", wk.object)], wk.object, true);
    let strings = types.array_of(wk.string);
    let worker = types.declare_class("Worker");

    let body = vec![
        Statement::While(WhileStatement {
            condition: operator(
                BinaryOp::LessThan,
                var("i", Some(wk.int)),
                var("n", Some(wk.int)),
                compare_to,
                "compareTo",
            ),
            body: block(vec![expr_stmt(operator(
                BinaryOp::PlusAssign,
                var("i", Some(wk.int)),
                int(1),
                plus,
                "plus",
            ))]),
        }),
        Statement::ForIn(ForInStatement {
            variable: Parameter::new("x", None),
            iterable: safe_call(var("xs", None), "items", vec![]),
            body: block(vec![Statement::Throw(
                static_call(math, "fail", vec![var("x", None)])
                    .with_call_target(CallTarget::Method(fail)),
            )]),
        }),
        Statement::If(IfStatement {
            condition: var("flag", Some(wk.boolean)),
            then_block: block(vec![ret(call(var("arr", Some(strings)), "getAt", vec![int(0)]))]),
            else_block: Some(block(vec![ret(null())])),
        }),
    ];
    let node = method("work", worker, body);

    let run = rewrite_node(&types, AnnotatedNode::Method(node));
    let method = unwrap_method(run.output);
    assert_eq!(
        print_block(&method.body, &types),
        "{ while (BytecodeAdapter.compareLessThan(i, n)) { i = i.plus(1) }; \
         for (x in (xs != null) ? xs.items() : null) { throw MathUtil.fail(x) }; \
         if (flag) { return arr[0] } else { return null } }"
    );
    assert_eq!(run.stats.comparisons, 1);
    assert_eq!(run.stats.compound_assignments, 1);
    assert_eq!(run.stats.safe_navigation, 1);
    assert_eq!(run.stats.static_calls, 1);
    assert_eq!(run.stats.array_accesses, 1);
    assert_eq!(run.stats.total(), 5);
}

#[test]
fn test_rewritten_method_computes_the_same_result() {
    let mut types = TypeTable::new();
    let wk = *types.well_known();
    let plus = types.declare_method(wk.integer, "plus", vec![ParamInfo::new("n", wk.int)], wk.int, false);
    let compare_to =
        types.declare_method(wk.integer, "compareTo", vec![ParamInfo::new("n", wk.int)], wk.int, false);
    let calculator = types.declare_class("Calculator");

    let body = vec![
        expr_stmt(declare("i", Some(wk.int), int(0))),
        expr_stmt(declare("total", Some(wk.int), int(0))),
        Statement::While(WhileStatement {
            condition: operator(
                BinaryOp::LessThan,
                var("i", Some(wk.int)),
                var("n", Some(wk.int)),
                compare_to,
                "compareTo",
            ),
            body: block(vec![
                expr_stmt(operator(BinaryOp::PlusAssign, var("i", Some(wk.int)), int(1), plus, "plus")),
                expr_stmt(operator(
                    BinaryOp::PlusAssign,
                    var("total", Some(wk.int)),
                    var("i", Some(wk.int)),
                    plus,
                    "plus",
                )),
            ]),
        }),
        ret(var("total", Some(wk.int))),
    ];
    let mut original = method("sumTo", calculator, body);
    original.params.push(Parameter::new("n", Some(wk.int)));

    let run = rewrite_node(&types, AnnotatedNode::Method(original.clone()));
    let rewritten = unwrap_method(run.output);
    assert_ne!(rewritten, original);

    for method in [&original, &rewritten] {
        let mut ev = Evaluator::new(&types);
        let this = ev.instantiate(calculator);
        let result = ev.call_method(method, this, vec![Value::Int(4)]).unwrap();
        assert_eq!(result, Value::Int(10));
    }
}

#[test]
fn test_method_without_rewritable_nodes_is_returned_unchanged() {
    let mut types = TypeTable::new();
    let helper = types.declare_class("Helper");
    let node = method(
        "noop",
        helper,
        vec![expr_stmt(assign(var("x", None), int(1))), ret(var("x", None))],
    );

    let run = rewrite_node(&types, AnnotatedNode::Method(node.clone()));
    assert_eq!(unwrap_method(run.output), node);
    assert_eq!(run.stats.total(), 0);
    assert!(run.diagnostics.is_empty());
}
