//! `getAt`/`putAt` on statically-typed arrays become direct indexing.

use statica_core::ast::pretty::{print_block, print_expression};
use statica_core::ast::{AnnotatedNode, BinaryOp, CallTarget, ClassNode, ExpressionKind, Span};
use statica_core::config::RewriteConfig;
use statica_core::types::{ParamInfo, PrimitiveKind, TypeTable};
use statica_test_helpers::builders::*;
use statica_test_helpers::rewrite::{rewrite_expression, rewrite_expression_with, rewrite_node};
use statica_test_helpers::{Evaluator, Value};

#[test]
fn test_get_at_with_integral_index_becomes_indexing() {
    let mut types = TypeTable::new();
    let object = types.well_known().object;
    let string = types.well_known().string;
    let strings = types.array_of(string);
    let original = call(var("arr", Some(strings)), "getAt", vec![int(1)]);

    let out = rewrite_expression(&types, object, original.clone());
    assert_eq!(print_expression(&out, &types), "arr[1]");
    assert_eq!(out.meta.inferred_type, Some(string));

    let mut ev = Evaluator::new(&types);
    ev.define("arr", Value::array(vec![Value::str("a"), Value::str("b")]));
    assert_eq!(ev.evaluate(&out).unwrap(), Value::str("b"));
    assert_eq!(ev.evaluate(&original).unwrap(), Value::str("b"));
}

#[test]
fn test_boxed_integer_index_is_integral() {
    let mut types = TypeTable::new();
    let wk = *types.well_known();
    let ints = types.array_of(wk.int);

    let out = rewrite_expression(
        &types,
        wk.object,
        call(var("arr", Some(ints)), "getAt", vec![var("i", Some(wk.integer))]),
    );
    assert_eq!(print_expression(&out, &types), "arr[i]");
}

#[test]
fn test_get_at_with_string_index_is_left_alone() {
    let mut types = TypeTable::new();
    let object = types.well_known().object;
    let string = types.well_known().string;
    let strings = types.array_of(string);
    let expr = call(var("arr", Some(strings)), "getAt", vec![var("x", Some(string))]);

    let run = rewrite_expression_with(&types, &RewriteConfig::default(), object, expr.clone());
    assert_eq!(run.output, expr);
    assert_eq!(run.stats.array_accesses, 0);
}

#[test]
fn test_get_at_with_unknown_index_type_is_left_alone() {
    let mut types = TypeTable::new();
    let object = types.well_known().object;
    let string = types.well_known().string;
    let strings = types.array_of(string);
    let expr = call(var("arr", Some(strings)), "getAt", vec![var("i", None)]);

    assert_eq!(rewrite_expression(&types, object, expr.clone()), expr);
}

#[test]
fn test_enum_array_accepts_number_index() {
    let mut types = TypeTable::new();
    let wk = *types.well_known();
    let day = types.declare_enum("Day");
    let days = types.array_of(day);

    let out = rewrite_expression(
        &types,
        wk.object,
        call(var("values", Some(days)), "getAt", vec![var("next", Some(wk.number))]),
    );
    assert_eq!(print_expression(&out, &types), "values[next]");
    assert_eq!(out.meta.inferred_type, Some(day));
}

#[test]
fn test_put_at_becomes_indexed_assignment() {
    let mut types = TypeTable::new();
    let object = types.well_known().object;
    let string_type = types.well_known().string;
    let strings = types.array_of(string_type);
    let value = at(string("v"), 2, 17);
    let original = call(var("arr", Some(strings)), "putAt", vec![int(0), value]);

    let out = rewrite_expression(&types, object, original.clone());
    assert_eq!(print_expression(&out, &types), "arr[0] = \"v\"");
    let ExpressionKind::Binary(assignment) = &out.kind else {
        panic!("expected assignment");
    };
    assert_eq!(assignment.op, BinaryOp::Assign);
    assert_eq!(assignment.op_span, Span::new(2, 17));
    assert_eq!(assignment.left.meta.inferred_type, Some(string_type));

    for expr in [&original, &out] {
        let mut ev = Evaluator::new(&types);
        let arr = Value::array(vec![Value::str("a"), Value::str("b")]);
        ev.define("arr", arr.clone());
        ev.evaluate(expr).unwrap();
        assert_eq!(arr, Value::array(vec![Value::str("v"), Value::str("b")]));
    }
}

#[test]
fn test_put_at_with_wrong_arity_is_left_alone() {
    let mut types = TypeTable::new();
    let object = types.well_known().object;
    let string = types.well_known().string;
    let strings = types.array_of(string);
    let expr = call(var("arr", Some(strings)), "putAt", vec![int(0)]);

    assert_eq!(rewrite_expression(&types, object, expr.clone()), expr);
}

#[test]
fn test_put_at_with_number_index_on_enum_array_is_left_alone() {
    let mut types = TypeTable::new();
    let wk = *types.well_known();
    let day = types.declare_enum("Day");
    let days = types.array_of(day);
    let expr = call(
        var("values", Some(days)),
        "putAt",
        vec![var("n", Some(wk.number)), null()],
    );

    assert_eq!(rewrite_expression(&types, wk.object, expr.clone()), expr);
}

#[test]
fn test_get_at_on_list_is_left_alone() {
    let types = TypeTable::new();
    let wk = *types.well_known();
    let expr = call(var("items", Some(wk.list)), "getAt", vec![int(0)]);

    assert_eq!(rewrite_expression(&types, wk.object, expr.clone()), expr);
}

#[test]
fn test_receiver_type_comes_from_declaring_class_field() {
    let mut types = TypeTable::new();
    let string = types.well_known().string;
    let strings = types.array_of(string);
    let holder = types.declare_class("Holder");
    types.declare_field(holder, "names", strings);

    let body = vec![ret(call(property(this(), "names"), "getAt", vec![int(0)]))];
    let mut class = ClassNode::new(holder, span());
    class.methods.push(method("first", holder, body));

    let run = rewrite_node(&types, AnnotatedNode::Class(class));
    let Ok(AnnotatedNode::Class(class)) = run.output else {
        panic!("class rewrite failed: {:?}", run.output);
    };
    assert_eq!(
        print_block(&class.methods[0].body, &types),
        "{ return this.names[0] }"
    );
}

#[test]
fn test_receiver_is_retyped_after_static_call_rewrite() {
    let mut types = TypeTable::new();
    let object = types.well_known().object;
    let int_type = types.primitive(PrimitiveKind::Int);
    let ints = types.array_of(int_type);
    let util = types.declare_class("Util");
    let values = types.declare_method(util, "values", Vec::<ParamInfo>::new(), ints, true);

    let receiver = static_call(util, "values", vec![]).with_call_target(CallTarget::Method(values));
    let out = rewrite_expression(&types, object, call(receiver, "getAt", vec![int(2)]));
    assert_eq!(print_expression(&out, &types), "Util.values()[2]");
    assert_eq!(out.meta.inferred_type, Some(int_type));
}
