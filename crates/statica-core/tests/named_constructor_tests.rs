//! Keyword-argument constructors through a synthesized map constructor.

use statica_core::ast::pretty::print_expression;
use statica_core::ast::{CallTarget, ExpressionKind};
use statica_core::config::{RewriteConfig, Rules};
use statica_core::types::{PrimitiveKind, TypeTable};
use statica_test_helpers::builders::*;
use statica_test_helpers::rewrite::{rewrite_expression, rewrite_expression_with};
use statica_test_helpers::{Evaluator, Value};

#[test]
fn test_point_is_built_by_property_assignment() {
    let mut types = TypeTable::new();
    let point = point_type(&mut types);
    let object = types.well_known().object;
    let original = keyword_new(point.ty, point.map_constructor, vec![("x", int(1)), ("y", int(2))]);

    let out = rewrite_expression(&types, object, original.clone());
    assert_eq!(
        print_expression(&out, &types),
        "{ -> Point obj$0 = new Point(); obj$0.x = 1; obj$0.y = 2; return obj$0 }.call()"
    );

    let mut ev = Evaluator::new(&types);
    let built = ev.evaluate(&out).unwrap();
    assert_eq!(built.class_of_instance(), Some(point.ty));
    assert_eq!(built.field("x"), Some(Value::Int(1)));
    assert_eq!(built.field("y"), Some(Value::Int(2)));
    assert_eq!(built, ev.evaluate(&original).unwrap());
}

#[test]
fn test_blank_instance_uses_default_constructor() {
    let mut types = TypeTable::new();
    let point = point_type(&mut types);
    let object = types.well_known().object;

    let out = rewrite_expression(
        &types,
        object,
        keyword_new(point.ty, point.map_constructor, vec![("x", int(1))]),
    );
    let ExpressionKind::MethodCall(call) = &out.kind else {
        panic!("expected closure call");
    };
    assert_eq!(call.name, "call");
    assert_eq!(out.meta.call_target, Some(CallTarget::ClosureCallNoArg));
    assert_eq!(out.meta.inferred_type, Some(point.ty));
    let ExpressionKind::Closure(closure) = &call.receiver.kind else {
        panic!("expected closure receiver");
    };
    assert!(closure.params.is_empty());
    assert!(closure.scope.is_some());
}

#[test]
fn test_entry_values_are_evaluated_in_source_order() {
    let mut types = TypeTable::new();
    let point = point_type(&mut types);
    let object = types.well_known().object;
    let original = keyword_new(
        point.ty,
        point.map_constructor,
        vec![
            ("y", call(var("gen", None), "second", vec![])),
            ("x", call(var("gen", None), "first", vec![])),
        ],
    );
    let out = rewrite_expression(&types, object, original.clone());

    for expr in [&original, &out] {
        let mut ev = Evaluator::new(&types);
        ev.define("gen", Value::str("generator"));
        ev.register_native("first", |_, _| Ok(Value::Int(10)));
        ev.register_native("second", |_, _| Ok(Value::Int(20)));

        let built = ev.evaluate(expr).unwrap();
        assert_eq!(built.field("x"), Some(Value::Int(10)));
        assert_eq!(built.field("y"), Some(Value::Int(20)));
        let calls: Vec<&str> = ev
            .call_log()
            .iter()
            .map(String::as_str)
            .filter(|name| *name == "first" || *name == "second")
            .collect();
        assert_eq!(calls, vec!["second", "first"]);
    }
}

#[test]
fn test_unknown_property_still_fails_at_runtime() {
    let mut types = TypeTable::new();
    let point = point_type(&mut types);
    let object = types.well_known().object;
    let original = keyword_new(point.ty, point.map_constructor, vec![("z", int(3))]);
    let out = rewrite_expression(&types, object, original.clone());

    for expr in [&original, &out] {
        let mut ev = Evaluator::new(&types);
        let err = ev.evaluate(expr).unwrap_err();
        assert!(
            err.to_string().contains("No such property: z for class Point"),
            "unexpected error: {}",
            err
        );
    }
}

#[test]
fn test_nested_keyword_constructors_get_distinct_locals() {
    let mut types = TypeTable::new();
    let point = point_type(&mut types);
    let object = types.well_known().object;
    let line = types.declare_class("Line");
    types.declare_field(line, "start", point.ty);
    types.declare_field(line, "end", point.ty);
    let line_ctor = types.synthesize_map_constructor(line);

    let original = keyword_new(
        line,
        line_ctor,
        vec![
            (
                "start",
                keyword_new(point.ty, point.map_constructor, vec![("x", int(1)), ("y", int(2))]),
            ),
            (
                "end",
                keyword_new(point.ty, point.map_constructor, vec![("x", int(3)), ("y", int(4))]),
            ),
        ],
    );

    let run = rewrite_expression_with(&types, &RewriteConfig::default(), object, original.clone());
    let printed = print_expression(&run.output, &types);
    assert!(printed.starts_with("{ -> Line obj$2 = new Line(); obj$2.start = { -> Point obj$0"));
    assert!(printed.contains("obj$2.end = { -> Point obj$1 = new Point()"));
    assert!(printed.ends_with("return obj$2 }.call()"));
    assert_eq!(run.stats.named_constructors, 3);
    assert_eq!(run.closure_scopes.len(), 3);
    assert_eq!(run.closure_scopes[2].declared, vec!["obj$2".to_string()]);
    assert!(run.closure_scopes[2].captured.is_empty());

    let mut ev = Evaluator::new(&types);
    let built = ev.evaluate(&run.output).unwrap();
    let end = built.field("end").unwrap();
    assert_eq!(end.class_of_instance(), Some(point.ty));
    assert_eq!(end.field("x"), Some(Value::Int(3)));
    assert_eq!(built, ev.evaluate(&original).unwrap());
}

#[test]
fn test_closure_scope_captures_outer_variables() {
    let mut types = TypeTable::new();
    let point = point_type(&mut types);
    let object = types.well_known().object;
    let int_type = types.primitive(PrimitiveKind::Int);

    let run = rewrite_expression_with(
        &types,
        &RewriteConfig::default(),
        object,
        keyword_new(
            point.ty,
            point.map_constructor,
            vec![("x", var("a", Some(int_type))), ("y", var("b", Some(int_type)))],
        ),
    );

    let [scope] = run.closure_scopes.as_slice() else {
        panic!("expected one registered scope, got {:?}", run.closure_scopes);
    };
    assert_eq!(scope.declared, vec!["obj$0".to_string()]);
    assert_eq!(scope.captured, vec!["a".to_string(), "b".to_string()]);

    let mut ev = Evaluator::new(&types);
    ev.define("a", Value::Int(5));
    ev.define("b", Value::Int(6));
    let built = ev.evaluate(&run.output).unwrap();
    assert_eq!(built.field("y"), Some(Value::Int(6)));
}

#[test]
fn test_synthetic_local_prefix_is_configurable() {
    let mut types = TypeTable::new();
    let point = point_type(&mut types);
    let object = types.well_known().object;
    let config = RewriteConfig {
        synthetic_local_prefix: "built".to_string(),
        ..RewriteConfig::default()
    };

    let run = rewrite_expression_with(
        &types,
        &config,
        object,
        keyword_new(point.ty, point.map_constructor, vec![("y", int(9))]),
    );
    assert_eq!(
        print_expression(&run.output, &types),
        "{ -> Point built$0 = new Point(); built$0.y = 9; return built$0 }.call()"
    );
}

#[test]
fn test_programmer_declared_constructor_is_called_directly() {
    let mut types = TypeTable::new();
    let object = types.well_known().object;
    let map = types.well_known().map;
    let settings = types.declare_class("Settings");
    let ctor = types.declare_constructor(
        settings,
        vec![statica_core::types::ParamInfo::new("values", map)],
    );
    let expr = keyword_new(settings, ctor, vec![("verbose", boolean(true))]);

    let run = rewrite_expression_with(&types, &RewriteConfig::default(), object, expr.clone());
    assert_eq!(run.output, expr);
    assert!(run.closure_scopes.is_empty());
    assert_eq!(run.stats.named_constructors, 0);
}

#[test]
fn test_disabled_rule_keeps_constructor_call() {
    let mut types = TypeTable::new();
    let point = point_type(&mut types);
    let object = types.well_known().object;
    let config = RewriteConfig {
        rules: Rules::all() - Rules::NAMED_CONSTRUCTORS,
        ..RewriteConfig::default()
    };
    let expr = keyword_new(point.ty, point.map_constructor, vec![("x", int(1))]);

    let run = rewrite_expression_with(&types, &config, object, expr.clone());
    assert_eq!(run.output, expr);
}
