//! Integration tests for condition evaluation
//!
//! These tests exercise the public surface end to end: expression trees
//! mixing terminals, references, callables, deferred conditions and nested
//! sets, in both short-circuit and exhaustive mode.

use cond_eval::{
    evaluate, evaluate_with, truthiness, EvalError, EvalOptions, Evaluator, Expr, Kind, Relation,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Helpers
// ============================================================================

/// A callable that counts how many times it was invoked before returning
/// a fixed value.
fn counting(value: bool) -> (Expr, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let expr = Expr::call(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Expr::value(value)
    });
    (expr, calls)
}

fn context(pairs: Vec<(&str, Expr)>) -> EvalOptions {
    pairs
        .into_iter()
        .fold(EvalOptions::new(), |opts, (key, expr)| opts.define(key, expr))
}

// ============================================================================
// Terminals and truthiness
// ============================================================================

#[test]
fn test_terminal_values_follow_truthiness() {
    for value in [json!(null), json!(false), json!(0), json!("")] {
        assert_eq!(
            evaluate(Expr::value(value.clone())).unwrap().ready(),
            Some(false),
            "expected {} to be falsy",
            value
        );
    }
    for value in [json!(true), json!(1), json!("x"), json!({}), json!([])] {
        assert_eq!(
            evaluate(Expr::value(value.clone())).unwrap().ready(),
            Some(true),
            "expected {} to be truthy",
            value
        );
        assert!(truthiness(&value));
    }
}

#[test]
fn test_json_values_classify_once() {
    assert_eq!(Expr::from(json!(true)).kind(), Kind::Terminal);
    assert_eq!(Expr::from(json!("flag")).kind(), Kind::Reference);
    assert_eq!(Expr::from(json!(7)).kind(), Kind::Reference);
    assert_eq!(Expr::from(json!([true])).kind(), Kind::Set);
}

#[test]
fn test_whole_json_tree_evaluates() {
    // [true, "flag", {"note": "x"}] is an AND of a terminal, a reference
    // and a (truthy) object terminal.
    let expr = Expr::from(json!([true, "flag", {"note": "x"}]));

    let hit = context(vec![("flag", Expr::value(true))]).expression(expr.clone());
    assert_eq!(evaluate_with(hit).unwrap().ready(), Some(true));

    let miss = EvalOptions::new().expression(expr);
    assert_eq!(evaluate_with(miss).unwrap().ready(), Some(false));
}

// ============================================================================
// Sets, relations, negation
// ============================================================================

#[test]
fn test_empty_set_identities_match_neutral_elements() {
    assert_eq!(evaluate(Expr::set([], Relation::And)).unwrap().ready(), Some(true));
    assert_eq!(evaluate(Expr::set([], Relation::Or)).unwrap().ready(), Some(false));
}

#[test]
fn test_negation_is_xor_of_applied_flags() {
    let expr = Expr::all([Expr::from(true)]).negate();
    assert_eq!(evaluate(expr).unwrap().ready(), Some(false));

    let nested = Expr::all([Expr::all([Expr::from(true)]).negate()]).negate();
    assert_eq!(evaluate(nested).unwrap().ready(), Some(true));
}

#[test]
fn test_deeply_nested_sets() {
    let expr = Expr::any([
        Expr::from(false),
        Expr::all([
            Expr::from(true),
            Expr::any([Expr::from(false), Expr::all([Expr::from(true)])]),
        ]),
    ]);
    assert_eq!(evaluate(expr).unwrap().ready(), Some(true));
}

// ============================================================================
// Short-circuit vs exhaustive mode
// ============================================================================

#[test]
fn test_fast_mode_skips_side_effects_after_decision() {
    let (side_effect, calls) = counting(false);
    let expr = Expr::any([Expr::from(true), side_effect]);

    assert_eq!(evaluate(expr).unwrap().ready(), Some(true));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_full_mode_runs_every_side_effect() {
    let (side_effect, calls) = counting(false);
    let options = EvalOptions::new()
        .expression(Expr::any([Expr::from(true), side_effect]))
        .exhaustive(true);

    assert_eq!(evaluate_with(options).unwrap().ready(), Some(true));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_full_mode_runs_side_effects_in_nested_sets() {
    let (a, calls_a) = counting(true);
    let (b, calls_b) = counting(false);
    let options = EvalOptions::new()
        .expression(Expr::all([Expr::from(false), Expr::any([a, b])]))
        .exhaustive(true);

    assert_eq!(evaluate_with(options).unwrap().ready(), Some(false));
    assert_eq!(calls_a.load(Ordering::SeqCst), 1);
    assert_eq!(calls_b.load(Ordering::SeqCst), 1);
}

#[test]
fn test_fast_mode_consults_sets_before_deferred() {
    // The nested set alone decides the OR, so the outcome stays
    // synchronous even though a deferred sibling is parked.
    let expr = Expr::any([
        Expr::deferred(async { Expr::value(false) }),
        Expr::all([Expr::from(true)]),
    ]);
    assert_eq!(evaluate(expr).unwrap().ready(), Some(true));
}

// ============================================================================
// References and context maps
// ============================================================================

#[test]
fn test_reference_resolution_hit_and_miss() {
    let options = context(vec![("a", Expr::value(true))]);
    let evaluator = Evaluator::new(options);

    assert_eq!(evaluator.eval_expr("a").unwrap().ready(), Some(true));
    assert_eq!(evaluator.eval_expr("b").unwrap().ready(), Some(false));
}

#[test]
fn test_reference_chain_through_context() {
    let options = context(vec![
        ("entry", Expr::reference("next")),
        ("next", Expr::value(true)),
    ])
    .expression("entry");
    assert_eq!(evaluate_with(options).unwrap().ready(), Some(true));
}

#[test]
fn test_numeric_reference_identity() {
    let options = EvalOptions::new()
        .expression(json!(7))
        .define("7", true);
    assert_eq!(evaluate_with(options).unwrap().ready(), Some(true));
}

#[test]
fn test_reference_to_negated_entry_keeps_the_flag() {
    let options = context(vec![("no", Expr::value(true).negate())]).expression("no");
    assert_eq!(evaluate_with(options).unwrap().ready(), Some(false));
}

#[test]
fn test_cyclic_references_error_instead_of_overflowing() {
    let options = context(vec![
        ("a", Expr::reference("b")),
        ("b", Expr::reference("a")),
    ])
    .expression("a");
    let err = evaluate_with(options).unwrap_err();
    assert!(matches!(err, EvalError::DepthExceeded { .. }));
}

// ============================================================================
// Callables, binding, arguments
// ============================================================================

#[test]
fn test_binding_visible_at_any_depth() {
    let probe = || Expr::call(|binding: &Value, _: &[Value]| Expr::value(binding["flag"] == json!(true)));
    let expr = Expr::all([Expr::any([Expr::from(false), Expr::all([probe()])]), probe()]);

    let options = EvalOptions::new()
        .expression(expr)
        .binding(json!({"flag": true}));
    assert_eq!(evaluate_with(options).unwrap().ready(), Some(true));
}

#[test]
fn test_args_applied_uniformly_to_produced_callables() {
    // A callable returning another callable: both see the same args.
    let expr = Expr::call(|_, args| {
        let first = args.first().cloned().unwrap_or(Value::Null);
        Expr::call(move |_, args| Expr::value(args.first() == Some(&first)))
    });

    let options = EvalOptions::new().expression(expr).args(vec![json!("x")]);
    assert_eq!(evaluate_with(options).unwrap().ready(), Some(true));
}

#[test]
fn test_callable_returning_reference_resolves() {
    let options = context(vec![("go", Expr::value(true))])
        .expression(Expr::call(|_, _| Expr::reference("go")));
    assert_eq!(evaluate_with(options).unwrap().ready(), Some(true));
}

// ============================================================================
// Deferred conditions
// ============================================================================

#[tokio::test]
async fn test_async_aggregation_never_rejects() {
    let expr = Expr::all([
        Expr::deferred(async { Expr::value(true) }),
        Expr::deferred_result(async { Err::<Expr, &str>("backend unavailable") }),
    ]);

    let outcome = evaluate(expr).unwrap();
    assert!(!outcome.is_ready());
    assert!(!outcome.wait().await.unwrap());
}

#[tokio::test]
async fn test_sibling_deferred_conditions_settle_as_a_batch() {
    let expr = Expr::all([
        Expr::deferred(async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Expr::value(true)
        }),
        Expr::deferred(async { Expr::value(true) }),
    ]);
    assert!(evaluate(expr).unwrap().wait().await.unwrap());
}

#[tokio::test]
async fn test_deferred_resolving_to_set_with_negation() {
    let expr = Expr::deferred(async { Expr::all([Expr::from(true)]).negate() });
    assert!(!evaluate(expr).unwrap().wait().await.unwrap());
}

#[tokio::test]
async fn test_deferred_inside_nested_set() {
    let expr = Expr::all([
        Expr::from(true),
        Expr::any([
            Expr::from(false),
            Expr::deferred(async { Expr::value(true) }),
        ]),
    ]);
    let outcome = evaluate(expr).unwrap();
    assert!(!outcome.is_ready());
    assert!(outcome.wait().await.unwrap());
}

#[tokio::test]
async fn test_deferred_resolving_to_callable_uses_call_binding() {
    let options = EvalOptions::new()
        .expression(Expr::deferred(async {
            Expr::call(|binding: &Value, _: &[Value]| Expr::value(binding["flag"] == json!(true)))
        }))
        .binding(json!({"flag": true}));
    assert!(evaluate_with(options).unwrap().wait().await.unwrap());
}

#[tokio::test]
async fn test_full_mode_awaits_deferred_results_in_aggregate() {
    let options = EvalOptions::new()
        .expression(Expr::all([
            Expr::deferred(async { Expr::value(true) }),
            Expr::deferred(async { Expr::value(false) }),
            Expr::from(true),
        ]))
        .exhaustive(true);
    let outcome = evaluate_with(options).unwrap();
    assert!(!outcome.is_ready());
    assert!(!outcome.wait().await.unwrap());
}

// ============================================================================
// Reusable evaluators
// ============================================================================

#[test]
fn test_prebound_evaluator_is_reusable_and_idempotent() {
    let evaluator = Evaluator::new(
        context(vec![("go", Expr::value(true))])
            .expression(Expr::any([Expr::from(false), Expr::reference("go")])),
    );

    assert_eq!(evaluator.eval().unwrap().ready(), Some(true));
    assert_eq!(evaluator.eval().unwrap().ready(), Some(true));
}

#[tokio::test]
async fn test_prebound_evaluator_reuses_settled_deferred() {
    // The shared future settles once; a second evaluation observes the
    // memoized value instead of re-running it.
    let evaluator = Evaluator::new(
        EvalOptions::new().expression(Expr::deferred(async { Expr::value(true) })),
    );

    assert!(evaluator.eval().unwrap().wait().await.unwrap());
    assert!(evaluator.eval().unwrap().wait().await.unwrap());
}

#[test]
fn test_residual_configuration_overlays_prebound() {
    let evaluator = Evaluator::new(
        context(vec![("on", Expr::value(true))]).expression(Expr::reference("on")),
    );

    assert_eq!(evaluator.eval().unwrap().ready(), Some(true));
    assert_eq!(
        evaluator
            .eval_with(EvalOptions::new().define("on", false))
            .unwrap()
            .ready(),
        Some(false)
    );
    assert_eq!(evaluator.eval_expr(false).unwrap().ready(), Some(false));
}
