//! Short-circuit and exhaustive evaluation of condition expressions
//!
//! Two modes share the same classification and recombination rules. Fast
//! mode settles cheap work first: plain terminals in document order, then
//! nested sets, then deferred conditions, bailing out as soon as the
//! relation is decided. Full mode resolves every entry regardless of early
//! determinacy and only short-circuits the final combination.

use crate::error::EvalError;
use crate::expr::{truthiness, DeferredFuture, Expr, Relation};
use crate::negation::{self, NotSeq};
use crate::options::{EvalOptions, Scope};
use crate::resolve::{self, Flat};
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Result of one evaluation call.
///
/// Evaluation stays synchronous as long as terminals and nested sets
/// decide the outcome; only when unresolved deferred conditions remain
/// does the result become a future.
pub enum Outcome {
    /// Decided without waiting on any deferred condition.
    Ready(bool),
    /// Still waiting on deferred conditions.
    Pending(BoxFuture<'static, Result<bool, EvalError>>),
}

impl Outcome {
    /// True when the result was decided synchronously.
    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready(_))
    }

    /// The synchronous result, if there is one.
    pub fn ready(&self) -> Option<bool> {
        match self {
            Outcome::Ready(value) => Some(*value),
            Outcome::Pending(_) => None,
        }
    }

    /// Resolve to the final boolean, awaiting deferred conditions if any
    /// remain.
    pub async fn wait(self) -> Result<bool, EvalError> {
        match self {
            Outcome::Ready(value) => Ok(value),
            Outcome::Pending(fut) => fut.await,
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Outcome::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Evaluate a bare condition expression with default options.
pub fn evaluate(expr: impl Into<Expr>) -> Result<Outcome, EvalError> {
    evaluate_with(EvalOptions::new().expression(expr))
}

/// Evaluate with explicit options: context map, call binding, arguments
/// and evaluation mode.
pub fn evaluate_with(options: EvalOptions) -> Result<Outcome, EvalError> {
    let EvalOptions {
        expression,
        context,
        binding,
        args,
        exhaustive,
    } = options;

    let expr = expression.unwrap_or_else(Expr::null);
    let scope = Arc::new(Scope {
        context,
        binding: binding.unwrap_or(Value::Null),
        args: args.unwrap_or_default(),
    });

    if exhaustive.unwrap_or(false) {
        eval_full(expr, &scope, NotSeq::new(), 0)
    } else {
        eval_fast(expr, &scope, NotSeq::new(), 0)
    }
}

/// A reusable evaluator with part of the configuration pre-bound.
///
/// The remaining configuration is supplied per call and overlays the
/// pre-bound options field-wise, later wins.
#[derive(Debug, Clone)]
pub struct Evaluator {
    options: EvalOptions,
}

impl Evaluator {
    /// Pre-bind a set of options.
    pub fn new(options: EvalOptions) -> Self {
        Self { options }
    }

    /// Evaluate with only the pre-bound options.
    pub fn eval(&self) -> Result<Outcome, EvalError> {
        evaluate_with(self.options.clone())
    }

    /// Evaluate with residual options overlaid on the pre-bound ones.
    pub fn eval_with(&self, residual: EvalOptions) -> Result<Outcome, EvalError> {
        evaluate_with(self.options.clone().overlay(residual))
    }

    /// Evaluate a residual expression against the pre-bound options.
    pub fn eval_expr(&self, expr: impl Into<Expr>) -> Result<Outcome, EvalError> {
        self.eval_with(EvalOptions::new().expression(expr))
    }
}

impl From<EvalOptions> for Evaluator {
    fn from(options: EvalOptions) -> Self {
        Self::new(options)
    }
}

type PendingSlot = BoxFuture<'static, Result<bool, EvalError>>;

/// True when this single value already decides a set under `rel`.
fn decisive(rel: Relation, value: bool) -> bool {
    match rel {
        Relation::And => !value,
        Relation::Or => value,
    }
}

/// The neutral element of `rel`: the result of an empty set.
fn neutral(rel: Relation) -> bool {
    matches!(rel, Relation::And)
}

/// Combine fully-settled entry results under `rel`.
fn combine(rel: Relation, values: &[bool]) -> bool {
    match rel {
        Relation::And => values.iter().all(|v| *v),
        Relation::Or => values.iter().any(|v| *v),
    }
}

/// Await every pending slot to completion as one concurrent batch.
/// Individual rejections were already mapped to false when the slot was
/// built; only a depth overflow propagates as an error.
async fn settle(slots: Vec<PendingSlot>) -> Result<Vec<bool>, EvalError> {
    future::join_all(slots).await.into_iter().collect()
}

/// Turn a deferred condition into a pending slot: await the shared future,
/// then re-enter evaluation with the slot's accumulated negation as seed.
/// A rejected future settles the slot as false, it never fails the call.
fn deferred_slot(
    future: DeferredFuture,
    nots: NotSeq,
    scope: Arc<Scope>,
    depth: u32,
    exhaustive: bool,
) -> PendingSlot {
    async move {
        match future.await {
            Ok(next) => {
                let outcome = if exhaustive {
                    eval_full(next, &scope, nots, depth + 1)?
                } else {
                    eval_fast(next, &scope, nots, depth + 1)?
                };
                outcome.wait().await
            }
            Err(reason) => {
                log::debug!("deferred condition rejected, treating as false: {}", reason);
                Ok(negation::apply(false, &nots))
            }
        }
    }
    .boxed()
}

fn eval_fast(expr: Expr, scope: &Arc<Scope>, seed: NotSeq, depth: u32) -> Result<Outcome, EvalError> {
    let resolved = resolve::flatten(expr, scope, seed, depth)?;
    match resolved.node {
        Flat::Terminal(value) => Ok(Outcome::Ready(negation::apply(
            truthiness(&value),
            &resolved.nots,
        ))),
        Flat::Deferred(future) => Ok(Outcome::Pending(deferred_slot(
            future,
            resolved.nots,
            scope.clone(),
            depth,
            false,
        ))),
        Flat::Set { entries, rel } => eval_fast_set(entries, rel, resolved.nots, scope, depth),
    }
}

fn eval_fast_set(
    entries: Vec<Expr>,
    rel: Relation,
    nots: NotSeq,
    scope: &Arc<Scope>,
    depth: u32,
) -> Result<Outcome, EvalError> {
    let mut nested: Vec<(Vec<Expr>, Relation, NotSeq)> = Vec::new();
    let mut slots: Vec<PendingSlot> = Vec::new();

    // Plain terminals first, in document order. Sets and deferred entries
    // are parked and only consulted if the terminals alone cannot decide.
    for entry in entries {
        let resolved = resolve::flatten(entry, scope, NotSeq::new(), depth)?;
        match resolved.node {
            Flat::Terminal(value) => {
                let value = negation::apply(truthiness(&value), &resolved.nots);
                if decisive(rel, value) {
                    return Ok(Outcome::Ready(negation::apply(value, &nots)));
                }
            }
            Flat::Set {
                entries: sub,
                rel: sub_rel,
            } => nested.push((sub, sub_rel, resolved.nots)),
            Flat::Deferred(future) => slots.push(deferred_slot(
                future,
                resolved.nots,
                scope.clone(),
                depth,
                false,
            )),
        }
    }

    // Nested sets second, each re-entering fast mode with the same
    // early-exit rule.
    for (sub, sub_rel, sub_nots) in nested {
        match eval_fast_set(sub, sub_rel, sub_nots, scope, depth + 1)? {
            Outcome::Ready(value) => {
                if decisive(rel, value) {
                    return Ok(Outcome::Ready(negation::apply(value, &nots)));
                }
            }
            Outcome::Pending(slot) => slots.push(slot),
        }
    }

    // Deferred work last. If nothing is pending the synchronous entries
    // were all non-decisive, which is the relation's neutral element.
    if slots.is_empty() {
        return Ok(Outcome::Ready(negation::apply(neutral(rel), &nots)));
    }

    Ok(Outcome::Pending(
        async move {
            let settled = settle(slots).await?;
            Ok(negation::apply(combine(rel, &settled), &nots))
        }
        .boxed(),
    ))
}

fn eval_full(expr: Expr, scope: &Arc<Scope>, seed: NotSeq, depth: u32) -> Result<Outcome, EvalError> {
    let resolved = resolve::flatten(expr, scope, seed, depth)?;
    match resolved.node {
        Flat::Terminal(value) => Ok(Outcome::Ready(negation::apply(
            truthiness(&value),
            &resolved.nots,
        ))),
        Flat::Deferred(future) => Ok(Outcome::Pending(deferred_slot(
            future,
            resolved.nots,
            scope.clone(),
            depth,
            true,
        ))),
        Flat::Set { entries, rel } => eval_full_set(entries, rel, resolved.nots, scope, depth),
    }
}

fn eval_full_set(
    entries: Vec<Expr>,
    rel: Relation,
    nots: NotSeq,
    scope: &Arc<Scope>,
    depth: u32,
) -> Result<Outcome, EvalError> {
    // Every entry is resolved and recursively evaluated, nothing is
    // skipped; only the final combination below short-circuits.
    let mut ready: Vec<bool> = Vec::new();
    let mut slots: Vec<PendingSlot> = Vec::new();

    for entry in entries {
        match eval_full(entry, scope, NotSeq::new(), depth + 1)? {
            Outcome::Ready(value) => ready.push(value),
            Outcome::Pending(slot) => slots.push(slot),
        }
    }

    let sync_result = combine(rel, &ready);
    if decisive(rel, sync_result) || slots.is_empty() {
        return Ok(Outcome::Ready(negation::apply(sync_result, &nots)));
    }

    Ok(Outcome::Pending(
        async move {
            let settled = settle(slots).await?;
            Ok(negation::apply(combine(rel, &settled), &nots))
        }
        .boxed(),
    ))
}
