//! Flattening of reference and callable conditions
//!
//! A reference or callable condition is not directly evaluable: it stands
//! for whatever expression it looks up or returns, which may itself be
//! another reference or callable. `flatten` substitutes along that chain
//! until one of the three terminal shapes remains, accumulating every
//! negation flag encountered on the way.

use crate::error::EvalError;
use crate::expr::{DeferredFuture, Expr, Relation};
use crate::negation::NotSeq;
use crate::options::Scope;
use serde_json::Value;

/// Hard ceiling on substitution steps plus evaluation descent. A chain
/// that exceeds it is treated as cyclic and surfaced as an error instead
/// of overflowing the stack.
pub(crate) const MAX_DEPTH: u32 = 128;

/// A condition reduced to one of the three directly evaluable shapes.
/// The node's own negation flag has been folded into the accumulated
/// sequence and stripped here.
pub(crate) enum Flat {
    Terminal(Value),
    Deferred(DeferredFuture),
    Set { entries: Vec<Expr>, rel: Relation },
}

/// Result of flattening: the terminal shape plus the full negation
/// sequence accumulated across the substitution chain.
pub(crate) struct Resolved {
    pub node: Flat,
    pub nots: NotSeq,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let node = match &self.node {
            Flat::Terminal(value) => format!("Terminal({value:?})"),
            Flat::Deferred(_) => "Deferred".to_string(),
            Flat::Set { entries, rel } => {
                format!("Set {{ entries: {}, rel: {rel:?} }}", entries.len())
            }
        };
        f.debug_struct("Resolved")
            .field("node", &node)
            .field("nots", &self.nots)
            .finish()
    }
}

/// Substitute references and callables until a terminal shape remains.
///
/// `seed` carries negation flags from an enclosing resolution (a deferred
/// condition re-entering evaluation after settling); it prepends to the
/// sequence and the current node's own flag still folds after it.
pub(crate) fn flatten(
    expr: Expr,
    scope: &Scope,
    seed: NotSeq,
    depth: u32,
) -> Result<Resolved, EvalError> {
    let mut nots = seed;
    let mut current = expr;
    let mut steps = depth;

    loop {
        nots.push(current.own_not());

        current = match current {
            Expr::Terminal { value, .. } => {
                return Ok(Resolved {
                    node: Flat::Terminal(value),
                    nots,
                })
            }
            Expr::Deferred { future, .. } => {
                return Ok(Resolved {
                    node: Flat::Deferred(future),
                    nots,
                })
            }
            Expr::Set { entries, rel, .. } => {
                return Ok(Resolved {
                    node: Flat::Set { entries, rel },
                    nots,
                })
            }
            Expr::Reference { key, .. } => match scope.context.get(&key) {
                Some(next) => next.clone(),
                None => {
                    log::trace!("reference '{}' not found in context, resolving to null", key);
                    Expr::null()
                }
            },
            Expr::Callable { func, .. } => func(&scope.binding, &scope.args),
        };

        steps += 1;
        if steps > MAX_DEPTH {
            return Err(EvalError::DepthExceeded { limit: MAX_DEPTH });
        }
    }
}
