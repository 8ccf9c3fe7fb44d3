// SPDX-License-Identifier: MIT

//! Boolean condition evaluation with lazy, symbolic, and asynchronous leaves.
//!
//! An [`Expr`] tree combines plain values, references resolved against a
//! caller-supplied context map, callables, and deferred (future) conditions
//! through AND/OR sets with per-node negation. [`evaluate`] reduces a tree
//! to a boolean, short-circuiting and settling cheap work first: terminals
//! in document order, then nested sets, then deferred conditions. The
//! result stays synchronous unless a deferred condition is actually needed,
//! in which case it becomes a future of a boolean.
//!
//! ```
//! use cond_eval::{evaluate_with, EvalOptions, Expr};
//!
//! let expr = Expr::any([
//!     Expr::from(false),
//!     Expr::all([Expr::from(true), Expr::reference("ready")]),
//! ]);
//! let options = EvalOptions::new().expression(expr).define("ready", true);
//! let outcome = evaluate_with(options).unwrap();
//! assert_eq!(outcome.ready(), Some(true));
//! ```
//!
//! Rejected deferred conditions and missing reference keys evaluate as
//! false rather than failing the call; the only error the crate produces
//! is [`EvalError::DepthExceeded`], for reference/callable chains that
//! never reach a terminal shape.

mod error;
mod eval;
mod expr;
mod negation;
mod options;
mod resolve;

pub use error::EvalError;
pub use eval::{evaluate, evaluate_with, Evaluator, Outcome};
pub use expr::{truthiness, CallFn, DeferredFuture, Expr, Kind, Relation};
pub use options::{ContextMap, EvalOptions};
