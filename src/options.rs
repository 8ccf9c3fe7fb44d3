// SPDX-License-Identifier: MIT

//! Evaluation options and the reference lookup table

use crate::expr::Expr;
use serde_json::Value;
use std::collections::HashMap;

/// Lookup table for reference conditions: key -> expression.
pub type ContextMap = HashMap<String, Expr>;

/// Configuration for one evaluation call.
///
/// All fields are optional; defaults are applied once at the API boundary
/// (null binding, empty argument list, short-circuit mode, missing
/// expression evaluates to false). Conflicting sources merge with
/// last-applied-wins semantics via [`EvalOptions::overlay`].
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// Root expression to evaluate.
    pub expression: Option<Expr>,
    /// Lookup table for reference conditions.
    pub context: ContextMap,
    /// Receiver handed to every callable condition, at any depth.
    pub binding: Option<Value>,
    /// Arguments handed to every callable condition, at any depth.
    pub args: Option<Vec<Value>>,
    /// Evaluate every entry instead of short-circuiting.
    pub exhaustive: Option<bool>,
}

impl EvalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root expression.
    pub fn expression(mut self, expr: impl Into<Expr>) -> Self {
        self.expression = Some(expr.into());
        self
    }

    /// Merge a whole context map; later keys override earlier ones.
    pub fn context(mut self, context: ContextMap) -> Self {
        self.context.extend(context);
        self
    }

    /// Bind a single reference key to an expression.
    pub fn define(mut self, key: impl Into<String>, expr: impl Into<Expr>) -> Self {
        self.context.insert(key.into(), expr.into());
        self
    }

    /// Set the receiver passed to callable conditions.
    pub fn binding(mut self, binding: Value) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Set the argument list passed to callable conditions.
    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = Some(args);
        self
    }

    /// Select exhaustive (full) evaluation instead of short-circuiting.
    pub fn exhaustive(mut self, exhaustive: bool) -> Self {
        self.exhaustive = Some(exhaustive);
        self
    }

    /// Merge `other` on top of these options. Per field the later value
    /// (`other`'s) wins where it is set; context maps merge key-wise.
    pub fn overlay(mut self, other: EvalOptions) -> Self {
        if other.expression.is_some() {
            self.expression = other.expression;
        }
        self.context.extend(other.context);
        if other.binding.is_some() {
            self.binding = other.binding;
        }
        if other.args.is_some() {
            self.args = other.args;
        }
        if other.exhaustive.is_some() {
            self.exhaustive = other.exhaustive;
        }
        self
    }
}

/// Immutable per-call scope threaded through resolution and evaluation.
/// Built once per `evaluate` call so it applies identically to every
/// callable and reference at any depth.
pub(crate) struct Scope {
    pub context: ContextMap,
    pub binding: Value,
    pub args: Vec<Value>,
}
