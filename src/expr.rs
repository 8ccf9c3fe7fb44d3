// SPDX-License-Identifier: MIT

//! Condition expression model
//!
//! A condition expression is a tree whose leaves are plain values, symbolic
//! references, callables, or deferred (future) conditions, and whose inner
//! nodes are AND/OR sets. Every node carries its own negation flag.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Signature of a callable condition.
///
/// Invoked with the call binding and argument list from the evaluation
/// options; the returned expression is evaluated in its place.
pub type CallFn = Arc<dyn Fn(&Value, &[Value]) -> Expr + Send + Sync>;

/// A deferred condition: a shareable future that eventually yields the next
/// expression, or a rejection reason. Rejection evaluates as false.
pub type DeferredFuture = Shared<BoxFuture<'static, Result<Expr, String>>>;

/// How the entries of a set combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// All entries must hold.
    #[default]
    And,
    /// At least one entry must hold.
    Or,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::And => write!(f, "and"),
            Relation::Or => write!(f, "or"),
        }
    }
}

/// Variant tag of an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Terminal,
    Reference,
    Callable,
    Deferred,
    Set,
}

/// A condition expression node.
///
/// Exactly one variant applies to any node. Classification of raw JSON
/// values happens once, in [`From<Value>`]: strings and numbers become
/// references, arrays become AND sets, everything else is a terminal.
#[derive(Clone)]
pub enum Expr {
    /// A plain value judged by truthiness alone.
    Terminal { value: Value, not: bool },
    /// A symbolic key resolved against the context map. A missing key
    /// resolves to the null terminal, never an error.
    Reference { key: String, not: bool },
    /// A function invoked with the call binding and arguments; its return
    /// value is evaluated next.
    Callable { func: CallFn, not: bool },
    /// A future settling to the next expression; rejection counts as false.
    Deferred { future: DeferredFuture, not: bool },
    /// Ordered entries combined with AND/OR.
    Set {
        entries: Vec<Expr>,
        rel: Relation,
        not: bool,
    },
}

impl Expr {
    /// A terminal condition judged purely by truthiness.
    pub fn value(value: impl Into<Value>) -> Self {
        Expr::Terminal {
            value: value.into(),
            not: false,
        }
    }

    /// The null terminal (always false before negation).
    pub fn null() -> Self {
        Expr::Terminal {
            value: Value::Null,
            not: false,
        }
    }

    /// A reference condition resolved against the context map.
    pub fn reference(key: impl Into<String>) -> Self {
        Expr::Reference {
            key: key.into(),
            not: false,
        }
    }

    /// A callable condition.
    pub fn call<F>(func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Expr + Send + Sync + 'static,
    {
        Expr::Callable {
            func: Arc::new(func),
            not: false,
        }
    }

    /// A deferred condition from a future that cannot fail.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Expr> + Send + 'static,
    {
        Self::deferred_result(async move { Ok::<_, std::convert::Infallible>(future.await) })
    }

    /// A deferred condition from a fallible future. A rejected future
    /// evaluates as the false terminal for its slot.
    pub fn deferred_result<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<Expr, E>> + Send + 'static,
        E: fmt::Display,
    {
        let boxed: BoxFuture<'static, Result<Expr, String>> =
            async move { future.await.map_err(|e| e.to_string()) }.boxed();
        Expr::Deferred {
            future: boxed.shared(),
            not: false,
        }
    }

    /// A set whose entries must all hold.
    pub fn all<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        Self::set(entries, Relation::And)
    }

    /// A set where at least one entry must hold.
    pub fn any<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        Self::set(entries, Relation::Or)
    }

    /// A set with an explicit relation.
    pub fn set<I>(entries: I, rel: Relation) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        Expr::Set {
            entries: entries.into_iter().collect(),
            rel,
            not: false,
        }
    }

    /// Toggle this node's own negation flag.
    pub fn negate(mut self) -> Self {
        match &mut self {
            Expr::Terminal { not, .. }
            | Expr::Reference { not, .. }
            | Expr::Callable { not, .. }
            | Expr::Deferred { not, .. }
            | Expr::Set { not, .. } => *not = !*not,
        }
        self
    }

    /// The variant tag of this node.
    pub fn kind(&self) -> Kind {
        match self {
            Expr::Terminal { .. } => Kind::Terminal,
            Expr::Reference { .. } => Kind::Reference,
            Expr::Callable { .. } => Kind::Callable,
            Expr::Deferred { .. } => Kind::Deferred,
            Expr::Set { .. } => Kind::Set,
        }
    }

    pub(crate) fn own_not(&self) -> bool {
        match self {
            Expr::Terminal { not, .. }
            | Expr::Reference { not, .. }
            | Expr::Callable { not, .. }
            | Expr::Deferred { not, .. }
            | Expr::Set { not, .. } => *not,
        }
    }
}

/// Standard truthiness coercion for terminal values: null, false, zero and
/// the empty string are false, everything else (including empty arrays and
/// objects) is true.
pub fn truthiness(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Terminal { value, not } => f
                .debug_struct("Terminal")
                .field("value", value)
                .field("not", not)
                .finish(),
            Expr::Reference { key, not } => f
                .debug_struct("Reference")
                .field("key", key)
                .field("not", not)
                .finish(),
            Expr::Callable { not, .. } => {
                f.debug_struct("Callable").field("not", not).finish_non_exhaustive()
            }
            Expr::Deferred { not, .. } => {
                f.debug_struct("Deferred").field("not", not).finish_non_exhaustive()
            }
            Expr::Set { entries, rel, not } => f
                .debug_struct("Set")
                .field("entries", entries)
                .field("rel", rel)
                .field("not", not)
                .finish(),
        }
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::value(value)
    }
}

impl From<&str> for Expr {
    fn from(key: &str) -> Self {
        Expr::reference(key)
    }
}

impl From<String> for Expr {
    fn from(key: String) -> Self {
        Expr::reference(key)
    }
}

impl From<Vec<Expr>> for Expr {
    fn from(entries: Vec<Expr>) -> Self {
        Expr::all(entries)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        match value {
            Value::String(key) => Expr::Reference { key, not: false },
            Value::Number(n) => Expr::Reference {
                key: n.to_string(),
                not: false,
            },
            Value::Array(items) => Expr::Set {
                entries: items.into_iter().map(Expr::from).collect(),
                rel: Relation::And,
                not: false,
            },
            other => Expr::Terminal {
                value: other,
                not: false,
            },
        }
    }
}
