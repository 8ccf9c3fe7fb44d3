// SPDX-License-Identifier: MIT

//! Typed error handling for cond-eval
//!
//! Evaluation is designed to recover locally from everything a caller can
//! reasonably hand it (missing reference keys, rejected futures, conflicting
//! options). The one failure it surfaces is a resolution chain that never
//! terminates.

use thiserror::Error;

/// Top-level error type for condition evaluation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A reference or callable chain kept producing new conditions without
    /// ever reaching a terminal, set, or deferred shape (for example a
    /// callable that always returns another callable, or two references
    /// pointing at each other).
    #[error("resolution depth exceeded: more than {limit} substitutions without reaching a terminal condition")]
    DepthExceeded { limit: u32 },
}
