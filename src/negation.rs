// SPDX-License-Identifier: MIT

//! Negation composition shared by the resolver and the evaluators
//!
//! Every node in an expression carries an optional negation flag. As
//! references and callables are substituted away, their flags accumulate
//! into a sequence; the sequence collapses to a single effective toggle
//! (an even number of active flags cancels out) which is applied exactly
//! once, when the resolved value is actually used.

/// An accumulated sequence of negation flags.
pub(crate) type NotSeq = Vec<bool>;

/// Collapse a sequence of negation flags into one effective toggle.
/// Reduces left-to-right; a false flag is a no-op.
pub(crate) fn compose(seq: &[bool]) -> bool {
    seq.iter()
        .fold(false, |acc, not| if *not { !acc } else { acc })
}

/// Apply the composed negation of `seq` to an already-coerced boolean.
pub(crate) fn apply(value: bool, seq: &[bool]) -> bool {
    if compose(seq) {
        !value
    } else {
        value
    }
}
