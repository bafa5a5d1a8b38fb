//! The shrinker (`spec.md` §4.8): rose-tree minimization of a failing
//! history under the subvector order.
//!
//! No direct teacher analogue — `oxcrypt-core`/`oxcrypt-mount` are
//! `proptest`/`criterion` *consumers*, not generative-testing frameworks
//! themselves, so this module is written straight from `spec.md` §4.8/§9.
//! It follows §9's explicit redesign note: an iterative work loop over
//! candidate histories (a "monotonic best failing tracker"), not recursion
//! over a lazily materialized tree.

use crate::checker::Divergence;
use crate::event::Invocation;

/// The children of a history `h` of length `n` under `spec.md` §4.8's
/// rose tree: binary bisection (only once `n >= 4`), then one child per
/// single-element deletion. Bisection is tried first since it is more
/// likely to shrink the history by a lot in one step.
#[must_use]
pub fn children(history: &[Invocation]) -> Vec<Vec<Invocation>> {
    let n = history.len();
    let mut out = Vec::new();

    if n >= 4 {
        let mid = n / 2;
        out.push(history[..mid].to_vec());
        out.push(history[mid..].to_vec());
    }

    for i in 0..n {
        let mut candidate = history.to_vec();
        candidate.remove(i);
        out.push(candidate);
    }

    out
}

/// `K` re-executions and how a verdict is reached from them
/// (`spec.md` §4.8's "scour" parameter): a history is failing iff *at
/// least one* of `K` runs fails. Once a failing run is observed there is
/// no need to run the remaining attempts — more failing runs can't change
/// the verdict — but a *passing* verdict requires every attempt to pass.
pub fn classify(scour: usize, mut run: impl FnMut() -> Option<Divergence>) -> Option<Divergence> {
    for _ in 0..scour.max(1) {
        if let Some(divergence) = run() {
            return Some(divergence);
        }
    }
    None
}

/// Greedily descends the rose tree from `history`/`divergence`: at each
/// step, tries every child in `children`'s order and jumps to the first
/// one that still fails (verified via `classify`); stops when no child
/// fails. The result is a locally minimal failing history under the
/// subvector order (`spec.md` §8's shrinker-monotonicity property: the
/// returned history's length never exceeds the input's, by construction,
/// since every `children` entry is a subvector of its parent).
pub fn shrink(
    history: Vec<Invocation>,
    divergence: Divergence,
    scour: usize,
    mut run_against_sut: impl FnMut(&[Invocation]) -> Option<Divergence>,
) -> (Vec<Invocation>, Divergence) {
    let mut best_history = history;
    let mut best_divergence = divergence;

    loop {
        let candidates = children(&best_history);
        let mut shrunk = false;

        for candidate in candidates {
            if candidate.is_empty() {
                continue;
            }
            if let Some(d) = classify(scour, || run_against_sut(&candidate)) {
                best_history = candidate;
                best_divergence = d;
                shrunk = true;
                break;
            }
        }

        if !shrunk {
            break;
        }
    }

    (best_history, best_divergence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Op, OpId};
    use fsmodel_core::{ErrorKind, FsState};

    fn inv(id: u64) -> Invocation {
        Invocation { id: OpId(id), op: Op::Touch(fsmodel_core::Path::new(["a"])) }
    }

    fn history(n: u64) -> Vec<Invocation> {
        (0..n).map(inv).collect()
    }

    fn dummy_divergence() -> Divergence {
        let state = FsState::new();
        Divergence {
            index: 0,
            trace_up_to_index: vec![],
            model_state_before: state.clone(),
            model_state_after: state,
            expected: crate::event::Event {
                process: 0,
                kind: crate::event::EventType::Ok,
                f: "touch".to_string(),
                value: serde_json::Value::Null,
                error: None,
                time: 0,
                index: 0,
            },
            actual: crate::event::Event {
                process: 0,
                kind: crate::event::EventType::Fail,
                f: "touch".to_string(),
                value: serde_json::Value::Null,
                error: Some(ErrorKind::DoesNotExist),
                time: 0,
                index: 0,
            },
        }
    }

    #[test]
    fn children_of_short_history_are_deletions_only() {
        let h = history(3);
        let kids = children(&h);
        assert_eq!(kids.len(), 3);
        for k in &kids {
            assert_eq!(k.len(), 2);
        }
    }

    #[test]
    fn children_of_long_history_bisect_first() {
        let h = history(6);
        let kids = children(&h);
        // 2 bisection children + 6 deletion children.
        assert_eq!(kids.len(), 8);
        assert_eq!(kids[0].len(), 3);
        assert_eq!(kids[1].len(), 3);
    }

    #[test]
    fn shrinker_never_enlarges_a_history() {
        // A synthetic SUT that fails iff the history contains at least
        // `threshold` entries, so there is a known-minimal failing size.
        let threshold = 3;
        let original = history(20);
        let divergence = dummy_divergence();

        let (shrunk, _) = shrink(original.clone(), divergence, 1, |candidate| {
            if candidate.len() >= threshold { Some(dummy_divergence()) } else { None }
        });

        assert!(shrunk.len() <= original.len());
        assert_eq!(shrunk.len(), threshold);
    }

    #[test]
    fn classify_short_circuits_on_first_failure() {
        let mut calls = 0;
        let result = classify(5, || {
            calls += 1;
            Some(dummy_divergence())
        });
        assert!(result.is_some());
        assert_eq!(calls, 1);
    }

    #[test]
    fn classify_requires_all_attempts_to_pass() {
        let mut calls = 0;
        let result = classify(3, || {
            calls += 1;
            None
        });
        assert!(result.is_none());
        assert_eq!(calls, 3);
    }
}
