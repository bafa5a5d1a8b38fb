//! The `Sut` trait and `ModelSut`, an in-process self-check adapter.
//!
//! Real adapters (shelling out to `touch`/`mv`/`cat`, mounting lazyfs) are
//! external collaborators per `spec.md` §1/§6 and live outside this
//! workspace. `ModelSut` runs a second copy of the reference model as its
//! own "system under test" so the checker and shrinker can be exercised,
//! and this crate's own test suite run, without a real filesystem mount.
//! Grounded on the one-trait-many-backends shape of the teacher's
//! `oxcrypt-mount`/`oxcrypt-fuse`/`oxcrypt-webdav` split, reduced here to a
//! single trait with one concrete implementation.

use std::time::{Duration, Instant};

use fsmodel_core::ops::Completion;
use fsmodel_core::FsState;

use crate::event::{self, Event, Invocation};

/// Per-invocation budget a real SUT adapter is expected to enforce
/// (`spec.md` §5). `ModelSut` is synchronous and can never hang, so it has
/// no use for this constant itself; it exists for downstream adapters and
/// as the default `fsmodel test`/`quickcheck` flag value.
pub const DEFAULT_SUT_TIMEOUT: Duration = Duration::from_secs(10);

/// A system under test: something that can accept the same operation
/// vocabulary the model accepts and report back a `Completion`.
pub trait Sut {
    /// Prepares the SUT for a trial (mount a filesystem, open a
    /// connection, ...). Default no-op for in-process SUTs like
    /// `ModelSut`.
    fn setup(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Applies one invocation, returning its completion. A filesystem
    /// error (`ENOENT`, ...) is expected domain data, not a Rust-level
    /// error, hence `Completion` rather than `Result`.
    fn apply(&mut self, invoke: &Invocation) -> Completion;

    /// Tears down whatever `setup` prepared. Default no-op.
    fn teardown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Runs a fresh copy of [`fsmodel_core`]'s reference model as its own
/// system under test. A model-vs-model run should never diverge; this is
/// what `fsmodel-testkit`'s and `fsmodel-cli`'s own tests drive against.
#[derive(Debug, Clone)]
pub struct ModelSut {
    state: FsState,
}

impl ModelSut {
    #[must_use]
    pub fn new() -> Self {
        ModelSut { state: FsState::new() }
    }
}

impl Default for ModelSut {
    fn default() -> Self {
        Self::new()
    }
}

impl Sut for ModelSut {
    fn apply(&mut self, invoke: &Invocation) -> Completion {
        let (new_state, completion) = event::apply(&self.state, &invoke.op);
        self.state = new_state;
        completion
    }
}

/// Drives `history` through `sut`, emitting one `invoke` and one
/// `ok`/`fail` event per entry with a monotonic `index` and a `time`
/// measured from the first call (`spec.md` §6.4). `process` is always `0`
/// in this single-threaded engine (`spec.md` §5).
pub fn drive<S: Sut>(sut: &mut S, history: &[Invocation], process: u32) -> Vec<Event> {
    let start = Instant::now();
    let mut events = Vec::with_capacity(history.len() * 2);
    let mut index = 0u64;
    for inv in history {
        let t = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        events.push(event::invoke_event(process, t, index, inv));
        index += 1;

        let completion = sut.apply(inv);

        let t = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        events.push(event::completion_event(process, t, index, inv, &completion));
        index += 1;
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Op, OpId};
    use fsmodel_core::Path;

    fn inv(id: u64, op: Op) -> Invocation {
        Invocation { id: OpId(id), op }
    }

    #[test]
    fn model_sut_applies_ops_in_sequence() {
        let mut sut = ModelSut::new();
        let events = drive(&mut sut, &[inv(0, Op::Touch(Path::new(["a"]))), inv(1, Op::Read(Path::new(["a"])))], 0);
        assert_eq!(events.len(), 4);
        assert_eq!(events[3].value, serde_json::json!([["a"], ""]));
    }

    #[test]
    fn drive_assigns_monotonic_indices() {
        let mut sut = ModelSut::new();
        let events = drive(&mut sut, &[inv(0, Op::Touch(Path::new(["a"]))), inv(1, Op::Touch(Path::new(["b"])))], 0);
        let indices: Vec<u64> = events.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }
}
