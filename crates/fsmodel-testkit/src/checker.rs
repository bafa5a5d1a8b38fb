//! The checker (`spec.md` §4.7): replays an actual (SUT) event trace
//! through the model and reports the earliest index at which the model's
//! own completion disagrees.
//!
//! Grounded on `oxcrypt-mount::testing::assertions::assert_bytes_equal`'s
//! "compare expected vs actual, report the first point of disagreement"
//! shape — that function's first-differing-byte search is the same idea
//! as this module's first-differing-event search, just over events
//! instead of bytes.

use fsmodel_core::FsState;

use crate::event::{self, Event, EventType, Invocation, Op, OpId};

/// The result of checking an actual history against the model.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// The model agreed with the actual trace at every index.
    Valid,
    /// The earliest disagreement, with enough context to debug it.
    Invalid(Box<Divergence>),
}

impl CheckOutcome {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, CheckOutcome::Valid)
    }
}

/// The earliest index at which the model's event disagrees with the
/// actual (SUT) event, plus the model state immediately before and after
/// that point (`spec.md` §4.7).
#[derive(Debug, Clone, PartialEq)]
pub struct Divergence {
    pub index: usize,
    pub trace_up_to_index: Vec<Event>,
    pub model_state_before: FsState,
    pub model_state_after: FsState,
    pub expected: Event,
    pub actual: Event,
}

/// Replays `actual`'s `invoke` events through the model (starting from
/// `initial`), using each completion's original `process`/`time`/`index`
/// so only the operation-relevant fields differ, and returns the earliest
/// index where the model's event disagrees with `actual`'s.
///
/// `info`/`nemesis` events pass through unchanged on both sides, so they
/// never cause a disagreement by construction (`spec.md` §4.7,
/// `SPEC_FULL.md` §4.7).
#[must_use]
pub fn check(initial: &FsState, actual: &[Event]) -> CheckOutcome {
    let mut state = initial.clone();
    let mut pending: Option<Invocation> = None;
    let mut next_id = 0u64;

    let mut model_events: Vec<Event> = Vec::with_capacity(actual.len());
    let mut state_after: Vec<FsState> = Vec::with_capacity(actual.len());

    for actual_event in actual {
        match actual_event.kind {
            EventType::Invoke => {
                let op = match Op::from_invoke(&actual_event.f, &actual_event.value) {
                    Ok(op) => op,
                    Err(_) => {
                        // An invoke event the model can't even parse is
                        // itself a divergence from what the model's own
                        // vocabulary would ever produce.
                        model_events.push(actual_event.clone());
                        state_after.push(state.clone());
                        continue;
                    }
                };
                let inv = Invocation { id: OpId(next_id), op };
                next_id += 1;
                model_events.push(event::invoke_event(actual_event.process, actual_event.time, actual_event.index, &inv));
                state_after.push(state.clone());
                pending = Some(inv);
            }
            EventType::Ok | EventType::Fail => {
                if let Some(inv) = pending.take() {
                    let (new_state, completion) = event::apply(&state, &inv.op);
                    state = new_state;
                    model_events.push(event::completion_event(actual_event.process, actual_event.time, actual_event.index, &inv, &completion));
                } else {
                    model_events.push(actual_event.clone());
                }
                state_after.push(state.clone());
            }
            EventType::Info | EventType::Nemesis => {
                // Opaque to the model: copy through so these never
                // register as a divergence (`spec.md` §4.7, §5).
                model_events.push(actual_event.clone());
                state_after.push(state.clone());
            }
        }
    }

    for i in 0..actual.len() {
        if !event::events_equal(&model_events[i], &actual[i]) {
            let before = if i == 0 { initial.clone() } else { state_after[i - 1].clone() };
            let after = state_after[i].clone();
            return CheckOutcome::Invalid(Box::new(Divergence {
                index: i,
                trace_up_to_index: actual[..i].to_vec(),
                model_state_before: before,
                model_state_after: after,
                expected: model_events[i].clone(),
                actual: actual[i].clone(),
            }));
        }
    }

    CheckOutcome::Valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sut::{drive, ModelSut, Sut};
    use fsmodel_core::Path;

    fn inv(id: u64, op: Op) -> Invocation {
        Invocation { id: OpId(id), op }
    }

    #[test]
    fn model_vs_itself_never_diverges() {
        let initial = FsState::new();
        let history = vec![
            inv(0, Op::Touch(Path::new(["a"]))),
            inv(1, Op::Write(Path::new(["a"]), vec![1, 2, 3])),
            inv(2, Op::Read(Path::new(["a"]))),
            inv(3, Op::Fsync(Path::new(["a"]))),
            inv(4, Op::LoseUnfsyncedWrites),
            inv(5, Op::Read(Path::new(["a"]))),
        ];
        let mut sut = ModelSut::new();
        sut.setup().unwrap();
        let actual = drive(&mut sut, &history, 0);
        sut.teardown().unwrap();
        assert_eq!(check(&initial, &actual), CheckOutcome::Valid);
    }

    #[test]
    fn divergence_is_reported_at_the_earliest_differing_index() {
        let initial = FsState::new();
        let history = vec![inv(0, Op::Touch(Path::new(["a"]))), inv(1, Op::Read(Path::new(["a"])))];
        let mut sut = ModelSut::new();
        let mut actual = drive(&mut sut, &history, 0);
        // Corrupt the final `read`'s ok-value to simulate a SUT that
        // returned the wrong bytes.
        let last = actual.len() - 1;
        actual[last].value = serde_json::json!([["a"], "ff"]);

        match check(&initial, &actual) {
            CheckOutcome::Invalid(d) => assert_eq!(d.index, last),
            CheckOutcome::Valid => panic!("expected a divergence"),
        }
    }

    #[test]
    fn info_events_never_cause_a_divergence() {
        let initial = FsState::new();
        let mut actual = drive(&mut ModelSut::new(), &[inv(0, Op::Touch(Path::new(["a"])))], 0);
        actual.push(Event {
            process: 0,
            kind: EventType::Info,
            f: "fsync".to_string(),
            value: serde_json::json!(["a"]),
            error: None,
            time: 999,
            index: 2,
        });
        assert_eq!(check(&initial, &actual), CheckOutcome::Valid);
    }

    #[test]
    fn nemesis_events_pass_through_unchanged() {
        let initial = FsState::new();
        let actual = vec![Event {
            process: 0,
            kind: EventType::Nemesis,
            f: "start-partition".to_string(),
            value: serde_json::Value::Null,
            error: None,
            time: 0,
            index: 0,
        }];
        assert_eq!(check(&initial, &actual), CheckOutcome::Valid);
    }
}
