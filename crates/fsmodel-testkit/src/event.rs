//! Operation vocabulary and event-log wire format (`spec.md` §6).
//!
//! `Op` is the tagged variant the generator, checker and shrinker all
//! operate on. `Event` is the JSON-Lines wire form of `history.edn`'s
//! event shape (`{:process :type :f :value :time :index [:error]}`):
//! field names and semantics are kept exactly, only EDN's concrete syntax
//! is swapped for JSON, since this workspace's only other structured-data
//! need (the teacher's `oxcrypt-cli` `stats`/`info` commands) already goes
//! through `serde_json` rather than a bespoke format.

use fsmodel_core::ops::Completion;
use fsmodel_core::{ErrorKind, FsState, Path};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A single history operation and its payload (`spec.md` §6.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Read(Path),
    Touch(Path),
    Rm(Path),
    Fsync(Path),
    Mkdir(Path),
    Write(Path, Vec<u8>),
    Append(Path, Vec<u8>),
    Mv(Path, Path),
    Ln(Path, Path),
    Truncate(Path, i64),
    LoseUnfsyncedWrites,
}

impl Op {
    /// The wire name of this operation, matching `history.edn`'s `:f`
    /// keyword vocabulary.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Op::Read(_) => "read",
            Op::Touch(_) => "touch",
            Op::Rm(_) => "rm",
            Op::Fsync(_) => "fsync",
            Op::Mkdir(_) => "mkdir",
            Op::Write(_, _) => "write",
            Op::Append(_, _) => "append",
            Op::Mv(_, _) => "mv",
            Op::Ln(_, _) => "ln",
            Op::Truncate(_, _) => "truncate",
            Op::LoseUnfsyncedWrites => "lose_unfsynced_writes",
        }
    }

    /// The `:value` payload of this op's `invoke` event (`spec.md` §6.2).
    #[must_use]
    pub fn invoke_value(&self) -> Value {
        match self {
            Op::Touch(p) | Op::Rm(p) | Op::Fsync(p) | Op::Mkdir(p) => path_value(p),
            Op::Read(p) => json!([path_value(p), Value::Null]),
            Op::Write(p, data) | Op::Append(p, data) => json!([path_value(p), hex::encode(data)]),
            Op::Mv(from, to) | Op::Ln(from, to) => json!([path_value(from), path_value(to)]),
            Op::Truncate(p, delta) => json!([path_value(p), delta]),
            Op::LoseUnfsyncedWrites => Value::Null,
        }
    }

    /// Parses an `invoke` event's `f`/`value` pair back into an `Op`.
    /// Used by the checker and by `--history FILE` replay.
    pub fn from_invoke(f: &str, value: &Value) -> anyhow::Result<Op> {
        match f {
            "touch" => Ok(Op::Touch(value_path(value)?)),
            "rm" => Ok(Op::Rm(value_path(value)?)),
            "fsync" => Ok(Op::Fsync(value_path(value)?)),
            "mkdir" => Ok(Op::Mkdir(value_path(value)?)),
            "read" => {
                let arr = value.as_array().ok_or_else(|| anyhow::anyhow!("read value must be an array"))?;
                Ok(Op::Read(value_path(&arr[0])?))
            }
            "write" | "append" => {
                let arr = value.as_array().ok_or_else(|| anyhow::anyhow!("{f} value must be an array"))?;
                let path = value_path(&arr[0])?;
                let hex_str = arr[1].as_str().ok_or_else(|| anyhow::anyhow!("{f} data must be a hex string"))?;
                let data = hex::decode(hex_str)?;
                if f == "write" { Ok(Op::Write(path, data)) } else { Ok(Op::Append(path, data)) }
            }
            "mv" | "ln" => {
                let arr = value.as_array().ok_or_else(|| anyhow::anyhow!("{f} value must be an array"))?;
                let from = value_path(&arr[0])?;
                let to = value_path(&arr[1])?;
                if f == "mv" { Ok(Op::Mv(from, to)) } else { Ok(Op::Ln(from, to)) }
            }
            "truncate" => {
                let arr = value.as_array().ok_or_else(|| anyhow::anyhow!("truncate value must be an array"))?;
                let path = value_path(&arr[0])?;
                let delta = arr[1].as_i64().ok_or_else(|| anyhow::anyhow!("truncate delta must be an integer"))?;
                Ok(Op::Truncate(path, delta))
            }
            "lose_unfsynced_writes" => Ok(Op::LoseUnfsyncedWrites),
            other => Err(anyhow::anyhow!("unknown op: {other}")),
        }
    }
}

fn path_value(p: &Path) -> Value {
    Value::Array(p.components().iter().map(|c| Value::String(c.clone())).collect())
}

fn value_path(v: &Value) -> anyhow::Result<Path> {
    let arr = v.as_array().ok_or_else(|| anyhow::anyhow!("path must be an array of strings"))?;
    let components: anyhow::Result<Vec<String>> = arr
        .iter()
        .map(|c| c.as_str().map(String::from).ok_or_else(|| anyhow::anyhow!("path component must be a string")))
        .collect();
    Ok(Path::new(components?))
}

/// Applies `op` to `state`, dispatching to the matching `fsmodel_core::ops`
/// function. The one place in this crate that knows how `Op` maps onto the
/// model's operation set.
#[must_use]
pub fn apply(state: &FsState, op: &Op) -> (FsState, Completion) {
    use fsmodel_core::ops;
    match op {
        Op::Read(p) => ops::read(state, p),
        Op::Touch(p) => ops::touch(state, p),
        Op::Rm(p) => ops::rm(state, p),
        Op::Fsync(p) => ops::fsync(state, p),
        Op::Mkdir(p) => ops::mkdir(state, p),
        Op::Write(p, data) => ops::write(state, p, data),
        Op::Append(p, data) => ops::append(state, p, data),
        Op::Mv(from, to) => ops::mv(state, from, to),
        Op::Ln(from, to) => ops::ln(state, from, to),
        Op::Truncate(p, delta) => ops::truncate(state, p, *delta),
        Op::LoseUnfsyncedWrites => ops::lose_unfsynced_writes(state),
    }
}

/// Stable identity for pairing an `invoke` event with its later `ok`/`fail`
/// completion (`spec.md` §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpId(pub u64);

/// One history entry: an operation plus its stable identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub id: OpId,
    pub op: Op,
}

/// The `:type` tag of an `Event` (`spec.md` §6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Invoke,
    Ok,
    Fail,
    /// A SUT invocation that neither completed nor failed within the
    /// per-op timeout budget (`spec.md` §5); compared opaquely by the
    /// checker.
    Info,
    /// An operation-less control event. Passes through the checker
    /// unchanged (`spec.md` §4.7).
    Nemesis,
}

/// One line of the event log: `{process, type, f, value, time, index,
/// error?}` (`spec.md` §6.4), serialized as JSON rather than the original
/// EDN (no maintained EDN parser exists in this ecosystem; every other
/// structured-data surface in this workspace already uses `serde_json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub process: u32,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub f: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ErrorKind>,
    pub time: u64,
    pub index: u64,
}

/// Builds the `invoke` event for `inv`.
#[must_use]
pub fn invoke_event(process: u32, time: u64, index: u64, inv: &Invocation) -> Event {
    Event { process, kind: EventType::Invoke, f: inv.op.name().to_string(), value: inv.op.invoke_value(), error: None, time, index }
}

/// Builds the `ok`/`fail` completion event for `inv`, given the
/// `Completion` it produced.
#[must_use]
pub fn completion_event(process: u32, time: u64, index: u64, inv: &Invocation, completion: &Completion) -> Event {
    let (kind, value, error) = match completion {
        Completion::Ok => (EventType::Ok, inv.op.invoke_value(), None),
        Completion::OkData(data) => {
            let Op::Read(p) = &inv.op else { unreachable!("OkData only returned by read") };
            (EventType::Ok, json!([path_value(p), hex::encode(data)]), None)
        }
        Completion::Fail(kind) => (EventType::Fail, inv.op.invoke_value(), Some(*kind)),
    };
    Event { process, kind, f: inv.op.name().to_string(), value, error, time, index }
}

/// Structural equality ignoring `time`/`index` (`spec.md` §4.7's
/// divergence definition: "differ in any field other than `time`/`index`").
#[must_use]
pub fn events_equal(a: &Event, b: &Event) -> bool {
    a.process == b.process && a.kind == b.kind && a.f == b.f && a.value == b.value && a.error == b.error
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(components: &[&str]) -> Path {
        Path::new(components.iter().copied())
    }

    #[test]
    fn touch_invoke_value_is_bare_path() {
        let op = Op::Touch(p(&["a"]));
        assert_eq!(op.invoke_value(), json!(["a"]));
    }

    #[test]
    fn read_invoke_value_pairs_path_with_null() {
        let op = Op::Read(p(&["a", "b"]));
        assert_eq!(op.invoke_value(), json!([["a", "b"], null]));
    }

    #[test]
    fn write_invoke_value_hex_encodes_data() {
        let op = Op::Write(p(&["a"]), vec![0x1a, 0x2b]);
        assert_eq!(op.invoke_value(), json!([["a"], "1a2b"]));
    }

    #[test]
    fn from_invoke_round_trips_write() {
        let op = Op::Write(p(&["a"]), vec![0x1a, 0x2b]);
        let parsed = Op::from_invoke(op.name(), &op.invoke_value()).unwrap();
        assert_eq!(parsed, op);
    }

    #[test]
    fn from_invoke_round_trips_mv() {
        let op = Op::Mv(p(&["a"]), p(&["b", "c"]));
        let parsed = Op::from_invoke(op.name(), &op.invoke_value()).unwrap();
        assert_eq!(parsed, op);
    }

    #[test]
    fn from_invoke_round_trips_lose_unfsynced_writes() {
        let op = Op::LoseUnfsyncedWrites;
        let parsed = Op::from_invoke(op.name(), &op.invoke_value()).unwrap();
        assert_eq!(parsed, op);
    }

    #[test]
    fn completion_event_for_read_carries_hex_data() {
        let inv = Invocation { id: OpId(0), op: Op::Read(p(&["a"])) };
        let ev = completion_event(0, 0, 1, &inv, &Completion::OkData(vec![0xff]));
        assert_eq!(ev.value, json!([["a"], "ff"]));
        assert_eq!(ev.kind, EventType::Ok);
    }

    #[test]
    fn completion_event_for_failure_carries_error_kind() {
        let inv = Invocation { id: OpId(0), op: Op::Rm(p(&["a"])) };
        let ev = completion_event(0, 0, 1, &inv, &Completion::Fail(ErrorKind::DoesNotExist));
        assert_eq!(ev.kind, EventType::Fail);
        assert_eq!(ev.error, Some(ErrorKind::DoesNotExist));
    }

    #[test]
    fn events_equal_ignores_time_and_index() {
        let inv = Invocation { id: OpId(0), op: Op::Touch(p(&["a"])) };
        let e1 = invoke_event(0, 10, 0, &inv);
        let e2 = invoke_event(0, 99, 7, &inv);
        assert!(events_equal(&e1, &e2));
    }
}
