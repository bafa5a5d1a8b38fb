//! Property-based testing engine for `fsmodel-core`: a seeded history
//! generator (C6), a model-vs-SUT checker (C7), and a rose-tree shrinker
//! (C8), plus the `Sut` trait external adapters implement and the
//! JSON-Lines event-log wire format.
//!
//! This crate owns everything in `spec.md` up to but not including the
//! generate -> check -> shrink trial loop itself (C9), which lives in
//! `fsmodel-cli::engine` alongside the CLI surface.
#![forbid(unsafe_code)]

pub mod checker;
pub mod event;
pub mod generator;
pub mod shrinker;
pub mod sut;

pub use checker::{check, CheckOutcome, Divergence};
pub use event::{Event, EventType, Invocation, Op, OpId};
pub use generator::{generate, GeneratorConfig};
pub use sut::{ModelSut, Sut, DEFAULT_SUT_TIMEOUT};
