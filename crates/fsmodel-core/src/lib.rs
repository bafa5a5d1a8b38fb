//! A purely-functional reference model of a POSIX-like, caching
//! filesystem: inodes, hard links, directories, a write-back data /
//! write-through metadata cache, and crash-and-recovery semantics.
//!
//! This crate has no I/O and no async runtime. It exists to be driven by
//! a test harness (see the `fsmodel-testkit` crate) that generates
//! operation histories, applies them to both this model and a real
//! system under test, and checks that the two agree up to the error
//! taxonomy in [`error::ErrorKind`].
//!
//! The public surface is intentionally small: [`state::FsState`] is the
//! whole of the model's data, [`ops`] is the whole of its behavior.
#![forbid(unsafe_code)]

pub mod entry;
pub mod error;
pub mod fsync;
pub mod inode;
pub mod ops;
pub mod path;
pub mod state;
pub mod store;

pub use entry::Entry;
pub use error::{ErrorKind, Result};
pub use ops::Completion;
pub use path::Path;
pub use state::FsState;
