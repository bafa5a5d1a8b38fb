//! Filesystem operations (`spec.md` §4.4): `touch`, `write`, `append`,
//! `read`, `rm`, `mkdir`, `ln`, `mv`, `truncate`, `fsync`,
//! `lose_unfsynced_writes`.
//!
//! Every operation takes `&FsState` and returns `(FsState, Completion)`:
//! the "purely functional" contract is realized as clone-on-write at this
//! boundary (`spec.md` §3's "internal representation notes" in
//! `SPEC_FULL.md`), not as a persistent data structure throughout. Any
//! error caught inside an operation reverts to the pre-operation state
//! (the mutated clone is simply dropped) and is rendered as a failure
//! completion, per `spec.md` §7's propagation policy. Every successful
//! state-mutating operation is followed by the automatic metadata fsync
//! (`spec.md` §4.4); data is never auto-fsynced.
//!
//! Grounded on the pure/impure split in
//! `oxcrypt-core::vault::operations_async::VaultOperationsAsync` (path and
//! state calculations delegated to a pure core, I/O kept separate) — here
//! there is no I/O at all, so the whole operation body is the "pure" half
//! of that split, with `tracing::instrument` spans matching that module's
//! style.

use tracing::instrument;

use crate::entry::Entry;
use crate::error::{ErrorKind, Result};
use crate::fsync;
use crate::inode::{self, Inode, InodeNumber};
use crate::path::Path;
use crate::state::FsState;
use crate::store;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The outcome of applying one operation to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Completion {
    /// Success with no payload (every operation but `read`).
    Ok,
    /// Success carrying `read`'s returned bytes.
    OkData(Vec<u8>),
    /// Failure with a model error kind.
    Fail(ErrorKind),
}

impl Completion {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !matches!(self, Completion::Fail(_))
    }
}

fn alloc_inode(state: &mut FsState) -> InodeNumber {
    let n = InodeNumber(state.next_inode_number);
    state.next_inode_number += 1;
    n
}

/// Runs a fallible operation body against a clone of `state`, applying the
/// automatic metadata fsync on success and reverting to the original
/// state on failure.
fn apply(state: &FsState, body: impl FnOnce(&mut FsState) -> Result<Completion>) -> (FsState, Completion) {
    let mut new_state = state.clone();
    match body(&mut new_state) {
        Ok(completion) => {
            fsync::promote_metadata(&mut new_state);
            (new_state, completion)
        }
        Err(e) => (state.clone(), Completion::Fail(e)),
    }
}

#[instrument(level = "debug", skip(state))]
pub fn touch(state: &FsState, path: &Path) -> (FsState, Completion) {
    apply(state, |s| {
        if store::get(s, path)?.is_some() {
            return Ok(Completion::Ok);
        }
        let n = alloc_inode(s);
        s.cache.inodes.insert(n, Inode::empty());
        store::put(s, path, Some(Entry::Link { inode: n }))?;
        Ok(Completion::Ok)
    })
}

#[instrument(level = "debug", skip(state, data))]
pub fn write(state: &FsState, path: &Path, data: &[u8]) -> (FsState, Completion) {
    apply(state, |s| {
        match store::get(s, path)? {
            Some(Entry::Dir) => return Err(ErrorKind::NotFile),
            Some(Entry::Link { inode: n }) => {
                inode::update(&mut s.cache.inodes, &s.disk.inodes, n, |mut i| {
                    i.data = data.to_vec();
                    i
                });
            }
            None => {
                let n = alloc_inode(s);
                s.cache.inodes.insert(n, Inode { link_count: 0, data: data.to_vec() });
                store::put(s, path, Some(Entry::Link { inode: n }))?;
            }
        }
        Ok(Completion::Ok)
    })
}

#[instrument(level = "debug", skip(state, data))]
pub fn append(state: &FsState, path: &Path, data: &[u8]) -> (FsState, Completion) {
    apply(state, |s| {
        match store::get(s, path)? {
            Some(Entry::Dir) => return Err(ErrorKind::NotFile),
            Some(Entry::Link { inode: n }) => {
                inode::update(&mut s.cache.inodes, &s.disk.inodes, n, |mut i| {
                    i.data.extend_from_slice(data);
                    i
                });
            }
            None => {
                let n = alloc_inode(s);
                s.cache.inodes.insert(n, Inode { link_count: 0, data: data.to_vec() });
                store::put(s, path, Some(Entry::Link { inode: n }))?;
            }
        }
        Ok(Completion::Ok)
    })
}

#[instrument(level = "debug", skip(state))]
pub fn read(state: &FsState, path: &Path) -> (FsState, Completion) {
    apply(state, |s| match store::get(s, path)? {
        None => Err(ErrorKind::DoesNotExist),
        Some(Entry::Dir) => Err(ErrorKind::NotFile),
        Some(Entry::Link { inode: n }) => {
            let data = inode::get(&s.cache.inodes, &s.disk.inodes, n).map(|i| i.data.clone()).unwrap_or_default();
            Ok(Completion::OkData(data))
        }
    })
}

#[instrument(level = "debug", skip(state))]
pub fn rm(state: &FsState, path: &Path) -> (FsState, Completion) {
    apply(state, |s| {
        if path.is_root() {
            return Err(ErrorKind::CannotDissocRoot);
        }
        if store::get(s, path)?.is_none() {
            return Err(ErrorKind::DoesNotExist);
        }
        store::put(s, path, None)?;
        Ok(Completion::Ok)
    })
}

#[instrument(level = "debug", skip(state))]
pub fn mkdir(state: &FsState, path: &Path) -> (FsState, Completion) {
    apply(state, |s| {
        if store::get(s, path)?.is_some() {
            return Err(ErrorKind::Exists);
        }
        store::put(s, path, Some(Entry::Dir))?;
        Ok(Completion::Ok)
    })
}

#[instrument(level = "debug", skip(state))]
pub fn ln(state: &FsState, from: &Path, to: &Path) -> (FsState, Completion) {
    apply(state, |s| {
        let from_inode = match store::get(s, from)? {
            Some(Entry::Link { inode: n }) => n,
            _ => return Err(ErrorKind::NotFile),
        };
        let dest = match store::get(s, to)? {
            Some(Entry::Dir) => {
                let name = from.last().expect("from resolved to a Link, so it is not root");
                to.join(name)
            }
            _ => to.clone(),
        };
        if store::get(s, &dest)?.is_some() {
            return Err(ErrorKind::Exists);
        }
        store::put(s, &dest, Some(Entry::Link { inode: from_inode }))?;
        Ok(Completion::Ok)
    })
}

fn mv_inner(s: &mut FsState, from: &Path, to: &Path) -> Result<Completion> {
    let from_entry = store::get(s, from)?.ok_or(ErrorKind::DoesNotExist)?;

    let target = match store::get(s, to)? {
        Some(Entry::Dir) => {
            let name = from.last().ok_or(ErrorKind::DoesNotExist)?;
            to.join(name)
        }
        _ => to.clone(),
    };

    if target == *from {
        return Err(ErrorKind::SameFile);
    }

    let existing_target = store::get(s, &target)?;

    if let (Entry::Link { inode: from_inode }, Some(Entry::Link { inode: to_inode })) = (from_entry, existing_target) {
        if from_inode == to_inode {
            return Err(ErrorKind::SameFile);
        }
    }

    if let Some(existing) = existing_target {
        match (existing.is_dir(), from_entry.is_dir()) {
            (true, false) => return Err(ErrorKind::CannotOverwriteDirWithNonDir),
            (false, true) => return Err(ErrorKind::CannotOverwriteNonDirWithDir),
            _ => {}
        }
        if existing.is_dir() && !store::descendants(s, &target).is_empty() {
            return Err(ErrorKind::NotEmpty);
        }
    }

    if target.is_child_of(from) {
        return Err(ErrorKind::CannotMoveInsideSelf);
    }

    let moved_descendants = store::descendants(s, from);

    store::put(s, from, None)?;
    store::put(s, &target, Some(from_entry))?;
    for (descendant_path, descendant_entry) in moved_descendants {
        let relative = descendant_path.strip_prefix(from).expect("collected as a descendant of from");
        let new_path = target.extend(relative);
        store::put(s, &new_path, Some(descendant_entry))?;
    }

    Ok(Completion::Ok)
}

#[instrument(level = "debug", skip(state))]
pub fn mv(state: &FsState, from: &Path, to: &Path) -> (FsState, Completion) {
    let mut new_state = state.clone();
    match mv_inner(&mut new_state, from, to) {
        Ok(completion) => {
            fsync::promote_metadata(&mut new_state);
            (new_state, completion)
        }
        Err(ErrorKind::NotDir) => (state.clone(), Completion::Fail(ErrorKind::DoesNotExist)),
        Err(e) => (state.clone(), Completion::Fail(e)),
    }
}

#[instrument(level = "debug", skip(state))]
pub fn truncate(state: &FsState, path: &Path, delta: i64) -> (FsState, Completion) {
    apply(state, |s| {
        let n = match store::get(s, path)? {
            Some(Entry::Dir) => return Err(ErrorKind::NotFile),
            Some(Entry::Link { inode: n }) => n,
            None => {
                let n = alloc_inode(s);
                s.cache.inodes.insert(n, Inode::empty());
                store::put(s, path, Some(Entry::Link { inode: n }))?;
                n
            }
        };
        inode::update(&mut s.cache.inodes, &s.disk.inodes, n, |mut i| {
            let old_size = i64::try_from(i.data.len()).unwrap_or(i64::MAX);
            let new_size = usize::try_from((old_size + delta).max(0)).unwrap_or(usize::MAX);
            i.data.resize(new_size, 0);
            i
        });
        Ok(Completion::Ok)
    })
}

#[instrument(level = "debug", skip(state))]
pub fn fsync(state: &FsState, path: &Path) -> (FsState, Completion) {
    apply(state, |s| {
        match store::get(s, path)? {
            Some(Entry::Link { inode: n }) => inode::fsync_inode(&mut s.cache.inodes, &mut s.disk.inodes, n),
            Some(Entry::Dir) => {}
            None => return Err(ErrorKind::DoesNotExist),
        }
        Ok(Completion::Ok)
    })
}

#[instrument(level = "info", skip(state))]
pub fn lose_unfsynced_writes(state: &FsState) -> (FsState, Completion) {
    let mut new_state = state.clone();
    fsync::lose_unfsynced_writes(&mut new_state);
    (new_state, Completion::Ok)
}
