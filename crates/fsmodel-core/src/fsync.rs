//! Fsync / crash engine (`spec.md` §4.5): per-inode fsync (see
//! [`crate::inode::fsync_inode`]), the automatic metadata fsync that
//! follows every successful operation, and crash-and-recovery
//! (`lose_unfsynced_writes`).
//!
//! This module has no direct counterpart in the teacher crate — the
//! teacher's own crash handling is "rely on the OS page cache", since
//! `oxcrypt-fuse` doesn't implement its own write-back layer with
//! synthetic crash semantics. It is written in the same plain,
//! `Result`-free (these functions cannot fail) style as the rest of the
//! model, per `spec.md` §4.5/§9.

use std::collections::HashMap;

use crate::entry::Entry;
use crate::inode::{Inode, InodeNumber};
use crate::state::{FsState, Layer};

/// Promotes every cache entry into disk: a non-tombstone cache entry
/// replaces any disk entry at its path; a tombstone removes the disk
/// entry at its path. Inodes are untouched. Run after every successful
/// state-mutating operation — this is lazyfs's write-through metadata
/// policy.
pub fn promote_metadata(state: &mut FsState) {
    let cache_entries = std::mem::take(&mut state.cache.entries);
    for (path, entry) in cache_entries {
        match entry {
            Entry::Tombstone => {
                state.disk.entries.remove(&path);
            }
            other => {
                state.disk.entries.insert(path, other);
            }
        }
    }
}

/// Models a crash: discards the entire cache layer (entries and inodes).
/// Repairs any disk `Link` whose inode no longer exists on disk by
/// allocating a fresh empty inode for it (preserving invariant I1), then
/// recomputes every disk inode's `link_count` from the multiset of
/// disk-link references, removing any inode whose count falls to zero.
pub fn lose_unfsynced_writes(state: &mut FsState) {
    state.cache = Layer::default();

    let dangling: Vec<InodeNumber> = state
        .disk
        .entries
        .values()
        .filter_map(|e| match e {
            Entry::Link { inode } if !state.disk.inodes.contains(*inode) => Some(*inode),
            _ => None,
        })
        .collect();
    for n in dangling {
        state.disk.inodes.insert(n, Inode::empty());
    }

    let mut referenced: HashMap<InodeNumber, u32> = HashMap::new();
    for e in state.disk.entries.values() {
        if let Entry::Link { inode } = e {
            *referenced.entry(*inode).or_insert(0) += 1;
        }
    }

    let existing: Vec<InodeNumber> = state.disk.inodes.iter().map(|(n, _)| n).collect();
    for n in existing {
        match referenced.get(&n).copied() {
            None | Some(0) => {
                state.disk.inodes.remove(n);
            }
            Some(count) => {
                let inode = state.disk.inodes.get(n).expect("just iterated").clone();
                state.disk.inodes.insert(n, Inode { link_count: count, ..inode });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;

    #[test]
    fn promote_metadata_clears_cache_and_writes_disk() {
        let mut state = FsState::new();
        let n = InodeNumber(0);
        state.cache.inodes.insert(n, Inode { link_count: 1, data: vec![1, 2] });
        state.cache.entries.insert(Path::new(["a"]), Entry::Link { inode: n });
        promote_metadata(&mut state);
        assert!(state.cache.entries.is_empty());
        assert_eq!(state.disk.entries.get(&Path::new(["a"])), Some(&Entry::Link { inode: n }));
        // Data itself is not promoted by the metadata fsync.
        assert!(!state.disk.inodes.contains(n));
    }

    #[test]
    fn lose_unfsynced_writes_heals_dangling_links_with_empty_inodes() {
        let mut state = FsState::new();
        let n = InodeNumber(0);
        // Promote the link to disk but never fsync the inode's data.
        state.disk.entries.insert(Path::new(["a"]), Entry::Link { inode: n });
        lose_unfsynced_writes(&mut state);
        assert_eq!(state.disk.inodes.get(n), Some(&Inode::empty()));
    }

    #[test]
    fn lose_unfsynced_writes_rebuilds_link_counts_and_drops_orphans() {
        let mut state = FsState::new();
        let n = InodeNumber(0);
        let orphan = InodeNumber(1);
        state.disk.entries.insert(Path::new(["a"]), Entry::Link { inode: n });
        state.disk.entries.insert(Path::new(["b"]), Entry::Link { inode: n });
        state.disk.inodes.insert(n, Inode { link_count: 99, data: vec![7] });
        state.disk.inodes.insert(orphan, Inode { link_count: 1, data: vec![] });
        lose_unfsynced_writes(&mut state);
        assert_eq!(state.disk.inodes.get(n).unwrap().link_count, 2);
        assert!(!state.disk.inodes.contains(orphan));
    }

    #[test]
    fn lose_unfsynced_writes_is_idempotent() {
        let mut state = FsState::new();
        let n = InodeNumber(0);
        state.disk.entries.insert(Path::new(["a"]), Entry::Link { inode: n });
        lose_unfsynced_writes(&mut state);
        let once = state.clone();
        lose_unfsynced_writes(&mut state);
        assert_eq!(state, once);
    }
}
