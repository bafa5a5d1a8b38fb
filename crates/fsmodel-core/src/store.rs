//! Entry store: the cache/disk overlay over path→entry, plus directory
//! traversal via path-prefix enumeration.
//!
//! Grounded on the overlay discipline in `oxcrypt-core::vault::cache`
//! (a faster layer masking a slower one) combined with the explicit
//! Design Note in `spec.md` §9 rejecting a class-hierarchy model of the
//! overlay: here it is just two `BTreeMap<Path, Entry>`s plus the
//! `Entry::Tombstone` variant, so `(absent, tombstoned-in-cache-over-
//! present-on-disk, present)` stay three distinct, directly observable
//! states rather than being collapsed into one.

use crate::entry::Entry;
use crate::error::{ErrorKind, Result};
use crate::inode;
use crate::path::Path;
use crate::state::FsState;

/// Raw overlay lookup with no directory-ness checks: cache, then disk.
fn resolve_raw(state: &FsState, path: &Path) -> Option<Entry> {
    state
        .cache
        .entries
        .get(path)
        .copied()
        .or_else(|| state.disk.entries.get(path).copied())
}

/// Overlay lookup for `path`. A cache `Tombstone` or a miss in both layers
/// is reported as absent (`Ok(None)`); additionally, on a miss, the parent
/// must resolve to a directory or this fails with `NotDir`.
pub fn get(state: &FsState, path: &Path) -> Result<Option<Entry>> {
    if path.is_root() {
        return Ok(Some(Entry::Dir));
    }
    match resolve_raw(state, path) {
        Some(Entry::Tombstone) | None => {
            if let Some(parent) = path.parent() {
                if let Some(parent_entry) = resolve_raw(state, &parent) {
                    if !parent_entry.is_tombstone() && !parent_entry.is_dir() {
                        return Err(ErrorKind::NotDir);
                    }
                }
            }
            Ok(None)
        }
        Some(e) => Ok(Some(e)),
    }
}

/// All entries whose path is a (strict, any-depth) descendant of `path`,
/// resolved through the overlay and sorted by path. Used both for
/// directory listing and, internally, for the recursive sweeps `put` and
/// `ops::mv` need.
#[must_use]
pub fn descendants(state: &FsState, path: &Path) -> Vec<(Path, Entry)> {
    let mut result: std::collections::BTreeMap<Path, Entry> = std::collections::BTreeMap::new();
    for (p, e) in &state.disk.entries {
        if p.is_child_of(path) {
            result.insert(p.clone(), *e);
        }
    }
    for (p, e) in &state.cache.entries {
        if p.is_child_of(path) {
            if e.is_tombstone() {
                result.remove(p);
            } else {
                result.insert(p.clone(), *e);
            }
        }
    }
    result.into_iter().collect()
}

/// Sets the cache entry at `path`. `entry = None` stores a `Tombstone`.
///
/// Verifies the parent exists and is a directory in the overlay
/// (`DoesNotExist`/`NotDir`). Adjusts link counts for the old and new
/// resolved entries. If the replaced entry was a `Dir` and the new one is
/// not, stamps `Tombstone` on every overlay descendant of `path` first,
/// releasing each descendant `Link`'s reference on its inode the same way
/// a direct removal would (dropping a cache-only inode that reaches zero),
/// so invariant I3 (`spec.md` §3) holds for subtree removals too.
pub fn put(state: &mut FsState, path: &Path, entry: Option<Entry>) -> Result<()> {
    if path.is_root() {
        return Err(ErrorKind::CannotDissocRoot);
    }
    let parent = path.parent().expect("non-root path always has a parent");
    match get(state, &parent)? {
        Some(Entry::Dir) => {}
        Some(_) => return Err(ErrorKind::NotDir),
        None => return Err(ErrorKind::DoesNotExist),
    }

    let old = get(state, path)?;

    if let Some(Entry::Link { inode: n }) = old {
        inode::adjust_link_count(&mut state.cache.inodes, &state.disk.inodes, n, -1, false);
    }
    if let Some(Entry::Link { inode: n }) = entry {
        if !inode::adjust_link_count(&mut state.cache.inodes, &state.disk.inodes, n, 1, true) {
            return Err(ErrorKind::NoSuchInode);
        }
    }

    if matches!(old, Some(Entry::Dir)) && !matches!(entry, Some(Entry::Dir)) {
        for (descendant_path, descendant_entry) in descendants(state, path) {
            if let Entry::Link { inode: n } = descendant_entry {
                inode::adjust_link_count(&mut state.cache.inodes, &state.disk.inodes, n, -1, false);
                if !state.disk.inodes.contains(n) && state.cache.inodes.get(n).is_some_and(|i| i.link_count == 0) {
                    state.cache.inodes.remove(n);
                }
            }
            state.cache.entries.insert(descendant_path, Entry::Tombstone);
        }
    }

    state.cache.entries.insert(path.clone(), entry.unwrap_or(Entry::Tombstone));
    Ok(())
}
