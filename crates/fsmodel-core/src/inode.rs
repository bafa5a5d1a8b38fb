//! Inode table: allocation, reference counting, and the cache/disk overlay.
//!
//! Reworked from the teacher's `oxcrypt-fuse::inode::InodeTable` (a
//! `DashMap`-backed, concurrently-accessed table keyed by an atomically
//! allocated inode number) into a plain, single-threaded table that hands
//! back new state by value — `spec.md` §5 requires the model to be pure
//! and single-threaded, so there is no need for interior mutability or
//! locking here.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A content-bearing file object, referenced by zero or more hard links.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Inode {
    pub link_count: u32,
    pub data: Vec<u8>,
}

impl Inode {
    #[must_use]
    pub fn empty() -> Self {
        Inode { link_count: 0, data: Vec::new() }
    }
}

/// Newtype over the raw inode id, allocated monotonically from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InodeNumber(pub u64);

/// One overlay layer's worth of inodes (`disk` or `cache`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InodeLayer {
    inodes: HashMap<InodeNumber, Inode>,
}

impl InodeLayer {
    #[must_use]
    pub fn get(&self, n: InodeNumber) -> Option<&Inode> {
        self.inodes.get(&n)
    }

    pub fn insert(&mut self, n: InodeNumber, inode: Inode) {
        self.inodes.insert(n, inode);
    }

    pub fn remove(&mut self, n: InodeNumber) -> Option<Inode> {
        self.inodes.remove(&n)
    }

    pub fn contains(&self, n: InodeNumber) -> bool {
        self.inodes.contains_key(&n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InodeNumber, &Inode)> {
        self.inodes.iter().map(|(k, v)| (*k, v))
    }
}

/// Reads an inode through the cache-then-disk overlay: cache is consulted
/// first, then disk.
#[must_use]
pub fn get<'a>(cache: &'a InodeLayer, disk: &'a InodeLayer, n: InodeNumber) -> Option<&'a Inode> {
    cache.get(n).or_else(|| disk.get(n))
}

/// Applies `f` to the current overlay value of inode `n`, storing the
/// result in `cache` (copying the disk value forward first if `n` is only
/// present on disk — copy-on-write).
pub fn update(cache: &mut InodeLayer, disk: &InodeLayer, n: InodeNumber, f: impl FnOnce(Inode) -> Inode) {
    let current = cache.get(n).or_else(|| disk.get(n)).cloned().unwrap_or_default();
    cache.insert(n, f(current));
}

/// Adds `delta` to `n`'s `link_count` in `cache`. If `strict` and `n` is
/// missing from both layers, returns `false` without allocating it;
/// non-strict callers silently ignore a missing inode (used during
/// directory-replacement tombstoning sweeps, where a dangling link may
/// already have been healed away).
pub fn adjust_link_count(cache: &mut InodeLayer, disk: &InodeLayer, n: InodeNumber, delta: i64, strict: bool) -> bool {
    let Some(current) = cache.get(n).or_else(|| disk.get(n)).cloned() else {
        return !strict;
    };
    let new_count = i64::from(current.link_count) + delta;
    let new_count = u32::try_from(new_count.max(0)).unwrap_or(u32::MAX);
    cache.insert(n, Inode { link_count: new_count, ..current });
    true
}

/// Moves `n`'s cache inode into `disk` (overwriting), or if its cached
/// `link_count == 0`, destroys it in both layers. Clears the cache slot
/// either way. No-op if `n` is not present in `cache`.
pub fn fsync_inode(cache: &mut InodeLayer, disk: &mut InodeLayer, n: InodeNumber) {
    let Some(inode) = cache.remove(n) else { return };
    if inode.link_count == 0 {
        disk.remove(n);
    } else {
        disk.insert(n, inode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_prefers_cache_over_disk() {
        let mut disk = InodeLayer::default();
        let mut cache = InodeLayer::default();
        let n = InodeNumber(0);
        disk.insert(n, Inode { link_count: 1, data: vec![1] });
        cache.insert(n, Inode { link_count: 1, data: vec![2] });
        assert_eq!(get(&cache, &disk, n).unwrap().data, vec![2]);
    }

    #[test]
    fn fsync_zero_link_count_destroys_inode() {
        let mut disk = InodeLayer::default();
        let mut cache = InodeLayer::default();
        let n = InodeNumber(0);
        disk.insert(n, Inode { link_count: 1, data: vec![1] });
        cache.insert(n, Inode { link_count: 0, data: vec![1] });
        fsync_inode(&mut cache, &mut disk, n);
        assert!(!disk.contains(n));
        assert!(!cache.contains(n));
    }

    #[test]
    fn fsync_promotes_cache_into_disk() {
        let mut disk = InodeLayer::default();
        let mut cache = InodeLayer::default();
        let n = InodeNumber(0);
        cache.insert(n, Inode { link_count: 1, data: vec![9] });
        fsync_inode(&mut cache, &mut disk, n);
        assert_eq!(disk.get(n).unwrap().data, vec![9]);
        assert!(!cache.contains(n));
    }

    #[test]
    fn adjust_link_count_non_strict_ignores_missing() {
        let disk = InodeLayer::default();
        let mut cache = InodeLayer::default();
        assert!(adjust_link_count(&mut cache, &disk, InodeNumber(5), 1, false));
        assert!(!cache.contains(InodeNumber(5)));
    }

    #[test]
    fn adjust_link_count_strict_fails_on_missing() {
        let disk = InodeLayer::default();
        let mut cache = InodeLayer::default();
        assert!(!adjust_link_count(&mut cache, &disk, InodeNumber(5), 1, true));
    }
}
