//! Filesystem state: `next_inode_number` plus a `disk` and `cache` layer
//! (`spec.md` §3).

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::inode::InodeLayer;
use crate::path::Path;

/// One overlay layer: its own entry map and its own inode table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Layer {
    pub entries: BTreeMap<Path, Entry>,
    pub inodes: InodeLayer,
}

/// The full filesystem state: a write-back `cache` overlaying a
/// persistent `disk`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FsState {
    pub next_inode_number: u64,
    pub disk: Layer,
    pub cache: Layer,
}

impl FsState {
    /// An empty filesystem: just the root directory on disk.
    #[must_use]
    pub fn new() -> Self {
        let mut disk = Layer::default();
        disk.entries.insert(Path::root(), Entry::Dir);
        FsState { next_inode_number: 0, disk, cache: Layer::default() }
    }
}

impl Default for FsState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_root_dir_on_disk() {
        let state = FsState::new();
        assert_eq!(state.disk.entries.get(&Path::root()), Some(&Entry::Dir));
        assert!(state.cache.entries.is_empty());
        assert_eq!(state.next_inode_number, 0);
    }
}
