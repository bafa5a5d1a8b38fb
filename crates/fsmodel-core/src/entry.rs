//! Directory entry variants.
//!
//! A [`Tombstone`](Entry::Tombstone) is a first-class entry variant, not a
//! sentinel wrapped around another type: it is how the cache layer
//! distinguishes "deleted here, but maybe present on disk" from "absent
//! everywhere" (`spec.md` §9).

use crate::inode::InodeNumber;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One directory entry: a directory marker, a hard link to an inode (a
/// "file"), or a cache-layer deletion marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Entry {
    /// A directory. Children are discovered by path-prefix enumeration
    /// over the entry store, not nested inside this variant.
    Dir,
    /// A hard link naming an inode. This is what "a file" means here.
    Link { inode: InodeNumber },
    /// Marks that a cache has deleted a path that may still exist on disk.
    Tombstone,
}

impl Entry {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self, Entry::Dir)
    }

    #[must_use]
    pub fn is_link(&self) -> bool {
        matches!(self, Entry::Link { .. })
    }

    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Entry::Tombstone)
    }

    #[must_use]
    pub fn inode(&self) -> Option<InodeNumber> {
        match self {
            Entry::Link { inode } => Some(*inode),
            _ => None,
        }
    }
}
