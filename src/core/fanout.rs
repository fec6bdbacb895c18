//! Fan-out index: dataset identity → every live copy
//!
//! After classification the same dataset exists in several places at once:
//! the canonical registry entry plus one embedded copy per widget it feeds.
//! The index maps an identity to stable handles for all of them, so one
//! incoming value updates every copy in O(copies) without scanning the
//! model.
//!
//! Handles are (collection, slot) coordinates rather than references: the
//! index is only built after every collection has reached its final size,
//! and any structural mutation invalidates it wholesale. It is never
//! patched incrementally.

use std::collections::HashMap;

use teledash_types::WidgetKind;

/// Stable handle to one live copy of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyHandle {
    /// The canonical entry in the dataset registry.
    Registry,
    /// A dataset embedded in a group registered under a group widget kind.
    GroupDataset {
        kind: WidgetKind,
        group: usize,
        slot: usize,
    },
    /// A dataset registered directly under a dataset widget kind.
    WidgetDataset { kind: WidgetKind, slot: usize },
}

/// Identity → copies map, rebuilt in full on every reconfiguration.
#[derive(Debug, Default)]
pub struct FanoutIndex {
    copies: HashMap<u32, Vec<CopyHandle>>,
}

impl FanoutIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more live copy of `unique_id`.
    pub fn register(&mut self, unique_id: u32, handle: CopyHandle) {
        self.copies.entry(unique_id).or_default().push(handle);
    }

    /// All live copies of `unique_id`.
    ///
    /// `None` for an identity the hot path expects to find means the model
    /// is stale; the caller must force a full reset-and-reclassify before
    /// continuing.
    pub fn copies(&self, unique_id: u32) -> Option<&[CopyHandle]> {
        self.copies.get(&unique_id).map(|v| v.as_slice())
    }

    pub fn contains(&self, unique_id: u32) -> bool {
        self.copies.contains_key(&unique_id)
    }

    /// Number of distinct identities tracked.
    pub fn len(&self) -> usize {
        self.copies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    pub fn clear(&mut self) {
        self.copies.clear();
    }
}
