//! B+ tree range scan engine.
//!
//! A scan normalizes its operator pair to a closed interval `[lb, ub]`,
//! descends to the first leaf entry with `key >= lb`, and then walks the
//! leaf sibling chain. Between `scan_next` calls the current leaf stays
//! pinned; that pin is the cursor. Completion is deliver-then-defer: the
//! call that reads the final in-range RID still returns it, and the call
//! after that fails with IndexScanCompleted.

use super::constants::{KEY_SENTINEL, LEAF_FANOUT};
use super::index::BTreeIndex;
use super::node::{InternalNode, LeafNode};
use crate::bufmgr::PinnedPage;
use brindle_common::page::{PageNo, INVALID_PAGE_NO};
use brindle_common::{BrindleError, RecordId, Result};

/// Comparison operator bounding one end of a range scan.
///
/// The low bound takes `Gt`/`Gte`, the high bound `Lt`/`Lte`; any other
/// pairing fails with BadOpcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOp {
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Greater than or equal.
    Gte,
    /// Strictly greater than.
    Gt,
}

/// State of an active range scan.
pub(super) struct ScanState {
    /// Inclusive upper bound after operator normalization.
    upper_bound: i32,
    /// Position of the next entry to deliver. None once the scan has run
    /// past its last match; the following `scan_next` reports completion.
    cursor: Option<Cursor>,
}

/// The scan's position: a pinned leaf and the next slot within it.
struct Cursor {
    leaf: PinnedPage,
    next_entry: usize,
}

/// Outcome of probing one leaf for the scan origin.
enum LeafProbe {
    /// Slot of the first entry within the range.
    Origin(usize),
    /// A key above the upper bound was reached first; no match exists.
    PastUpper,
    /// Every entry is below the lower bound; continue at this sibling.
    NextLeaf(PageNo),
}

impl BTreeIndex {
    /// Starts a range scan over keys in the interval described by the two
    /// operator/value pairs.
    ///
    /// Fails with BadOpcodes for an invalid operator pairing, BadScanRange
    /// when `low_val > high_val`, and NoSuchKeyFound when no key falls in
    /// the interval. Any active scan is ended first. On failure no scan is
    /// active and no page remains pinned.
    pub fn start_scan(
        &mut self,
        low_val: i32,
        low_op: ScanOp,
        high_val: i32,
        high_op: ScanOp,
    ) -> Result<()> {
        if !matches!(low_op, ScanOp::Gt | ScanOp::Gte) || !matches!(high_op, ScanOp::Lt | ScanOp::Lte)
        {
            return Err(BrindleError::BadOpcodes);
        }
        if low_val > high_val {
            return Err(BrindleError::BadScanRange {
                low: low_val,
                high: high_val,
            });
        }

        // Drop any previous scan's cursor pin before descending.
        self.scan = None;

        // Normalize to a closed interval.
        let lb = if low_op == ScanOp::Gt {
            low_val.saturating_add(1)
        } else {
            low_val
        };
        let ub = if high_op == ScanOp::Lt {
            high_val.saturating_sub(1)
        } else {
            high_val
        };

        let leaf_no = self.descend_to_leaf(lb)?;
        let mut leaf = self.bufmgr().read_page(self.file_id(), leaf_no)?;

        // Walk the leaf chain for the first entry with key >= lb. Sentinel
        // slots read as KEY_SENTINEL and terminate through the PastUpper
        // arm like any other key above the bound.
        loop {
            let probe = leaf.read(|data| {
                for slot in 0..LEAF_FANOUT {
                    let key = LeafNode::key(data, slot);
                    if key > ub {
                        return LeafProbe::PastUpper;
                    }
                    if key >= lb {
                        return LeafProbe::Origin(slot);
                    }
                }
                LeafProbe::NextLeaf(LeafNode::right_sibling(data))
            });

            match probe {
                LeafProbe::Origin(slot) => {
                    self.scan = Some(ScanState {
                        upper_bound: ub,
                        cursor: Some(Cursor {
                            leaf,
                            next_entry: slot,
                        }),
                    });
                    return Ok(());
                }
                LeafProbe::PastUpper => return Err(BrindleError::NoSuchKeyFound),
                LeafProbe::NextLeaf(INVALID_PAGE_NO) => {
                    return Err(BrindleError::NoSuchKeyFound)
                }
                LeafProbe::NextLeaf(sibling) => {
                    leaf = self.bufmgr().read_page(self.file_id(), sibling)?;
                }
            }
        }
    }

    /// Descends from the root to the leaf that would contain `lb`.
    ///
    /// At each internal node the child taken is the one whose key range
    /// admits `lb`. A missing child pointer means no subtree can hold a
    /// matching key.
    fn descend_to_leaf(&self, lb: i32) -> Result<PageNo> {
        let mut page = self
            .bufmgr()
            .read_page(self.file_id(), self.root_page_no())?;

        loop {
            let (level, child) = page.read(|data| {
                let slot = InternalNode::search_child(data, lb);
                (InternalNode::level(data), InternalNode::child(data, slot))
            });

            if child == INVALID_PAGE_NO {
                return Err(BrindleError::NoSuchKeyFound);
            }
            if level == 1 {
                return Ok(child);
            }

            page = self.bufmgr().read_page(self.file_id(), child)?;
        }
    }

    /// Returns the RID of the next matching entry and advances the cursor.
    ///
    /// Fails with ScanNotInitialized when no scan is active and with
    /// IndexScanCompleted once the scan has moved past its final match.
    pub fn scan_next(&mut self) -> Result<RecordId> {
        let bufmgr = std::sync::Arc::clone(self.bufmgr());
        let file_id = self.file_id();

        let state = self
            .scan
            .as_mut()
            .ok_or(BrindleError::ScanNotInitialized)?;
        let cursor = state
            .cursor
            .as_mut()
            .ok_or(BrindleError::IndexScanCompleted)?;

        let rid = cursor.leaf.read(|data| LeafNode::rid(data, cursor.next_entry));

        // Advance. Running off the used slots of this leaf moves the
        // cursor to the right sibling; running off the chain, or onto a
        // key above the bound, closes the cursor so the next call reports
        // completion.
        cursor.next_entry += 1;
        let sibling = cursor.leaf.read(|data| {
            if cursor.next_entry >= LEAF_FANOUT
                || LeafNode::key(data, cursor.next_entry) == KEY_SENTINEL
            {
                Some(LeafNode::right_sibling(data))
            } else {
                None
            }
        });

        match sibling {
            Some(INVALID_PAGE_NO) => {
                state.cursor = None;
                return Ok(rid);
            }
            Some(next_leaf) => {
                cursor.leaf = bufmgr.read_page(file_id, next_leaf)?;
                cursor.next_entry = 0;
            }
            None => {}
        }

        let next_key = cursor
            .leaf
            .read(|data| LeafNode::key(data, cursor.next_entry));
        if next_key > state.upper_bound {
            state.cursor = None;
        }

        Ok(rid)
    }

    /// Ends the active scan, releasing the cursor's pin.
    ///
    /// Fails with ScanNotInitialized if no scan is active.
    pub fn end_scan(&mut self) -> Result<()> {
        match self.scan.take() {
            Some(_) => Ok(()),
            None => Err(BrindleError::ScanNotInitialized),
        }
    }
}
