//! Page ledger
//!
//! The ledger mirrors the live document's page order. Entry `i` describes
//! the page currently at position `i`: the 1-based page number it had when
//! the document was uploaded, and its current rotation.

use crate::rotation::Rotation;

/// Provenance and rotation of one live page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRecord {
    /// Page number (1-indexed) at upload time
    pub original_index: u32,
    pub rotation: Rotation,
}

impl PageRecord {
    /// Display label used by the page listing, e.g. `p.3`
    pub fn label(&self) -> String {
        format!("p.{}", self.original_index)
    }
}

/// Ordered list of [`PageRecord`]s, one per page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    records: Vec<PageRecord>,
}

impl Ledger {
    /// Pair persisted original indices with rotations read from the document.
    ///
    /// Both slices describe the same page sequence, so they must have the
    /// same length.
    pub fn from_parts(original_indices: &[u32], rotations: &[Rotation]) -> Option<Self> {
        if original_indices.len() != rotations.len() {
            return None;
        }
        let records = original_indices
            .iter()
            .zip(rotations)
            .map(|(&original_index, &rotation)| PageRecord {
                original_index,
                rotation,
            })
            .collect();
        Some(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PageRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[PageRecord] {
        &self.records
    }

    pub fn original_indices(&self) -> Vec<u32> {
        self.records.iter().map(|r| r.original_index).collect()
    }

    pub fn rotations(&self) -> Vec<Rotation> {
        self.records.iter().map(|r| r.rotation).collect()
    }

    pub(crate) fn set_rotation(&mut self, index: usize, rotation: Rotation) {
        if let Some(record) = self.records.get_mut(index) {
            record.rotation = rotation;
        }
    }

    pub(crate) fn remove(&mut self, index: usize) -> PageRecord {
        self.records.remove(index)
    }

    /// Pop the record at `from` and reinsert it at `to` of the shortened list
    pub(crate) fn move_record(&mut self, from: usize, to: usize) {
        let record = self.records.remove(from);
        self.records.insert(to, record);
    }
}

/// The ledger of a freshly uploaded document: pages `1..=page_count`
pub fn initial_indices(page_count: usize) -> Vec<u32> {
    (1..=page_count as u32).collect()
}
