//! Per-bin lists of every cell that contributed to a bin.
//!
//! Lists live in one arena: each bin stores the head of a singly linked list
//! and entries are appended at the tail, so a bin's candidates come back in
//! arrival order.

use crate::camera_cell::CellRef;

const NONE: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct Entry {
    source: CellRef,
    next: usize,
}

/// Candidate cells per lattice bin.
#[derive(Debug, Clone)]
pub struct CellList {
    heads: Vec<usize>,
    tails: Vec<usize>,
    entries: Vec<Entry>,
}

impl CellList {
    /// Creates empty lists for `num_bins` bins.
    pub fn new(num_bins: usize) -> Self {
        Self {
            heads: vec![NONE; num_bins],
            tails: vec![NONE; num_bins],
            entries: Vec::new(),
        }
    }

    pub fn num_bins(&self) -> usize {
        self.heads.len()
    }

    /// Total number of recorded candidates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends `source` to the list of `bin`.
    pub fn push(&mut self, bin: usize, source: CellRef) {
        let index = self.entries.len();
        self.entries.push(Entry { source, next: NONE });
        match self.tails[bin] {
            NONE => self.heads[bin] = index,
            tail => self.entries[tail].next = index,
        }
        self.tails[bin] = index;
    }

    /// Candidates of `bin`, in arrival order.
    pub fn candidates(&self, bin: usize) -> Candidates<'_> {
        Candidates {
            list: self,
            cursor: self.heads[bin],
        }
    }

    /// Appends the lists of `other` after the bins of `self`.
    pub fn append(&mut self, other: &CellList) {
        let offset = self.heads.len();
        self.heads.resize(offset + other.num_bins(), NONE);
        self.tails.resize(offset + other.num_bins(), NONE);
        for bin in 0..other.num_bins() {
            for source in other.candidates(bin) {
                self.push(offset + bin, source);
            }
        }
    }
}

/// Iterator over one bin's candidates.
pub struct Candidates<'a> {
    list: &'a CellList,
    cursor: usize,
}

impl Iterator for Candidates<'_> {
    type Item = CellRef;

    fn next(&mut self) -> Option<CellRef> {
        if self.cursor == NONE {
            return None;
        }
        let entry = self.list.entries[self.cursor];
        self.cursor = entry.next;
        Some(entry.source)
    }
}
