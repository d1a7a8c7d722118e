//! Applying a matrix row to a candidate list.

use crate::latin::OrderMatrix;
use crate::model::DocId;

/// Outcome of placing candidates with one matrix row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The first `n` candidates, reordered by matrix row `row`.
    Permuted { doc_ids: Vec<DocId>, row: usize },
    /// Fewer than `n` candidates: returned as given.
    Unpermuted { doc_ids: Vec<DocId> },
    /// Nothing to place.
    Empty,
}

impl Placement {
    pub fn doc_ids(&self) -> &[DocId] {
        match self {
            Self::Permuted { doc_ids, .. } | Self::Unpermuted { doc_ids } => doc_ids,
            Self::Empty => &[],
        }
    }

    pub fn into_doc_ids(self) -> Vec<DocId> {
        match self {
            Self::Permuted { doc_ids, .. } | Self::Unpermuted { doc_ids } => doc_ids,
            Self::Empty => Vec::new(),
        }
    }
}

/// Reorder `candidates` by a 1-based permutation: `out[i] = candidates[perm[i] - 1]`.
///
/// Matrix rows are permutations of `1..=n` and `place` only passes slices of
/// at least `n` candidates, so every index is in bounds.
fn apply_row(candidates: &[DocId], perm: &[usize]) -> Vec<DocId> {
    perm.iter().map(|&p| candidates[p - 1]).collect()
}

/// Place `candidates` using row `row` of `matrix`.
///
/// `row` is taken modulo the matrix dimension, so any mapper output is safe.
pub fn place(candidates: &[DocId], matrix: &OrderMatrix, row: usize) -> Placement {
    let n = matrix.dimension();
    if candidates.is_empty() {
        return Placement::Empty;
    }
    if candidates.len() < n {
        return Placement::Unpermuted {
            doc_ids: candidates.to_vec(),
        };
    }
    let row = row % n;
    Placement::Permuted {
        doc_ids: apply_row(&candidates[..n], &matrix.rows()[row]),
        row,
    }
}
