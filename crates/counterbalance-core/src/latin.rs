//! Order matrices for counterbalanced presentation.
//!
//! Two constructions are provided and they are not interchangeable:
//!
//! - [`LatinSquare::cyclic`] builds a true Latin square. Every row *and every
//!   column* is a permutation of `1..=n`, so across `n` participants each
//!   document occupies each presentation slot exactly once.
//! - [`SampledOrders::generate`] picks `n` distinct permutations spaced evenly
//!   through the lexicographic enumeration of all `n!` orders. Rows are
//!   distinct permutations, but columns are generally *not* balanced: some
//!   documents land in the same slot for several rows.
//!
//! [`OrderMatrix`] wraps either one so the assignment service can be driven
//! by configuration while callers can still ask which guarantee they hold.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest `n` for which `n!` fits in a `u64`.
pub const MAX_SAMPLED_SIZE: usize = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SquareError {
    #[error("order matrix size must be positive, got {n}")]
    InvalidSize { n: usize },

    #[error("sampled construction supports n <= {max}, got {n}")]
    TooLarge { n: usize, max: usize },

    #[error("row {row} is not a permutation of 1..={n}")]
    RowNotPermutation { row: usize, n: usize },

    #[error("column {col} is not a permutation of 1..={n}")]
    ColumnNotPermutation { col: usize, n: usize },

    #[error("expected {expected} cells in row {row}, found {found}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Which construction to use when building an [`OrderMatrix`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Construction {
    /// Cyclic shift: a true Latin square.
    #[default]
    Cyclic,
    /// Evenly spaced lexicographic permutations: distinct rows only.
    Sampled,
}

impl std::str::FromStr for Construction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cyclic" => Ok(Self::Cyclic),
            "sampled" => Ok(Self::Sampled),
            other => Err(format!("unknown construction '{other}' (expected cyclic or sampled)")),
        }
    }
}

/// Check that `seq` contains each of `1..=n` exactly once.
pub fn is_permutation_of_1_to_n(seq: &[usize], n: usize) -> bool {
    if seq.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &v in seq {
        if v == 0 || v > n || seen[v - 1] {
            return false;
        }
        seen[v - 1] = true;
    }
    true
}

/// An immutable n×n Latin square over the symbols `1..=n`.
///
/// Values of this type always satisfy the Latin property: the only ways to
/// obtain one are [`cyclic`](Self::cyclic) and the validating
/// [`from_rows`](Self::from_rows).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatinSquare {
    rows: Vec<Vec<usize>>,
}

impl LatinSquare {
    /// Build the cyclic square `cell[i][j] = ((i + j) mod n) + 1`.
    pub fn cyclic(n: usize) -> Result<Self, SquareError> {
        if n == 0 {
            return Err(SquareError::InvalidSize { n });
        }
        let rows = (0..n)
            .map(|i| (0..n).map(|j| (i + j) % n + 1).collect())
            .collect();
        Ok(Self { rows })
    }

    /// Accept an externally supplied grid after checking the Latin property.
    pub fn from_rows(rows: Vec<Vec<usize>>) -> Result<Self, SquareError> {
        let square = Self { rows };
        square.verify()?;
        Ok(square)
    }

    /// Check every row and column. Always `Ok` for values built by this module.
    pub fn verify(&self) -> Result<(), SquareError> {
        let n = self.rows.len();
        if n == 0 {
            return Err(SquareError::InvalidSize { n });
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != n {
                return Err(SquareError::Ragged {
                    row: i,
                    expected: n,
                    found: row.len(),
                });
            }
            if !is_permutation_of_1_to_n(row, n) {
                return Err(SquareError::RowNotPermutation { row: i, n });
            }
        }
        for col in 0..n {
            let column: Vec<usize> = self.rows.iter().map(|r| r[col]).collect();
            if !is_permutation_of_1_to_n(&column, n) {
                return Err(SquareError::ColumnNotPermutation { col, n });
            }
        }
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, i: usize) -> Option<&[usize]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }
}

/// `n` distinct permutations of `1..=n`, taken at stride `n!/n` through the
/// lexicographic enumeration.
///
/// This is a weaker object than a [`LatinSquare`]: row `i` is the
/// permutation that starts with symbol `i + 1` followed by the remaining
/// symbols ascending, so columns after the first repeat symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledOrders {
    rows: Vec<Vec<usize>>,
}

impl SampledOrders {
    pub fn generate(n: usize) -> Result<Self, SquareError> {
        if n == 0 {
            return Err(SquareError::InvalidSize { n });
        }
        if n > MAX_SAMPLED_SIZE {
            return Err(SquareError::TooLarge {
                n,
                max: MAX_SAMPLED_SIZE,
            });
        }
        let stride = factorial(n) / n as u64;
        let rows = (0..n as u64)
            .map(|i| nth_lexicographic_permutation(n, i * stride))
            .collect();
        Ok(Self { rows })
    }

    pub fn dimension(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, i: usize) -> Option<&[usize]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }
}

/// Caller must keep `n <= MAX_SAMPLED_SIZE`.
fn factorial(n: usize) -> u64 {
    (1..=n as u64).product()
}

/// The `k`-th (0-based) permutation of `1..=n` in lexicographic order,
/// decoded from the factorial number system.
fn nth_lexicographic_permutation(n: usize, mut k: u64) -> Vec<usize> {
    let mut pool: Vec<usize> = (1..=n).collect();
    let mut out = Vec::with_capacity(n);
    for remaining in (1..=n).rev() {
        let block = factorial(remaining - 1);
        let idx = (k / block) as usize;
        k %= block;
        out.push(pool.remove(idx));
    }
    out
}

/// The matrix whose rows are applied as document permutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderMatrix {
    Latin(LatinSquare),
    Sampled(SampledOrders),
}

impl OrderMatrix {
    pub fn build(construction: Construction, n: usize) -> Result<Self, SquareError> {
        let matrix = match construction {
            Construction::Cyclic => LatinSquare::cyclic(n).map(Self::Latin)?,
            Construction::Sampled => SampledOrders::generate(n).map(Self::Sampled)?,
        };
        tracing::debug!(?construction, n, "built order matrix");
        Ok(matrix)
    }

    pub fn construction(&self) -> Construction {
        match self {
            Self::Latin(_) => Construction::Cyclic,
            Self::Sampled(_) => Construction::Sampled,
        }
    }

    pub fn dimension(&self) -> usize {
        self.rows().len()
    }

    pub fn row(&self, i: usize) -> Option<&[usize]> {
        self.rows().get(i).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        match self {
            Self::Latin(sq) => sq.rows(),
            Self::Sampled(s) => s.rows(),
        }
    }

    /// Whether every column is also a permutation, i.e. each document visits
    /// each slot exactly once across the `n` rows.
    pub fn is_column_balanced(&self) -> bool {
        match self {
            Self::Latin(_) => true,
            Self::Sampled(s) => {
                let n = s.dimension();
                (0..n).all(|col| {
                    let column: Vec<usize> = s.rows().iter().map(|r| r[col]).collect();
                    is_permutation_of_1_to_n(&column, n)
                })
            }
        }
    }
}
