//! Ordered sparse vectors.
//!
//! A [`SparseVector`] has a fixed cardinality (`size`) and stores only its
//! non-zero slots, kept sorted by index. Two views of the same data are used
//! throughout the crate:
//!
//! - as a geometric point, when canopies accumulate moments, and
//! - as a sequence of tokens, when the edit-distance measure compares two
//!   vectors. The sequence is the non-zero values in index order; zero or
//!   missing slots are not sequence elements.

use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A sparse numeric vector addressable by integer index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSparseVector", into = "RawSparseVector")]
pub struct SparseVector {
    size: usize,
    // Sorted by index, never holds an explicit zero.
    entries: Vec<(usize, f64)>,
}

/// Wire shape of a [`SparseVector`]; validated on the way in.
#[derive(Serialize, Deserialize)]
struct RawSparseVector {
    size: usize,
    entries: Vec<(usize, f64)>,
}

impl TryFrom<RawSparseVector> for SparseVector {
    type Error = Error;

    fn try_from(raw: RawSparseVector) -> Result<Self> {
        Self::from_entries(raw.size, raw.entries)
    }
}

impl From<SparseVector> for RawSparseVector {
    fn from(v: SparseVector) -> Self {
        Self {
            size: v.size,
            entries: v.entries,
        }
    }
}

impl SparseVector {
    /// Create an all-zero vector of the given cardinality.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            entries: Vec::new(),
        }
    }

    /// Build a vector from a dense slice, dropping zero slots.
    pub fn from_dense(values: &[f64]) -> Self {
        let entries = values
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0.0)
            .map(|(i, &v)| (i, v))
            .collect();
        Self {
            size: values.len(),
            entries,
        }
    }

    /// Build a vector from `(index, value)` pairs.
    ///
    /// Pairs may come in any order; a later pair for the same index wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if an index is `>= size`.
    pub fn from_entries(size: usize, entries: impl IntoIterator<Item = (usize, f64)>) -> Result<Self> {
        let mut v = Self::new(size);
        for (index, value) in entries {
            v.set(index, value)?;
        }
        Ok(v)
    }

    /// A zero vector with the same cardinality.
    pub fn like(&self) -> Self {
        Self::new(self.size)
    }

    /// Cardinality of the vector.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of non-zero slots.
    #[inline]
    pub fn num_nonzeros(&self) -> usize {
        self.entries.len()
    }

    /// True if every slot is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value at `index` (zero for unset or out-of-range slots).
    pub fn get(&self, index: usize) -> f64 {
        match self.entries.binary_search_by_key(&index, |&(i, _)| i) {
            Ok(pos) => self.entries[pos].1,
            Err(_) => 0.0,
        }
    }

    /// Set the value at `index`. Setting zero clears the slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= size`.
    pub fn set(&mut self, index: usize, value: f64) -> Result<()> {
        if index >= self.size {
            return Err(Error::IndexOutOfBounds {
                index,
                size: self.size,
            });
        }
        match self.entries.binary_search_by_key(&index, |&(i, _)| i) {
            Ok(pos) if value == 0.0 => {
                self.entries.remove(pos);
            }
            Ok(pos) => self.entries[pos].1 = value,
            Err(_) if value == 0.0 => {}
            Err(pos) => self.entries.insert(pos, (index, value)),
        }
        Ok(())
    }

    /// Non-zero `(index, value)` pairs in index order.
    pub fn nonzeros(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Non-zero values in index order: the vector read as a token sequence.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|&(_, v)| v)
    }

    /// Dense copy of the vector.
    pub fn to_dense(&self) -> Vec<f64> {
        let mut out = vec![0.0; self.size];
        for &(i, v) in &self.entries {
            out[i] = v;
        }
        out
    }

    /// Element-wise `self += other²`.
    ///
    /// The cardinality grows to cover `other` if it is larger.
    pub fn add_squares(&mut self, other: &SparseVector) {
        self.merge_from(other, |x| x * x);
    }

    /// Element-wise square.
    pub fn squared(&self) -> SparseVector {
        Self {
            size: self.size,
            entries: self.entries.iter().map(|&(i, v)| (i, v * v)).collect(),
        }
    }

    /// Dot product.
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let mut acc = 0.0;
        merge_join(&self.entries, &other.entries, |_, x, y| {
            if let (Some(x), Some(y)) = (x, y) {
                acc += x * y;
            }
        });
        acc
    }

    /// Squared L2 norm.
    pub fn norm_squared(&self) -> f64 {
        self.values().map(|v| v * v).sum()
    }

    /// Squared Euclidean distance, treating missing slots as zero.
    pub fn squared_distance(&self, other: &SparseVector) -> f64 {
        let mut acc = 0.0;
        merge_join(&self.entries, &other.entries, |_, x, y| {
            let d = x.unwrap_or(0.0) - y.unwrap_or(0.0);
            acc += d * d;
        });
        acc
    }

    /// Human-readable rendering, not intended as an interchange format.
    ///
    /// Values print with three decimals. When `bindings` names a dimension the
    /// name prefixes its value; otherwise the index does, if bindings were
    /// given at all or the vector is sparse.
    pub fn format_with_bindings(&self, bindings: Option<&[Option<&str>]>) -> String {
        let is_sparse = self.entries.len() != self.size;
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|&(i, v)| {
                let label = match bindings {
                    Some(names) => match names.get(i).copied().flatten() {
                        Some(name) => format!("{name}:"),
                        None => format!("{i}:"),
                    },
                    None if is_sparse => format!("{i}:"),
                    None => String::new(),
                };
                format!("{label}{v:.3}")
            })
            .collect();
        format!("[{}]", parts.join(", "))
    }

    fn merge_from(&mut self, other: &SparseVector, f: impl Fn(f64) -> f64) {
        self.size = self.size.max(other.size);
        let mut merged = Vec::with_capacity(self.entries.len() + other.entries.len());
        merge_join(&self.entries, &other.entries, |i, x, y| {
            let v = x.unwrap_or(0.0) + y.map_or(0.0, &f);
            if v != 0.0 {
                merged.push((i, v));
            }
        });
        self.entries = merged;
    }
}

/// Walk two index-sorted entry lists in lockstep, calling `visit` once per
/// index present in either.
fn merge_join(
    a: &[(usize, f64)],
    b: &[(usize, f64)],
    mut visit: impl FnMut(usize, Option<f64>, Option<f64>),
) {
    let (mut ia, mut ib) = (0, 0);
    while ia < a.len() || ib < b.len() {
        match (a.get(ia), b.get(ib)) {
            (Some(&(i, x)), Some(&(j, _))) if i < j => {
                visit(i, Some(x), None);
                ia += 1;
            }
            (Some(&(i, _)), Some(&(j, y))) if j < i => {
                visit(j, None, Some(y));
                ib += 1;
            }
            (Some(&(i, x)), Some(&(_, y))) => {
                visit(i, Some(x), Some(y));
                ia += 1;
                ib += 1;
            }
            (Some(&(i, x)), None) => {
                visit(i, Some(x), None);
                ia += 1;
            }
            (None, Some(&(j, y))) => {
                visit(j, None, Some(y));
                ib += 1;
            }
            (None, None) => break,
        }
    }
}

impl From<&[f64]> for SparseVector {
    fn from(values: &[f64]) -> Self {
        Self::from_dense(values)
    }
}

impl From<Vec<f64>> for SparseVector {
    fn from(values: Vec<f64>) -> Self {
        Self::from_dense(&values)
    }
}

/// Element-wise addition; the cardinality grows to cover `other` if it is larger.
impl AddAssign<&SparseVector> for SparseVector {
    fn add_assign(&mut self, other: &SparseVector) {
        self.merge_from(other, |x| x);
    }
}

impl fmt::Display for SparseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with_bindings(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_dense_drops_zeros() {
        let v = SparseVector::from_dense(&[0.0, 3.0, 0.0, 1.0]);
        assert_eq!(v.size(), 4);
        assert_eq!(v.num_nonzeros(), 2);
        assert_eq!(v.values().collect::<Vec<_>>(), vec![3.0, 1.0]);
        assert_eq!(v.to_dense(), vec![0.0, 3.0, 0.0, 1.0]);
    }

    #[test]
    fn set_keeps_index_order_and_clears_zero() {
        let mut v = SparseVector::new(10);
        v.set(7, 2.0).unwrap();
        v.set(1, 5.0).unwrap();
        v.set(4, 9.0).unwrap();
        assert_eq!(v.nonzeros().collect::<Vec<_>>(), vec![(1, 5.0), (4, 9.0), (7, 2.0)]);

        v.set(4, 0.0).unwrap();
        assert_eq!(v.values().collect::<Vec<_>>(), vec![5.0, 2.0]);
        assert_eq!(v.get(4), 0.0);
    }

    #[test]
    fn set_out_of_bounds() {
        let mut v = SparseVector::new(3);
        assert_eq!(v.set(3, 1.0), Err(Error::IndexOutOfBounds { index: 3, size: 3 }));
        assert!(SparseVector::from_entries(2, [(0, 1.0), (5, 1.0)]).is_err());
    }

    #[test]
    fn add_assign_and_squares() {
        let mut sum = SparseVector::from_dense(&[1.0, 0.0, 2.0]);
        let x = SparseVector::from_dense(&[0.0, 3.0, -2.0]);
        sum += &x;
        assert_eq!(sum.to_dense(), vec![1.0, 3.0, 0.0]);
        // Cancelled slot is no longer stored.
        assert_eq!(sum.num_nonzeros(), 2);

        let mut sq = SparseVector::new(3);
        sq.add_squares(&x);
        sq.add_squares(&x);
        assert_eq!(sq.to_dense(), vec![0.0, 18.0, 8.0]);
    }

    #[test]
    fn dot_and_distance() {
        let a = SparseVector::from_dense(&[1.0, 0.0, 2.0]);
        let b = SparseVector::from_dense(&[0.0, 4.0, 3.0]);
        assert_eq!(a.dot(&b), 6.0);
        assert_eq!(a.norm_squared(), 5.0);
        assert_eq!(a.squared_distance(&b), 1.0 + 16.0 + 1.0);
        assert_eq!(a.squared_distance(&a), 0.0);
    }

    #[test]
    fn formatting() {
        let dense = SparseVector::from_dense(&[1.0, 2.5]);
        assert_eq!(dense.to_string(), "[1.000, 2.500]");

        let sparse = SparseVector::from_dense(&[0.0, 2.5, 0.0]);
        assert_eq!(sparse.to_string(), "[1:2.500]");

        let names = [Some("a"), None];
        assert_eq!(dense.format_with_bindings(Some(&names[..])), "[a:1.000, 1:2.500]");

        assert_eq!(SparseVector::new(4).to_string(), "[]");
    }

    #[test]
    fn serde_validates_indices() {
        let v = SparseVector::from_entries(5, [(3, 1.5), (0, 2.0)]).unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let back: SparseVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);

        let bad = r#"{"size":2,"entries":[[4,1.0]]}"#;
        assert!(serde_json::from_str::<SparseVector>(bad).is_err());
    }
}
