/// Sparse feature vector with entries sorted by index
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
    dim: usize,
    entries: Vec<(usize, f32)>,
}

impl SparseVector {
    /// Build from unordered `(index, value)` pairs.
    ///
    /// Zero values are dropped; duplicate indices are summed.
    pub fn from_pairs(dim: usize, pairs: impl IntoIterator<Item = (usize, f32)>) -> Self {
        let mut entries: Vec<(usize, f32)> = pairs.into_iter().collect();
        entries.sort_by_key(|&(i, _)| i);

        let mut merged: Vec<(usize, f32)> = Vec::with_capacity(entries.len());
        for (index, value) in entries {
            match merged.last_mut() {
                Some((last, acc)) if *last == index => *acc += value,
                _ => merged.push((index, value)),
            }
        }
        merged.retain(|&(_, v)| v != 0.0);

        Self {
            dim,
            entries: merged,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn entries(&self) -> &[(usize, f32)] {
        &self.entries
    }

    /// Number of stored (non-zero) entries
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> f32 {
        self.entries
            .binary_search_by_key(&index, |&(i, _)| i)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0.0)
    }

    /// Dot product with a dense row
    pub fn dot(&self, dense: &[f32]) -> f32 {
        self.entries
            .iter()
            .filter_map(|&(i, v)| dense.get(i).map(|w| w * v))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_sorts_and_merges() {
        let v = SparseVector::from_pairs(10, vec![(5, 1.0), (2, 0.5), (5, 2.0), (7, 0.0)]);
        assert_eq!(v.entries(), &[(2, 0.5), (5, 3.0)]);
        assert_eq!(v.nnz(), 2);
        assert_eq!(v.dim(), 10);
    }

    #[test]
    fn test_get_and_dot() {
        let v = SparseVector::from_pairs(4, vec![(0, 1.0), (3, 2.0)]);
        assert_eq!(v.get(3), 2.0);
        assert_eq!(v.get(1), 0.0);
        assert_eq!(v.dot(&[1.0, 10.0, 10.0, 0.5]), 2.0);
    }

    #[test]
    fn test_empty() {
        let v = SparseVector::from_pairs(3, Vec::new());
        assert!(v.is_empty());
        assert_eq!(v.dot(&[1.0, 1.0, 1.0]), 0.0);
    }
}
