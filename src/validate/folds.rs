//! Seeded k-fold partitioning

use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices split into k disjoint, non-empty folds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldPartition {
    folds: Vec<Vec<usize>>,
    n_rows: usize,
}

impl FoldPartition {
    /// Shuffle `0..n_rows` with `seed` and cut it into `k` contiguous folds
    ///
    /// The first `n_rows % k` folds hold one extra row. The same `(n_rows,
    /// k, seed)` always yields the same partition.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] unless `2 <= k <= n_rows`
    pub fn new(n_rows: usize, k: usize, seed: u64) -> Result<Self> {
        if k < 2 {
            return Err(Error::InvalidInput(format!(
                "k-fold cross-validation needs at least 2 folds, got {k}"
            )));
        }
        if k > n_rows {
            return Err(Error::InvalidInput(format!(
                "cannot split {n_rows} rows into {k} folds"
            )));
        }

        let mut indices: Vec<usize> = (0..n_rows).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let base = n_rows / k;
        let extra = n_rows % k;
        let mut folds = Vec::with_capacity(k);
        let mut start = 0;
        for i in 0..k {
            let size = base + usize::from(i < extra);
            folds.push(indices[start..start + size].to_vec());
            start += size;
        }

        Ok(Self { folds, n_rows })
    }

    /// Number of folds
    #[must_use]
    pub fn k(&self) -> usize {
        self.folds.len()
    }

    /// Rows partitioned
    #[must_use]
    pub const fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Held-out rows of fold `i` (0-based)
    #[must_use]
    pub fn test_indices(&self, i: usize) -> &[usize] {
        &self.folds[i]
    }

    /// Training rows for fold `i`: every other fold, in fold order
    #[must_use]
    pub fn train_indices(&self, i: usize) -> Vec<usize> {
        self.folds
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .flat_map(|(_, fold)| fold.iter().copied())
            .collect()
    }

    /// `(train, test)` pairs in fold order
    pub fn splits(&self) -> impl Iterator<Item = (Vec<usize>, &[usize])> + '_ {
        (0..self.k()).map(move |i| (self.train_indices(i), self.test_indices(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_balanced() {
        let partition = FoldPartition::new(103, 5, 42).unwrap();
        let sizes: Vec<usize> = (0..5).map(|i| partition.test_indices(i).len()).collect();
        assert_eq!(sizes, vec![21, 21, 21, 20, 20]);
    }

    #[test]
    fn test_folds_are_disjoint_and_cover() {
        let partition = FoldPartition::new(50, 4, 7).unwrap();
        let mut seen: Vec<usize> = (0..4).flat_map(|i| partition.test_indices(i).to_vec()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_train_excludes_test() {
        let partition = FoldPartition::new(20, 5, 42).unwrap();
        for (train, test) in partition.splits() {
            assert_eq!(train.len() + test.len(), 20);
            assert!(test.iter().all(|t| !train.contains(t)));
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let a = FoldPartition::new(100, 5, 42).unwrap();
        let b = FoldPartition::new(100, 5, 42).unwrap();
        assert_eq!(a, b);
        let c = FoldPartition::new(100, 5, 43).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_invalid_k() {
        assert!(matches!(FoldPartition::new(10, 1, 42), Err(Error::InvalidInput(_))));
        assert!(matches!(FoldPartition::new(3, 4, 42), Err(Error::InvalidInput(_))));
        assert!(FoldPartition::new(4, 4, 42).is_ok());
    }
}
