//! Coordinate (triplet) storage used to hand Jacobians, mass matrices and
//! iteration matrices to the linear solvers.

use sprs::{CsMat, TriMat};

use crate::Float;

use super::base::Matrix;

/// Sparse matrix in coordinate form. Duplicate entries are summed when the
/// triplet is converted to a dense or compressed matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Triplet {
    nrow: usize,
    ncol: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<Float>,
}

impl Triplet {
    /// Empty `nrow x ncol` triplet.
    pub fn new(nrow: usize, ncol: usize) -> Self {
        Self::with_capacity(nrow, ncol, 0)
    }

    pub fn with_capacity(nrow: usize, ncol: usize, nnz: usize) -> Self {
        Self {
            nrow,
            ncol,
            rows: Vec::with_capacity(nnz),
            cols: Vec::with_capacity(nnz),
            vals: Vec::with_capacity(nnz),
        }
    }

    /// `n x n` identity.
    pub fn identity(n: usize) -> Self {
        let mut t = Self::with_capacity(n, n, n);
        for i in 0..n {
            t.put(i, i, 1.0);
        }
        t
    }

    /// Adds `val` at `(i, j)`.
    pub fn put(&mut self, i: usize, j: usize, val: Float) {
        assert!(
            i < self.nrow && j < self.ncol,
            "entry ({}, {}) outside a {}x{} triplet",
            i,
            j,
            self.nrow,
            self.ncol
        );
        self.rows.push(i);
        self.cols.push(j);
        self.vals.push(val);
    }

    /// Removes all entries, keeping the dimensions and the allocation.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.cols.clear();
        self.vals.clear();
    }

    pub fn nrow(&self) -> usize {
        self.nrow
    }

    pub fn ncol(&self) -> usize {
        self.ncol
    }

    /// Number of stored entries (duplicates included).
    pub fn nnz(&self) -> usize {
        self.vals.len()
    }

    /// Iterates over `(i, j, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Float)> + '_ {
        self.rows
            .iter()
            .zip(&self.cols)
            .zip(&self.vals)
            .map(|((&i, &j), &v)| (i, j, v))
    }

    /// out = A·x
    pub fn mul_vec(&self, x: &[Float], out: &mut [Float]) {
        out.iter_mut().for_each(|v| *v = 0.0);
        for (i, j, v) in self.iter() {
            out[i] += v * x[j];
        }
    }

    /// Dense copy with duplicates summed.
    pub fn to_dense(&self) -> Matrix {
        let mut a = Matrix::zeros(self.nrow, self.ncol);
        for (i, j, v) in self.iter() {
            a[(i, j)] += v;
        }
        a
    }

    /// Compressed sparse column copy with duplicates summed.
    pub fn to_csc(&self) -> CsMat<Float> {
        let tri = TriMat::from_triplets(
            (self.nrow, self.ncol),
            self.rows.clone(),
            self.cols.clone(),
            self.vals.clone(),
        );
        tri.to_csc()
    }
}

#[cfg(test)]
mod tests {
    use super::Triplet;

    #[test]
    fn duplicates_are_summed() {
        let mut t = Triplet::new(2, 2);
        t.put(0, 0, 1.0);
        t.put(0, 0, 2.0);
        t.put(1, 0, -1.0);
        let a = t.to_dense();
        assert_eq!(a[(0, 0)], 3.0);
        assert_eq!(a[(1, 0)], -1.0);
        assert_eq!(a[(1, 1)], 0.0);

        let csc = t.to_csc();
        assert_eq!(csc.get(0, 0), Some(&3.0));
        assert_eq!(csc.get(1, 0), Some(&-1.0));
    }

    #[test]
    fn mul_vec_matches_dense() {
        let mut t = Triplet::identity(3);
        t.put(0, 2, 4.0);
        let mut out = vec![0.0; 3];
        t.mul_vec(&[1.0, 2.0, 3.0], &mut out);
        assert_eq!(out, vec![13.0, 2.0, 3.0]);
    }
}
